// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity format validation.
//!
//! Only checks shape: the PEM alphabet and the nebula PEM headers. Whether
//! the certificates are actually valid is left to `nebula -test`.

use std::sync::LazyLock;

use lighthouse_supervisor::Identity;
use regex::Regex;

use crate::payload::LighthouseFields;

static PEM_ALPHABET: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[ A-Za-z0-9+/\r\n=-]+$").unwrap());

const CERTIFICATE_HEADER: &str = "-----BEGIN NEBULA CERTIFICATE-----";
const KEY_HEADER: &str = "-----BEGIN NEBULA";
const KEY_MARKER: &str = " PRIVATE KEY-----";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityValidationError {
	#[error("missing field `{0}`")]
	MissingField(&'static str),

	#[error("{0} must be ASCII text")]
	NotAscii(&'static str),

	#[error("{0} must be a valid NEBULA CERTIFICATE")]
	NotCertificate(&'static str),

	#[error("host_key must be a valid NEBULA PRIVATE KEY")]
	NotPrivateKey,
}

/// Validates the three uploaded fields and builds the identity they describe.
pub fn validate_fields(fields: LighthouseFields) -> Result<Identity, IdentityValidationError> {
	let ca_crt = fields
		.ca_crt
		.ok_or(IdentityValidationError::MissingField("ca_crt"))?;
	let host_crt = fields
		.host_crt
		.ok_or(IdentityValidationError::MissingField("host_crt"))?;
	let host_key = fields
		.host_key
		.ok_or(IdentityValidationError::MissingField("host_key"))?;

	validate_identity(
		ascii("ca_crt", ca_crt)?,
		ascii("host_crt", host_crt)?,
		ascii("host_key", host_key)?,
	)
}

/// Checks the PEM shape of each part and builds the identity.
pub fn validate_identity(
	ca_crt: String,
	host_crt: String,
	host_key: String,
) -> Result<Identity, IdentityValidationError> {
	if !is_nebula_certificate(&ca_crt) {
		return Err(IdentityValidationError::NotCertificate("ca_crt"));
	}
	if !is_nebula_certificate(&host_crt) {
		return Err(IdentityValidationError::NotCertificate("host_crt"));
	}
	if !is_nebula_private_key(&host_key) {
		return Err(IdentityValidationError::NotPrivateKey);
	}

	Ok(Identity::new(ca_crt, host_crt, host_key))
}

fn ascii(field: &'static str, bytes: Vec<u8>) -> Result<String, IdentityValidationError> {
	if !bytes.is_ascii() {
		return Err(IdentityValidationError::NotAscii(field));
	}
	String::from_utf8(bytes).map_err(|_| IdentityValidationError::NotAscii(field))
}

pub fn is_nebula_certificate(text: &str) -> bool {
	PEM_ALPHABET.is_match(text) && text.starts_with(CERTIFICATE_HEADER)
}

pub fn is_nebula_private_key(text: &str) -> bool {
	PEM_ALPHABET.is_match(text) && text.starts_with(KEY_HEADER) && text.contains(KEY_MARKER)
}
