// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lighthouses declared in configuration.
//!
//! Declared lighthouses are provisioned at startup with a fixed index taken
//! from their name:
//!
//! ```toml
//! [lighthouses.lighthouse-0]
//! ca = "-----BEGIN NEBULA CERTIFICATE-----\n..."
//! cert = "-----BEGIN NEBULA CERTIFICATE-----\n..."
//! key = "-----BEGIN NEBULA X25519 PRIVATE KEY-----\n..."
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

const NAME_PREFIX: &str = "lighthouse-";

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct DeclaredLighthouseLayer {
	pub ca: String,
	pub cert: String,
	pub key: String,
}

impl fmt::Debug for DeclaredLighthouseLayer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DeclaredLighthouseLayer")
			.field("ca_len", &self.ca.len())
			.field("cert_len", &self.cert.len())
			.field("key", &"[REDACTED]")
			.finish()
	}
}

#[derive(Clone, PartialEq)]
pub struct DeclaredLighthouse {
	pub index: u32,
	pub ca: String,
	pub cert: String,
	pub key: String,
}

impl fmt::Debug for DeclaredLighthouse {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DeclaredLighthouse")
			.field("index", &self.index)
			.field("key", &"[REDACTED]")
			.finish_non_exhaustive()
	}
}

/// Parses the index out of a `lighthouse-<n>` name.
pub fn declared_index(name: &str) -> Option<u32> {
	let digits = name.strip_prefix(NAME_PREFIX)?;
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	if digits.len() > 1 && digits.starts_with('0') {
		return None;
	}
	digits.parse().ok()
}

/// Resolves declared entries, ordered by index. Entries with malformed names
/// are skipped.
pub fn finalize(layer: Option<BTreeMap<String, DeclaredLighthouseLayer>>) -> Vec<DeclaredLighthouse> {
	let mut declared: Vec<DeclaredLighthouse> = layer
		.unwrap_or_default()
		.into_iter()
		.filter_map(|(name, entry)| match declared_index(&name) {
			Some(index) => Some(DeclaredLighthouse {
				index,
				ca: entry.ca,
				cert: entry.cert,
				key: entry.key,
			}),
			None => {
				warn!(name = %name, "ignoring declared lighthouse: name must be lighthouse-<number>");
				None
			}
		})
		.collect();
	declared.sort_by_key(|lighthouse| lighthouse.index);
	declared
}
