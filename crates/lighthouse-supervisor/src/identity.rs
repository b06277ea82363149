// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lighthouse identity: the certificate/key triple a daemon runs as.

use sha2::{Digest, Sha256};

use crate::error::IdentityError;

/// The (CA certificate, host certificate, host key) triple distinguishing one
/// lighthouse from another.
///
/// Equality and hashing are byte-exact over all three fields. Format checks
/// (PEM headers, alphabet) are the caller's responsibility; this type only
/// requires the blobs to be text so they can be embedded in the daemon config.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity {
	ca_cert: String,
	host_cert: String,
	host_key: String,
}

impl Identity {
	pub fn new(
		ca_cert: impl Into<String>,
		host_cert: impl Into<String>,
		host_key: impl Into<String>,
	) -> Self {
		Self {
			ca_cert: ca_cert.into(),
			host_cert: host_cert.into(),
			host_key: host_key.into(),
		}
	}

	pub fn from_bytes(
		ca_cert: Vec<u8>,
		host_cert: Vec<u8>,
		host_key: Vec<u8>,
	) -> Result<Self, IdentityError> {
		let text = |bytes: Vec<u8>, field: &'static str| {
			String::from_utf8(bytes).map_err(|_| IdentityError::NotUtf8 { field })
		};

		Ok(Self {
			ca_cert: text(ca_cert, "ca_crt")?,
			host_cert: text(host_cert, "host_crt")?,
			host_key: text(host_key, "host_key")?,
		})
	}

	pub fn ca_cert(&self) -> &str {
		&self.ca_cert
	}

	pub fn host_cert(&self) -> &str {
		&self.host_cert
	}

	pub fn host_key(&self) -> &str {
		&self.host_key
	}

	/// Short, log-safe digest of the two certificates.
	///
	/// The host key never contributes, so the fingerprint can appear in logs.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();
		hasher.update(self.ca_cert.as_bytes());
		hasher.update([0u8]);
		hasher.update(self.host_cert.as_bytes());
		let digest = hasher.finalize();
		hex::encode(&digest[..6])
	}
}

impl std::fmt::Debug for Identity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Identity")
			.field("fingerprint", &self.fingerprint())
			.field("host_key", &"[REDACTED]")
			.finish()
	}
}
