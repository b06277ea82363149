// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wrapped nebula binary section.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BINARY: &str = "nebula";
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NebulaConfigLayer {
	pub binary: Option<PathBuf>,
	pub stop_timeout_secs: Option<u64>,
}

impl NebulaConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.binary.is_some() {
			self.binary = other.binary;
		}
		if other.stop_timeout_secs.is_some() {
			self.stop_timeout_secs = other.stop_timeout_secs;
		}
	}

	pub fn finalize(self) -> NebulaConfig {
		NebulaConfig {
			binary: self.binary.unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY)),
			stop_timeout_secs: self.stop_timeout_secs.unwrap_or(DEFAULT_STOP_TIMEOUT_SECS),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NebulaConfig {
	/// Path to the binary, or a bare name looked up on `PATH`.
	pub binary: PathBuf,
	pub stop_timeout_secs: u64,
}

impl NebulaConfig {
	pub fn stop_timeout(&self) -> Duration {
		Duration::from_secs(self.stop_timeout_secs)
	}
}

impl Default for NebulaConfig {
	fn default() -> Self {
		NebulaConfigLayer::default().finalize()
	}
}
