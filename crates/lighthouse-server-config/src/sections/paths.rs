// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Filesystem paths section.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_DIR: &str = "/var/lib/nebula-lighthouse";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PathsConfigLayer {
	pub config_dir: Option<PathBuf>,
}

impl PathsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.config_dir.is_some() {
			self.config_dir = other.config_dir;
		}
	}

	pub fn finalize(self) -> PathsConfig {
		PathsConfig {
			config_dir: self
				.config_dir
				.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
	/// Directory holding the generated `lighthouse-<n>.yaml` files.
	pub config_dir: PathBuf,
}

impl Default for PathsConfig {
	fn default() -> Self {
		PathsConfigLayer::default().finalize()
	}
}
