// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP listener configuration section.

use serde::{Deserialize, Serialize};

use super::clamp_port;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HttpConfigLayer {
	pub host: Option<String>,
	/// Signed so out-of-range values can be clamped rather than rejected.
	pub port: Option<i64>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
	}

	pub fn finalize(self) -> HttpConfig {
		HttpConfig {
			host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
			port: self.port.map(clamp_port).unwrap_or(DEFAULT_PORT),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpConfig {
	pub host: String,
	pub port: u16,
}

impl Default for HttpConfig {
	fn default() -> Self {
		HttpConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = HttpConfig::default();
		assert_eq!(config.host, "0.0.0.0");
		assert_eq!(config.port, 8080);
	}

	#[test]
	fn test_port_is_clamped() {
		let high = HttpConfigLayer {
			port: Some(70000),
			..Default::default()
		};
		assert_eq!(high.finalize().port, 65535);

		let low = HttpConfigLayer {
			port: Some(-5),
			..Default::default()
		};
		assert_eq!(low.finalize().port, 1);
	}

	#[test]
	fn test_deserialize_layer_partial() {
		let layer: HttpConfigLayer = toml::from_str("port = 9000\n").unwrap();
		assert_eq!(layer.port, Some(9000));
		assert!(layer.host.is_none());
	}
}
