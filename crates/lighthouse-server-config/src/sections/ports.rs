// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lighthouse UDP port range section.

use serde::{Deserialize, Serialize};

use super::clamp_port;

pub const DEFAULT_MIN_PORT: u16 = 49152;
pub const DEFAULT_MAX_PORT: u16 = 65535;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortsConfigLayer {
	pub min_port: Option<i64>,
	pub max_port: Option<i64>,
}

impl PortsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.min_port.is_some() {
			self.min_port = other.min_port;
		}
		if other.max_port.is_some() {
			self.max_port = other.max_port;
		}
	}

	/// Resolves the range, clamping each bound into `1..=65535`.
	///
	/// An inverted range is left as is; [`crate::load_config`] rejects it.
	pub fn finalize(self) -> PortsConfig {
		PortsConfig {
			min_port: self.min_port.map(clamp_port).unwrap_or(DEFAULT_MIN_PORT),
			max_port: self.max_port.map(clamp_port).unwrap_or(DEFAULT_MAX_PORT),
		}
	}
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortsConfig {
	pub min_port: u16,
	pub max_port: u16,
}

impl Default for PortsConfig {
	fn default() -> Self {
		Self {
			min_port: DEFAULT_MIN_PORT,
			max_port: DEFAULT_MAX_PORT,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_defaults() {
		let config = PortsConfigLayer::default().finalize();
		assert_eq!(config, PortsConfig::default());
		assert_eq!(config.min_port, 49152);
		assert_eq!(config.max_port, 65535);
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = PortsConfigLayer {
			min_port: Some(40000),
			max_port: Some(40010),
		};
		base.merge(PortsConfigLayer {
			min_port: None,
			max_port: Some(40100),
		});
		assert_eq!(base.min_port, Some(40000));
		assert_eq!(base.max_port, Some(40100));
	}

	proptest! {
		#[test]
		fn prop_finalized_bounds_are_valid_ports(min in any::<i64>(), max in any::<i64>()) {
			let config = PortsConfigLayer {
				min_port: Some(min),
				max_port: Some(max),
			}
			.finalize();
			prop_assert!(config.min_port >= 1);
			prop_assert!(config.max_port >= 1);
			if (1..=65535).contains(&min) {
				prop_assert_eq!(i64::from(config.min_port), min);
			}
		}
	}
}
