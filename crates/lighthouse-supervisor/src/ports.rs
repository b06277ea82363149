// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ordinal to UDP port mapping.

use crate::error::SupervisorError;

/// Inclusive UDP port range lighthouses are allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
	min: u16,
	max: u16,
}

impl PortRange {
	pub fn new(min: u16, max: u16) -> Self {
		Self { min, max }
	}

	pub fn min(&self) -> u16 {
		self.min
	}

	pub fn max(&self) -> u16 {
		self.max
	}

	/// Number of lighthouses the range can hold.
	pub fn capacity(&self) -> u32 {
		if self.max < self.min {
			0
		} else {
			u32::from(self.max - self.min) + 1
		}
	}

	/// Maps an ordinal to `min + ordinal`, failing once the range is exhausted.
	pub fn allocate(&self, ordinal: u32) -> Result<u16, SupervisorError> {
		u32::from(self.min)
			.checked_add(ordinal)
			.filter(|port| *port <= u32::from(self.max))
			.and_then(|port| u16::try_from(port).ok())
			.ok_or(SupervisorError::CapacityExceeded {
				ordinal,
				min_port: self.min,
				max_port: self.max,
			})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn allocates_from_the_bottom_of_the_range() {
		let range = PortRange::new(49152, 49153);
		assert_eq!(range.allocate(0).unwrap(), 49152);
		assert_eq!(range.allocate(1).unwrap(), 49153);
	}

	#[test]
	fn exhausted_range_is_capacity_error() {
		let range = PortRange::new(49152, 49153);
		let err = range.allocate(2).unwrap_err();
		assert!(matches!(
			err,
			SupervisorError::CapacityExceeded {
				ordinal: 2,
				min_port: 49152,
				max_port: 49153
			}
		));
	}

	#[test]
	fn single_port_range_holds_one_lighthouse() {
		let range = PortRange::new(50000, 50000);
		assert_eq!(range.capacity(), 1);
		assert_eq!(range.allocate(0).unwrap(), 50000);
		assert!(range.allocate(1).is_err());
	}

	#[test]
	fn inverted_range_has_no_capacity() {
		let range = PortRange::new(50001, 50000);
		assert_eq!(range.capacity(), 0);
		assert!(range.allocate(0).is_err());
	}

	#[test]
	fn top_of_port_space_does_not_overflow() {
		let range = PortRange::new(65535, 65535);
		assert_eq!(range.allocate(0).unwrap(), 65535);
		assert!(range.allocate(1).is_err());
		assert!(range.allocate(u32::MAX).is_err());
	}

	proptest! {
		#[test]
		fn prop_allocation_is_in_range_or_capacity_error(
			min in 1u16..=65535,
			span in 0u16..2048,
			ordinal in 0u32..4096,
		) {
			let max = min.saturating_add(span);
			let range = PortRange::new(min, max);
			match range.allocate(ordinal) {
				Ok(port) => {
					prop_assert!(ordinal < range.capacity());
					prop_assert_eq!(u32::from(port), u32::from(min) + ordinal);
					prop_assert!(port <= max);
				}
				Err(_) => prop_assert!(ordinal >= range.capacity()),
			}
		}
	}
}
