// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity to ordinal claims.
//!
//! Sequential and declared provisioning share one directory of
//! `lighthouse-<n>.yaml` files. The ledger records which identity holds which
//! ordinal for the supervisor's lifetime so the two numbering schemes never
//! hand one slot to two identities by accident.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::identity::Identity;

/// A claim taken by [`OrdinalLedger::claim`], with enough state to undo it.
#[derive(Debug, Clone)]
pub(crate) struct Claim {
	pub ordinal: u32,
	/// Identity that held `ordinal` before this claim, if any.
	pub displaced: Option<Identity>,
	/// Ordinal the claiming identity held before, if any.
	pub previous_ordinal: Option<u32>,
}

#[derive(Debug, Default)]
pub(crate) struct OrdinalLedger {
	by_ordinal: BTreeMap<u32, Identity>,
	by_identity: HashMap<Identity, u32>,
}

impl OrdinalLedger {
	pub fn ordinal_of(&self, identity: &Identity) -> Option<u32> {
		self.by_identity.get(identity).copied()
	}

	#[cfg(test)]
	pub fn holder(&self, ordinal: u32) -> Option<&Identity> {
		self.by_ordinal.get(&ordinal)
	}

	/// First ordinal at or after `start` that no other identity holds and that
	/// has no file on disk.
	pub fn next_sequential(&self, start: u32, on_disk: &BTreeSet<u32>) -> u32 {
		let mut ordinal = start;
		while self.by_ordinal.contains_key(&ordinal) || on_disk.contains(&ordinal) {
			match ordinal.checked_add(1) {
				Some(next) => ordinal = next,
				None => break,
			}
		}
		ordinal
	}

	/// Assigns `ordinal` to `identity`, releasing whatever either side held.
	pub fn claim(&mut self, identity: &Identity, ordinal: u32) -> Claim {
		let previous_ordinal = self.by_identity.insert(identity.clone(), ordinal);
		if previous_ordinal == Some(ordinal) {
			return Claim {
				ordinal,
				displaced: None,
				previous_ordinal,
			};
		}

		if let Some(previous) = previous_ordinal {
			self.by_ordinal.remove(&previous);
		}

		let displaced = self
			.by_ordinal
			.insert(ordinal, identity.clone())
			.filter(|holder| holder != identity);
		if let Some(holder) = &displaced {
			self.by_identity.remove(holder);
		}

		Claim {
			ordinal,
			displaced,
			previous_ordinal,
		}
	}

	/// Undoes `claim` as far as the slots involved are still free.
	///
	/// Claims taken concurrently for other identities are never overwritten.
	pub fn rollback(&mut self, identity: &Identity, claim: Claim) {
		if claim.previous_ordinal == Some(claim.ordinal) {
			return;
		}

		if self.by_ordinal.get(&claim.ordinal) == Some(identity) {
			self.by_ordinal.remove(&claim.ordinal);
			self.by_identity.remove(identity);
		}

		if let Some(holder) = claim.displaced {
			if !self.by_ordinal.contains_key(&claim.ordinal) && !self.by_identity.contains_key(&holder) {
				self.by_ordinal.insert(claim.ordinal, holder.clone());
				self.by_identity.insert(holder, claim.ordinal);
			}
		}

		if let Some(previous) = claim.previous_ordinal {
			if !self.by_ordinal.contains_key(&previous) && !self.by_identity.contains_key(identity) {
				self.by_ordinal.insert(previous, identity.clone());
				self.by_identity.insert(identity.clone(), previous);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn id(name: &str) -> Identity {
		Identity::new("ca", name, "key")
	}

	#[test]
	fn next_sequential_skips_claimed_and_on_disk_slots() {
		let mut ledger = OrdinalLedger::default();
		ledger.claim(&id("a"), 1);
		let on_disk = BTreeSet::from([2]);

		assert_eq!(ledger.next_sequential(0, &on_disk), 0);
		assert_eq!(ledger.next_sequential(1, &on_disk), 3);
	}

	#[test]
	fn reclaiming_the_same_slot_is_a_no_op() {
		let mut ledger = OrdinalLedger::default();
		ledger.claim(&id("a"), 4);
		let claim = ledger.claim(&id("a"), 4);

		assert!(claim.displaced.is_none());
		ledger.rollback(&id("a"), claim);
		assert_eq!(ledger.ordinal_of(&id("a")), Some(4));
	}

	#[test]
	fn claim_displaces_previous_holder() {
		let mut ledger = OrdinalLedger::default();
		ledger.claim(&id("a"), 0);
		let claim = ledger.claim(&id("b"), 0);

		assert_eq!(claim.displaced, Some(id("a")));
		assert_eq!(ledger.holder(0), Some(&id("b")));
		assert_eq!(ledger.ordinal_of(&id("a")), None);
	}

	#[test]
	fn claim_moves_identity_off_its_old_slot() {
		let mut ledger = OrdinalLedger::default();
		ledger.claim(&id("a"), 0);
		let claim = ledger.claim(&id("a"), 5);

		assert_eq!(claim.previous_ordinal, Some(0));
		assert_eq!(ledger.holder(0), None);
		assert_eq!(ledger.ordinal_of(&id("a")), Some(5));
	}

	#[test]
	fn rollback_restores_both_sides() {
		let mut ledger = OrdinalLedger::default();
		ledger.claim(&id("a"), 0);
		ledger.claim(&id("b"), 1);

		let claim = ledger.claim(&id("b"), 0);
		ledger.rollback(&id("b"), claim);

		assert_eq!(ledger.holder(0), Some(&id("a")));
		assert_eq!(ledger.holder(1), Some(&id("b")));
	}

	#[test]
	fn rollback_leaves_newer_claims_alone() {
		let mut ledger = OrdinalLedger::default();
		let first = ledger.claim(&id("a"), 3);
		ledger.claim(&id("b"), 3);

		ledger.rollback(&id("a"), first);

		assert_eq!(ledger.holder(3), Some(&id("b")));
		assert_eq!(ledger.ordinal_of(&id("a")), None);
	}
}
