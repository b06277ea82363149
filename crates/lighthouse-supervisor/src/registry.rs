// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity to daemon registry.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::identity::Identity;
use crate::monitor::{DaemonExit, ProcessHandle};

/// A supervised daemon.
#[derive(Debug, Clone)]
pub struct DaemonRecord {
	pub ordinal: u32,
	pub port: u16,
	pub config_path: PathBuf,
	pub handle: ProcessHandle,
}

/// In-memory map of identities to their daemons.
///
/// Entries are added by the supervisor after a successful launch and removed
/// by the daemon's monitor once it exits, so a record found here is at most
/// one exit notification stale. Readers that need certainty check
/// [`ProcessHandle::is_alive`].
#[derive(Debug, Default)]
pub struct Registry {
	daemons: Mutex<HashMap<Identity, DaemonRecord>>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, identity: &Identity) -> Option<DaemonRecord> {
		self.daemons.lock().get(identity).cloned()
	}

	/// The identity's record, if its daemon is still running.
	pub fn live(&self, identity: &Identity) -> Option<DaemonRecord> {
		self.get(identity).filter(|record| record.handle.is_alive())
	}

	/// The live daemon occupying `ordinal`, whichever identity it runs as.
	pub fn find_by_ordinal(&self, ordinal: u32) -> Option<(Identity, DaemonRecord)> {
		self.daemons
			.lock()
			.iter()
			.find(|(_, record)| record.ordinal == ordinal && record.handle.is_alive())
			.map(|(identity, record)| (identity.clone(), record.clone()))
	}

	/// Registers a freshly launched daemon, replacing any previous record.
	///
	/// Fails with the daemon's exit if it has already died, so a monitor that
	/// finished before registration cannot leave a dead entry behind.
	pub(crate) fn insert(
		&self,
		identity: Identity,
		record: DaemonRecord,
	) -> Result<Option<DaemonRecord>, DaemonExit> {
		let mut daemons = self.daemons.lock();
		if let Some(exit) = record.handle.exit() {
			return Err(exit);
		}
		Ok(daemons.insert(identity, record))
	}

	/// Removes the identity's record if it belongs to `launch_id`.
	pub(crate) fn remove_launch(&self, identity: &Identity, launch_id: u64) -> bool {
		let mut daemons = self.daemons.lock();
		match daemons.get(identity) {
			Some(record) if record.handle.launch_id() == launch_id => {
				daemons.remove(identity);
				true
			}
			_ => false,
		}
	}

	pub fn remove(&self, identity: &Identity) -> Option<DaemonRecord> {
		self.daemons.lock().remove(identity)
	}

	/// Removes and returns every record.
	pub fn drain(&self) -> Vec<(Identity, DaemonRecord)> {
		self.daemons.lock().drain().collect()
	}

	pub fn len(&self) -> usize {
		self.daemons.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.daemons.lock().is_empty()
	}

	pub fn snapshot(&self) -> Vec<(Identity, DaemonRecord)> {
		let mut records: Vec<_> = self
			.daemons
			.lock()
			.iter()
			.map(|(identity, record)| (identity.clone(), record.clone()))
			.collect();
		records.sort_by_key(|(_, record)| record.ordinal);
		records
	}
}
