// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per key, created on demand.
///
/// Entries nobody holds or waits on are pruned on the next `lock` call.
#[derive(Debug)]
pub(crate) struct KeyedLocks<K> {
	locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
	fn default() -> Self {
		Self {
			locks: Mutex::new(HashMap::new()),
		}
	}
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
	pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
		let lock = {
			let mut locks = self.locks.lock();
			locks.retain(|_, lock| Arc::strong_count(lock) > 1);
			Arc::clone(locks.entry(key.clone()).or_default())
		};
		lock.lock_owned().await
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.locks.lock().len()
	}
}
