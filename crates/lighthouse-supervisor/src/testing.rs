// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory validator and launcher for tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::document::Document;
use crate::error::{LaunchError, ValidationError};
use crate::launcher::{DaemonLauncher, DaemonProcess};
use crate::validator::ConfigValidator;

/// Validator that accepts everything unless told to reject.
#[derive(Debug, Default)]
pub struct MockValidator {
	calls: AtomicUsize,
	reject: AtomicBool,
}

impl MockValidator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_reject(&self, reject: bool) {
		self.reject.store(reject, Ordering::SeqCst);
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ConfigValidator for MockValidator {
	async fn validate(&self, _document: &Document) -> Result<(), ValidationError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if self.reject.load(Ordering::SeqCst) {
			return Err(ValidationError::Rejected {
				code: Some(1),
				stderr: "mock rejection".to_string(),
			});
		}
		Ok(())
	}
}

/// Test-side control for a daemon started by [`MockLauncher`].
#[derive(Debug, Clone)]
pub struct MockDaemon {
	pub config_path: PathBuf,
	exit_tx: Arc<watch::Sender<Option<Option<i32>>>>,
	killed: Arc<AtomicBool>,
}

impl MockDaemon {
	/// Makes the daemon exit with `code`, as if it crashed.
	pub fn exit(&self, code: i32) {
		self.exit_tx.send_if_modified(|state| {
			if state.is_none() {
				*state = Some(Some(code));
				true
			} else {
				false
			}
		});
	}

	pub fn was_killed(&self) -> bool {
		self.killed.load(Ordering::SeqCst)
	}

	pub fn is_running(&self) -> bool {
		self.exit_tx.borrow().is_none()
	}
}

/// Launcher whose daemons run until a test ends them or they are killed.
#[derive(Debug, Default)]
pub struct MockLauncher {
	daemons: Mutex<Vec<MockDaemon>>,
	next_pid: AtomicU32,
	binary_missing: AtomicBool,
	spawn_failure: AtomicBool,
	launch_delay: Mutex<Option<Duration>>,
}

impl MockLauncher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fails every launch with [`LaunchError::BinaryNotFound`].
	pub fn set_binary_missing(&self, missing: bool) {
		self.binary_missing.store(missing, Ordering::SeqCst);
	}

	/// Fails every launch with [`LaunchError::Spawn`].
	pub fn set_spawn_failure(&self, fail: bool) {
		self.spawn_failure.store(fail, Ordering::SeqCst);
	}

	pub fn set_launch_delay(&self, delay: Option<Duration>) {
		*self.launch_delay.lock() = delay;
	}

	/// Daemons started so far, in launch order.
	pub fn daemons(&self) -> Vec<MockDaemon> {
		self.daemons.lock().clone()
	}

	pub fn launch_count(&self) -> usize {
		self.daemons.lock().len()
	}

	pub fn launched_paths(&self) -> Vec<PathBuf> {
		self.daemons
			.lock()
			.iter()
			.map(|daemon| daemon.config_path.clone())
			.collect()
	}
}

#[async_trait]
impl DaemonLauncher for MockLauncher {
	async fn launch(&self, config_path: &Path) -> Result<Box<dyn DaemonProcess>, LaunchError> {
		let delay = *self.launch_delay.lock();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		if self.binary_missing.load(Ordering::SeqCst) {
			return Err(LaunchError::BinaryNotFound {
				path: PathBuf::from("/nonexistent/nebula"),
			});
		}
		if self.spawn_failure.load(Ordering::SeqCst) {
			return Err(LaunchError::Spawn(std::io::Error::other("mock spawn failure")));
		}

		let (exit_tx, exit_rx) = watch::channel(None);
		let exit_tx = Arc::new(exit_tx);
		let killed = Arc::new(AtomicBool::new(false));

		self.daemons.lock().push(MockDaemon {
			config_path: config_path.to_path_buf(),
			exit_tx: Arc::clone(&exit_tx),
			killed: Arc::clone(&killed),
		});

		Ok(Box::new(MockProcess {
			pid: 10_000 + self.next_pid.fetch_add(1, Ordering::SeqCst),
			exit_tx,
			exit_rx,
			killed,
		}))
	}
}

struct MockProcess {
	pid: u32,
	exit_tx: Arc<watch::Sender<Option<Option<i32>>>>,
	exit_rx: watch::Receiver<Option<Option<i32>>>,
	killed: Arc<AtomicBool>,
}

#[async_trait]
impl DaemonProcess for MockProcess {
	fn id(&self) -> Option<u32> {
		Some(self.pid)
	}

	async fn wait(&mut self) -> std::io::Result<Option<i32>> {
		let state = self
			.exit_rx
			.wait_for(Option::is_some)
			.await
			.map_err(|_| std::io::Error::other("mock daemon control dropped"))?;
		Ok((*state).flatten())
	}

	fn start_kill(&mut self) -> std::io::Result<()> {
		self.killed.store(true, Ordering::SeqCst);
		self.exit_tx.send_if_modified(|state| {
			if state.is_none() {
				*state = Some(None);
				true
			} else {
				false
			}
		});
		Ok(())
	}
}
