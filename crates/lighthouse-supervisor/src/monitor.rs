// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-daemon monitor tasks.
//!
//! Every launched daemon is owned by a monitor task that waits for it to exit,
//! publishes the exit on a watch channel and removes the daemon's registry
//! entry. The rest of the crate talks to the daemon through a cloneable
//! [`ProcessHandle`].

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::identity::Identity;
use crate::launcher::DaemonProcess;
use crate::registry::Registry;

/// How a daemon ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonExit {
	/// Exit code, or `None` if the daemon was killed by a signal or its status
	/// could not be collected.
	pub code: Option<i32>,
}

/// Shared view of a daemon owned by a monitor task.
#[derive(Clone)]
pub struct ProcessHandle {
	launch_id: u64,
	pid: Option<u32>,
	started_at: SystemTime,
	kill_tx: Arc<watch::Sender<bool>>,
	exit_rx: watch::Receiver<Option<DaemonExit>>,
}

impl ProcessHandle {
	pub(crate) fn launch_id(&self) -> u64 {
		self.launch_id
	}

	pub fn pid(&self) -> Option<u32> {
		self.pid
	}

	pub fn started_at(&self) -> SystemTime {
		self.started_at
	}

	/// True until the monitor has observed the daemon exit.
	pub fn is_alive(&self) -> bool {
		self.exit_rx.borrow().is_none() && self.exit_rx.has_changed().is_ok()
	}

	pub fn exit(&self) -> Option<DaemonExit> {
		*self.exit_rx.borrow()
	}

	/// Requests termination. Returns immediately; use
	/// [`wait_for_exit`](Self::wait_for_exit) to observe the result.
	pub fn kill(&self) {
		self.kill_tx.send_replace(true);
	}

	pub async fn wait_for_exit(&self) -> DaemonExit {
		let mut exit_rx = self.exit_rx.clone();
		let exit = match exit_rx.wait_for(Option::is_some).await {
			Ok(exit) => (*exit).unwrap_or(DaemonExit { code: None }),
			Err(_) => DaemonExit { code: None },
		};
		exit
	}
}

impl std::fmt::Debug for ProcessHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProcessHandle")
			.field("launch_id", &self.launch_id)
			.field("pid", &self.pid)
			.field("exit", &self.exit())
			.finish()
	}
}

/// Hands `process` to a new monitor task.
///
/// When the process exits the monitor removes the registry entry for
/// `identity`, but only if that entry still belongs to `launch_id`; a newer
/// launch for the same identity is left alone.
pub(crate) fn spawn_monitor(
	mut process: Box<dyn DaemonProcess>,
	identity: Identity,
	launch_id: u64,
	registry: Arc<Registry>,
) -> ProcessHandle {
	let pid = process.id();
	let (kill_tx, mut kill_rx) = watch::channel(false);
	let (exit_tx, exit_rx) = watch::channel(None);

	tokio::spawn(async move {
		let fingerprint = identity.fingerprint();
		let mut watching = true;

		let code = loop {
			tokio::select! {
				result = process.wait() => {
					break match result {
						Ok(code) => code,
						Err(e) => {
							warn!(identity = %fingerprint, error = %e, "failed to collect lighthouse exit status");
							None
						}
					};
				}
				changed = kill_rx.changed(), if watching => {
					match changed {
						Ok(()) => {
							if *kill_rx.borrow_and_update() {
								if let Err(e) = process.start_kill() {
									warn!(identity = %fingerprint, error = %e, "failed to kill lighthouse");
								}
							}
						}
						Err(_) => watching = false,
					}
				}
			}
		};

		let exit = DaemonExit { code };
		exit_tx.send_replace(Some(exit));
		let removed = registry.remove_launch(&identity, launch_id);

		info!(
			identity = %fingerprint,
			launch_id,
			code = ?exit.code,
			removed,
			"lighthouse exited"
		);
	});

	ProcessHandle {
		launch_id,
		pid,
		started_at: SystemTime::now(),
		kill_tx: Arc::new(kill_tx),
		exit_rx,
	}
}
