// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Spawning lighthouse daemons.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::LaunchError;

/// A running daemon process.
#[async_trait]
pub trait DaemonProcess: Send {
	/// OS process id, if the process has not been reaped.
	fn id(&self) -> Option<u32>;

	/// Waits for the process to exit, returning its exit code (`None` when
	/// killed by a signal).
	async fn wait(&mut self) -> std::io::Result<Option<i32>>;

	/// Asks the process to terminate without waiting for it.
	fn start_kill(&mut self) -> std::io::Result<()>;
}

/// Starts daemons from configuration files.
#[async_trait]
pub trait DaemonLauncher: Send + Sync {
	async fn launch(&self, config_path: &Path) -> Result<Box<dyn DaemonProcess>, LaunchError>;
}

/// Launches `nebula -config <path>`.
#[derive(Debug, Clone)]
pub struct NebulaLauncher {
	binary: PathBuf,
}

impl NebulaLauncher {
	pub fn new(binary: impl Into<PathBuf>) -> Self {
		Self {
			binary: binary.into(),
		}
	}

	pub fn binary(&self) -> &Path {
		&self.binary
	}
}

#[async_trait]
impl DaemonLauncher for NebulaLauncher {
	async fn launch(&self, config_path: &Path) -> Result<Box<dyn DaemonProcess>, LaunchError> {
		let child = Command::new(&self.binary)
			.arg("-config")
			.arg(config_path)
			.stdin(Stdio::null())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| {
				if e.kind() == std::io::ErrorKind::NotFound {
					LaunchError::BinaryNotFound {
						path: self.binary.clone(),
					}
				} else {
					LaunchError::Spawn(e)
				}
			})?;

		info!(
			pid = ?child.id(),
			config = %config_path.display(),
			"spawned nebula lighthouse"
		);
		Ok(Box::new(NebulaProcess { child }))
	}
}

struct NebulaProcess {
	child: Child,
}

#[async_trait]
impl DaemonProcess for NebulaProcess {
	fn id(&self) -> Option<u32> {
		self.child.id()
	}

	async fn wait(&mut self) -> std::io::Result<Option<i32>> {
		let status = self.child.wait().await?;
		Ok(status.code())
	}

	fn start_kill(&mut self) -> std::io::Result<()> {
		match self.child.start_kill() {
			// Already reaped.
			Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
			other => other,
		}
	}
}

/// Resolves the nebula executable, searching `PATH` for bare names.
pub fn locate_nebula(binary: impl AsRef<Path>) -> Result<PathBuf, LaunchError> {
	let binary = binary.as_ref();
	let resolved = which::which(binary).map_err(|_| LaunchError::BinaryNotFound {
		path: binary.to_path_buf(),
	})?;
	debug!(binary = %resolved.display(), "located nebula");
	Ok(resolved)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn locate_nebula_reports_missing_binary() {
		let dir = TempDir::new().unwrap();
		let missing = dir.path().join("nebula");
		let err = locate_nebula(&missing).unwrap_err();
		assert!(matches!(err, LaunchError::BinaryNotFound { path } if path == missing));
	}

	#[tokio::test]
	async fn launch_of_missing_binary_is_binary_not_found() {
		let dir = TempDir::new().unwrap();
		let launcher = NebulaLauncher::new(dir.path().join("nebula"));
		let err = launcher
			.launch(&dir.path().join("lighthouse-0.yaml"))
			.await
			.err()
			.unwrap();
		assert!(matches!(err, LaunchError::BinaryNotFound { .. }));
	}
}
