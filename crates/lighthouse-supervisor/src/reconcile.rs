// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Startup reconciliation.
//!
//! Lighthouse daemons do not outlive the service, but their configuration
//! files do. Before the service accepts requests it relaunches one daemon per
//! readable file so previously provisioned identities keep their ports.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{info, instrument, warn};

use crate::document;
use crate::error::LaunchError;
use crate::supervisor::Supervisor;
use crate::{Result, SupervisorError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResurrectedLighthouse {
	pub ordinal: u32,
	pub port: u16,
	pub config_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedConfig {
	pub path: PathBuf,
	pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
	pub resurrected: Vec<ResurrectedLighthouse>,
	pub skipped: Vec<SkippedConfig>,
}

impl ReconcileReport {
	fn skip(&mut self, path: PathBuf, reason: impl Into<String>) {
		let reason = reason.into();
		warn!(path = %path.display(), reason = %reason, "skipping lighthouse configuration");
		self.skipped.push(SkippedConfig { path, reason });
	}
}

impl Supervisor {
	/// Relaunches the lighthouses described by the files in the config
	/// directory.
	///
	/// Files are trusted as written and are not re-validated. Unreadable or
	/// duplicate files are skipped. A missing nebula binary aborts
	/// reconciliation, since no lighthouse could ever start.
	#[instrument(skip(self), fields(dir = %self.settings().config_dir.display()))]
	pub async fn reconcile(&self) -> Result<ReconcileReport> {
		let config_dir = &self.settings().config_dir;
		let configs = document::list_configs(config_dir)
			.await
			.map_err(|e| SupervisorError::io(config_dir, e))?;

		let mut report = ReconcileReport::default();
		let mut seen = HashSet::new();

		for (ordinal, path) in configs {
			let text = match document::read_config(&path).await {
				Ok(Some(text)) => text,
				Ok(None) => continue,
				Err(e) => {
					report.skip(path, format!("unreadable: {e}"));
					continue;
				}
			};

			let config = match document::parse(&text) {
				Ok(config) => config,
				Err(e) => {
					report.skip(path, format!("unparseable: {e}"));
					continue;
				}
			};

			let identity = config.identity;
			if !seen.insert(identity.clone()) {
				report.skip(path, "identity already has a lighthouse");
				continue;
			}

			let _identity_guard = self.lock_identity(&identity).await;
			if self.registry().live(&identity).is_some() {
				report.skip(path, "identity already has a lighthouse");
				continue;
			}

			let _ordinal_guard = self.lock_ordinal(ordinal).await;
			self.claim_ordinal(&identity, ordinal);

			match self
				.launch_and_register(&identity, ordinal, config.port, path.clone())
				.await
			{
				Ok(record) => {
					info!(ordinal, port = record.port, identity = %identity.fingerprint(), "resurrected lighthouse");
					report.resurrected.push(ResurrectedLighthouse {
						ordinal,
						port: record.port,
						config_path: path,
					});
				}
				Err(e @ SupervisorError::Launch(LaunchError::BinaryNotFound { .. })) => return Err(e),
				Err(e) => report.skip(path, format!("launch failed: {e}")),
			}
		}

		info!(
			resurrected = report.resurrected.len(),
			skipped = report.skipped.len(),
			"reconciliation complete"
		);
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::supervisor::tests::{identity, Harness};
	use crate::OrdinalSource;

	fn write_config(h: &Harness, ordinal: u32, n: u32, port: u16) {
		let document = document::render(&identity(n), port).unwrap();
		std::fs::write(h.config_file(ordinal), document.as_str()).unwrap();
	}

	#[tokio::test]
	async fn resurrects_valid_files_and_skips_corrupt_ones() {
		let h = Harness::new(49152, 65535);
		write_config(&h, 0, 0, 49152);
		write_config(&h, 1, 1, 49153);
		std::fs::write(h.config_file(2), "::: not yaml :::\n").unwrap();

		let report = h.supervisor.reconcile().await.unwrap();

		assert_eq!(report.resurrected.len(), 2);
		assert_eq!(report.skipped.len(), 1);
		assert_eq!(report.skipped[0].path, h.config_file(2));
		assert_eq!(h.validator.calls(), 0);
		assert_eq!(h.launcher.launched_paths(), [h.config_file(0), h.config_file(1)]);
		assert_eq!(h.supervisor.status(&identity(1)).port, Some(49153));
	}

	#[tokio::test]
	async fn reconciled_identity_is_returned_without_relaunch() {
		let h = Harness::new(49152, 65535);
		write_config(&h, 0, 0, 49152);
		let before = std::fs::read_to_string(h.config_file(0)).unwrap();

		h.supervisor.reconcile().await.unwrap();
		let provisioned = h
			.supervisor
			.get_or_create(&identity(0), OrdinalSource::Sequential)
			.await
			.unwrap();

		assert_eq!(provisioned.port, 49152);
		assert_eq!(h.launcher.launch_count(), 1);
		assert_eq!(h.validator.calls(), 0);
		assert_eq!(std::fs::read_to_string(h.config_file(0)).unwrap(), before);
	}

	#[tokio::test]
	async fn new_identities_continue_after_reconciled_ordinals() {
		let h = Harness::new(49152, 65535);
		write_config(&h, 0, 0, 49152);
		write_config(&h, 1, 1, 49153);

		h.supervisor.reconcile().await.unwrap();
		let provisioned = h
			.supervisor
			.get_or_create(&identity(2), OrdinalSource::Sequential)
			.await
			.unwrap();

		assert_eq!(provisioned, crate::Provisioned { ordinal: 2, port: 49154 });
	}

	#[tokio::test]
	async fn file_port_is_trusted() {
		let h = Harness::new(49152, 65535);
		write_config(&h, 3, 0, 4242);

		let report = h.supervisor.reconcile().await.unwrap();

		assert_eq!(report.resurrected[0].ordinal, 3);
		assert_eq!(report.resurrected[0].port, 4242);
		assert_eq!(h.supervisor.status(&identity(0)).port, Some(4242));
	}

	#[tokio::test]
	async fn duplicate_identity_is_launched_once() {
		let h = Harness::new(49152, 65535);
		write_config(&h, 0, 5, 49152);
		write_config(&h, 1, 5, 49153);

		let report = h.supervisor.reconcile().await.unwrap();

		assert_eq!(report.resurrected.len(), 1);
		assert_eq!(report.skipped.len(), 1);
		assert_eq!(report.skipped[0].path, h.config_file(1));
		assert_eq!(h.launcher.launch_count(), 1);
	}

	#[tokio::test]
	async fn missing_binary_aborts_reconciliation() {
		let h = Harness::new(49152, 65535);
		write_config(&h, 0, 0, 49152);
		h.launcher.set_binary_missing(true);

		let err = h.supervisor.reconcile().await.unwrap_err();
		assert!(matches!(
			err,
			SupervisorError::Launch(LaunchError::BinaryNotFound { .. })
		));
	}

	#[tokio::test]
	async fn other_launch_failures_are_skipped() {
		let h = Harness::new(49152, 65535);
		write_config(&h, 0, 0, 49152);
		h.launcher.set_spawn_failure(true);

		let report = h.supervisor.reconcile().await.unwrap();
		assert!(report.resurrected.is_empty());
		assert_eq!(report.skipped.len(), 1);
	}

	#[tokio::test]
	async fn empty_directory_reconciles_nothing() {
		let h = Harness::new(49152, 65535);
		let report = h.supervisor.reconcile().await.unwrap();
		assert_eq!(report, ReconcileReport::default());
	}
}
