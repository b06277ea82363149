// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The lighthouse supervisor.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};

use crate::document::{self, Document};
use crate::error::LaunchError;
use crate::identity::Identity;
use crate::launcher::{DaemonLauncher, NebulaLauncher};
use crate::ledger::{Claim, OrdinalLedger};
use crate::locks::KeyedLocks;
use crate::monitor::spawn_monitor;
use crate::ports::PortRange;
use crate::registry::{DaemonRecord, Registry};
use crate::validator::{ConfigValidator, NebulaValidator};
use crate::{Result, SupervisorError};

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
	/// Directory holding the `lighthouse-<n>.yaml` files.
	pub config_dir: PathBuf,
	pub port_range: PortRange,
	/// How long to wait for a displaced daemon to exit before starting its
	/// replacement anyway.
	pub stop_timeout: Duration,
}

/// Where a lighthouse's ordinal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdinalSource {
	/// Next free slot, for lighthouses requested over the wire.
	Sequential,
	/// A fixed slot, for lighthouses declared in configuration.
	Declared(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provisioned {
	pub ordinal: u32,
	pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LighthouseStatus {
	pub running: bool,
	pub port: Option<u16>,
}

enum Plan {
	/// The unchanged configuration is already running.
	AlreadyRunning(DaemonRecord),
	Launch {
		/// Document to persist before launching; `None` reuses the file on disk.
		write: Option<Document>,
		/// Daemon currently running on the ordinal, to be stopped first.
		displaced: Option<(Identity, DaemonRecord)>,
	},
}

/// Supervises one nebula lighthouse per identity.
pub struct Supervisor {
	settings: SupervisorSettings,
	validator: Arc<dyn ConfigValidator>,
	launcher: Arc<dyn DaemonLauncher>,
	registry: Arc<Registry>,
	ledger: Mutex<OrdinalLedger>,
	identity_locks: KeyedLocks<Identity>,
	ordinal_locks: KeyedLocks<u32>,
	next_launch_id: AtomicU64,
}

impl Supervisor {
	pub fn new(
		settings: SupervisorSettings,
		validator: Arc<dyn ConfigValidator>,
		launcher: Arc<dyn DaemonLauncher>,
	) -> Self {
		Self {
			settings,
			validator,
			launcher,
			registry: Arc::new(Registry::new()),
			ledger: Mutex::new(OrdinalLedger::default()),
			identity_locks: KeyedLocks::default(),
			ordinal_locks: KeyedLocks::default(),
			next_launch_id: AtomicU64::new(1),
		}
	}

	/// A supervisor that validates and runs configurations with `binary`.
	pub fn with_nebula(settings: SupervisorSettings, binary: impl Into<PathBuf>) -> Self {
		let binary = binary.into();
		Self::new(
			settings,
			Arc::new(NebulaValidator::new(binary.clone())),
			Arc::new(NebulaLauncher::new(binary)),
		)
	}

	pub fn settings(&self) -> &SupervisorSettings {
		&self.settings
	}

	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	/// Returns the port of the identity's lighthouse, starting one if needed.
	///
	/// Requests for the same identity are serialized; a live daemon is returned
	/// without touching the validator, the disk or the launcher.
	#[instrument(skip(self, identity), fields(identity = %identity.fingerprint()))]
	pub async fn get_or_create(
		&self,
		identity: &Identity,
		source: OrdinalSource,
	) -> Result<Provisioned> {
		let _identity_guard = self.lock_identity(identity).await;

		if let Some(record) = self.registry.live(identity) {
			debug!(
				ordinal = record.ordinal,
				port = record.port,
				"lighthouse already running"
			);
			return Ok(Provisioned {
				ordinal: record.ordinal,
				port: record.port,
			});
		}

		let (claim, port) = self.reserve(identity, source).await?;
		let ordinal = claim.ordinal;
		let _ordinal_guard = self.lock_ordinal(ordinal).await;
		let config_path = document::config_path(&self.settings.config_dir, ordinal);

		let plan = match self.prepare(identity, ordinal, port, &config_path).await {
			Ok(plan) => plan,
			Err(e) => {
				self.ledger.lock().rollback(identity, claim);
				return Err(e);
			}
		};

		match plan {
			Plan::AlreadyRunning(record) => {
				debug!(ordinal, port = record.port, "configuration unchanged and running");
				Ok(Provisioned {
					ordinal,
					port: record.port,
				})
			}
			Plan::Launch { write, displaced } => {
				if let Some(document) = write {
					if let Err(e) = document::persist(&config_path, &document).await {
						self.ledger.lock().rollback(identity, claim);
						return Err(SupervisorError::io(config_path, e));
					}
					info!(ordinal, port, path = %config_path.display(), "wrote lighthouse configuration");
				}

				if let Some((holder, record)) = displaced {
					self.stop(&holder, record).await;
				}

				let record = self
					.launch_and_register(identity, ordinal, port, config_path)
					.await?;
				Ok(Provisioned {
					ordinal,
					port: record.port,
				})
			}
		}
	}

	/// Whether the identity has a running lighthouse, and on which port.
	pub fn status(&self, identity: &Identity) -> LighthouseStatus {
		match self.registry.live(identity) {
			Some(record) => LighthouseStatus {
				running: true,
				port: Some(record.port),
			},
			None => LighthouseStatus {
				running: false,
				port: None,
			},
		}
	}

	/// Kills every supervised daemon without waiting for them to exit.
	///
	/// Returns the number of daemons signalled.
	pub fn shutdown(&self) -> usize {
		let records = self.registry.drain();
		for (identity, record) in &records {
			debug!(
				identity = %identity.fingerprint(),
				ordinal = record.ordinal,
				pid = ?record.handle.pid(),
				"killing lighthouse"
			);
			record.handle.kill();
		}
		info!(count = records.len(), "signalled lighthouses to stop");
		records.len()
	}

	pub(crate) async fn lock_identity(&self, identity: &Identity) -> OwnedMutexGuard<()> {
		self.identity_locks.lock(identity).await
	}

	pub(crate) async fn lock_ordinal(&self, ordinal: u32) -> OwnedMutexGuard<()> {
		self.ordinal_locks.lock(&ordinal).await
	}

	pub(crate) fn claim_ordinal(&self, identity: &Identity, ordinal: u32) {
		self.ledger.lock().claim(identity, ordinal);
	}

	/// Claims an ordinal for `identity` and maps it to a port.
	///
	/// The port is allocated before the claim is recorded, so an exhausted
	/// range leaves the ledger untouched.
	async fn reserve(&self, identity: &Identity, source: OrdinalSource) -> Result<(Claim, u16)> {
		let on_disk: BTreeSet<u32> = match source {
			OrdinalSource::Sequential => document::list_configs(&self.settings.config_dir)
				.await
				.map_err(|e| SupervisorError::io(&self.settings.config_dir, e))?
				.into_iter()
				.map(|(ordinal, _)| ordinal)
				.collect(),
			OrdinalSource::Declared(_) => BTreeSet::new(),
		};

		let mut ledger = self.ledger.lock();
		let ordinal = match source {
			OrdinalSource::Declared(ordinal) => ordinal,
			OrdinalSource::Sequential => match ledger.ordinal_of(identity) {
				Some(ordinal) => ordinal,
				None => {
					let start = u32::try_from(on_disk.len()).unwrap_or(u32::MAX);
					ledger.next_sequential(start, &on_disk)
				}
			},
		};

		let port = self.settings.port_range.allocate(ordinal)?;
		Ok((ledger.claim(identity, ordinal), port))
	}

	/// Decides what has to happen on `ordinal`, validating the new document
	/// when it will be launched.
	async fn prepare(
		&self,
		identity: &Identity,
		ordinal: u32,
		port: u16,
		config_path: &Path,
	) -> Result<Plan> {
		let rendered = document::render(identity, port)?;

		let existing = document::read_config(config_path)
			.await
			.map_err(|e| SupervisorError::io(config_path, e))?;
		let unchanged = match existing {
			Some(text) => {
				let parsed = document::parse(&text).map_err(|source| SupervisorError::Parse {
					path: config_path.to_path_buf(),
					source,
				})?;
				parsed.render()? == rendered
			}
			None => false,
		};

		let running = self.registry.find_by_ordinal(ordinal);
		if unchanged {
			if let Some((holder, record)) = &running {
				if holder == identity {
					return Ok(Plan::AlreadyRunning(record.clone()));
				}
			}
		}

		self.validator.validate(&rendered).await?;

		Ok(Plan::Launch {
			write: (!unchanged).then_some(rendered),
			displaced: running,
		})
	}

	/// Stops the daemon `holder` runs on an ordinal being taken over.
	async fn stop(&self, holder: &Identity, record: DaemonRecord) {
		self.registry.remove_launch(holder, record.handle.launch_id());
		record.handle.kill();

		match tokio::time::timeout(self.settings.stop_timeout, record.handle.wait_for_exit()).await {
			Ok(exit) => info!(
				identity = %holder.fingerprint(),
				ordinal = record.ordinal,
				code = ?exit.code,
				"stopped displaced lighthouse"
			),
			Err(_) => warn!(
				identity = %holder.fingerprint(),
				ordinal = record.ordinal,
				timeout_secs = self.settings.stop_timeout.as_secs(),
				"displaced lighthouse did not exit in time"
			),
		}
	}

	/// Launches the daemon for `config_path` and registers it under `identity`.
	pub(crate) async fn launch_and_register(
		&self,
		identity: &Identity,
		ordinal: u32,
		port: u16,
		config_path: PathBuf,
	) -> Result<DaemonRecord> {
		let launch_id = self.next_launch_id.fetch_add(1, Ordering::Relaxed);
		let process = self.launcher.launch(&config_path).await?;
		let handle = spawn_monitor(process, identity.clone(), launch_id, Arc::clone(&self.registry));

		let record = DaemonRecord {
			ordinal,
			port,
			config_path,
			handle,
		};

		match self.registry.insert(identity.clone(), record.clone()) {
			Ok(_) => {
				info!(
					ordinal,
					port,
					launch_id,
					pid = ?record.handle.pid(),
					"lighthouse started"
				);
				Ok(record)
			}
			Err(exit) => {
				warn!(ordinal, port, code = ?exit.code, "lighthouse exited before registration");
				Err(LaunchError::ExitedImmediately { code: exit.code }.into())
			}
		}
	}
}

impl std::fmt::Debug for Supervisor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Supervisor")
			.field("settings", &self.settings)
			.field("lighthouses", &self.registry.len())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::error::ValidationError;
	use crate::testing::{MockLauncher, MockValidator};
	use tempfile::TempDir;

	pub(crate) fn identity(n: u32) -> Identity {
		Identity::new(
			"-----BEGIN NEBULA CERTIFICATE-----\nY2EtY2VydA==\n-----END NEBULA CERTIFICATE-----\n",
			format!("-----BEGIN NEBULA CERTIFICATE-----\naG9zdC17bn0={n}\n-----END NEBULA CERTIFICATE-----\n"),
			format!("-----BEGIN NEBULA X25519 PRIVATE KEY-----\na2V5{n}\n-----END NEBULA X25519 PRIVATE KEY-----\n"),
		)
	}

	pub(crate) struct Harness {
		pub dir: TempDir,
		pub supervisor: Arc<Supervisor>,
		pub validator: Arc<MockValidator>,
		pub launcher: Arc<MockLauncher>,
	}

	impl Harness {
		pub fn new(min_port: u16, max_port: u16) -> Self {
			let dir = TempDir::new().unwrap();
			Self::in_dir(dir, min_port, max_port)
		}

		pub fn in_dir(dir: TempDir, min_port: u16, max_port: u16) -> Self {
			let validator = Arc::new(MockValidator::new());
			let launcher = Arc::new(MockLauncher::new());
			let settings = SupervisorSettings {
				config_dir: dir.path().to_path_buf(),
				port_range: PortRange::new(min_port, max_port),
				stop_timeout: Duration::from_secs(1),
			};
			let supervisor = Arc::new(Supervisor::new(
				settings,
				validator.clone(),
				launcher.clone(),
			));
			Self {
				dir,
				supervisor,
				validator,
				launcher,
			}
		}

		pub fn config_file(&self, ordinal: u32) -> PathBuf {
			document::config_path(self.dir.path(), ordinal)
		}

		pub fn read_file(&self, ordinal: u32) -> Option<document::LighthouseConfig> {
			let text = std::fs::read_to_string(self.config_file(ordinal)).ok()?;
			document::parse(&text).ok()
		}
	}

	#[tokio::test]
	async fn new_identities_get_consecutive_ports() {
		let h = Harness::new(49152, 49160);

		for n in 0..3 {
			let provisioned = h
				.supervisor
				.get_or_create(&identity(n), OrdinalSource::Sequential)
				.await
				.unwrap();
			assert_eq!(provisioned.ordinal, n);
			assert_eq!(provisioned.port, 49152 + n as u16);

			let on_disk = h.read_file(n).unwrap();
			assert_eq!(on_disk.identity, identity(n));
			assert_eq!(on_disk.port, provisioned.port);
		}
		assert_eq!(h.launcher.launch_count(), 3);
	}

	#[tokio::test]
	async fn repeated_request_returns_running_lighthouse() {
		let h = Harness::new(49152, 65535);
		let a = identity(0);

		let first = h.supervisor.get_or_create(&a, OrdinalSource::Sequential).await.unwrap();
		let second = h.supervisor.get_or_create(&a, OrdinalSource::Sequential).await.unwrap();

		assert_eq!(first, second);
		assert_eq!(h.launcher.launch_count(), 1);
		assert_eq!(h.validator.calls(), 1);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_requests_spawn_one_daemon() {
		let h = Harness::new(49152, 65535);
		h.launcher.set_launch_delay(Some(Duration::from_millis(20)));

		let tasks: Vec<_> = (0..16)
			.map(|_| {
				let supervisor = Arc::clone(&h.supervisor);
				tokio::spawn(async move {
					supervisor
						.get_or_create(&identity(7), OrdinalSource::Sequential)
						.await
						.unwrap()
				})
			})
			.collect();

		let mut ports = BTreeSet::new();
		for task in tasks {
			ports.insert(task.await.unwrap().port);
		}

		assert_eq!(ports.len(), 1);
		assert_eq!(h.launcher.launch_count(), 1);
		assert_eq!(h.supervisor.registry().len(), 1);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_distinct_identities_get_distinct_ports() {
		let h = Harness::new(49152, 65535);

		let tasks: Vec<_> = (0..8)
			.map(|n| {
				let supervisor = Arc::clone(&h.supervisor);
				tokio::spawn(async move {
					supervisor
						.get_or_create(&identity(n), OrdinalSource::Sequential)
						.await
						.unwrap()
				})
			})
			.collect();

		let mut ports = BTreeSet::new();
		for task in tasks {
			ports.insert(task.await.unwrap().port);
		}

		assert_eq!(ports.len(), 8);
		assert_eq!(h.launcher.launch_count(), 8);
	}

	#[tokio::test]
	async fn exhausted_range_fails_without_side_effects() {
		let h = Harness::new(49152, 49153);

		let a = h.supervisor.get_or_create(&identity(0), OrdinalSource::Sequential).await.unwrap();
		let b = h.supervisor.get_or_create(&identity(1), OrdinalSource::Sequential).await.unwrap();
		assert_eq!(a.port, 49152);
		assert_eq!(b.port, 49153);

		let err = h
			.supervisor
			.get_or_create(&identity(2), OrdinalSource::Sequential)
			.await
			.unwrap_err();
		assert!(matches!(err, SupervisorError::CapacityExceeded { ordinal: 2, .. }));
		assert!(!h.config_file(2).exists());
		assert_eq!(h.launcher.launch_count(), 2);
		assert_eq!(h.validator.calls(), 2);
	}

	#[tokio::test]
	async fn rejected_configuration_releases_the_ordinal() {
		let h = Harness::new(49152, 65535);
		h.validator.set_reject(true);

		let err = h
			.supervisor
			.get_or_create(&identity(0), OrdinalSource::Sequential)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			SupervisorError::InvalidConfiguration(ValidationError::Rejected { .. })
		));
		assert!(!h.config_file(0).exists());
		assert_eq!(h.launcher.launch_count(), 0);

		h.validator.set_reject(false);
		let next = h.supervisor.get_or_create(&identity(1), OrdinalSource::Sequential).await.unwrap();
		assert_eq!(next.ordinal, 0);
		assert_eq!(next.port, 49152);
	}

	#[tokio::test]
	async fn launch_failure_keeps_the_written_file() {
		let h = Harness::new(49152, 65535);
		let a = identity(0);
		h.launcher.set_spawn_failure(true);

		let err = h.supervisor.get_or_create(&a, OrdinalSource::Sequential).await.unwrap_err();
		assert!(matches!(err, SupervisorError::Launch(LaunchError::Spawn(_))));
		assert_eq!(h.read_file(0).unwrap().identity, a);
		assert!(!h.supervisor.status(&a).running);

		h.launcher.set_spawn_failure(false);
		let retried = h.supervisor.get_or_create(&a, OrdinalSource::Sequential).await.unwrap();
		assert_eq!(retried, Provisioned { ordinal: 0, port: 49152 });
		assert!(h.supervisor.status(&a).running);
	}

	#[tokio::test]
	async fn declared_swap_restarts_the_ordinal() {
		let h = Harness::new(49152, 65535);
		let (a, b) = (identity(0), identity(1));

		h.supervisor.get_or_create(&a, OrdinalSource::Declared(0)).await.unwrap();
		let provisioned = h.supervisor.get_or_create(&b, OrdinalSource::Declared(0)).await.unwrap();

		assert_eq!(provisioned, Provisioned { ordinal: 0, port: 49152 });
		let daemons = h.launcher.daemons();
		assert_eq!(daemons.len(), 2);
		assert!(daemons[0].was_killed());
		assert!(daemons[1].is_running());

		assert_eq!(h.read_file(0).unwrap().identity, b);
		assert!(!h.supervisor.status(&a).running);
		assert_eq!(h.supervisor.status(&b).port, Some(49152));
	}

	#[tokio::test]
	async fn crashed_daemon_is_relaunched_on_its_old_port() {
		let h = Harness::new(49152, 65535);
		let (a, b) = (identity(0), identity(1));

		h.supervisor.get_or_create(&a, OrdinalSource::Sequential).await.unwrap();
		h.supervisor.get_or_create(&b, OrdinalSource::Sequential).await.unwrap();
		let before = std::fs::read_to_string(h.config_file(0)).unwrap();

		let handle = h.supervisor.registry().get(&a).unwrap().handle;
		h.launcher.daemons()[0].exit(1);
		handle.wait_for_exit().await;
		assert!(!h.supervisor.status(&a).running);

		let again = h.supervisor.get_or_create(&a, OrdinalSource::Sequential).await.unwrap();
		assert_eq!(again, Provisioned { ordinal: 0, port: 49152 });
		assert_eq!(h.launcher.launch_count(), 3);
		assert_eq!(h.validator.calls(), 3);
		assert_eq!(std::fs::read_to_string(h.config_file(0)).unwrap(), before);
	}

	#[tokio::test]
	async fn sequential_allocation_skips_declared_ordinals() {
		let h = Harness::new(49152, 65535);

		h.supervisor.get_or_create(&identity(0), OrdinalSource::Declared(1)).await.unwrap();
		let sequential = h.supervisor.get_or_create(&identity(1), OrdinalSource::Sequential).await.unwrap();

		assert_eq!(sequential.ordinal, 2);
		assert_eq!(h.read_file(1).unwrap().identity, identity(0));
		assert_eq!(h.read_file(2).unwrap().identity, identity(1));
	}

	#[tokio::test]
	async fn corrupt_file_at_declared_ordinal_is_a_parse_error() {
		let h = Harness::new(49152, 65535);
		std::fs::write(h.config_file(4), "pki: [not, a, mapping]\n").unwrap();

		let err = h
			.supervisor
			.get_or_create(&identity(0), OrdinalSource::Declared(4))
			.await
			.unwrap_err();
		assert!(matches!(err, SupervisorError::Parse { .. }));
		assert_eq!(h.launcher.launch_count(), 0);

		let sequential = h.supervisor.get_or_create(&identity(0), OrdinalSource::Sequential).await.unwrap();
		assert_eq!(sequential.ordinal, 1);
	}

	#[tokio::test]
	async fn status_reflects_registry() {
		let h = Harness::new(50000, 50010);
		let a = identity(0);

		assert_eq!(h.supervisor.status(&a), LighthouseStatus { running: false, port: None });
		h.supervisor.get_or_create(&a, OrdinalSource::Sequential).await.unwrap();
		assert_eq!(h.supervisor.status(&a), LighthouseStatus { running: true, port: Some(50000) });
		assert!(!h.supervisor.status(&identity(1)).running);
	}

	#[tokio::test]
	async fn shutdown_kills_every_daemon() {
		let h = Harness::new(49152, 65535);
		for n in 0..3 {
			h.supervisor.get_or_create(&identity(n), OrdinalSource::Sequential).await.unwrap();
		}
		let handles: Vec<_> = h
			.supervisor
			.registry()
			.snapshot()
			.into_iter()
			.map(|(_, record)| record.handle)
			.collect();

		assert_eq!(h.supervisor.shutdown(), 3);
		assert!(h.supervisor.registry().is_empty());

		for handle in handles {
			handle.wait_for_exit().await;
		}
		assert!(h.launcher.daemons().iter().all(|daemon| daemon.was_killed()));
	}
}
