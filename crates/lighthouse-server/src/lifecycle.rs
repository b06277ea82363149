// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Startup of the supervisor: locate nebula, resurrect previous lighthouses and
//! provision the ones declared in configuration.

use std::path::PathBuf;
use std::sync::Arc;

use lighthouse_server_config::{DeclaredLighthouse, ServerConfig};
use lighthouse_supervisor::{
	locate_nebula, LaunchError, OrdinalSource, PortRange, Supervisor, SupervisorError,
	SupervisorSettings,
};
use tracing::{error, info, instrument, warn};

use crate::validation::validate_identity;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
	#[error("nebula binary unavailable: {0}")]
	NebulaNotFound(#[from] LaunchError),

	#[error("failed to create config directory {path}: {source}")]
	ConfigDir {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to reconcile existing lighthouses: {0}")]
	Reconcile(#[source] SupervisorError),
}

pub fn supervisor_settings(config: &ServerConfig) -> SupervisorSettings {
	SupervisorSettings {
		config_dir: config.paths.config_dir.clone(),
		port_range: PortRange::new(config.ports.min_port, config.ports.max_port),
		stop_timeout: config.nebula.stop_timeout(),
	}
}

/// Builds the supervisor and brings it up to date with disk and configuration.
///
/// A missing nebula binary is fatal. Declared lighthouses that fail to start
/// are logged and skipped.
#[instrument(skip_all)]
pub async fn start(config: &ServerConfig) -> Result<Arc<Supervisor>, StartupError> {
	let binary = locate_nebula(&config.nebula.binary)?;
	info!(binary = %binary.display(), "using nebula binary");

	let config_dir = &config.paths.config_dir;
	tokio::fs::create_dir_all(config_dir)
		.await
		.map_err(|source| StartupError::ConfigDir {
			path: config_dir.clone(),
			source,
		})?;

	let supervisor = Arc::new(Supervisor::with_nebula(supervisor_settings(config), binary));
	bring_up(&supervisor, &config.lighthouses).await?;
	Ok(supervisor)
}

/// Reconciles existing files, then provisions the declared lighthouses.
pub async fn bring_up(
	supervisor: &Supervisor,
	declared: &[DeclaredLighthouse],
) -> Result<(), StartupError> {
	let report = supervisor
		.reconcile()
		.await
		.map_err(StartupError::Reconcile)?;
	info!(
		resurrected = report.resurrected.len(),
		skipped = report.skipped.len(),
		"existing lighthouses reconciled"
	);

	let started = provision_declared(supervisor, declared).await;
	if !declared.is_empty() {
		info!(declared = declared.len(), started, "declared lighthouses provisioned");
	}
	Ok(())
}

/// Starts each declared lighthouse on its fixed ordinal. Returns how many are
/// running afterwards.
pub async fn provision_declared(supervisor: &Supervisor, declared: &[DeclaredLighthouse]) -> usize {
	let mut started = 0;

	for lighthouse in declared {
		let identity = match validate_identity(
			lighthouse.ca.clone(),
			lighthouse.cert.clone(),
			lighthouse.key.clone(),
		) {
			Ok(identity) => identity,
			Err(e) => {
				warn!(index = lighthouse.index, error = %e, "declared lighthouse has an invalid identity");
				continue;
			}
		};

		match supervisor
			.get_or_create(&identity, OrdinalSource::Declared(lighthouse.index))
			.await
		{
			Ok(provisioned) => {
				info!(index = lighthouse.index, port = provisioned.port, "declared lighthouse running");
				started += 1;
			}
			Err(e) => {
				error!(index = lighthouse.index, error = %e, "failed to start declared lighthouse");
			}
		}
	}

	started
}
