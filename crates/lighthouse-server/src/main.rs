// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Nebula lighthouse service binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lighthouse_server::{create_router, lifecycle, logging, AppState};

/// Lighthouse server - runs a Nebula lighthouse for every uploaded identity.
#[derive(Parser, Debug)]
#[command(
	name = "lighthouse-server",
	about = "Nebula lighthouse provisioning server",
	version
)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/nebula-lighthouse/server.toml)
	#[arg(long, env = "LIGHTHOUSE_CONFIG_FILE")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Load .env before clap so LIGHTHOUSE_CONFIG_FILE can come from it
	dotenvy::dotenv().ok();

	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("lighthouse-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	let config = match args.config {
		Some(path) => lighthouse_server_config::load_config_with_file(path)?,
		None => lighthouse_server_config::load_config()?,
	};

	logging::init_tracing(&config.logging);

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		min_port = config.ports.min_port,
		max_port = config.ports.max_port,
		config_dir = %config.paths.config_dir.display(),
		"starting lighthouse-server"
	);

	let supervisor = lifecycle::start(&config).await?;
	let app = create_router(AppState::new(supervisor.clone()));

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = shutdown_signal() => {
			tracing::info!("Received shutdown signal");
		}
	}

	let stopped = supervisor.shutdown();
	tracing::info!(stopped, "Server shutdown complete");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!(error = %e, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {}
		_ = terminate => {}
	}
}
