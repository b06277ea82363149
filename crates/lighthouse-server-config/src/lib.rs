// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the lighthouse server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Port range clamping and validation
//! - Lighthouses declared up front in the TOML file
//!
//! # Usage
//!
//! ```ignore
//! use lighthouse_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub ports: PortsConfig,
	pub nebula: NebulaConfig,
	pub paths: PathsConfig,
	pub logging: LoggingConfig,
	pub lighthouses: Vec<DeclaredLighthouse>,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`LIGHTHOUSE_*`)
/// 2. Config file (`/etc/nebula-lighthouse/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let ports = layer.ports.unwrap_or_default().finalize();
	let nebula = layer.nebula.unwrap_or_default().finalize();
	let paths = layer.paths.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let lighthouses = sections::finalize_lighthouses(layer.lighthouses);

	validate_config(&ports)?;

	info!(
		host = %http.host,
		port = http.port,
		min_port = ports.min_port,
		max_port = ports.max_port,
		nebula = %nebula.binary.display(),
		config_dir = %paths.config_dir.display(),
		declared_lighthouses = lighthouses.len(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		ports,
		nebula,
		paths,
		logging,
		lighthouses,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(ports: &PortsConfig) -> Result<(), ConfigError> {
	if ports.min_port > ports.max_port {
		return Err(ConfigError::Validation(format!(
			"lighthouse port range is empty: min_port {} is greater than max_port {}",
			ports.min_port, ports.max_port
		)));
	}

	Ok(())
}
