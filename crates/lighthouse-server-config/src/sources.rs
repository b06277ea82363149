// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	HttpConfigLayer, LogFormat, LoggingConfigLayer, NebulaConfigLayer, PathsConfigLayer,
	PortsConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/nebula-lighthouse/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `LIGHTHOUSE_<FIELD>`. Declared lighthouses are TOML-only.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			ports: Some(load_ports_from_env()?),
			nebula: Some(load_nebula_from_env()?),
			paths: Some(load_paths_from_env()),
			logging: Some(load_logging_from_env()?),
			lighthouses: None,
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("LIGHTHOUSE_SERVER_HOST"),
		port: env_parse("LIGHTHOUSE_SERVER_PORT", "integer")?,
	})
}

fn load_ports_from_env() -> Result<PortsConfigLayer, ConfigError> {
	Ok(PortsConfigLayer {
		min_port: env_parse("LIGHTHOUSE_MIN_PORT", "integer")?,
		max_port: env_parse("LIGHTHOUSE_MAX_PORT", "integer")?,
	})
}

fn load_nebula_from_env() -> Result<NebulaConfigLayer, ConfigError> {
	Ok(NebulaConfigLayer {
		binary: env_var("LIGHTHOUSE_NEBULA_BIN").map(PathBuf::from),
		stop_timeout_secs: env_parse("LIGHTHOUSE_STOP_TIMEOUT_SECS", "u64")?,
	})
}

fn load_paths_from_env() -> PathsConfigLayer {
	PathsConfigLayer {
		config_dir: env_var("LIGHTHOUSE_CONFIG_DIR").map(PathBuf::from),
	}
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("LIGHTHOUSE_LOG_FORMAT") {
		Some(v) => Some(LogFormat::from_str(&v).map_err(|message| ConfigError::InvalidValue {
			key: "LIGHTHOUSE_LOG_FORMAT".to_string(),
			message,
		})?),
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("LIGHTHOUSE_LOG_LEVEL"),
		format,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_env_parse_rejects_garbage() {
		std::env::set_var("LIGHTHOUSE_TEST_ENV_PARSE_GARBAGE", "eighty");
		let result: Result<Option<i64>, _> = env_parse("LIGHTHOUSE_TEST_ENV_PARSE_GARBAGE", "integer");
		assert!(matches!(
			result,
			Err(ConfigError::InvalidValue { ref key, .. }) if key == "LIGHTHOUSE_TEST_ENV_PARSE_GARBAGE"
		));
	}

	#[test]
	fn test_env_parse_treats_empty_as_unset() {
		std::env::set_var("LIGHTHOUSE_TEST_ENV_PARSE_EMPTY", "");
		let result: Option<u64> = env_parse("LIGHTHOUSE_TEST_ENV_PARSE_EMPTY", "u64").unwrap();
		assert!(result.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_is_empty() {
		let dir = TempDir::new().unwrap();
		let layer = TomlSource::new(dir.path().join("absent.toml")).load().unwrap();
		assert_eq!(layer, ServerConfigLayer::default());
	}

	#[test]
	fn test_toml_source_parses_sections() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("server.toml");
		std::fs::write(
			&path,
			r#"
[http]
port = 9000

[ports]
min_port = 50000
max_port = 50010

[nebula]
binary = "/usr/local/bin/nebula"

[lighthouses.lighthouse-3]
ca = "ca"
cert = "cert"
key = "key"
"#,
		)
		.unwrap();

		let layer = TomlSource::new(&path).load().unwrap();
		assert_eq!(layer.http.unwrap().port, Some(9000));
		assert_eq!(layer.ports.unwrap().min_port, Some(50000));
		assert_eq!(
			layer.nebula.unwrap().binary,
			Some(PathBuf::from("/usr/local/bin/nebula"))
		);
		assert!(layer.lighthouses.unwrap().contains_key("lighthouse-3"));
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("server.toml");
		std::fs::write(&path, "[http\nport = ").unwrap();

		let err = TomlSource::new(&path).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}
}
