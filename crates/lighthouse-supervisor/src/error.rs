// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`crate::Supervisor`] operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
	/// The ordinal maps past the end of the configured port range.
	#[error("no port available for lighthouse {ordinal}: range {min_port}-{max_port} is exhausted")]
	CapacityExceeded {
		ordinal: u32,
		min_port: u16,
		max_port: u16,
	},

	/// `nebula -test` rejected the rendered configuration.
	#[error("invalid configuration: {0}")]
	InvalidConfiguration(#[from] ValidationError),

	/// A persisted configuration file could not be parsed.
	#[error("failed to parse {}: {source}", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: ParseError,
	},

	#[error("failed to launch lighthouse: {0}")]
	Launch(#[from] LaunchError),

	#[error("failed to render configuration: {0}")]
	Render(#[from] serde_yaml::Error),

	#[error("I/O error on {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

impl SupervisorError {
	pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		SupervisorError::Io {
			path: path.into(),
			source,
		}
	}
}

#[derive(Debug, Error)]
pub enum ParseError {
	#[error("malformed YAML: {0}")]
	Yaml(#[from] serde_yaml::Error),

	#[error("missing required field `{0}`")]
	MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("nebula rejected the configuration (exit code {code:?}): {stderr}")]
	Rejected { code: Option<i32>, stderr: String },

	#[error("failed to run nebula config test: {0}")]
	Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LaunchError {
	#[error("nebula binary not found: {}", path.display())]
	BinaryNotFound { path: PathBuf },

	#[error("failed to spawn nebula: {0}")]
	Spawn(#[source] std::io::Error),

	#[error("lighthouse exited immediately (exit code {code:?})")]
	ExitedImmediately { code: Option<i32> },
}

#[derive(Debug, Error)]
pub enum IdentityError {
	#[error("{field} is not valid UTF-8")]
	NotUtf8 { field: &'static str },
}
