// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::document::Document;
use crate::error::ValidationError;

/// Checks a rendered configuration before it is persisted or launched.
#[async_trait]
pub trait ConfigValidator: Send + Sync {
	async fn validate(&self, document: &Document) -> Result<(), ValidationError>;
}

/// Validator that pipes the document into `nebula -test -config /dev/stdin`.
///
/// Nothing is written to disk; the document reaches nebula only through its
/// standard input.
#[derive(Debug, Clone)]
pub struct NebulaValidator {
	binary: PathBuf,
}

impl NebulaValidator {
	pub fn new(binary: impl Into<PathBuf>) -> Self {
		Self {
			binary: binary.into(),
		}
	}
}

#[async_trait]
impl ConfigValidator for NebulaValidator {
	async fn validate(&self, document: &Document) -> Result<(), ValidationError> {
		let mut child = Command::new(&self.binary)
			.args(["-test", "-config", "/dev/stdin"])
			.stdin(Stdio::piped())
			.stdout(Stdio::null())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()?;

		if let Some(mut stdin) = child.stdin.take() {
			// nebula may exit before reading everything it was sent.
			if let Err(e) = stdin.write_all(document.as_bytes()).await {
				if e.kind() != std::io::ErrorKind::BrokenPipe {
					return Err(e.into());
				}
			}
		}

		let output = child.wait_with_output().await?;
		if output.status.success() {
			debug!("nebula accepted configuration");
			return Ok(());
		}

		let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
		warn!(code = ?output.status.code(), stderr = %stderr, "nebula rejected configuration");
		Err(ValidationError::Rejected {
			code: output.status.code(),
			stderr,
		})
	}
}
