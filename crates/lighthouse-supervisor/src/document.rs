// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Nebula lighthouse configuration documents.
//!
//! A document is the YAML file `nebula -config` runs against. Each lighthouse
//! gets one file, `<config_dir>/lighthouse-<ordinal>.yaml`, holding its PKI
//! material, its listen port and the fixed lighthouse-mode flags.
//!
//! Rendering is deterministic: the same identity and port always produce the
//! same bytes, so "did the configuration change?" is a byte comparison of
//! rendered documents.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, instrument, trace};

use crate::error::ParseError;
use crate::identity::Identity;

pub const CONFIG_PREFIX: &str = "lighthouse-";
pub const CONFIG_EXTENSION: &str = "yaml";

/// A rendered configuration document.
#[derive(Clone, PartialEq, Eq)]
pub struct Document(String);

impl Document {
	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn as_bytes(&self) -> &[u8] {
		self.0.as_bytes()
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

impl std::fmt::Debug for Document {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Document")
			.field("len", &self.0.len())
			.finish_non_exhaustive()
	}
}

/// The (identity, port) pair a document encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LighthouseConfig {
	pub identity: Identity,
	pub port: u16,
}

impl LighthouseConfig {
	pub fn render(&self) -> Result<Document, serde_yaml::Error> {
		render(&self.identity, self.port)
	}
}

// Field order is the sorted key order, which keeps files byte-identical to
// the ones written by earlier deployments.
#[derive(Serialize)]
struct RenderedConfig<'a> {
	lighthouse: LighthouseSection,
	listen: ListenSection,
	pki: PkiSection<'a>,
	punchy: PunchySection,
	tun: TunSection,
}

#[derive(Serialize)]
struct LighthouseSection {
	am_lighthouse: bool,
}

#[derive(Serialize)]
struct ListenSection {
	port: u16,
}

#[derive(Serialize)]
struct PkiSection<'a> {
	ca: &'a str,
	cert: &'a str,
	key: &'a str,
}

#[derive(Serialize)]
struct PunchySection {
	punch: bool,
	respond: bool,
}

#[derive(Serialize)]
struct TunSection {
	disabled: bool,
}

#[derive(Deserialize)]
struct StoredConfig {
	listen: Option<StoredListen>,
	pki: Option<StoredPki>,
}

#[derive(Deserialize)]
struct StoredListen {
	port: Option<u16>,
}

#[derive(Deserialize)]
struct StoredPki {
	ca: Option<String>,
	cert: Option<String>,
	key: Option<String>,
}

/// Renders the lighthouse configuration for `identity` listening on `port`.
pub fn render(identity: &Identity, port: u16) -> Result<Document, serde_yaml::Error> {
	let config = RenderedConfig {
		lighthouse: LighthouseSection {
			am_lighthouse: true,
		},
		listen: ListenSection { port },
		pki: PkiSection {
			ca: identity.ca_cert(),
			cert: identity.host_cert(),
			key: identity.host_key(),
		},
		punchy: PunchySection {
			punch: true,
			respond: true,
		},
		tun: TunSection { disabled: true },
	};

	serde_yaml::to_string(&config).map(Document)
}

/// Parses a document back into the identity and port it encodes.
///
/// Only `pki.ca`, `pki.cert`, `pki.key` and `listen.port` are required; any
/// other keys are ignored.
pub fn parse(text: &str) -> Result<LighthouseConfig, ParseError> {
	let stored: StoredConfig = serde_yaml::from_str(text)?;

	let pki = stored.pki.ok_or(ParseError::MissingField("pki"))?;
	let ca = pki.ca.ok_or(ParseError::MissingField("pki.ca"))?;
	let cert = pki.cert.ok_or(ParseError::MissingField("pki.cert"))?;
	let key = pki.key.ok_or(ParseError::MissingField("pki.key"))?;
	let port = stored
		.listen
		.and_then(|listen| listen.port)
		.ok_or(ParseError::MissingField("listen.port"))?;

	Ok(LighthouseConfig {
		identity: Identity::new(ca, cert, key),
		port,
	})
}

pub fn config_path(config_dir: &Path, ordinal: u32) -> PathBuf {
	config_dir.join(format!("{CONFIG_PREFIX}{ordinal}.{CONFIG_EXTENSION}"))
}

/// Extracts the ordinal from a `lighthouse-<n>.yaml` file name.
///
/// Only the canonical spelling is accepted, so every ordinal has exactly one
/// file name.
pub fn parse_ordinal(file_name: &str) -> Option<u32> {
	let digits = file_name
		.strip_prefix(CONFIG_PREFIX)?
		.strip_suffix(CONFIG_EXTENSION)?
		.strip_suffix('.')?;

	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	if digits.len() > 1 && digits.starts_with('0') {
		return None;
	}

	digits.parse().ok()
}

/// Lists the lighthouse configuration files in `config_dir`, ordered by ordinal.
///
/// A missing directory holds no configurations.
#[instrument(skip_all, fields(dir = %config_dir.display()))]
pub async fn list_configs(config_dir: &Path) -> std::io::Result<Vec<(u32, PathBuf)>> {
	let mut entries = match fs::read_dir(config_dir).await {
		Ok(entries) => entries,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			debug!("config directory does not exist yet");
			return Ok(Vec::new());
		}
		Err(e) => return Err(e),
	};

	let mut configs = Vec::new();
	while let Some(entry) = entries.next_entry().await? {
		let file_name = entry.file_name();
		let Some(ordinal) = file_name.to_str().and_then(parse_ordinal) else {
			trace!(file = ?file_name, "ignoring non-lighthouse file");
			continue;
		};
		configs.push((ordinal, entry.path()));
	}

	configs.sort_by_key(|(ordinal, _)| *ordinal);
	Ok(configs)
}

/// Reads a configuration file, returning `None` if it does not exist.
pub async fn read_config(path: &Path) -> std::io::Result<Option<String>> {
	match fs::read_to_string(path).await {
		Ok(text) => Ok(Some(text)),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(e),
	}
}

/// Writes `document` to `path` by way of a sibling temp file and a rename.
///
/// The document embeds the host private key, so the file is created `0600`.
#[instrument(skip(document), fields(path = %path.display()))]
pub async fn persist(path: &Path, document: &Document) -> std::io::Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).await?;
	}

	let mut tmp_name = path.as_os_str().to_owned();
	tmp_name.push(".tmp");
	let tmp_path = PathBuf::from(tmp_name);

	if let Err(e) = write_private(&tmp_path, document.as_bytes()).await {
		let _ = fs::remove_file(&tmp_path).await;
		return Err(e);
	}
	if let Err(e) = fs::rename(&tmp_path, path).await {
		let _ = fs::remove_file(&tmp_path).await;
		return Err(e);
	}

	debug!("persisted lighthouse configuration");
	Ok(())
}

async fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
	#[cfg(unix)]
	{
		use tokio::fs::OpenOptions;
		use tokio::io::AsyncWriteExt;

		let mut file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(0o600)
			.open(path)
			.await?;
		file.write_all(contents).await?;
		file.sync_all().await?;
	}

	#[cfg(not(unix))]
	{
		fs::write(path, contents).await?;
	}

	Ok(())
}
