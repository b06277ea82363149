// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod http;
mod lighthouses;
mod logging;
mod nebula;
mod paths;
mod ports;

pub use http::{HttpConfig, HttpConfigLayer};
pub use lighthouses::{declared_index, DeclaredLighthouse, DeclaredLighthouseLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use nebula::{NebulaConfig, NebulaConfigLayer};
pub use paths::{PathsConfig, PathsConfigLayer};
pub use ports::{PortsConfig, PortsConfigLayer};

pub(crate) use lighthouses::finalize as finalize_lighthouses;

/// Clamps a configured port into the valid UDP/TCP range.
pub(crate) fn clamp_port(port: i64) -> u16 {
	// Lossless after the clamp.
	port.clamp(1, i64::from(u16::MAX)) as u16
}
