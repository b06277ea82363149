// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by a single source.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sections::{
	DeclaredLighthouseLayer, HttpConfigLayer, LoggingConfigLayer, NebulaConfigLayer,
	PathsConfigLayer, PortsConfigLayer,
};

/// One source's view of the configuration. Absent sections and fields defer
/// to lower-precedence sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfigLayer {
	pub http: Option<HttpConfigLayer>,
	pub ports: Option<PortsConfigLayer>,
	pub nebula: Option<NebulaConfigLayer>,
	pub paths: Option<PathsConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
	pub lighthouses: Option<BTreeMap<String, DeclaredLighthouseLayer>>,
}

impl ServerConfigLayer {
	/// Overlays `other` onto `self`, field by field.
	pub fn merge(&mut self, other: Self) {
		merge_section(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_section(&mut self.ports, other.ports, PortsConfigLayer::merge);
		merge_section(&mut self.nebula, other.nebula, NebulaConfigLayer::merge);
		merge_section(&mut self.paths, other.paths, PathsConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.lighthouses, other.lighthouses, |base, overlay| {
			base.extend(overlay)
		});
	}
}

fn merge_section<T>(base: &mut Option<T>, overlay: Option<T>, merge: impl FnOnce(&mut T, T)) {
	let Some(overlay) = overlay else {
		return;
	};
	match base {
		Some(base) => merge(base, overlay),
		None => *base = Some(overlay),
	}
}
