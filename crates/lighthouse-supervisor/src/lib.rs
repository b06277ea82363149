// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-identity Nebula lighthouse supervision.
//!
//! This crate owns the lifecycle of the `nebula` lighthouse processes running on
//! this host. Every distinct certificate/key triple gets at most one daemon and a
//! stable UDP port drawn from the configured range.
//!
//! # Overview
//!
//! A provisioning request flows through:
//! 1. The [`Registry`] - if the identity already has a live daemon, its port is returned
//! 2. The ordinal ledger - the identity is assigned a slot (sequential or declared)
//! 3. The [`PortRange`] - the slot is mapped to `min_port + ordinal`
//! 4. The [`document`] codec - the daemon configuration is rendered and compared with disk
//! 5. The [`ConfigValidator`] - `nebula -test` must accept the document
//! 6. The [`DaemonLauncher`] - the daemon is spawned and a monitor task watches it
//!
//! On startup, [`Supervisor::reconcile`] resurrects the daemons described by the
//! configuration files left behind by the previous run.
//!
//! # Example
//!
//! ```ignore
//! use lighthouse_supervisor::{Identity, OrdinalSource, Supervisor, SupervisorSettings};
//!
//! let supervisor = Supervisor::with_nebula(settings, nebula_binary);
//! supervisor.reconcile().await?;
//!
//! let provisioned = supervisor
//!     .get_or_create(&identity, OrdinalSource::Sequential)
//!     .await?;
//! println!("lighthouse listening on udp/{}", provisioned.port);
//! ```

pub mod document;
pub mod error;
pub mod identity;
pub mod launcher;
mod ledger;
mod locks;
pub mod monitor;
pub mod ports;
pub mod reconcile;
pub mod registry;
pub mod supervisor;
pub mod validator;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use document::{Document, LighthouseConfig};
pub use error::{IdentityError, LaunchError, ParseError, SupervisorError, ValidationError};
pub use identity::Identity;
pub use launcher::{locate_nebula, DaemonLauncher, DaemonProcess, NebulaLauncher};
pub use monitor::{DaemonExit, ProcessHandle};
pub use ports::PortRange;
pub use reconcile::{ReconcileReport, ResurrectedLighthouse, SkippedConfig};
pub use registry::{DaemonRecord, Registry};
pub use supervisor::{
	LighthouseStatus, OrdinalSource, Provisioned, Supervisor, SupervisorSettings,
};
pub use validator::{ConfigValidator, NebulaValidator};

pub type Result<T> = std::result::Result<T, SupervisorError>;
