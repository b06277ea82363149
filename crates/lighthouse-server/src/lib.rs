// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP front end for the lighthouse supervisor.
//!
//! Clients upload a CA certificate, host certificate and host key; the server
//! answers with the UDP port of a lighthouse running as that identity,
//! starting one if needed.

pub mod api;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod payload;
pub mod routes;
pub mod validation;

pub use api::{create_router, AppState};
pub use error::ServerError;
