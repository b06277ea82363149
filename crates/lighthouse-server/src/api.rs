// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use lighthouse_supervisor::Supervisor;
use tower_http::trace::TraceLayer;

use crate::routes::{health, index, lighthouse};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
	pub supervisor: Arc<Supervisor>,
}

impl AppState {
	pub fn new(supervisor: Arc<Supervisor>) -> Self {
		Self { supervisor }
	}
}

pub fn create_router(state: AppState) -> Router {
	let lighthouse_routes =
		get(lighthouse::lighthouse_status).post(lighthouse::create_lighthouse);

	Router::new()
		.route("/", get(index::index))
		.route("/lighthouse/", lighthouse_routes.clone())
		.route("/lighthouse", lighthouse_routes)
		.route("/health", get(health::health_check))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
