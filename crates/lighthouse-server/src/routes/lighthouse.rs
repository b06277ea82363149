// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lighthouse provisioning handlers.

use axum::extract::State;
use axum::Json;
use lighthouse_supervisor::OrdinalSource;
use serde::Serialize;
use tracing::{info, instrument};

use crate::api::AppState;
use crate::error::ServerError;
use crate::payload::LighthouseFields;
use crate::validation::validate_fields;

#[derive(Debug, Serialize)]
pub struct CreateLighthouseResponse {
	pub port: u16,
}

#[derive(Debug, Serialize)]
pub struct LighthouseStatusResponse {
	pub running: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub port: Option<u16>,
}

/// POST /lighthouse/ - Get or create the lighthouse for the uploaded identity.
#[instrument(skip_all)]
pub async fn create_lighthouse(
	State(state): State<AppState>,
	fields: LighthouseFields,
) -> Result<Json<CreateLighthouseResponse>, ServerError> {
	let identity = validate_fields(fields)?;
	let provisioned = state
		.supervisor
		.get_or_create(&identity, OrdinalSource::Sequential)
		.await?;

	info!(
		identity = %identity.fingerprint(),
		port = provisioned.port,
		"lighthouse provisioned"
	);
	Ok(Json(CreateLighthouseResponse {
		port: provisioned.port,
	}))
}

/// GET /lighthouse/ - Report whether the uploaded identity has a running lighthouse.
#[instrument(skip_all)]
pub async fn lighthouse_status(
	State(state): State<AppState>,
	fields: LighthouseFields,
) -> Result<Json<LighthouseStatusResponse>, ServerError> {
	let identity = validate_fields(fields)?;
	let status = state.supervisor.status(&identity);

	Ok(Json(LighthouseStatusResponse {
		running: status.running,
		port: status.port,
	}))
}
