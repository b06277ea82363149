// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lighthouse_supervisor::SupervisorError;
use serde::Serialize;

use crate::validation::IdentityValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// The request body could not be read as a form.
	#[error("bad request: {0}")]
	BadRequest(String),

	#[error(transparent)]
	InvalidIdentity(#[from] IdentityValidationError),

	#[error(transparent)]
	Supervisor(#[from] SupervisorError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
	pub error: &'static str,
	pub message: String,
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, error, message) = match &self {
			ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
			ServerError::InvalidIdentity(e) => (
				StatusCode::UNPROCESSABLE_ENTITY,
				"invalid_identity",
				e.to_string(),
			),
			ServerError::Supervisor(SupervisorError::CapacityExceeded { .. }) => (
				StatusCode::SERVICE_UNAVAILABLE,
				"capacity_exceeded",
				"Too many nebula lighthouse services already running".to_string(),
			),
			ServerError::Supervisor(SupervisorError::InvalidConfiguration(e)) => (
				StatusCode::BAD_REQUEST,
				"invalid_configuration",
				e.to_string(),
			),
			ServerError::Supervisor(e) => {
				tracing::error!(error = %e, "lighthouse request failed");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal_error",
					"failed to start lighthouse".to_string(),
				)
			}
		};

		(status, Json(ErrorBody { error, message })).into_response()
	}
}
