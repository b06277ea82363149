// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Extraction of the `ca_crt`, `host_crt` and `host_key` request fields.
//!
//! Clients send the three files either as `multipart/form-data` uploads or as
//! an `application/x-www-form-urlencoded` body. Status queries are `GET`s,
//! so an empty body falls back to the query string.

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use tracing::trace;

use crate::error::ServerError;

/// The raw identity fields of a lighthouse request. Missing fields are
/// reported by [`crate::validation::validate_fields`].
#[derive(Default)]
pub struct LighthouseFields {
	pub ca_crt: Option<Vec<u8>>,
	pub host_crt: Option<Vec<u8>>,
	pub host_key: Option<Vec<u8>>,
}

impl LighthouseFields {
	fn set(&mut self, name: &str, value: Vec<u8>) {
		match name {
			"ca_crt" => self.ca_crt = Some(value),
			"host_crt" => self.host_crt = Some(value),
			"host_key" => self.host_key = Some(value),
			other => trace!(field = %other, "ignoring unknown form field"),
		}
	}
}

impl std::fmt::Debug for LighthouseFields {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LighthouseFields")
			.field("ca_crt", &self.ca_crt.as_ref().map(Vec::len))
			.field("host_crt", &self.host_crt.as_ref().map(Vec::len))
			.field("host_key", &self.host_key.as_ref().map(|_| "[REDACTED]"))
			.finish()
	}
}

impl<S> FromRequest<S> for LighthouseFields
where
	S: Send + Sync,
{
	type Rejection = ServerError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let is_multipart = req
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.is_some_and(|value| value.starts_with("multipart/form-data"));

		let mut fields = LighthouseFields::default();

		if is_multipart {
			let mut multipart = Multipart::from_request(req, state)
				.await
				.map_err(|e| ServerError::BadRequest(e.body_text()))?;
			while let Some(field) = multipart
				.next_field()
				.await
				.map_err(|e| ServerError::BadRequest(e.body_text()))?
			{
				let Some(name) = field.name().map(str::to_owned) else {
					continue;
				};
				let data = field
					.bytes()
					.await
					.map_err(|e| ServerError::BadRequest(e.body_text()))?;
				fields.set(&name, data.to_vec());
			}
			return Ok(fields);
		}

		let query = req.uri().query().map(str::to_owned);
		let body = Bytes::from_request(req, state)
			.await
			.map_err(|e| ServerError::BadRequest(e.body_text()))?;
		let encoded: &[u8] = if body.is_empty() {
			query.as_deref().unwrap_or_default().as_bytes()
		} else {
			&body
		};

		for (name, value) in url::form_urlencoded::parse(encoded) {
			fields.set(&name, value.into_owned().into_bytes());
		}
		Ok(fields)
	}
}
