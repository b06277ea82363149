// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// GET / - Upload form for requesting a lighthouse.
pub async fn index() -> Html<&'static str> {
	Html(INDEX_HTML)
}
