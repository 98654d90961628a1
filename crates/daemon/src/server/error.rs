// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP error mapping
//!
//! Only this layer translates structured error kinds into status codes;
//! core components never see HTTP.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, kind: "not_found", message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self { status: StatusCode::FORBIDDEN, kind: "forbidden", message: message.into() }
    }

    pub fn bad_request(kind: &'static str, message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, kind, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "error_type": self.kind,
        }));
        (self.status, body).into_response()
    }
}

impl From<gobby_storage::StorageError> for ApiError {
    fn from(e: gobby_storage::StorageError) -> Self {
        match e.kind() {
            "not_found" => Self::not_found(e.to_string()),
            "validation_failed" => Self::bad_request("validation_failed", e.to_string()),
            "uncommitted_changes" => Self {
                status: StatusCode::CONFLICT,
                kind: "uncommitted_changes",
                message: e.to_string(),
            },
            _ => Self::internal(e.to_string()),
        }
    }
}

impl From<gobby_engine::EngineError> for ApiError {
    fn from(e: gobby_engine::EngineError) -> Self {
        match e.kind() {
            "not_found" => Self::not_found(e.to_string()),
            "validation_failed" => Self::bad_request("validation_failed", e.to_string()),
            "depth_exceeded" => Self::bad_request("depth_exceeded", e.to_string()),
            "uncommitted_changes" => Self {
                status: StatusCode::CONFLICT,
                kind: "uncommitted_changes",
                message: e.to_string(),
            },
            // approval_required is translated at its call site (202).
            _ => Self::internal(e.to_string()),
        }
    }
}
