// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::envelope::{self, REQUEST_ID_HEADER, TRACE_ID_HEADER};
use crate::store::StoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
    pub reason: Option<String>,
}

/// Uniform failure envelope returned by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
    pub status_code: u16,
    pub trace_id: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response extension marking a body that is already a well-formed envelope.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Enveloped;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            reason: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden")
    }

    /// Generic 500. Callers log the cause; it never reaches the client.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Render against an explicit trace id.
    pub fn into_response_with_trace(self, trace_id: &str) -> Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
            status_code: self.status.as_u16(),
            trace_id: trace_id.to_string(),
            request_id: trace_id.to_string(),
            reason: self.reason,
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(trace_id) {
            let headers = response.headers_mut();
            headers.insert(TRACE_ID_HEADER, value.clone());
            headers.insert(REQUEST_ID_HEADER, value);
        }
        response.extensions_mut().insert(Enveloped);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let trace_id = envelope::current_trace_id().unwrap_or_else(envelope::generate_trace_id);
        self.into_response_with_trace(&trace_id)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store operation failed");
        ApiError::internal()
    }
}
