// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::CacheStatus;
use crate::envelope::TraceContext;
use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// True when every check passed.
    pub ok: bool,
    pub checks: HealthChecks,
    pub trace_id: String,
    /// RFC 3339 time the checks ran.
    pub timestamp: String,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthChecks {
    /// Whether the key-value store answered a ping.
    pub store: bool,
    /// Cached issuer key sets.
    pub key_set_cache: CacheStatus,
}

/// Health check endpoint handler.
///
/// Always answers 200; `ok` carries the verdict. Unauthenticated.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Component status", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>, trace: TraceContext) -> Json<HealthResponse> {
    let store = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "store health check failed");
            false
        }
    };
    let key_set_cache = state.key_sets.status().await;

    Json(HealthResponse {
        ok: store,
        checks: HealthChecks {
            store,
            key_set_cache,
        },
        trace_id: trace.trace_id,
        timestamp: super::now_iso(),
    })
}
