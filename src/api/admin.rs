// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints for coaches.
//!
//! These endpoints require an allowlisted caller and provide:
//! - The client roster
//! - The audit log
//! - One client's stored documents

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::IntoParams;

use crate::{
    auth::AdminOnly,
    error::ApiError,
    models::{keys, AuditEntry, ClientDetail, ClientsResponse},
    state::AppState,
    store::ScopedStore,
};

/// Query parameters for the client detail view.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ClientQuery {
    /// Subject id of the client to inspect.
    pub user_id: Option<String>,
}

/// List recently seen clients, most recent first.
#[utoipa::path(
    get,
    path = "/v1/admin/clients",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Client roster", body = ClientsResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
        (status = 403, description = "Forbidden - not an admin", body = crate::error::ErrorBody),
    )
)]
pub async fn list_clients(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<Json<ClientsResponse>, ApiError> {
    let clients = ScopedStore::global(state.store.clone())
        .get_as(keys::CLIENTS)
        .await?
        .unwrap_or_default();
    Ok(Json(ClientsResponse { clients }))
}

/// Audit log, newest first.
#[utoipa::path(
    get,
    path = "/v1/admin/audit",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Audit entries", body = [AuditEntry]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
        (status = 403, description = "Forbidden - not an admin", body = crate::error::ErrorBody),
    )
)]
pub async fn list_audit_events(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let events = ScopedStore::global(state.store.clone())
        .get_as(keys::AUDIT_EVENTS)
        .await?
        .unwrap_or_default();
    Ok(Json(events))
}

/// Everything stored for one client.
#[utoipa::path(
    get,
    path = "/v1/admin/client",
    tag = "Admin",
    security(("bearer" = [])),
    params(ClientQuery),
    responses(
        (status = 200, description = "Client documents", body = ClientDetail),
        (status = 400, description = "Missing userId", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
        (status = 403, description = "Forbidden - not an admin", body = crate::error::ErrorBody),
    )
)]
pub async fn get_client(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Query(query): Query<ClientQuery>,
) -> Result<Json<ClientDetail>, ApiError> {
    let user_id = query
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing userId"))?;

    let store = ScopedStore::user(state.store.clone(), &user_id);
    let profile = store.get(keys::PROFILE).await?.filter(|v| !v.is_null());
    let program = store.get(keys::PROGRAM).await?.filter(|v| !v.is_null());
    let workouts = store
        .get(keys::WORKOUTS)
        .await?
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({}));
    let prs = store
        .get(keys::PRS)
        .await?
        .filter(Value::is_array)
        .unwrap_or_else(|| json!([]));

    let today = super::today_iso();
    let today_workout = workouts.get(&today).filter(|v| !v.is_null()).cloned();
    let email = profile
        .as_ref()
        .and_then(|p| p.get("email"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    tracing::info!(admin = admin.subject_id(), client = %user_id, "client documents viewed");

    Ok(Json(ClientDetail {
        user_id,
        email,
        profile,
        program,
        workouts,
        prs,
        today_workout,
    }))
}
