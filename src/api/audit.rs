// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{keys, AuditEntry, AuditEventRequest, ROSTER_LIMIT},
    state::AppState,
    store::{ScopedStore, StoreError},
};

/// Record an audit event for the caller.
#[utoipa::path(
    post,
    path = "/v1/audit-events",
    tag = "Audit",
    security(("bearer" = [])),
    request_body = AuditEventRequest,
    responses(
        (status = 200, description = "Recorded entry", body = AuditEntry),
        (status = 400, description = "Missing type or bad shape", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    )
)]
pub async fn record_event(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Json(request): Json<AuditEventRequest>,
) -> Result<Json<AuditEntry>, ApiError> {
    let event_type = match request.event_type {
        None | Some(Value::Null) => return Err(ApiError::bad_request("Missing event type")),
        Some(Value::String(s)) if s.is_empty() => {
            return Err(ApiError::bad_request("Missing event type"))
        }
        Some(Value::String(s)) => s,
        Some(_) => return Err(ApiError::bad_request("Invalid audit schema")),
    };
    let detail = match request.detail {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(_) => return Err(ApiError::bad_request("Invalid audit schema")),
    };

    let entry = AuditEntry {
        event_type,
        detail,
        created_at: super::now_iso(),
        user_id: identity.subject_id().to_string(),
        email: identity.email().unwrap_or_default().to_string(),
    };

    let global = ScopedStore::global(state.store.clone());
    let mut events: Vec<AuditEntry> = global.get_as(keys::AUDIT_EVENTS).await?.unwrap_or_default();
    events.insert(0, entry.clone());
    events.truncate(ROSTER_LIMIT);

    let value = serde_json::to_value(&events).map_err(|source| StoreError::Shape {
        key: keys::AUDIT_EVENTS.to_string(),
        source,
    })?;
    global.set(keys::AUDIT_EVENTS, value).await?;

    tracing::info!(event_type = %entry.event_type, subject = %entry.user_id, "audit event recorded");
    Ok(Json(entry))
}
