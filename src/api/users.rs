// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller identity endpoint and the global client roster.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    auth::{Auth, Identity},
    error::ApiError,
    models::{keys, ClientSummary, UserInfo, WhoAmIResponse, ROSTER_LIMIT},
    state::AppState,
    store::{ScopedStore, StoreError},
};

/// Profile returned for callers who never saved one.
pub(crate) fn default_profile() -> Value {
    json!({ "units": "lb" })
}

/// Move the caller to the front of the roster, dropping any older entry for
/// the same user. Last writer wins between concurrent updates.
pub(crate) async fn record_client(
    state: &AppState,
    identity: &Identity,
    last_login: String,
    goal: String,
) -> Result<(), StoreError> {
    let global = ScopedStore::global(state.store.clone());
    let mut clients: Vec<ClientSummary> = global.get_as(keys::CLIENTS).await?.unwrap_or_default();

    clients.retain(|client| client.user_id != identity.subject_id());
    clients.insert(
        0,
        ClientSummary {
            user_id: identity.subject_id().to_string(),
            email: identity.email().map(str::to_owned),
            last_login,
            goal,
        },
    );
    clients.truncate(ROSTER_LIMIT);

    let value = serde_json::to_value(&clients).map_err(|source| StoreError::Shape {
        key: keys::CLIENTS.to_string(),
        source,
    })?;
    global.set(keys::CLIENTS, value).await
}

/// Goal recorded in the roster; empty when onboarding is incomplete.
pub(crate) fn profile_goal(profile: &Value) -> String {
    profile
        .pointer("/onboarding/goal")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Get the current caller's identity, role and profile.
///
/// Also records the call as the caller's latest login in the client roster.
#[utoipa::path(
    get,
    path = "/v1/whoami",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller information", body = WhoAmIResponse),
        (status = 401, description = "Unauthorized - invalid or missing token", body = crate::error::ErrorBody),
    )
)]
pub async fn whoami(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<WhoAmIResponse>, ApiError> {
    let store = ScopedStore::user(state.store.clone(), identity.subject_id());
    let profile = store
        .get(keys::PROFILE)
        .await?
        .filter(|p| !p.is_null())
        .unwrap_or_else(default_profile);

    record_client(&state, &identity, super::now_iso(), profile_goal(&profile)).await?;

    Ok(Json(WhoAmIResponse {
        user: UserInfo {
            user_id: identity.subject_id().to_string(),
            email: identity.email().map(str::to_owned),
            role: state.policy.role_for(&identity),
        },
        profile,
    }))
}
