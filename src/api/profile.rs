// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller profile endpoints.

use axum::{body::Bytes, extract::State, Json};
use serde_json::{json, Map, Value};

use super::users::{default_profile, record_client};
use crate::{
    auth::Auth,
    error::ApiError,
    models::{keys, UserProfile},
    state::AppState,
    store::ScopedStore,
};

/// Get the caller's stored profile.
#[utoipa::path(
    get,
    path = "/v1/profile",
    tag = "Profile",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Stored profile, or the default", body = UserProfile),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<Value>, ApiError> {
    let store = ScopedStore::user(state.store.clone(), identity.subject_id());
    let profile = store
        .get(keys::PROFILE)
        .await?
        .filter(|p| !p.is_null())
        .unwrap_or_else(default_profile);
    Ok(Json(profile))
}

/// Merge the body into the caller's profile and store it.
///
/// `email`, `createdAt` and `updatedAt` are server-controlled; values sent
/// for them are overwritten.
#[utoipa::path(
    put,
    path = "/v1/profile",
    tag = "Profile",
    security(("bearer" = [])),
    request_body = UserProfile,
    responses(
        (status = 200, description = "Saved profile", body = UserProfile),
        (status = 400, description = "Invalid JSON or profile shape", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    )
)]
pub async fn save_profile(
    State(state): State<AppState>,
    Auth(identity): Auth,
    body: Bytes,
) -> Result<Json<UserProfile>, ApiError> {
    let update: Value = if body.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request("Invalid JSON"))?
    };
    let Value::Object(update) = update else {
        return Err(ApiError::bad_request("Invalid profile schema"));
    };

    let store = ScopedStore::user(state.store.clone(), identity.subject_id());
    let mut merged = match store.get(keys::PROFILE).await? {
        Some(Value::Object(existing)) => existing,
        _ => Map::new(),
    };
    let created_at = merged
        .get("createdAt")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    merged.extend(update);

    let now = super::now_iso();
    match identity.email() {
        Some(email) => merged.insert("email".into(), json!(email)),
        None => merged.remove("email"),
    };
    merged.insert("updatedAt".into(), json!(now));
    merged.insert("createdAt".into(), json!(created_at.unwrap_or_else(|| now.clone())));

    let profile: UserProfile = serde_json::from_value(Value::Object(merged)).map_err(|e| {
        ApiError::bad_request("Invalid profile schema").with_details(json!({ "message": e.to_string() }))
    })?;
    profile.validate().map_err(|message| {
        ApiError::bad_request("Invalid profile schema").with_details(json!({ "message": message }))
    })?;

    let value = serde_json::to_value(&profile).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize profile");
        ApiError::internal()
    })?;
    store.set(keys::PROFILE, value).await?;
    record_client(&state, &identity, now, profile.goal()).await?;

    Ok(Json(profile))
}
