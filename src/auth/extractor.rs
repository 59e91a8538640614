// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for verified callers.
//!
//! Use the `Auth` extractor in handlers to require a verified bearer token:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity.subject_id() is the token's `sub`
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthFailure, AuthRejection, Identity};
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Extractor for a verified caller.
///
/// Runs the full trust gateway against the `Authorization: Bearer` token.
/// The resulting [`Identity`] is stored in the request extensions, so stacking
/// `Auth` with [`AdminOnly`] verifies the token once.
pub struct Auth(pub Identity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(Auth(identity));
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthRejection::MissingCredentials)?;

        let token = bearer_token(header.as_bytes()).map_err(|failure| {
            tracing::warn!(reason = %failure.reason, error = %failure.message, "bearer token rejected");
            AuthRejection::Invalid(failure)
        })?;

        match state.gateway.verify(token).await {
            Ok(identity) => {
                parts.extensions.insert(identity.clone());
                Ok(Auth(identity))
            }
            Err(failure) => {
                tracing::warn!(
                    reason = %failure.reason,
                    detail = ?failure.detail,
                    error = %failure.message,
                    "bearer token rejected"
                );
                Err(AuthRejection::Invalid(failure))
            }
        }
    }
}

fn bearer_token(raw: &[u8]) -> Result<&str, AuthFailure> {
    let value = std::str::from_utf8(raw)
        .map_err(|_| AuthFailure::malformed("authorization header is not valid text"))?;
    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| AuthFailure::malformed("authorization header is not a bearer credential"))?
        .trim();
    if token.is_empty() {
        return Err(AuthFailure::malformed("bearer credential is empty"));
    }
    Ok(token)
}

/// Extractor that requires a privileged caller.
pub struct AdminOnly(pub Identity);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(identity) = Auth::from_request_parts(parts, state).await?;

        if !state.policy.is_privileged(&identity) {
            tracing::warn!(subject = identity.subject_id(), "caller is not privileged");
            return Err(AuthRejection::Forbidden);
        }

        Ok(AdminOnly(identity))
    }
}
