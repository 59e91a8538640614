// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification failures and their HTTP rejection.

use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiError;

/// Machine-readable reason a bearer token was rejected.
///
/// Reason codes are meant for operator diagnostics. Clients only ever see
/// "Unauthorized" as the message; the code travels in the `reason` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// Token is not three valid base64url/JSON segments
    Malformed,
    /// Expiry claim exceeded beyond skew tolerance
    Expired,
    /// Not-before claim not reached beyond skew tolerance
    NotYetValid,
    /// Issuer claim absent or empty
    MissingIssuer,
    /// Issuer outside the configured trusted set
    UntrustedIssuer,
    /// Header algorithm is not RS256
    UnsupportedAlg,
    /// Every candidate discovery URL failed to fetch or parse
    KeysetFetchFailed,
    /// No key record matches the token's key id
    KeyNotFound,
    /// Matched key record cannot be turned into a verification key
    KeyInvalid,
    /// Cryptographic check failed against a structurally valid key
    BadSignature,
}

impl ReasonCode {
    /// Stable wire form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Malformed => "MALFORMED",
            ReasonCode::Expired => "EXPIRED",
            ReasonCode::NotYetValid => "NOT_YET_VALID",
            ReasonCode::MissingIssuer => "MISSING_ISSUER",
            ReasonCode::UntrustedIssuer => "UNTRUSTED_ISSUER",
            ReasonCode::UnsupportedAlg => "UNSUPPORTED_ALG",
            ReasonCode::KeysetFetchFailed => "KEYSET_FETCH_FAILED",
            ReasonCode::KeyNotFound => "KEY_NOT_FOUND",
            ReasonCode::KeyInvalid => "KEY_INVALID",
            ReasonCode::BadSignature => "BAD_SIGNATURE",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a failed verification.
///
/// Never retried by the gateway; a caller that wants another attempt calls
/// `TrustGateway::verify` again from the top.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{reason}: {message}")]
pub struct AuthFailure {
    pub reason: ReasonCode,
    pub message: String,
    pub detail: Option<Value>,
}

impl AuthFailure {
    pub fn new(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ReasonCode::Malformed, message)
    }

    pub fn key_invalid(message: impl Into<String>) -> Self {
        Self::new(ReasonCode::KeyInvalid, message)
    }
}

/// Why the auth extractors turned a request away.
#[derive(Debug)]
pub enum AuthRejection {
    /// No `Authorization` header present
    MissingCredentials,
    /// A token was presented and failed verification
    Invalid(AuthFailure),
    /// Verified, but not on the privileged allowlist
    Forbidden,
}

impl From<AuthFailure> for AuthRejection {
    fn from(failure: AuthFailure) -> Self {
        AuthRejection::Invalid(failure)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::MissingCredentials => ApiError::unauthorized().into_response(),
            AuthRejection::Invalid(failure) => ApiError::unauthorized()
                .with_reason(failure.reason.as_str())
                .into_response(),
            AuthRejection::Forbidden => ApiError::forbidden().into_response(),
        }
    }
}
