// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Time-based and structural claim rules.

use serde_json::json;

use super::error::{AuthFailure, ReasonCode};
use super::token::TokenClaims;

/// Allowed clock drift, in seconds, on both `exp` and `nbf`.
pub const CLOCK_SKEW_LEEWAY: i64 = 60;

pub struct ClaimValidator;

impl ClaimValidator {
    /// Check `claims` against `now` (seconds since epoch).
    ///
    /// Rules run in order and the first failure wins:
    /// 1. `exp` present and `now > exp + skew` is `EXPIRED`
    /// 2. `nbf` present and `now + skew < nbf` is `NOT_YET_VALID`
    /// 3. `iss` absent or empty is `MISSING_ISSUER`
    ///
    /// A token without `exp` or `nbf` is unconstrained in that direction.
    pub fn validate(claims: &TokenClaims, now: i64) -> Result<(), AuthFailure> {
        let now = now as f64;
        let skew = CLOCK_SKEW_LEEWAY as f64;

        if let Some(exp) = claims.exp {
            if now > exp + skew {
                return Err(AuthFailure::new(ReasonCode::Expired, "token has expired")
                    .with_detail(json!({ "exp": exp })));
            }
        }

        if let Some(nbf) = claims.nbf {
            if now + skew < nbf {
                return Err(
                    AuthFailure::new(ReasonCode::NotYetValid, "token is not yet valid")
                        .with_detail(json!({ "nbf": nbf })),
                );
            }
        }

        if claims.iss.is_none() {
            return Err(AuthFailure::new(
                ReasonCode::MissingIssuer,
                "token has no issuer",
            ));
        }

        Ok(())
    }
}
