// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification pipeline.
//!
//! `verify` runs a fixed, linear sequence and stops at the first failure:
//!
//! 1. decode the three segments and project header and claims
//! 2. validate `exp`, `nbf` and `iss`
//! 3. require `alg == "RS256"`
//! 4. (optional) require a trusted issuer
//! 5. resolve the issuer's key set through the cache
//! 6. select the key by `kid`, or the first key when the token has none
//! 7. verify the signature
//!
//! Nothing is retried and no state survives a call. A caller that wants a
//! second attempt, e.g. after a transient key set outage, calls `verify`
//! again.

use std::collections::HashSet;

use serde_json::json;

use super::claims::ClaimValidator;
use super::discovery::IssuerKeySetResolver;
use super::error::{AuthFailure, ReasonCode};
use super::identity::Identity;
use super::signature::SignatureVerifier;
use super::token::{TokenClaims, TokenDecoder, TokenHeader};

/// The one accepted signature algorithm.
pub const SUPPORTED_ALG: &str = "RS256";

pub struct TrustGateway {
    resolver: IssuerKeySetResolver,
    trusted_issuers: Option<HashSet<String>>,
}

impl TrustGateway {
    pub fn new(resolver: IssuerKeySetResolver) -> Self {
        Self {
            resolver,
            trusted_issuers: None,
        }
    }

    /// Restrict accepted issuers. Compared with trailing slashes stripped.
    pub fn with_trusted_issuers<I, S>(mut self, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.trusted_issuers = Some(
            issuers
                .into_iter()
                .map(|iss| iss.as_ref().trim().trim_end_matches('/').to_string())
                .filter(|iss| !iss.is_empty())
                .collect(),
        );
        self
    }

    /// Verify `raw` against the current wall clock.
    pub async fn verify(&self, raw: &str) -> Result<Identity, AuthFailure> {
        self.verify_at(raw, chrono::Utc::now().timestamp()).await
    }

    /// Verify `raw` as of `now` (seconds since epoch).
    pub async fn verify_at(&self, raw: &str, now: i64) -> Result<Identity, AuthFailure> {
        let token = TokenDecoder::decode(raw)?;
        let header = TokenHeader::project(&token.header);
        let claims = TokenClaims::project(&token.payload)?;

        ClaimValidator::validate(&claims, now)?;

        if header.alg.as_deref() != Some(SUPPORTED_ALG) {
            return Err(AuthFailure::new(
                ReasonCode::UnsupportedAlg,
                "unsupported signature algorithm",
            )
            .with_detail(json!({ "alg": header.alg })));
        }

        let issuer = claims
            .iss
            .as_deref()
            .ok_or_else(|| AuthFailure::new(ReasonCode::MissingIssuer, "token has no issuer"))?;
        self.check_trusted(issuer)?;

        let key_set = self.resolver.resolve(issuer).await?;

        // Tokens without a kid take the first published key. This depends
        // on the issuer's key order and is only safe for single-key sets.
        let key = match header.kid.as_deref().filter(|kid| !kid.is_empty()) {
            Some(kid) => key_set.find(kid).ok_or_else(|| {
                AuthFailure::new(ReasonCode::KeyNotFound, "no key matches the token's kid")
                    .with_detail(json!({ "kid": kid }))
            })?,
            None => key_set.keys.first().ok_or_else(|| {
                AuthFailure::new(ReasonCode::KeyNotFound, "key set is empty")
                    .with_detail(json!({ "kid": null }))
            })?,
        };

        SignatureVerifier::verify(&token.signing_input, &token.signature, key)?;

        let TokenClaims { sub, email, .. } = claims;
        let subject_id = sub
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| AuthFailure::malformed("verified token has no subject"))?;

        Ok(Identity::new(subject_id, email, raw.to_string()))
    }

    fn check_trusted(&self, issuer: &str) -> Result<(), AuthFailure> {
        let Some(trusted) = &self.trusted_issuers else {
            return Ok(());
        };
        let normalized = issuer.trim_end_matches('/');
        if trusted.contains(normalized) {
            Ok(())
        } else {
            Err(
                AuthFailure::new(ReasonCode::UntrustedIssuer, "issuer is not trusted")
                    .with_detail(json!({ "issuer": normalized })),
            )
        }
    }
}
