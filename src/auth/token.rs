// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token decoding.
//!
//! A compact token is `header.payload.signature`, each segment base64url
//! encoded. Nothing decoded here is trusted: the header and payload are kept
//! as loose JSON maps only long enough to project the handful of fields the
//! gateway reads into [`TokenHeader`] and [`TokenClaims`].

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde_json::{Map, Value};

use super::error::{AuthFailure, ReasonCode};

/// base64url that accepts both padded and unpadded segments.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A token split into its parts, owned by the verification call that made it.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub header: Map<String, Value>,
    pub payload: Map<String, Value>,
    pub signature: Vec<u8>,
    /// `segment1 + "." + segment2` exactly as received.
    pub signing_input: String,
}

pub struct TokenDecoder;

impl TokenDecoder {
    /// Decode a raw compact token.
    ///
    /// Any failure (segment count, base64, JSON, non-object JSON) is
    /// `MALFORMED`, with no partial result.
    pub fn decode(raw: &str) -> Result<DecodedToken, AuthFailure> {
        let segments: Vec<&str> = raw.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = segments.as_slice() else {
            return Err(AuthFailure::malformed(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };

        let header = decode_json_segment(header_b64, "header")?;
        let payload = decode_json_segment(payload_b64, "payload")?;
        let signature = BASE64URL
            .decode(signature_b64)
            .map_err(|e| AuthFailure::malformed(format!("signature segment: {e}")))?;

        Ok(DecodedToken {
            header,
            payload,
            signature,
            signing_input: format!("{header_b64}.{payload_b64}"),
        })
    }
}

fn decode_json_segment(segment: &str, name: &str) -> Result<Map<String, Value>, AuthFailure> {
    let bytes = BASE64URL
        .decode(segment)
        .map_err(|e| AuthFailure::malformed(format!("{name} segment: {e}")))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AuthFailure::malformed(format!("{name} is not a JSON object"))),
        Err(e) => Err(AuthFailure::malformed(format!("{name} JSON: {e}"))),
    }
}

/// The header fields the gateway acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: Option<String>,
    pub kid: Option<String>,
}

impl TokenHeader {
    /// Non-string values are treated as absent; the orchestrator rejects an
    /// absent `alg` anyway and an absent `kid` selects the first key.
    pub fn project(header: &Map<String, Value>) -> Self {
        Self {
            alg: string_field(header, "alg"),
            kid: string_field(header, "kid"),
        }
    }
}

/// The payload claims the gateway acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    pub sub: Option<String>,
    pub email: Option<String>,
    /// `None` when absent, not a string, or empty.
    pub iss: Option<String>,
    /// Seconds since epoch; fractional values are kept as sent.
    pub exp: Option<f64>,
    pub nbf: Option<f64>,
}

impl TokenClaims {
    pub fn project(payload: &Map<String, Value>) -> Result<Self, AuthFailure> {
        Ok(Self {
            sub: string_field(payload, "sub"),
            email: string_field(payload, "email"),
            iss: string_field(payload, "iss").filter(|iss| !iss.is_empty()),
            exp: numeric_field(payload, "exp")?,
            nbf: numeric_field(payload, "nbf")?,
        })
    }
}

fn string_field(map: &Map<String, Value>, name: &str) -> Option<String> {
    map.get(name).and_then(Value::as_str).map(str::to_owned)
}

fn numeric_field(map: &Map<String, Value>, name: &str) -> Result<Option<f64>, AuthFailure> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            AuthFailure::new(ReasonCode::Malformed, format!("{name} claim is not numeric"))
        }),
    }
}
