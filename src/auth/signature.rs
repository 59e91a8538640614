// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RS256 signature verification against a key set record.
//!
//! Only RSA PKCS#1 v1.5 with SHA-256 is supported. The orchestrator rejects
//! every other `alg` before a key is ever looked up, so nothing here
//! branches on algorithm.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey};

use super::error::{AuthFailure, ReasonCode};
use super::jwks::KeyRecord;

/// Accepted RSA modulus sizes, in bits.
const MIN_MODULUS_BITS: usize = 2048;
const MAX_MODULUS_BITS: usize = 4096;

/// Largest public exponent the RSA backend accepts (2^33 - 1).
const MAX_PUBLIC_EXPONENT: u64 = (1 << 33) - 1;

pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Verify `signature` over the verbatim `signing_input`.
    ///
    /// Key material that cannot be turned into an RSA public key is
    /// `KEY_INVALID`; a usable key that does not verify is `BAD_SIGNATURE`.
    pub fn verify(
        signing_input: &str,
        signature: &[u8],
        key: &KeyRecord,
    ) -> Result<(), AuthFailure> {
        let decoding_key = Self::decoding_key(key)?;
        let encoded = URL_SAFE_NO_PAD.encode(signature);

        match jsonwebtoken::crypto::verify(
            &encoded,
            signing_input.as_bytes(),
            &decoding_key,
            Algorithm::RS256,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(bad_signature()),
            // Key material was checked in `decoding_key`; anything the
            // backend still reports about the key is KEY_INVALID, every other
            // error is a signature that does not verify.
            Err(e) => match e.kind() {
                ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                    Err(AuthFailure::key_invalid(format!("unusable RSA key: {e}")))
                }
                _ => {
                    tracing::debug!(error = %e, "RSA verification error");
                    Err(bad_signature())
                }
            },
        }
    }

    fn decoding_key(key: &KeyRecord) -> Result<DecodingKey, AuthFailure> {
        if let Some(kty) = key.kty.as_deref() {
            if kty != "RSA" {
                return Err(AuthFailure::key_invalid(format!(
                    "key type {kty} is not RSA"
                )));
            }
        }

        let (Some(n), Some(e)) = (key.n.as_deref(), key.e.as_deref()) else {
            return Err(AuthFailure::key_invalid("RSA key is missing n or e"));
        };

        // `from_rsa_components` only base64-decodes; the RSA key itself is
        // built lazily at verify time, so the numbers are checked here.
        let modulus = rsa_integer("n", n)?;
        let modulus_bits = bit_length(&modulus);
        if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&modulus_bits) {
            return Err(AuthFailure::key_invalid(format!(
                "RSA modulus is {modulus_bits} bits, expected {MIN_MODULUS_BITS} to {MAX_MODULUS_BITS}"
            )));
        }

        let exponent = rsa_integer("e", e)?;
        let exponent = exponent
            .iter()
            .try_fold(0u64, |acc, byte| acc.checked_mul(256).map(|v| v | u64::from(*byte)))
            .filter(|v| *v >= 3 && *v <= MAX_PUBLIC_EXPONENT && v % 2 == 1)
            .ok_or_else(|| AuthFailure::key_invalid("RSA public exponent is out of range"))?;
        tracing::trace!(modulus_bits, exponent, "RSA key material accepted");

        DecodingKey::from_rsa_components(n, e)
            .map_err(|err| AuthFailure::key_invalid(format!("failed to build RSA key: {err}")))
    }
}

/// Decode a base64url big-endian integer, without leading zero bytes.
fn rsa_integer(name: &str, encoded: &str) -> Result<Vec<u8>, AuthFailure> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|err| AuthFailure::key_invalid(format!("RSA {name} is not base64url: {err}")))?;
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    if first == bytes.len() {
        return Err(AuthFailure::key_invalid(format!("RSA {name} is empty or zero")));
    }
    Ok(bytes[first..].to_vec())
}

fn bit_length(magnitude: &[u8]) -> usize {
    match magnitude.first() {
        Some(top) => magnitude.len() * 8 - top.leading_zeros() as usize,
        None => 0,
    }
}

fn bad_signature() -> AuthFailure {
    AuthFailure::new(ReasonCode::BadSignature, "signature does not verify")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        rsa_record, sign_with, OTHER_KEY_PEM, SIGNING_KEY_E, SIGNING_KEY_N, SIGNING_KEY_PEM,
    };

    const INPUT: &str = "eyJhbGciOiJSUzI1NiJ9.eyJzdWIiOiJ1c2VyLTQyIn0";

    #[test]
    fn matching_key_verifies() {
        let signature = sign_with(SIGNING_KEY_PEM, INPUT);
        assert!(SignatureVerifier::verify(INPUT, &signature, &rsa_record("k1")).is_ok());
    }

    #[test]
    fn tampered_input_is_bad_signature() {
        let signature = sign_with(SIGNING_KEY_PEM, INPUT);
        let tampered = format!("{INPUT}x");
        let err = SignatureVerifier::verify(&tampered, &signature, &rsa_record("k1")).unwrap_err();
        assert_eq!(err.reason, ReasonCode::BadSignature);
    }

    #[test]
    fn signature_from_another_key_is_bad_signature() {
        let signature = sign_with(OTHER_KEY_PEM, INPUT);
        let err = SignatureVerifier::verify(INPUT, &signature, &rsa_record("k1")).unwrap_err();
        assert_eq!(err.reason, ReasonCode::BadSignature);
    }

    #[test]
    fn non_rsa_key_type_is_key_invalid() {
        let key = KeyRecord {
            kty: Some("EC".into()),
            ..rsa_record("k1")
        };
        let signature = sign_with(SIGNING_KEY_PEM, INPUT);
        let err = SignatureVerifier::verify(INPUT, &signature, &key).unwrap_err();
        assert_eq!(err.reason, ReasonCode::KeyInvalid);
    }

    #[test]
    fn missing_or_garbled_material_is_key_invalid() {
        let signature = sign_with(SIGNING_KEY_PEM, INPUT);

        let no_modulus = KeyRecord {
            n: None,
            ..rsa_record("k1")
        };
        let err = SignatureVerifier::verify(INPUT, &signature, &no_modulus).unwrap_err();
        assert_eq!(err.reason, ReasonCode::KeyInvalid);

        let garbled = KeyRecord {
            n: Some("!!not base64!!".into()),
            ..rsa_record("k1")
        };
        let err = SignatureVerifier::verify(INPUT, &signature, &garbled).unwrap_err();
        assert_eq!(err.reason, ReasonCode::KeyInvalid);
    }

    #[test]
    fn decodable_but_unusable_material_is_key_invalid() {
        let signature = sign_with(SIGNING_KEY_PEM, INPUT);

        for (n, e) in [
            ("AQAB", SIGNING_KEY_E),
            ("AA", SIGNING_KEY_E),
            ("", SIGNING_KEY_E),
            (SIGNING_KEY_N, ""),
            (SIGNING_KEY_N, "AA"),
            (SIGNING_KEY_N, "AQ"),
            (SIGNING_KEY_N, "AQAA"),
        ] {
            let key = KeyRecord {
                n: Some(n.into()),
                e: Some(e.into()),
                ..rsa_record("k1")
            };
            let err = SignatureVerifier::verify(INPUT, &signature, &key).unwrap_err();
            assert_eq!(err.reason, ReasonCode::KeyInvalid, "n={n:?} e={e:?}");
        }
    }

    #[test]
    fn leading_zero_bytes_do_not_change_the_key() {
        let signature = sign_with(SIGNING_KEY_PEM, INPUT);
        let mut modulus = vec![0u8];
        modulus.extend(URL_SAFE_NO_PAD.decode(SIGNING_KEY_N).unwrap());
        let key = KeyRecord {
            n: Some(URL_SAFE_NO_PAD.encode(&modulus)),
            ..rsa_record("k1")
        };
        assert!(SignatureVerifier::verify(INPUT, &signature, &key).is_ok());
    }

    #[test]
    fn absent_key_type_is_accepted() {
        let key = KeyRecord {
            kty: None,
            ..rsa_record("k1")
        };
        let signature = sign_with(SIGNING_KEY_PEM, INPUT);
        assert!(SignatureVerifier::verify(INPUT, &signature, &key).is_ok());
    }
}
