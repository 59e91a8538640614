// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Self-hosted verification of bearer tokens issued by a third-party
//! identity service. No session store: every request carries its own proof.
//!
//! ## Verification Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. [`TrustGateway`] runs, in order:
//!    - decode the three base64url segments and project header/claims
//!    - check `exp` / `nbf` (60 second skew) and require `iss`
//!    - require `alg = RS256` and, when configured, a trusted issuer
//!    - resolve the issuer's key set through discovery (cached per URL)
//!    - select the key by `kid` and verify the RSA-SHA256 signature
//! 3. The result is an [`Identity`] or an [`AuthFailure`] with a stable
//!    [`ReasonCode`]
//!
//! ## Security
//!
//! - All `/v1` endpoints require a verified identity
//! - Admin endpoints additionally require an allowlisted email ([`AccessPolicy`])
//! - Key sets are fetched over HTTPS only and cached with a TTL
//! - Reason codes reach logs and the `reason` field, never the client message

pub mod claims;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod gateway;
pub mod identity;
pub mod jwks;
pub mod policy;
pub mod signature;
pub mod token;

pub use error::{AuthFailure, AuthRejection, ReasonCode};
pub use extractor::{AdminOnly, Auth};
pub use gateway::TrustGateway;
pub use identity::Identity;
pub use jwks::{CacheStatus, KeySetCache};
pub use policy::{AccessPolicy, Role};
