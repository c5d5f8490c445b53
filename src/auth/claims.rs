// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated doctor representation.

use serde::{Deserialize, Serialize};

/// Fixed token lifetime: one hour from issuance.
pub const TOKEN_LIFETIME_SECS: i64 = 60 * 60;

/// Claims carried by a doctor token.
///
/// Only `sub`, `iat` and `exp` are used; nothing else about the doctor is
/// embedded, so a token reveals no profile data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoctorClaims {
    /// Subject - the doctor ID
    pub sub: String,

    /// Issued at timestamp (Unix seconds)
    pub iat: i64,

    /// Expiration timestamp (Unix seconds), always `iat + TOKEN_LIFETIME_SECS`
    pub exp: i64,
}

impl DoctorClaims {
    /// Claims for a token issued at `issued_at`.
    pub fn new(doctor_id: impl Into<String>, issued_at: i64) -> Self {
        Self {
            sub: doctor_id.into(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        }
    }

    /// Whether the token has expired at `now`.
    ///
    /// The expiry instant itself is already expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// Authenticated doctor resolved from a valid token.
///
/// This is the identity every protected handler receives; patient access is
/// scoped to `doctor_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedDoctor {
    /// Doctor ID (`sub` claim)
    pub doctor_id: String,

    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedDoctor {
    /// Create from validated claims.
    pub fn from_claims(claims: DoctorClaims) -> Self {
        Self {
            doctor_id: claims.sub,
            expires_at: claims.exp,
        }
    }
}
