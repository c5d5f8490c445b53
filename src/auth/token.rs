// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuance and validation (HS256).
//!
//! Validation is stateless: signature plus expiry, no store lookup. The
//! signing secret comes from startup configuration and is injected here;
//! when it is missing no `TokenService` exists and the callers fail closed.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{AuthenticatedDoctor, DoctorClaims};
use super::AuthError;

/// Mints and verifies doctor tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a service from the signing secret.
    ///
    /// # Errors
    /// `AuthError::SigningKeyUnavailable` if the secret is empty.
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.trim().is_empty() {
            return Err(AuthError::SigningKeyUnavailable);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Issue a token for `doctor_id`, valid for one hour from now.
    pub fn issue(&self, doctor_id: &str) -> Result<String, AuthError> {
        self.issue_at(doctor_id, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `issued_at`.
    pub fn issue_at(&self, doctor_id: &str, issued_at: i64) -> Result<String, AuthError> {
        let claims = DoctorClaims::new(doctor_id, issued_at);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("token encoding failed: {e}")))
    }

    /// Validate a token against the current time.
    pub fn validate(&self, token: &str) -> Result<AuthenticatedDoctor, AuthError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validate a token as if the current time were `now`.
    ///
    /// Expiry is checked here rather than by `jsonwebtoken` so the boundary is
    /// exact: valid while `now < exp`, no leeway.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<AuthenticatedDoctor, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<DoctorClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::MalformedToken,
            })?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::MalformedToken);
        }
        if claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }

        Ok(AuthenticatedDoctor::from_claims(claims))
    }
}
