// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the authenticated doctor.
//!
//! Use the `Auth` extractor in handlers that act on behalf of a doctor:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(doctor): Auth) -> impl IntoResponse {
//!     // doctor is AuthenticatedDoctor
//! }
//! ```
//!
//! Protected routes are also wrapped by [`super::middleware::require_doctor`],
//! which resolves the identity once and stores it in the request extensions;
//! the extractor then just picks it up.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{AuthError, AuthenticatedDoctor};
use crate::state::AppState;

/// Extractor for the authenticated doctor.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_patients(
///     Auth(doctor): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<Vec<StoredPatient>>, ApiError> {
///     // doctor.doctor_id scopes every repository call
/// }
/// ```
pub struct Auth(pub AuthenticatedDoctor);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the doctor
        if let Some(doctor) = parts.extensions.get::<AuthenticatedDoctor>().cloned() {
            return Ok(Auth(doctor));
        }

        let doctor = authenticate(&parts.headers, state)?;
        Ok(Auth(doctor))
    }
}

/// Extract the bearer token from request headers.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    // Auth schemes are case-insensitive (RFC 9110 §11.1).
    let token = auth_header
        .split_once(' ')
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Resolve the doctor behind the request's bearer token.
///
/// Fails closed when no signing key is configured.
pub fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<AuthenticatedDoctor, AuthError> {
    let token = bearer_token(headers)?;

    let tokens = state.token_service().inspect_err(|_| {
        tracing::error!("Rejecting authenticated request: no signing key configured");
    })?;

    tokens.validate(token)
}
