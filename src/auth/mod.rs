// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Doctor identity for the clinic records API.
//!
//! ## Auth Flow
//!
//! 1. A doctor signs up, then logs in with email and password
//! 2. Login returns an HS256 token valid for one hour
//! 3. Clients send `Authorization: Bearer <token>`
//! 4. The server:
//!    - Verifies the signature with the configured secret
//!    - Rejects the token once `now >= exp` (no leeway)
//!    - Extracts `sub` → canonical `doctor_id`
//!
//! ## Security
//!
//! - All patient and profile endpoints require authentication
//! - Every token failure renders the same generic 401
//! - With no signing secret configured, login and protected routes fail closed
//! - Passwords go through [`CredentialVerifier`]; the default stores plaintext

pub mod claims;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod token;

pub use claims::{AuthenticatedDoctor, DoctorClaims, TOKEN_LIFETIME_SECS};
pub use credentials::{CredentialVerifier, PlaintextVerifier};
pub use error::AuthError;
pub use extractor::Auth;
pub use middleware::require_doctor;
pub use token::TokenService;
