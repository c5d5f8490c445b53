// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential verification.
//!
//! ## Security
//!
//! The default [`PlaintextVerifier`] stores the password verbatim and
//! compares with plain equality. This matches the records this service was
//! built to serve, and it is a known weakness: anyone who can read the
//! database can read every doctor's password.
//!
//! Signup and login only talk to the [`CredentialVerifier`] trait, so a
//! hashing implementation (e.g. Argon2 with PHC strings) can replace it in
//! `AppState` without touching the handlers. Existing plaintext records would
//! need a migration at that point.

/// Decides how secrets are stored and how a login attempt is checked.
pub trait CredentialVerifier: Send + Sync {
    /// The form in which a newly registered secret is persisted.
    fn to_stored(&self, supplied: &str) -> String;

    /// Whether `supplied` matches the persisted `stored` form.
    fn verify(&self, supplied: &str, stored: &str) -> bool;
}

/// Verbatim storage and direct comparison (no hashing).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextVerifier;

impl CredentialVerifier for PlaintextVerifier {
    fn to_stored(&self, supplied: &str) -> String {
        supplied.to_string()
    }

    fn verify(&self, supplied: &str, stored: &str) -> bool {
        supplied == stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_stores_verbatim() {
        assert_eq!(PlaintextVerifier.to_stored("s3cret!"), "s3cret!");
    }

    #[test]
    fn plaintext_requires_exact_match() {
        let verifier = PlaintextVerifier;
        assert!(verifier.verify("s3cret!", "s3cret!"));
        assert!(!verifier.verify("S3cret!", "s3cret!"));
        assert!(!verifier.verify("s3cret! ", "s3cret!"));
        assert!(!verifier.verify("", "s3cret!"));
    }

    #[test]
    fn usable_as_trait_object() {
        let verifier: std::sync::Arc<dyn CredentialVerifier> = std::sync::Arc::new(PlaintextVerifier);
        let stored = verifier.to_stored("pw");
        assert!(verifier.verify("pw", &stored));
    }
}
