// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthError, CredentialVerifier, PlaintextVerifier, TokenService};
use crate::inference::InferenceClient;
use crate::storage::ClinicDatabase;

/// Shared application state.
///
/// Everything here is either read-only after startup (token service,
/// verifier, inference client) or synchronises internally (the database).
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<ClinicDatabase>,
    /// `None` when no signing secret is configured; authentication then fails closed.
    pub tokens: Option<Arc<TokenService>>,
    pub verifier: Arc<dyn CredentialVerifier>,
    /// `None` when no inference endpoint is configured.
    pub inference: Option<Arc<InferenceClient>>,
}

impl AppState {
    pub fn new(db: ClinicDatabase) -> Self {
        Self {
            db: Arc::new(db),
            tokens: None,
            verifier: Arc::new(PlaintextVerifier),
            inference: None,
        }
    }

    pub fn with_token_service(mut self, tokens: TokenService) -> Self {
        self.tokens = Some(Arc::new(tokens));
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_inference(mut self, client: InferenceClient) -> Self {
        self.inference = Some(Arc::new(client));
        self
    }

    /// The token service, or `SigningKeyUnavailable` when none is configured.
    pub fn token_service(&self) -> Result<&TokenService, AuthError> {
        self.tokens.as_deref().ok_or(AuthError::SigningKeyUnavailable)
    }
}
