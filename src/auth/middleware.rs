// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied to the protected router subtree with `route_layer`, so unmatched
//! paths still 404 instead of 401. On success the doctor is inserted into the
//! request extensions, where the [`super::Auth`] extractor picks it up.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/patient", get(list_patients))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         require_doctor,
//!     ));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::authenticate;
use crate::state::AppState;

/// Authentication middleware function.
pub async fn require_doctor(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match authenticate(request.headers(), &state) {
        Ok(doctor) => {
            tracing::Span::current().record("doctor_id", doctor.doctor_id.as_str());
            request.extensions_mut().insert(doctor);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
