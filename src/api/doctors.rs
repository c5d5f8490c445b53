// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Doctor account endpoints: signup, login and profile.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{DoctorProfile, LoginRequest, LoginResponse, SignupRequest, SignupResponse},
    state::AppState,
    storage::{DoctorRepository, StoredDoctor},
};

/// Register a new doctor account.
#[utoipa::path(
    post,
    path = "/doctor/signup",
    tag = "Doctors",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Doctor registered", body = SignupResponse),
        (status = 400, description = "Doctor already exists or invalid input"),
        (status = 500, description = "Server error")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    request.validate()?;

    let doctor = StoredDoctor::new(
        request.name,
        request.email,
        state.verifier.to_stored(&request.password),
        request.specialty,
    );

    DoctorRepository::new(&state.db).register(&doctor)?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Doctor registered successfully".to_string(),
            doctor_id: doctor.id,
        }),
    ))
}

/// Exchange email and password for a one-hour bearer token.
///
/// Unknown email and wrong password produce the same response.
#[utoipa::path(
    post,
    path = "/doctor/login",
    tag = "Doctors",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid credentials"),
        (status = 500, description = "Server error")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let invalid = || ApiError::bad_request("Invalid credentials");

    let doctor = DoctorRepository::new(&state.db)
        .find_by_email(&request.email)?
        .ok_or_else(invalid)?;

    if !state.verifier.verify(&request.password, &doctor.secret) {
        tracing::debug!(doctor_id = %doctor.id, "Login rejected");
        return Err(invalid());
    }

    let tokens = state.token_service().map_err(ApiError::internal)?;
    let token = tokens.issue(&doctor.id).map_err(ApiError::internal)?;

    tracing::info!(doctor_id = %doctor.id, "Doctor logged in");

    Ok(Json(LoginResponse { token }))
}

/// Profile of the authenticated doctor. The stored secret is never returned.
#[utoipa::path(
    get,
    path = "/doctor/profile",
    tag = "Doctors",
    responses(
        (status = 200, description = "Doctor profile", body = DoctorProfile),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "Doctor not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn profile(
    Auth(doctor): Auth,
    State(state): State<AppState>,
) -> Result<Json<DoctorProfile>, ApiError> {
    let stored = DoctorRepository::new(&state.db)
        .get(&doctor.doctor_id)?
        .ok_or_else(|| ApiError::not_found("Doctor not found"))?;

    Ok(Json(stored.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedDoctor, CredentialVerifier, TokenService};
    use crate::storage::ClinicDatabase;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = ClinicDatabase::open(&temp_dir.path().join("doctors.redb")).unwrap();
        let state = AppState::new(db).with_token_service(TokenService::new("doctor-secret").unwrap());
        (state, temp_dir)
    }

    /// Stores secrets with a marker prefix so the stored form differs from input.
    struct TaggedVerifier;

    impl CredentialVerifier for TaggedVerifier {
        fn to_stored(&self, supplied: &str) -> String {
            format!("tagged:{supplied}")
        }

        fn verify(&self, supplied: &str, stored: &str) -> bool {
            stored == self.to_stored(supplied)
        }
    }

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            name: "Dr. Ada".into(),
            email: email.into(),
            password: "hunter2".into(),
            specialty: "Neurology".into(),
        }
    }

    #[tokio::test]
    async fn signup_then_login_issues_valid_token() {
        let (state, _dir) = test_state();

        let (status, Json(created)) = signup(State(state.clone()), Json(signup_request("ada@clinic.test")))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(LoginResponse { token }) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@clinic.test".into(),
                password: "hunter2".into(),
            }),
        )
        .await
        .unwrap();

        let doctor = state.token_service().unwrap().validate(&token).unwrap();
        assert_eq!(doctor.doctor_id, created.doctor_id);
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected() {
        let (state, _dir) = test_state();
        signup(State(state.clone()), Json(signup_request("dup@clinic.test")))
            .await
            .unwrap();

        let err = signup(State(state), Json(signup_request("dup@clinic.test")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Doctor already exists");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_alike() {
        let (state, _dir) = test_state();
        signup(State(state.clone()), Json(signup_request("ada@clinic.test")))
            .await
            .unwrap();

        let wrong = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@clinic.test".into(),
                password: "nope".into(),
            }),
        )
        .await
        .unwrap_err();
        let unknown = login(
            State(state),
            Json(LoginRequest {
                email: "ghost@clinic.test".into(),
                password: "hunter2".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
        assert_eq!(wrong.message, unknown.message);
    }

    #[tokio::test]
    async fn signup_and_login_go_through_installed_verifier() {
        let (state, _dir) = test_state();
        let state = state.with_verifier(Arc::new(TaggedVerifier));

        signup(State(state.clone()), Json(signup_request("ada@clinic.test")))
            .await
            .unwrap();

        let stored = DoctorRepository::new(&state.db)
            .find_by_email("ada@clinic.test")
            .unwrap()
            .unwrap();
        assert_eq!(stored.secret, "tagged:hunter2");

        login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@clinic.test".into(),
                password: "hunter2".into(),
            }),
        )
        .await
        .unwrap();

        let err = login(
            State(state),
            Json(LoginRequest {
                email: "ada@clinic.test".into(),
                password: "tagged:hunter2".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_without_signing_key_is_server_error() {
        let temp_dir = TempDir::new().unwrap();
        let db = ClinicDatabase::open(&temp_dir.path().join("nokey.redb")).unwrap();
        let state = AppState::new(db);
        signup(State(state.clone()), Json(signup_request("ada@clinic.test")))
            .await
            .unwrap();

        let err = login(
            State(state),
            Json(LoginRequest {
                email: "ada@clinic.test".into(),
                password: "hunter2".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Server error");
    }

    #[tokio::test]
    async fn profile_returns_public_view() {
        let (state, _dir) = test_state();
        let (_, Json(created)) = signup(State(state.clone()), Json(signup_request("ada@clinic.test")))
            .await
            .unwrap();

        let auth = Auth(AuthenticatedDoctor {
            doctor_id: created.doctor_id.clone(),
            expires_at: i64::MAX,
        });
        let Json(view) = profile(auth, State(state)).await.unwrap();

        assert_eq!(view.id, created.doctor_id);
        assert_eq!(view.email, "ada@clinic.test");
        assert!(view.patients.is_empty());
    }

    #[tokio::test]
    async fn profile_of_unknown_doctor_is_not_found() {
        let (state, _dir) = test_state();
        let auth = Auth(AuthenticatedDoctor {
            doctor_id: "vanished".into(),
            expires_at: i64::MAX,
        });
        let err = profile(auth, State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
