// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{HeaderName, Request},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::require_doctor,
    inference::Prediction,
    models::{
        CreatePatientRequest, DetectionPredictions, DetectionRequest, DetectionResponse,
        DoctorProfile, LoginRequest, LoginResponse, MessageResponse, PatientResponse,
        SignupRequest, SignupResponse, UpdatePatientRequest,
    },
    state::AppState,
    storage::{BrainScan, CognitiveTest, StoredPatient},
};

pub mod doctors;
pub mod health;
pub mod patients;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/doctor/signup", post(doctors::signup))
        .route("/doctor/login", post(doctors::login));

    let protected_routes = Router::new()
        .route("/doctor/profile", get(doctors::profile))
        .route(
            "/patient",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/patient/{patient_id}",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route(
            "/patient/{patient_id}/detection",
            post(patients::run_detection),
        )
        .route_layer(from_fn_with_state(state.clone(), require_doctor));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri().path(),
                    request_id,
                    doctor_id = tracing::field::Empty,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        doctors::signup,
        doctors::login,
        doctors::profile,
        patients::create_patient,
        patients::list_patients,
        patients::get_patient,
        patients::update_patient,
        patients::delete_patient,
        patients::run_detection
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            SignupRequest,
            SignupResponse,
            LoginRequest,
            LoginResponse,
            DoctorProfile,
            StoredPatient,
            BrainScan,
            CognitiveTest,
            CreatePatientRequest,
            UpdatePatientRequest,
            PatientResponse,
            MessageResponse,
            DetectionRequest,
            DetectionPredictions,
            DetectionResponse,
            Prediction
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Doctors", description = "Doctor signup, login and profile"),
        (name = "Patients", description = "Patient records owned by the calling doctor")
    )
)]
struct ApiDoc;
