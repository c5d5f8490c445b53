// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Patient endpoints.
//!
//! Every handler works on behalf of the authenticated doctor and only sees
//! that doctor's patients. A patient owned by someone else is reported as
//! not found, never as forbidden.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::Auth,
    error::ApiError,
    inference::{label_indicates_tumor, Detector, InferenceError},
    models::{
        CreatePatientRequest, DetectionPredictions, DetectionRequest, DetectionResponse,
        MessageResponse, PatientResponse, UpdatePatientRequest,
    },
    state::AppState,
    storage::{PatientRepository, StoredPatient},
};

/// Parse a path ID, rejecting anything that is not a UUID.
fn parse_patient_id(raw: &str) -> Result<String, ApiError> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| ApiError::invalid_id())
}

/// Add a patient owned by the authenticated doctor.
#[utoipa::path(
    post,
    path = "/patient",
    tag = "Patients",
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient added", body = PatientResponse),
        (status = 400, description = "Invalid input or duplicate email"),
        (status = 401, description = "Not authorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_patient(
    Auth(doctor): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<PatientResponse>), ApiError> {
    request.validate()?;

    let patient = request.into_patient(&doctor.doctor_id);
    PatientRepository::new(&state.db).create(&patient)?;

    Ok((
        StatusCode::CREATED,
        Json(PatientResponse {
            message: "Patient added successfully".to_string(),
            patient,
        }),
    ))
}

/// List the authenticated doctor's patients, oldest first.
#[utoipa::path(
    get,
    path = "/patient",
    tag = "Patients",
    responses(
        (status = 200, description = "Patients owned by the caller", body = [StoredPatient]),
        (status = 401, description = "Not authorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_patients(
    Auth(doctor): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredPatient>>, ApiError> {
    let patients = PatientRepository::new(&state.db).list_by_owner(&doctor.doctor_id)?;
    Ok(Json(patients))
}

#[utoipa::path(
    get,
    path = "/patient/{patient_id}",
    tag = "Patients",
    params(("patient_id" = String, Path, description = "Patient UUID")),
    responses(
        (status = 200, description = "Patient", body = StoredPatient),
        (status = 400, description = "Invalid patient ID"),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "Patient not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_patient(
    Auth(doctor): Auth,
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<StoredPatient>, ApiError> {
    let patient_id = parse_patient_id(&patient_id)?;

    PatientRepository::new(&state.db)
        .get_scoped(&doctor.doctor_id, &patient_id)?
        .map(Json)
        .ok_or_else(ApiError::patient_not_found)
}

/// Partially update a patient. Omitted fields keep their values.
#[utoipa::path(
    put,
    path = "/patient/{patient_id}",
    tag = "Patients",
    params(("patient_id" = String, Path, description = "Patient UUID")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = PatientResponse),
        (status = 400, description = "Invalid ID, invalid input or duplicate email"),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "Patient not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_patient(
    Auth(doctor): Auth,
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<PatientResponse>, ApiError> {
    let patient_id = parse_patient_id(&patient_id)?;
    request.validate()?;

    let patient = PatientRepository::new(&state.db)
        .update_scoped(&doctor.doctor_id, &patient_id, request.into())?
        .ok_or_else(ApiError::patient_not_found)?;

    Ok(Json(PatientResponse {
        message: "Patient updated successfully".to_string(),
        patient,
    }))
}

#[utoipa::path(
    delete,
    path = "/patient/{patient_id}",
    tag = "Patients",
    params(("patient_id" = String, Path, description = "Patient UUID")),
    responses(
        (status = 200, description = "Patient deleted", body = MessageResponse),
        (status = 400, description = "Invalid patient ID"),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "Patient not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_patient(
    Auth(doctor): Auth,
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let patient_id = parse_patient_id(&patient_id)?;

    if !PatientRepository::new(&state.db).delete_scoped(&doctor.doctor_id, &patient_id)? {
        return Err(ApiError::patient_not_found());
    }

    Ok(Json(MessageResponse::new("Patient deleted successfully")))
}

/// Run the configured detectors against the patient's brain scan image.
///
/// A brain-tumor prediction is written back to the patient's `brainScan`.
/// Requested detectors without a configured endpoint are skipped; if none
/// of the requested detectors is available the call fails with 503.
#[utoipa::path(
    post,
    path = "/patient/{patient_id}/detection",
    tag = "Patients",
    params(("patient_id" = String, Path, description = "Patient UUID")),
    request_body = DetectionRequest,
    responses(
        (status = 200, description = "Predictions", body = DetectionResponse),
        (status = 400, description = "Invalid ID, no detector requested, or no scan image"),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "Patient not found"),
        (status = 409, description = "Brain scan changed during detection"),
        (status = 502, description = "Detection service request failed"),
        (status = 503, description = "Detection service is not configured")
    ),
    security(("bearer_auth" = []))
)]
pub async fn run_detection(
    Auth(doctor): Auth,
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Json(request): Json<DetectionRequest>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let patient_id = parse_patient_id(&patient_id)?;
    if !request.brain_tumor && !request.alzheimer {
        return Err(ApiError::bad_request("At least one detector must be requested"));
    }

    let client = state.inference.as_deref().ok_or(InferenceError::NotConfigured)?;
    let run_tumor = request.brain_tumor && client.endpoint(Detector::BrainTumor).is_some();
    let run_alzheimer = request.alzheimer && client.endpoint(Detector::Alzheimer).is_some();
    if !run_tumor && !run_alzheimer {
        return Err(InferenceError::NotConfigured.into());
    }

    let repo = PatientRepository::new(&state.db);
    let patient = repo
        .get_scoped(&doctor.doctor_id, &patient_id)?
        .ok_or_else(ApiError::patient_not_found)?;

    let image_url = patient
        .brain_scan
        .as_ref()
        .and_then(|scan| scan.scan_image.clone())
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Patient has no brain scan image"))?;

    let tumor = async {
        if run_tumor {
            client.predict(Detector::BrainTumor, &image_url).await.map(Some)
        } else {
            Ok(None)
        }
    };
    let alzheimer = async {
        if run_alzheimer {
            client.predict(Detector::Alzheimer, &image_url).await.map(Some)
        } else {
            Ok(None)
        }
    };
    let (tumor, alzheimer) = tokio::join!(tumor, alzheimer);
    let predictions = DetectionPredictions {
        brain_tumor: tumor?,
        alzheimer: alzheimer?,
    };

    // The scan may have been edited while the models ran.
    let patient = match &predictions.brain_tumor {
        Some(prediction) => repo
            .record_tumor_result(
                &doctor.doctor_id,
                &patient_id,
                &image_url,
                label_indicates_tumor(&prediction.label),
                &prediction.label,
            )?
            .ok_or_else(ApiError::patient_not_found)?,
        None => patient,
    };

    tracing::info!(
        doctor_id = %doctor.doctor_id,
        %patient_id,
        brain_tumor = run_tumor,
        alzheimer = run_alzheimer,
        "Detection completed"
    );

    Ok(Json(DetectionResponse {
        message: "Detection completed".to_string(),
        predictions,
        patient,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedDoctor;
    use crate::inference::InferenceClient;
    use crate::storage::{ClinicDatabase, DoctorRepository, StoredDoctor};
    use axum::{routing::post, Router};
    use std::{sync::Arc, time::Duration};
    use tempfile::TempDir;
    use tokio::sync::Notify;
    use url::Url;

    fn test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = ClinicDatabase::open(&temp_dir.path().join("patients.redb")).unwrap();
        (AppState::new(db), temp_dir)
    }

    fn register_doctor(state: &AppState, email: &str) -> Auth {
        let doctor = StoredDoctor::new("Dr. Test", email, "pw", "Neurology");
        DoctorRepository::new(&state.db).register(&doctor).unwrap();
        Auth(AuthenticatedDoctor {
            doctor_id: doctor.id,
            expires_at: i64::MAX,
        })
    }

    fn as_auth(auth: &Auth) -> Auth {
        Auth(auth.0.clone())
    }

    fn create_request(email: &str) -> CreatePatientRequest {
        serde_json::from_value(serde_json::json!({
            "name": "Pat",
            "email": email,
            "age": 71,
            "gender": "F",
            "alzheimerBiomarkers": ["amyloid-beta"],
            "brainScan": { "scanType": "MRI", "scanImage": "https://blobs.test/pat.png" }
        }))
        .unwrap()
    }

    async fn create(state: &AppState, auth: &Auth, email: &str) -> StoredPatient {
        let (_, Json(created)) =
            create_patient(as_auth(auth), State(state.clone()), Json(create_request(email)))
                .await
                .unwrap();
        created.patient
    }

    async fn spawn_model(label: &'static str) -> Url {
        let app = Router::new().route(
            "/predict",
            post(move || async move {
                Json(serde_json::json!({ "label": label, "confidence": 0.88 }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/predict")).unwrap()
    }

    /// Model that signals `called` and then answers only once `release` fires.
    async fn spawn_gated_model(label: &'static str, called: Arc<Notify>, release: Arc<Notify>) -> Url {
        let app = Router::new().route(
            "/predict",
            post(move || {
                let called = called.clone();
                let release = release.clone();
                async move {
                    called.notify_one();
                    release.notified().await;
                    Json(serde_json::json!({ "label": label, "confidence": 0.91 }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/predict")).unwrap()
    }

    #[tokio::test]
    async fn create_assigns_owner_and_lists_once() {
        let (state, _dir) = test_state();
        let auth = register_doctor(&state, "doc@clinic.test");

        let patient = create(&state, &auth, "pat@x.test").await;
        assert_eq!(patient.doctor, auth.0.doctor_id);

        let Json(listed) = list_patients(as_auth(&auth), State(state.clone())).await.unwrap();
        assert_eq!(listed, vec![patient.clone()]);

        let doctor = DoctorRepository::new(&state.db)
            .get(&auth.0.doctor_id)
            .unwrap()
            .unwrap();
        assert_eq!(doctor.patients, vec![patient.id]);
    }

    #[tokio::test]
    async fn other_doctor_sees_not_found() {
        let (state, _dir) = test_state();
        let owner = register_doctor(&state, "a@clinic.test");
        let intruder = register_doctor(&state, "b@clinic.test");
        let patient = create(&state, &owner, "pat@x.test").await;

        let err = get_patient(as_auth(&intruder), State(state.clone()), Path(patient.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = delete_patient(as_auth(&intruder), State(state.clone()), Path(patient.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let Json(still_there) = get_patient(as_auth(&owner), State(state), Path(patient.id.clone()))
            .await
            .unwrap();
        assert_eq!(still_there, patient);
    }

    #[tokio::test]
    async fn invalid_id_is_bad_request() {
        let (state, _dir) = test_state();
        let auth = register_doctor(&state, "doc@clinic.test");

        let err = get_patient(as_auth(&auth), State(state.clone()), Path("not-a-uuid".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = delete_patient(as_auth(&auth), State(state), Path("42".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn partial_update_preserves_omitted_fields() {
        let (state, _dir) = test_state();
        let auth = register_doctor(&state, "doc@clinic.test");
        let patient = create(&state, &auth, "pat@x.test").await;

        let request: UpdatePatientRequest =
            serde_json::from_value(serde_json::json!({ "age": 72 })).unwrap();
        let Json(updated) = update_patient(
            as_auth(&auth),
            State(state),
            Path(patient.id.clone()),
            Json(request),
        )
        .await
        .unwrap();

        assert_eq!(updated.patient.age, 72);
        assert_eq!(updated.patient.name, patient.name);
        assert_eq!(updated.patient.brain_scan, patient.brain_scan);
        assert_eq!(updated.patient.alzheimer_biomarkers, patient.alzheimer_biomarkers);
        assert_eq!(updated.patient.created_at, patient.created_at);
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let (state, _dir) = test_state();
        let auth = register_doctor(&state, "doc@clinic.test");
        let patient = create(&state, &auth, "pat@x.test").await;

        delete_patient(as_auth(&auth), State(state.clone()), Path(patient.id.clone()))
            .await
            .unwrap();
        let err = delete_patient(as_auth(&auth), State(state.clone()), Path(patient.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let doctor = DoctorRepository::new(&state.db)
            .get(&auth.0.doctor_id)
            .unwrap()
            .unwrap();
        assert!(doctor.patients.is_empty());
    }

    #[tokio::test]
    async fn detection_without_endpoints_is_unavailable() {
        let (state, _dir) = test_state();
        let auth = register_doctor(&state, "doc@clinic.test");
        let patient = create(&state, &auth, "pat@x.test").await;

        let err = run_detection(
            as_auth(&auth),
            State(state),
            Path(patient.id),
            Json(DetectionRequest::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn detection_stores_tumor_result() {
        let (state, _dir) = test_state();
        let tumor_url = spawn_model("glioma").await;
        let alzheimer_url = spawn_model("MildDemented").await;
        let state = state.with_inference(
            InferenceClient::new(Some(tumor_url), Some(alzheimer_url), Duration::from_secs(5))
                .unwrap(),
        );
        let auth = register_doctor(&state, "doc@clinic.test");
        let patient = create(&state, &auth, "pat@x.test").await;

        let Json(response) = run_detection(
            as_auth(&auth),
            State(state.clone()),
            Path(patient.id.clone()),
            Json(DetectionRequest::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.predictions.brain_tumor.unwrap().label, "glioma");
        assert_eq!(response.predictions.alzheimer.unwrap().label, "MildDemented");

        let scan = response.patient.brain_scan.unwrap();
        assert_eq!(scan.tumor_detected, Some(true));
        assert_eq!(scan.tumor_type.as_deref(), Some("glioma"));
        assert_eq!(scan.scan_type.as_deref(), Some("MRI"));

        let Json(stored) = get_patient(as_auth(&auth), State(state), Path(patient.id))
            .await
            .unwrap();
        assert_eq!(stored.brain_scan.unwrap().tumor_detected, Some(true));
    }

    #[tokio::test]
    async fn detection_keeps_scan_replaced_while_models_run() {
        let (state, _dir) = test_state();
        let called = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let tumor_url = spawn_gated_model("glioma", called.clone(), release.clone()).await;
        let state = state.with_inference(
            InferenceClient::new(Some(tumor_url), None, Duration::from_secs(5)).unwrap(),
        );
        let auth = register_doctor(&state, "doc@clinic.test");
        let patient = create(&state, &auth, "pat@x.test").await;

        let detection = tokio::spawn(run_detection(
            as_auth(&auth),
            State(state.clone()),
            Path(patient.id.clone()),
            Json(DetectionRequest::default()),
        ));
        called.notified().await;

        let request: UpdatePatientRequest = serde_json::from_value(serde_json::json!({
            "brainScan": { "scanType": "CT", "scanImage": "https://blobs.test/new.png" }
        }))
        .unwrap();
        update_patient(
            as_auth(&auth),
            State(state.clone()),
            Path(patient.id.clone()),
            Json(request),
        )
        .await
        .unwrap();
        release.notify_one();

        let err = detection.await.unwrap().unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let Json(stored) = get_patient(as_auth(&auth), State(state), Path(patient.id))
            .await
            .unwrap();
        let scan = stored.brain_scan.unwrap();
        assert_eq!(scan.scan_image.as_deref(), Some("https://blobs.test/new.png"));
        assert_eq!(scan.scan_type.as_deref(), Some("CT"));
        assert_eq!(scan.tumor_detected, None);
        assert_eq!(scan.tumor_type, None);
    }

    #[tokio::test]
    async fn detection_requires_scan_image() {
        let (state, _dir) = test_state();
        let tumor_url = spawn_model("no_tumor").await;
        let state = state.with_inference(
            InferenceClient::new(Some(tumor_url), None, Duration::from_secs(5)).unwrap(),
        );
        let auth = register_doctor(&state, "doc@clinic.test");

        let request: CreatePatientRequest = serde_json::from_value(serde_json::json!({
            "name": "No Scan", "email": "noscan@x.test", "age": 50, "gender": "M"
        }))
        .unwrap();
        let (_, Json(created)) = create_patient(as_auth(&auth), State(state.clone()), Json(request))
            .await
            .unwrap();

        let err = run_detection(
            as_auth(&auth),
            State(state),
            Path(created.patient.id),
            Json(DetectionRequest::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
