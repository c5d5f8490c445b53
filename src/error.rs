// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::inference::InferenceError;
use crate::storage::StoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    /// Log `detail` and return an opaque 500.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "Request failed with internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
    }

    /// 404 for a patient that is missing or owned by someone else.
    pub fn patient_not_found() -> Self {
        Self::not_found("Patient not found")
    }

    /// 400 for a path ID that is not a UUID.
    pub fn invalid_id() -> Self {
        Self::bad_request("Invalid patient ID")
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DoctorEmailTaken(_) => Self::bad_request("Doctor already exists"),
            StoreError::PatientEmailTaken(_) => {
                Self::bad_request("A patient with this email already exists")
            }
            // The token outlived its doctor; nothing to attach the patient to.
            StoreError::DoctorNotFound(_) => Self::not_found("Doctor not found"),
            StoreError::ScanImageChanged(_) => {
                Self::conflict("Brain scan changed during detection")
            }
            other => Self::internal(other),
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        tracing::warn!(error = %err, "Inference request failed");
        match err {
            InferenceError::NotConfigured => {
                Self::service_unavailable("Detection service is not configured")
            }
            _ => Self::bad_gateway("Detection service request failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let unavailable = ApiError::service_unavailable("down");
        assert_eq!(unavailable.status, StatusCode::SERVICE_UNAVAILABLE);

        let gateway = ApiError::bad_gateway("upstream");
        assert_eq!(gateway.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_hides_detail() {
        let err = ApiError::internal("disk on fire");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Server error");
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let taken: ApiError = StoreError::DoctorEmailTaken("a@b.c".into()).into();
        assert_eq!(taken.status, StatusCode::BAD_REQUEST);
        assert_eq!(taken.message, "Doctor already exists");

        let dup: ApiError = StoreError::PatientEmailTaken("p@b.c".into()).into();
        assert_eq!(dup.status, StatusCode::BAD_REQUEST);

        let stale: ApiError = StoreError::ScanImageChanged("p-1".into()).into();
        assert_eq!(stale.status, StatusCode::CONFLICT);

        let io: ApiError = StoreError::Io(std::io::Error::other("boom")).into();
        assert_eq!(io.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.message, "Server error");
    }

    #[test]
    fn inference_errors_map_to_gateway_statuses() {
        let missing: ApiError = InferenceError::NotConfigured.into();
        assert_eq!(missing.status, StatusCode::SERVICE_UNAVAILABLE);

        let upstream: ApiError = InferenceError::Status(500).into();
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
