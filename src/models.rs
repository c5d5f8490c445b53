// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Everything on the wire is
//! camelCase JSON; all types derive `ToSchema` for the OpenAPI document.
//!
//! Persisted records (`StoredPatient` and friends) live in
//! [`crate::storage`] and are returned as-is; the doctor record is not,
//! because it carries the stored secret. [`DoctorProfile`] is its public view.
//!
//! ## Model Categories
//!
//! - **Doctors**: signup, login, profile
//! - **Patients**: create, partial update, responses
//! - **Detection**: inference flags and predictions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::inference::Prediction;
use crate::storage::{BrainScan, CognitiveTest, PatientChanges, StoredDoctor, StoredPatient};

/// Plain `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn require_text(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

/// Minimal shape check: one `@` with something on both sides, no spaces.
fn require_email(value: &str) -> Result<(), ApiError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request("A valid email is required"));
    }
    Ok(())
}

fn require_age(age: u32) -> Result<(), ApiError> {
    if age == 0 {
        return Err(ApiError::bad_request("Age must be a positive integer"));
    }
    Ok(())
}

// =============================================================================
// Doctor Models
// =============================================================================

/// Request to register a new doctor.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    /// Login password (`secret` is accepted as an alias)
    #[serde(alias = "secret")]
    pub password: String,
    pub specialty: String,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_text(&self.name, "name")?;
        require_email(&self.email)?;
        require_text(&self.password, "password")?;
        require_text(&self.specialty, "specialty")
    }
}

/// Response after successful signup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub doctor_id: String,
}

/// Login credentials.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    #[serde(alias = "secret")]
    pub password: String,
}

/// Bearer token valid for one hour.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

/// Public view of a doctor account. Never includes the stored secret.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub specialty: String,
    /// IDs of the patients this doctor owns
    pub patients: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StoredDoctor> for DoctorProfile {
    fn from(doctor: StoredDoctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name,
            email: doctor.email,
            specialty: doctor.specialty,
            patients: doctor.patients,
            created_at: doctor.created_at,
        }
    }
}

// =============================================================================
// Patient Models
// =============================================================================

/// Request to add a patient. The owner is always the calling doctor.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub name: String,
    pub email: String,
    pub age: u32,
    pub gender: String,
    #[serde(default)]
    pub brain_scan: Option<BrainScan>,
    #[serde(default)]
    pub alzheimer_biomarkers: Vec<String>,
    #[serde(default)]
    pub cognitive_tests: Vec<CognitiveTest>,
}

impl CreatePatientRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_text(&self.name, "name")?;
        require_email(&self.email)?;
        require_age(self.age)?;
        require_text(&self.gender, "gender")
    }

    /// Build the record owned by `doctor_id`.
    pub fn into_patient(self, doctor_id: &str) -> StoredPatient {
        let now = Utc::now();
        StoredPatient {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            email: self.email,
            age: self.age,
            gender: self.gender,
            brain_scan: self.brain_scan,
            alzheimer_biomarkers: self.alzheimer_biomarkers,
            cognitive_tests: self.cognitive_tests,
            doctor: doctor_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial patient update.
///
/// Omitted and `null` fields are left unchanged. Supplied fields overwrite,
/// including empty lists. There is no owner field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub brain_scan: Option<BrainScan>,
    pub alzheimer_biomarkers: Option<Vec<String>>,
    pub cognitive_tests: Option<Vec<CognitiveTest>>,
}

impl UpdatePatientRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            require_text(name, "name")?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        if let Some(age) = self.age {
            require_age(age)?;
        }
        if let Some(gender) = &self.gender {
            require_text(gender, "gender")?;
        }
        Ok(())
    }
}

impl From<UpdatePatientRequest> for PatientChanges {
    fn from(request: UpdatePatientRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            age: request.age,
            gender: request.gender,
            brain_scan: request.brain_scan,
            alzheimer_biomarkers: request.alzheimer_biomarkers,
            cognitive_tests: request.cognitive_tests,
        }
    }
}

/// A patient together with an acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientResponse {
    pub message: String,
    pub patient: StoredPatient,
}

// =============================================================================
// Detection Models
// =============================================================================

fn default_true() -> bool {
    true
}

/// Which detectors to run against the patient's brain scan.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRequest {
    #[serde(default = "default_true")]
    pub brain_tumor: bool,
    #[serde(default = "default_true")]
    pub alzheimer: bool,
}

impl Default for DetectionRequest {
    fn default() -> Self {
        Self {
            brain_tumor: true,
            alzheimer: true,
        }
    }
}

/// Predictions returned by the detectors that were called.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionPredictions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brain_tumor: Option<Prediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alzheimer: Option<Prediction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DetectionResponse {
    pub message: String,
    pub predictions: DetectionPredictions,
    pub patient: StoredPatient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_accepts_secret_alias() {
        let req: SignupRequest = serde_json::from_str(
            r#"{"name":"Dr. Ada","email":"ada@clinic.test","secret":"pw","specialty":"Neurology"}"#,
        )
        .unwrap();
        assert_eq!(req.password, "pw");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn signup_rejects_blank_fields() {
        let req = SignupRequest {
            name: "Dr. Ada".into(),
            email: "not-an-email".into(),
            password: "pw".into(),
            specialty: "Neurology".into(),
        };
        assert_eq!(req.validate().unwrap_err().message, "A valid email is required");

        let req = SignupRequest {
            email: "ada@clinic.test".into(),
            specialty: "  ".into(),
            ..req
        };
        assert_eq!(req.validate().unwrap_err().message, "specialty is required");
    }

    #[test]
    fn profile_omits_secret() {
        let doctor = StoredDoctor::new("Dr. Ada", "ada@clinic.test", "hunter2", "Neurology");
        let json = serde_json::to_value(DoctorProfile::from(doctor)).unwrap();
        assert!(json.get("secret").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["specialty"], "Neurology");
    }

    #[test]
    fn create_rejects_zero_age() {
        let req: CreatePatientRequest = serde_json::from_str(
            r#"{"name":"Pat","email":"pat@x.test","age":0,"gender":"F"}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_sets_owner_and_timestamps() {
        let req: CreatePatientRequest = serde_json::from_str(
            r#"{"name":"Pat","email":"pat@x.test","age":70,"gender":"F",
                "brainScan":{"scanType":"MRI","scanDate":"2024-03-01"}}"#,
        )
        .unwrap();
        let patient = req.into_patient("doc-1");
        assert_eq!(patient.doctor, "doc-1");
        assert_eq!(patient.created_at, patient.updated_at);
        assert_eq!(
            patient.brain_scan.unwrap().scan_type.as_deref(),
            Some("MRI")
        );
    }

    #[test]
    fn update_distinguishes_absent_from_empty() {
        let req: UpdatePatientRequest =
            serde_json::from_str(r#"{"alzheimerBiomarkers":[],"name":null}"#).unwrap();
        let changes = PatientChanges::from(req);
        assert_eq!(changes.alzheimer_biomarkers, Some(vec![]));
        assert!(changes.name.is_none());
        assert!(changes.age.is_none());
    }

    #[test]
    fn update_validates_supplied_fields_only() {
        assert!(UpdatePatientRequest::default().validate().is_ok());

        let req = UpdatePatientRequest {
            age: Some(0),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn detection_flags_default_to_true() {
        let req: DetectionRequest = serde_json::from_str("{}").unwrap();
        assert!(req.brain_tumor && req.alzheimer);

        let req: DetectionRequest = serde_json::from_str(r#"{"alzheimer":false}"#).unwrap();
        assert!(req.brain_tumor);
        assert!(!req.alzheimer);
    }
}
