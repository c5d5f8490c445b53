// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Patient repository (ownership-scoped).
//!
//! Every read and write takes the requesting doctor's ID and only ever
//! touches records that doctor owns. Records owned by another doctor behave
//! exactly like missing records.
//!
//! Create and delete also maintain the owning doctor's `patients` list; both
//! writes share one redb transaction.

use chrono::{DateTime, NaiveDate, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{
    encode_record, read_all_records, read_record, ClinicDatabase, StoreError, StoreResult,
    DOCTORS, PATIENTS, PATIENT_EMAILS,
};
use crate::storage::ownership::{OwnedRecord, OwnershipScope};
use crate::storage::relationship::{link_patient, unlink_patient};

use super::StoredDoctor;

/// Brain scan sub-record.
///
/// `scan_image` is a reference (URL) into the external blob store; the
/// image itself is never held here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrainScan {
    /// Modality, e.g. MRI or CT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_type: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "flexible_date::deserialize"
    )]
    pub scan_date: Option<DateTime<Utc>>,
    /// Blob-store URL of the scan image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_detected: Option<bool>,
    /// E.g. glioma, meningioma, pituitary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
}

/// A cognitive assessment result (MoCA, MMSE, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveTest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "flexible_date::deserialize"
    )]
    pub test_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

/// Patient record as persisted and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredPatient {
    /// Unique patient identifier (UUID)
    pub id: String,
    pub name: String,
    /// Contact email, unique across all patients
    pub email: String,
    pub age: u32,
    pub gender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brain_scan: Option<BrainScan>,
    #[serde(default)]
    pub alzheimer_biomarkers: Vec<String>,
    #[serde(default)]
    pub cognitive_tests: Vec<CognitiveTest>,
    /// Owning doctor ID; fixed at creation
    pub doctor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedRecord for StoredPatient {
    fn owner_doctor_id(&self) -> &str {
        &self.doctor
    }
}

/// Field-by-field patient changes.
///
/// `None` means "not supplied" and leaves the field untouched. `Some` always
/// overwrites, including zero-like values such as an empty biomarker list.
/// There is no owner field: ownership never changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub brain_scan: Option<BrainScan>,
    pub alzheimer_biomarkers: Option<Vec<String>>,
    pub cognitive_tests: Option<Vec<CognitiveTest>>,
}

impl PatientChanges {
    /// Overwrite the supplied fields on `patient`.
    pub fn apply(self, patient: &mut StoredPatient) {
        if let Some(name) = self.name {
            patient.name = name;
        }
        if let Some(email) = self.email {
            patient.email = email;
        }
        if let Some(age) = self.age {
            patient.age = age;
        }
        if let Some(gender) = self.gender {
            patient.gender = gender;
        }
        if let Some(brain_scan) = self.brain_scan {
            patient.brain_scan = Some(brain_scan);
        }
        if let Some(biomarkers) = self.alzheimer_biomarkers {
            patient.alzheimer_biomarkers = biomarkers;
        }
        if let Some(tests) = self.cognitive_tests {
            patient.cognitive_tests = tests;
        }
    }
}

/// Repository for patient records, always scoped to a doctor.
pub struct PatientRepository<'a> {
    db: &'a ClinicDatabase,
}

impl<'a> PatientRepository<'a> {
    /// Create a new PatientRepository.
    pub fn new(db: &'a ClinicDatabase) -> Self {
        Self { db }
    }

    /// Insert a patient and append it to the owning doctor's list.
    ///
    /// The owner is `patient.doctor`; callers set it from the authenticated
    /// identity, never from request input.
    ///
    /// # Errors
    /// - `StoreError::PatientEmailTaken` if the email is already used
    /// - `StoreError::DoctorNotFound` if the owner does not exist
    pub fn create(&self, patient: &StoredPatient) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut emails = write_txn.open_table(PATIENT_EMAILS)?;
            if emails.get(patient.email.as_str())?.is_some() {
                return Err(StoreError::PatientEmailTaken(patient.email.clone()));
            }

            let mut doctors = write_txn.open_table(DOCTORS)?;
            let mut doctor: StoredDoctor = read_record(&doctors, &patient.doctor)?
                .ok_or_else(|| StoreError::DoctorNotFound(patient.doctor.clone()))?;

            let mut patients = write_txn.open_table(PATIENTS)?;
            patients.insert(patient.id.as_str(), encode_record(patient)?.as_slice())?;
            emails.insert(patient.email.as_str(), patient.id.as_str())?;

            link_patient(&mut doctor, &patient.id);
            doctors.insert(doctor.id.as_str(), encode_record(&doctor)?.as_slice())?;
        }
        write_txn.commit()?;

        tracing::info!(
            doctor_id = %patient.doctor,
            patient_id = %patient.id,
            "Patient created"
        );
        Ok(())
    }

    /// List every patient owned by `doctor_id`, oldest first.
    pub fn list_by_owner(&self, doctor_id: &str) -> StoreResult<Vec<StoredPatient>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PATIENTS)?;

        let mut patients: Vec<StoredPatient> = read_all_records::<StoredPatient, _>(&table)?
            .into_iter()
            .filter(|patient| patient.is_owned_by(doctor_id))
            .collect();
        patients.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(patients)
    }

    /// Get a patient only if `doctor_id` owns it.
    pub fn get_scoped(
        &self,
        doctor_id: &str,
        patient_id: &str,
    ) -> StoreResult<Option<StoredPatient>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PATIENTS)?;
        let patient: Option<StoredPatient> = read_record(&table, patient_id)?;
        Ok(patient.scoped_to(doctor_id))
    }

    /// Apply `changes` to a patient owned by `doctor_id`.
    ///
    /// Returns `Ok(None)` when the patient is missing or owned by someone else.
    ///
    /// # Errors
    /// `StoreError::PatientEmailTaken` if the new email belongs to another patient.
    pub fn update_scoped(
        &self,
        doctor_id: &str,
        patient_id: &str,
        changes: PatientChanges,
    ) -> StoreResult<Option<StoredPatient>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut patients = write_txn.open_table(PATIENTS)?;
            let existing: Option<StoredPatient> = read_record(&patients, patient_id)?;
            let Some(mut patient) = existing.scoped_to(doctor_id) else {
                return Ok(None);
            };

            if let Some(new_email) = changes.email.as_deref() {
                if new_email != patient.email {
                    let mut emails = write_txn.open_table(PATIENT_EMAILS)?;
                    if emails.get(new_email)?.is_some() {
                        return Err(StoreError::PatientEmailTaken(new_email.to_string()));
                    }
                    emails.remove(patient.email.as_str())?;
                    emails.insert(new_email, patient.id.as_str())?;
                }
            }

            changes.apply(&mut patient);
            patient.updated_at = Utc::now();
            patients.insert(patient.id.as_str(), encode_record(&patient)?.as_slice())?;
            patient
        };
        write_txn.commit()?;

        tracing::info!(doctor_id, patient_id, "Patient updated");
        Ok(Some(updated))
    }

    /// Store a tumor prediction made from `analysed_image`.
    ///
    /// Only `tumor_detected` and `tumor_type` are written. The stored scan
    /// image must still be `analysed_image`, otherwise the result belongs to
    /// a scan that no longer exists and nothing is written.
    ///
    /// Returns `Ok(None)` when the patient is missing or owned by someone else.
    ///
    /// # Errors
    /// `StoreError::ScanImageChanged` if the scan image was replaced meanwhile.
    pub fn record_tumor_result(
        &self,
        doctor_id: &str,
        patient_id: &str,
        analysed_image: &str,
        tumor_detected: bool,
        tumor_type: &str,
    ) -> StoreResult<Option<StoredPatient>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut patients = write_txn.open_table(PATIENTS)?;
            let existing: Option<StoredPatient> = read_record(&patients, patient_id)?;
            let Some(mut patient) = existing.scoped_to(doctor_id) else {
                return Ok(None);
            };

            let scan = match patient.brain_scan.as_mut() {
                Some(scan) if scan.scan_image.as_deref() == Some(analysed_image) => scan,
                _ => return Err(StoreError::ScanImageChanged(patient_id.to_string())),
            };
            scan.tumor_detected = Some(tumor_detected);
            scan.tumor_type = Some(tumor_type.to_string());

            patient.updated_at = Utc::now();
            patients.insert(patient.id.as_str(), encode_record(&patient)?.as_slice())?;
            patient
        };
        write_txn.commit()?;

        tracing::info!(doctor_id, patient_id, tumor_detected, "Tumor result recorded");
        Ok(Some(updated))
    }

    /// Delete a patient owned by `doctor_id` and unlink it from the doctor.
    ///
    /// Returns `Ok(false)` when the patient is missing or owned by someone else.
    pub fn delete_scoped(&self, doctor_id: &str, patient_id: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        {
            let mut patients = write_txn.open_table(PATIENTS)?;
            let existing: Option<StoredPatient> = read_record(&patients, patient_id)?;
            let Some(patient) = existing.scoped_to(doctor_id) else {
                return Ok(false);
            };

            patients.remove(patient.id.as_str())?;

            let mut emails = write_txn.open_table(PATIENT_EMAILS)?;
            emails.remove(patient.email.as_str())?;

            let mut doctors = write_txn.open_table(DOCTORS)?;
            let owner: Option<StoredDoctor> = read_record(&doctors, doctor_id)?;
            match owner {
                Some(mut doctor) => {
                    unlink_patient(&mut doctor, &patient.id);
                    doctors.insert(doctor.id.as_str(), encode_record(&doctor)?.as_slice())?;
                }
                None => {
                    tracing::warn!(doctor_id, patient_id, "Owner record missing during delete");
                }
            }
        }
        write_txn.commit()?;

        tracing::info!(doctor_id, patient_id, "Patient deleted");
        Ok(true)
    }
}

/// Accept either RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
///
/// HTML date inputs send the latter; plain dates are stored as midnight UTC.
mod flexible_date {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let raw = raw.trim();

        if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Some(timestamp.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Some(naive.and_utc()))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
    }
}

#[cfg(test)]
impl StoredPatient {
    pub(crate) fn sample(doctor_id: &str, email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Jane Roe".to_string(),
            email: email.to_string(),
            age: 67,
            gender: "female".to_string(),
            brain_scan: Some(BrainScan {
                scan_type: Some("MRI".to_string()),
                scan_image: Some("https://blobs.test/scan-1.png".to_string()),
                ..Default::default()
            }),
            alzheimer_biomarkers: vec!["amyloid-beta".to_string()],
            cognitive_tests: vec![CognitiveTest {
                test_name: Some("MoCA".to_string()),
                score: Some(24.0),
                interpretation: Some("Mild Cognitive Impairment".to_string()),
                ..Default::default()
            }],
            doctor: doctor_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
