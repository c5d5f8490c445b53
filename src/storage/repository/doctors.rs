// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Doctor repository (credential store).
//!
//! Doctors are keyed by a UUID and indexed by email. Registration checks and
//! claims the email inside one write transaction, so two concurrent signups
//! with the same address cannot both succeed.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use crate::storage::database::{
    encode_record, read_record, ClinicDatabase, StoreError, StoreResult, DOCTORS, DOCTOR_EMAILS,
};

/// Doctor account as persisted.
///
/// `secret` holds whatever the configured credential verifier chose to store.
/// With the default plaintext verifier that is the password itself; it must
/// never leave the service (see `DoctorProfile`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredDoctor {
    /// Unique doctor identifier (UUID)
    pub id: String,
    pub name: String,
    /// Login email, unique and compared case-sensitively
    pub email: String,
    pub secret: String,
    pub specialty: String,
    /// IDs of the patients this doctor owns, in creation order
    #[serde(default)]
    pub patients: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredDoctor {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        secret: impl Into<String>,
        specialty: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
            secret: secret.into(),
            specialty: specialty.into(),
            patients: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Repository for doctor accounts.
pub struct DoctorRepository<'a> {
    db: &'a ClinicDatabase,
}

impl<'a> DoctorRepository<'a> {
    /// Create a new DoctorRepository.
    pub fn new(db: &'a ClinicDatabase) -> Self {
        Self { db }
    }

    /// Register a new doctor.
    ///
    /// # Errors
    /// `StoreError::DoctorEmailTaken` if the email is already registered.
    pub fn register(&self, doctor: &StoredDoctor) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut emails = write_txn.open_table(DOCTOR_EMAILS)?;
            if emails.get(doctor.email.as_str())?.is_some() {
                return Err(StoreError::DoctorEmailTaken(doctor.email.clone()));
            }

            let mut doctors = write_txn.open_table(DOCTORS)?;
            doctors.insert(doctor.id.as_str(), encode_record(doctor)?.as_slice())?;
            emails.insert(doctor.email.as_str(), doctor.id.as_str())?;
        }
        write_txn.commit()?;

        tracing::info!(doctor_id = %doctor.id, "Doctor registered");
        Ok(())
    }

    /// Get a doctor by ID.
    pub fn get(&self, doctor_id: &str) -> StoreResult<Option<StoredDoctor>> {
        let read_txn = self.db.begin_read()?;
        let doctors = read_txn.open_table(DOCTORS)?;
        read_record(&doctors, doctor_id)
    }

    /// Find a doctor by exact email.
    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<StoredDoctor>> {
        let read_txn = self.db.begin_read()?;
        let emails = read_txn.open_table(DOCTOR_EMAILS)?;
        let doctor_id = match emails.get(email)? {
            Some(id) => id.value().to_string(),
            None => return Ok(None),
        };

        let doctors = read_txn.open_table(DOCTORS)?;
        read_record(&doctors, &doctor_id)
    }
}
