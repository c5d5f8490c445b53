// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Doctor → patient back-references.
//!
//! A doctor's `patients` list mirrors the `doctor` field of the patient
//! records. `PatientRepository` calls [`link_patient`] and
//! [`unlink_patient`] inside the same write transaction as the patient
//! insert/remove, so the two never diverge through the API.
//!
//! [`reconcile`] is the repair path for data that did not come through the
//! API (imports, restored backups): it rebuilds every doctor's list from the
//! patient table and reports what it changed.

use std::collections::BTreeMap;

use super::database::{
    encode_record, read_all_records, ClinicDatabase, StoreResult, DOCTORS, PATIENTS,
};
use super::repository::{StoredDoctor, StoredPatient};

/// Append `patient_id` to the doctor's list unless it is already there.
///
/// Returns `true` if the list changed.
pub fn link_patient(doctor: &mut StoredDoctor, patient_id: &str) -> bool {
    if doctor.patients.iter().any(|id| id == patient_id) {
        return false;
    }
    doctor.patients.push(patient_id.to_string());
    true
}

/// Remove every occurrence of `patient_id` from the doctor's list.
///
/// Returns the number of entries removed.
pub fn unlink_patient(doctor: &mut StoredDoctor, patient_id: &str) -> usize {
    let before = doctor.patients.len();
    doctor.patients.retain(|id| id != patient_id);
    before - doctor.patients.len()
}

/// A doctor whose patient list was rewritten by [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedLinks {
    pub doctor_id: String,
    /// Owned patients that were missing from the list
    pub added: Vec<String>,
    /// Entries that were stale, duplicated, or pointed at another doctor's patient
    pub removed: Vec<String>,
}

/// Rebuild every doctor's patient list from patient ownership.
///
/// The rebuilt list keeps the existing order for entries that stay and
/// appends missing patients by creation time. Runs in one write transaction.
pub fn reconcile(db: &ClinicDatabase) -> StoreResult<Vec<RepairedLinks>> {
    let mut repaired = Vec::new();

    let write_txn = db.begin_write()?;
    {
        let mut doctors_table = write_txn.open_table(DOCTORS)?;
        let patients_table = write_txn.open_table(PATIENTS)?;

        let mut patients: Vec<StoredPatient> = read_all_records(&patients_table)?;
        patients.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut owned: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for patient in &patients {
            owned
                .entry(patient.doctor.as_str())
                .or_default()
                .push(patient.id.as_str());
        }

        let doctors: Vec<StoredDoctor> = read_all_records(&doctors_table)?;
        for mut doctor in doctors {
            let expected = owned.get(doctor.id.as_str()).cloned().unwrap_or_default();

            let mut rebuilt: Vec<String> = Vec::with_capacity(expected.len());
            let mut removed = Vec::new();
            for id in &doctor.patients {
                if expected.contains(&id.as_str()) && !rebuilt.contains(id) {
                    rebuilt.push(id.clone());
                } else {
                    removed.push(id.clone());
                }
            }

            let mut added = Vec::new();
            for id in expected {
                if !rebuilt.iter().any(|existing| existing == id) {
                    rebuilt.push(id.to_string());
                    added.push(id.to_string());
                }
            }

            if added.is_empty() && removed.is_empty() {
                continue;
            }

            doctor.patients = rebuilt;
            doctors_table.insert(doctor.id.as_str(), encode_record(&doctor)?.as_slice())?;

            tracing::warn!(
                doctor_id = %doctor.id,
                added = added.len(),
                removed = removed.len(),
                "Repaired doctor patient list"
            );
            repaired.push(RepairedLinks {
                doctor_id: doctor.id,
                added,
                removed,
            });
        }
    }
    write_txn.commit()?;

    Ok(repaired)
}
