// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded record database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `doctors`: doctor_id → serialized StoredDoctor
//! - `doctor_emails`: email → doctor_id (uniqueness index)
//! - `patients`: patient_id → serialized StoredPatient
//! - `patient_emails`: email → patient_id (uniqueness index)
//!
//! Every multi-record mutation (patient create/delete plus the owning
//! doctor's patient list) runs inside a single write transaction, so a
//! failure part-way leaves nothing behind.

use std::path::Path;

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: doctor_id → StoredDoctor (JSON bytes).
pub(crate) const DOCTORS: TableDefinition<&str, &[u8]> = TableDefinition::new("doctors");

/// Index: email (case-sensitive) → doctor_id.
pub(crate) const DOCTOR_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("doctor_emails");

/// Primary table: patient_id → StoredPatient (JSON bytes).
pub(crate) const PATIENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("patients");

/// Index: email → patient_id.
pub(crate) const PATIENT_EMAILS: TableDefinition<&str, &str> =
    TableDefinition::new("patient_emails");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("a doctor with email {0} already exists")]
    DoctorEmailTaken(String),

    #[error("a patient with email {0} already exists")]
    PatientEmailTaken(String),

    #[error("doctor {0} not found")]
    DoctorNotFound(String),

    #[error("brain scan image of patient {0} changed")]
    ScanImageChanged(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Record Helpers
// =============================================================================

/// Read and decode a JSON record from any readable table.
pub(crate) fn read_record<T, R>(table: &R, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Decode every JSON record of a table.
pub(crate) fn read_all_records<T, R>(table: &R) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_slice(value.value())?);
    }
    Ok(records)
}

/// Serialize a record to the JSON bytes stored in the primary tables.
pub(crate) fn encode_record<T: Serialize>(record: &T) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

// =============================================================================
// ClinicDatabase
// =============================================================================

/// Embedded ACID store for doctors and patients.
pub struct ClinicDatabase {
    db: Database,
}

impl ClinicDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DOCTORS)?;
            let _ = write_txn.open_table(DOCTOR_EMAILS)?;
            let _ = write_txn.open_table(PATIENTS)?;
            let _ = write_txn.open_table(PATIENT_EMAILS)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Record database opened");
        Ok(Self { db })
    }

    pub(crate) fn begin_read(&self) -> StoreResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    pub(crate) fn begin_write(&self) -> StoreResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Cheap liveness probe: open a read transaction and touch a table.
    pub fn check(&self) -> StoreResult<()> {
        let read_txn = self.begin_read()?;
        let _ = read_txn.open_table(DOCTORS)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn temp_db() -> (ClinicDatabase, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = ClinicDatabase::open(&dir.path().join("test.redb")).unwrap();
    (db, dir)
}
