// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Record Storage Module
//!
//! This module provides persistent storage for doctors and patients in an
//! embedded redb database (single file under `DATA_DIR`).
//!
//! ## Consistency Model
//!
//! - Doctor and patient emails are unique; the store enforces it inside the
//!   same write transaction that inserts the record
//! - Patient access is always scoped to the owning doctor (`ownership`)
//! - A doctor's patient list is updated in the same transaction as the
//!   patient create/delete (`relationship`)
//! - Concurrent writes are serialised by redb; the last committed update of
//!   a patient wins

pub mod database;
pub mod ownership;
pub mod relationship;
pub mod repository;

pub use database::{ClinicDatabase, StoreError, StoreResult};
pub use ownership::{OwnedRecord, OwnershipScope};
pub use relationship::{reconcile, RepairedLinks};
pub use repository::{
    BrainScan, CognitiveTest, DoctorRepository, PatientChanges, PatientRepository, StoredDoctor,
    StoredPatient,
};
