// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the record database.
//!
//! Each repository provides CRUD operations for a specific entity type,
//! borrowing the shared `ClinicDatabase` for all transactions.

pub mod doctors;
pub mod patients;

pub use doctors::{DoctorRepository, StoredDoctor};
pub use patients::{BrainScan, CognitiveTest, PatientChanges, PatientRepository, StoredPatient};
