// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership scoping for patient records.
//!
//! Every patient read or write is filtered through the requesting doctor's
//! identity. A record owned by someone else is reported exactly like a record
//! that does not exist: the scoped lookup returns `None`, never a distinct
//! "forbidden" outcome, so callers cannot probe for other doctors' patients.

/// Trait for records bound to an owning doctor.
pub trait OwnedRecord {
    /// The owning doctor's ID.
    fn owner_doctor_id(&self) -> &str;

    /// Whether `doctor_id` owns this record.
    fn is_owned_by(&self, doctor_id: &str) -> bool {
        self.owner_doctor_id() == doctor_id
    }
}

/// Narrow a lookup result to the records a doctor owns.
pub trait OwnershipScope<T> {
    /// Keep the record only if `doctor_id` owns it.
    fn scoped_to(self, doctor_id: &str) -> Option<T>;
}

impl<T: OwnedRecord> OwnershipScope<T> for Option<T> {
    fn scoped_to(self, doctor_id: &str) -> Option<T> {
        self.filter(|record| record.is_owned_by(doctor_id))
    }
}
