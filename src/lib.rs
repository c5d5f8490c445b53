// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clinic Records Server - doctor-scoped patient records
//!
//! This crate provides an HTTP service where doctors sign up, log in with a
//! one-hour bearer token, and manage the patient records they own. Scan
//! analysis is forwarded to external inference endpoints.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token issuance, validation and the request gate
//! - `config` - Environment configuration
//! - `inference` - Outbound client for detection models
//! - `storage` - Embedded record store (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod state;
pub mod storage;
