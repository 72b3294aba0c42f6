// src/lib.rs

//! Custody and inventory core for a material recovery facility: vehicles are
//! weighed in and out, material is sorted into categories, and the stock
//! ledger stays consistent with every completed weighing and sorting log.
//!
//! The HTTP layer, credential verification and file storage are external
//! collaborators; this crate exposes the service API they call.

pub mod common;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
