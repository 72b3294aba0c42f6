// src/models.rs

pub mod auth;
pub mod custody;
pub mod inventory;
