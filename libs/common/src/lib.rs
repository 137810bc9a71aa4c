//! Common library for the VoyageX platform
//!
//! This crate provides shared infrastructure used across VoyageX services:
//! PostgreSQL connectivity and the error types that go with it.

pub mod database;
pub mod error;
