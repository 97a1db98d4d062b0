//! Test Helper Utilities
//!
//! Shared fixtures and log capture for fungimap-validator integration tests

#![allow(dead_code)]

pub mod fixtures;
pub mod log_capture;

pub use fixtures::TestStorage;
