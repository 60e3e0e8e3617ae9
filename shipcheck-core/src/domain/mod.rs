//! Core domain types
//!
//! Structures observed from the cloud build service and shared between the
//! HTTP client (which decodes them) and the harness (which polls them).

pub mod build;
