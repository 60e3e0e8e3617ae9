//! Shipcheck Core
//!
//! Core types shared by the shipcheck crates.
//!
//! This crate contains:
//! - Domain types: builds and their statuses as observed from the build service
//! - DTOs: response envelopes of the build API

pub mod domain;
pub mod dto;
