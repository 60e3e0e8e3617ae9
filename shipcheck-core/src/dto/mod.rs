//! Wire types for the build API
//!
//! Response envelopes that only exist on the wire; the useful payloads are
//! unwrapped into domain types by the client.

pub mod build;
