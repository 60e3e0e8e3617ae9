//! Scheduler layer for the harness
//!
//! Paces repeated queries against the build service. The only schedule the
//! harness needs is the fixed-interval, bounded wait for a triggered build.

pub mod poller;

pub use poller::{BuildPoller, PollError, PollPolicy};
