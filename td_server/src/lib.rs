//! HTTP front end for the taskdeck credential lifecycle and task resource.
//!
//! The binary in `main.rs` wires these modules together; they are exposed as a library so
//! integration tests can drive the router without a network listener.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
