//! Core library for the cp-core CLI.
//!
//! The resolution engine lives in cp-config; this crate adds the host-facing
//! pieces around it.

pub mod capabilities;
pub mod exit_codes;
pub mod logging;

pub use capabilities::SystemGpuProbe;
pub use exit_codes::ExitCode;
