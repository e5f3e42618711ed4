//! Domain error type and exit-code mapping.
//!
//! Four kinds mirror the taxonomy a build can fail under: parameter/config
//! validation, reference input problems, capacity exhaustion during
//! construction, and integrity violations found while decompressing. Each
//! carries operator-facing text; capacity errors should include actionable
//! guidance (a flag to retry with, or which knob to raise) wherever one is
//! known at the call site.

use std::fmt;

#[derive(Debug, Clone)]
pub enum BuildError {
    Validation(String),
    Input(String),
    Capacity(String),
    DecompressIntegrity(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Validation(msg) => write!(f, "validation error: {msg}"),
            BuildError::Input(msg) => write!(f, "input error: {msg}"),
            BuildError::Capacity(msg) => write!(f, "capacity error: {msg}"),
            BuildError::DecompressIntegrity(msg) => write!(f, "decompression integrity error: {msg}"),
        }
    }
}

impl std::error::Error for BuildError {}

impl BuildError {
    /// Process exit code per the external-interfaces contract: 1 for
    /// validation/input errors, 3 for capacity/decompression/internal errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Validation(_) | BuildError::Input(_) => 1,
            BuildError::Capacity(_) | BuildError::DecompressIntegrity(_) => 3,
        }
    }
}
