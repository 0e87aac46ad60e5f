//! Host-boundary error type.
//!
//! The hardware model itself never faults: undefined opcodes act as NOP,
//! divide-by-zero yields 0, reserved-register writes are dropped, addresses
//! wrap. `SimError` exists only for the handful of things a *host* cares
//! about that the architecture has no notion of: a kernel that never
//! signals completion, and a ROM image that can't be loaded.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// `step_count` exceeded the configured cycle budget without `done()`.
    #[error("kernel did not complete within {cycles} cycles")]
    Timeout { cycles: u64 },

    /// A host-visible misconfiguration, e.g. `start()` pulsed with
    /// `thread_count == 0`.
    #[error("misconfigured kernel launch: {0}")]
    Misconfigured(String),

    /// A ROM image could not be parsed into 16-bit instructions.
    #[error("malformed ROM image: {0}")]
    MalformedRom(String),
}
