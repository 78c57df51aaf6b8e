//! Device error types.
//!
//! Errors are categorized by who has to act on them:
//!
//! | Category | Variants | Recovery |
//! |----------|----------|----------|
//! | **Capacity** | `ResourceExhausted` | Release units or use a larger device |
//! | **Backend** | `Backend` | Backend-specific, surfaced at point of use |
//! | **Programming** | `InvalidOperation`, `InvalidArgument` | Fix the caller |
//! | **Config** | `Configuration` | Fix configuration |

use thiserror::Error;

/// Errors that can occur in qubit and device operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeviceError {
    /// The pool has no free unit at allocation time.
    #[error("No free qubit: all {capacity} qubits are allocated")]
    ResourceExhausted {
        /// Total number of units the device manages.
        capacity: u32,
    },

    /// The underlying resource could not be prepared or operated on.
    #[error("Backend error: {0}")]
    Backend(String),

    /// An operation was invoked with an incompatible argument,
    /// e.g. `swap` against a unit of another device.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A unit was handed back that this device does not own, or that was
    /// already released.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Device configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DeviceError {
    /// Returns `true` if this error is a logic fault in the calling code.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, Self::InvalidOperation(_) | Self::InvalidArgument(_))
    }

    /// Returns `true` if the pool ran out of units.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Self::ResourceExhausted { .. })
    }
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
