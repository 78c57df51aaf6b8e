//! The qubit capability.
//!
//! A [`Qubit`] is one controllable two-state unit held by exactly one
//! device. The trait exposes behaviour only: amplitudes or physical
//! registers belong to the implementing backend.
//!
//! ## Method table
//!
//! | Method | Fallible | Effect |
//! |--------|----------|--------|
//! | `swap()` | yes | exchange state with another unit of the same device |
//! | `h()`, `x()`, `y()`, `z()` | yes | fixed single-qubit transformation |
//! | `ry()` | yes | rotation about Y by `angle` radians |
//! | `measure()` | yes | projective measurement, collapses state |
//! | `reset()` | no | return to the canonical state `|0⟩` |
//! | `apply()` | provided | dispatch a [`SingleQubitGate`] |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};

/// A controllable two-state quantum unit.
///
/// # Contract
///
/// - Gate operations return `Ok(())` or a [`DeviceError::Backend`] raised at
///   the point of use; they never report a result value.
/// - `swap()` MUST reject a unit that does not belong to the same device
///   with [`DeviceError::InvalidOperation`].
/// - `ry()` accepts any finite angle and MUST reject non-finite angles
///   with [`DeviceError::InvalidOperation`].
/// - `reset()` MUST succeed unconditionally. It runs during scope cleanup,
///   where there is nobody left to report a failure to. A backend that
///   cannot reset reliably reports the fault on the next use instead.
pub trait Qubit {
    /// Exchange the quantum state held by this unit with `other`.
    fn swap(&mut self, other: &mut Self) -> DeviceResult<()>;

    /// Apply a Hadamard transformation.
    fn h(&mut self) -> DeviceResult<()>;

    /// Apply a Pauli-X transformation.
    fn x(&mut self) -> DeviceResult<()>;

    /// Apply a Pauli-Y transformation.
    fn y(&mut self) -> DeviceResult<()>;

    /// Apply a Pauli-Z transformation.
    fn z(&mut self) -> DeviceResult<()>;

    /// Rotate about the Y axis by `angle` radians.
    fn ry(&mut self, angle: f64) -> DeviceResult<()>;

    /// Measure in the computational basis.
    ///
    /// The measurement is irreversible: the unit's state collapses to the
    /// observed outcome and is not meaningful until reset or reprepared.
    fn measure(&mut self) -> DeviceResult<bool>;

    /// Return the unit to its canonical starting state.
    fn reset(&mut self);

    /// Apply a single-qubit gate given as data.
    fn apply(&mut self, gate: SingleQubitGate) -> DeviceResult<()> {
        match gate {
            SingleQubitGate::H => self.h(),
            SingleQubitGate::X => self.x(),
            SingleQubitGate::Y => self.y(),
            SingleQubitGate::Z => self.z(),
            SingleQubitGate::Ry(angle) => self.ry(angle),
        }
    }
}

/// A single-qubit gate supported by every [`Qubit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SingleQubitGate {
    /// Hadamard.
    H,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
    /// Y rotation by an angle in radians.
    Ry(f64),
}

impl SingleQubitGate {
    /// OpenQASM 3 name of the gate.
    pub fn name(&self) -> &'static str {
        match self {
            SingleQubitGate::H => "h",
            SingleQubitGate::X => "x",
            SingleQubitGate::Y => "y",
            SingleQubitGate::Z => "z",
            SingleQubitGate::Ry(_) => "ry",
        }
    }
}

impl fmt::Display for SingleQubitGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleQubitGate::Ry(angle) => write!(f, "ry({angle})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Reject rotation angles a backend cannot act on.
pub fn check_angle(angle: f64) -> DeviceResult<f64> {
    if angle.is_finite() {
        Ok(angle)
    } else {
        Err(DeviceError::InvalidOperation(format!(
            "rotation angle must be finite, got {angle}"
        )))
    }
}
