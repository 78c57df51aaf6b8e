//! Device capability introspection.
//!
//! This module defines the types that describe what a device offers: how many
//! units its pool holds, which qubit operations it implements natively, and
//! whether it is a simulator. Callers use these to size their scopes before
//! asking for units.
//!
//! - [`Capabilities`]: top-level device descriptor
//! - [`OperationSet`]: supported qubit operations (OpenQASM 3 naming)

use serde::{Deserialize, Serialize};

/// Capabilities of a quantum device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the device.
    pub name: String,
    /// Number of units in the pool.
    pub num_qubits: u32,
    /// Supported qubit operations.
    pub operations: OperationSet,
    /// Whether this is a simulator (not real hardware).
    pub is_simulator: bool,
    /// Additional features supported by this device.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Capabilities {
    /// Create capabilities for a simulator.
    pub fn simulator(num_qubits: u32) -> Self {
        Self {
            name: "simulator".into(),
            num_qubits,
            operations: OperationSet::standard(),
            is_simulator: true,
            features: vec!["statevector".into(), "seedable".into()],
        }
    }

    /// Create capabilities for a hardware register.
    pub fn hardware(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            operations: OperationSet::standard(),
            is_simulator: false,
            features: vec![],
        }
    }

    /// Override the device name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Restrict the native operation list.
    pub fn with_native(mut self, native: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.operations.native = native.into_iter().map(Into::into).collect();
        self
    }
}

/// Qubit operations supported by a device.
///
/// Every conforming device supports the full [`crate::Qubit`] surface.
/// The `native` list names operations that execute without decomposition.
/// If `native` is empty, all supported operations are considered native
/// (typical for simulators).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSet {
    /// Single-qubit gates.
    pub single_qubit: Vec<String>,
    /// Two-qubit operations.
    pub two_qubit: Vec<String>,
    /// Non-unitary operations.
    pub non_unitary: Vec<String>,
    /// Native operations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub native: Vec<String>,
}

impl OperationSet {
    /// The operation set every [`crate::Qubit`] implements.
    pub fn standard() -> Self {
        Self {
            single_qubit: vec!["h".into(), "x".into(), "y".into(), "z".into(), "ry".into()],
            two_qubit: vec!["swap".into()],
            non_unitary: vec!["measure".into(), "reset".into()],
            native: vec![],
        }
    }

    /// Check if an operation is supported.
    pub fn contains(&self, op: &str) -> bool {
        self.single_qubit.iter().any(|o| o == op)
            || self.two_qubit.iter().any(|o| o == op)
            || self.non_unitary.iter().any(|o| o == op)
    }

    /// Check if an operation is native (executes without decomposition).
    pub fn is_native(&self, op: &str) -> bool {
        if self.native.is_empty() {
            self.contains(op)
        } else {
            self.native.iter().any(|o| o == op)
        }
    }
}
