//! Qubit Contract — backend-neutral qubit and device capabilities
//!
//! This crate defines the interface between circuit-authoring code and
//! whatever actually holds the qubits: a hardware register, a simulator, or a
//! remote session. Call sites program against two traits and never name a
//! backend.
//!
//! # Overview
//!
//! - A [`Qubit`] trait for the operations a controllable unit supports
//! - A [`QuantumDevice`] trait for allocating and reclaiming units
//! - [`ScopedQubit`] / [`ScopedRegister`] guards that reset and release
//!   their units on every exit path
//! - [`Capabilities`] / [`OperationSet`] for device introspection
//! - [`DeviceError`] with categorized error variants
//! - [`StateVectorDevice`], an in-process reference implementation
//!
//! # Lifecycle
//!
//! ```text
//!   allocate_qubit() ──→ operate ──→ reset() ──→ deallocate_qubit()
//!    (scope entry)      (caller)        (scope exit, always)
//! ```
//!
//! A unit is never deallocated in an arbitrary state: the scoped helpers
//! reset it first, whether the caller's code returned normally, returned an
//! error, or panicked.
//!
//! ```
//! use qubit_contract::{DeviceResult, QuantumDevice, Qubit, StateVectorDevice};
//!
//! let mut device = StateVectorDevice::seeded(2, 7);
//! let parity = device.using_register(2, |qs| -> DeviceResult<bool> {
//!     qs[0].x()?;
//!     let (a, b) = qs.split_at_mut(1);
//!     a[0].swap(&mut b[0])?;
//!     Ok(qs[0].measure()? ^ qs[1].measure()?)
//! })?;
//! assert!(parity);
//! assert_eq!(device.free_qubits(), 2);
//! # Ok::<(), qubit_contract::DeviceError>(())
//! ```

pub mod capability;
pub mod config;
pub mod device;
pub mod error;
pub mod qubit;
pub mod scope;
pub mod simulator;

pub use capability::{Capabilities, OperationSet};
pub use config::DeviceConfig;
pub use device::QuantumDevice;
pub use error::{DeviceError, DeviceResult};
pub use qubit::{Qubit, SingleQubitGate};
pub use scope::{ScopedQubit, ScopedRegister};
pub use simulator::{SimulatedQubit, StateVectorDevice};
