//! The quantum device capability.
//!
//! A [`QuantumDevice`] owns a finite pool of [`Qubit`]s. Implementations
//! provide two primitives, allocation and deallocation. The trait builds
//! the scoped-acquisition helpers on top of those primitives and the
//! qubit's `reset()`:
//!
//! ```text
//!   allocate_qubit() ──→ body(&mut qubit) ──→ reset() ──→ deallocate_qubit()
//!                                          (every exit path, exactly once)
//! ```
//!
//! ## Method table
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | introspection | yes | `&str` |
//! | `capabilities()` | introspection | yes | `&Capabilities` |
//! | `allocate_qubit()` | primitive | yes | `DeviceResult<Self::Qubit>` |
//! | `deallocate_qubit()` | primitive | yes | `DeviceResult<()>` |
//! | `scoped_qubit()` | guard | provided | `DeviceResult<ScopedQubit>` |
//! | `scoped_register()` | guard | provided | `DeviceResult<ScopedRegister>` |
//! | `using_qubit()` | closure | provided | `Result<T, E>` |
//! | `using_register()` | closure | provided | `Result<T, E>` |
//!
//! ## Example
//!
//! ```
//! use qubit_contract::{DeviceResult, QuantumDevice, Qubit, StateVectorDevice};
//!
//! let mut device = StateVectorDevice::new(2);
//! let bit = device.using_qubit(|q| -> DeviceResult<bool> {
//!     q.x()?;
//!     q.measure()
//! })?;
//! assert!(bit);
//! assert_eq!(device.free_qubits(), 2);
//! # Ok::<(), qubit_contract::DeviceError>(())
//! ```

use tracing::warn;

use crate::capability::Capabilities;
use crate::error::{DeviceError, DeviceResult};
use crate::qubit::Qubit;
use crate::scope::{ScopedQubit, ScopedRegister};

/// A pool of controllable quantum units.
///
/// # Contract
///
/// - `capabilities()` MUST be synchronous and infallible, cached at
///   construction time.
/// - `allocate_qubit()` MUST hand out a unit in the canonical state, or fail
///   with [`DeviceError::ResourceExhausted`] when the pool is empty, or
///   [`DeviceError::Backend`] when the unit cannot be prepared.
/// - `deallocate_qubit()` MUST reject a unit this device does not currently
///   own with [`DeviceError::InvalidArgument`], leaving the pool untouched.
/// - Devices do not reset on deallocation: callers reset first. The scoped
///   helpers always do.
/// - Dropping a unit without deallocating it is a caller error. A backend
///   SHOULD reclaim the slot and log it rather than shrink the pool for
///   good. A unit that outlives its device SHOULD fail every operation
///   except `reset()` with [`DeviceError::Backend`].
pub trait QuantumDevice {
    /// The unit type this device hands out.
    type Qubit: Qubit;

    /// Get the name of this device.
    fn name(&self) -> &str;

    /// Get the capabilities of this device.
    fn capabilities(&self) -> &Capabilities;

    /// Take one unit from the pool, in the canonical state.
    fn allocate_qubit(&mut self) -> DeviceResult<Self::Qubit>;

    /// Return a previously allocated unit to the pool.
    fn deallocate_qubit(&mut self, qubit: Self::Qubit) -> DeviceResult<()>;

    /// Allocate one unit behind a guard that resets and releases it on drop.
    fn scoped_qubit(&mut self) -> DeviceResult<ScopedQubit<'_, Self>>
    where
        Self: Sized,
    {
        ScopedQubit::acquire(self)
    }

    /// Allocate `n_qubits` units behind a guard that resets and releases all
    /// of them on drop.
    ///
    /// Allocation is all-or-nothing: if any allocation fails, the units
    /// already taken by this call are released before the error is returned.
    fn scoped_register(&mut self, n_qubits: usize) -> DeviceResult<ScopedRegister<'_, Self>>
    where
        Self: Sized,
    {
        ScopedRegister::acquire(self, n_qubits)
    }

    /// Run `body` with one freshly allocated unit.
    ///
    /// The unit is reset and deallocated when `body` returns, whether it
    /// succeeded, failed, or panicked. If `body` succeeds but the release
    /// fails, the release error is returned. If both fail, `body`'s error
    /// wins and the release error is logged.
    fn using_qubit<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&mut Self::Qubit) -> Result<T, E>,
        E: From<DeviceError>,
    {
        let mut scope = self.scoped_qubit()?;
        let outcome = body(&mut *scope);
        settle(outcome, scope.release())
    }

    /// Run `body` with `n_qubits` freshly allocated units, in allocation
    /// order.
    ///
    /// If allocation fails, `body` never runs. Otherwise every unit is reset
    /// and deallocated when `body` returns, with the same error precedence
    /// as [`QuantumDevice::using_qubit`].
    fn using_register<T, E, F>(&mut self, n_qubits: usize, body: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&mut [Self::Qubit]) -> Result<T, E>,
        E: From<DeviceError>,
    {
        let mut scope = self.scoped_register(n_qubits)?;
        let outcome = body(&mut *scope);
        settle(outcome, scope.release())
    }
}

/// Combine a scope body's outcome with the result of releasing its units.
fn settle<T, E>(outcome: Result<T, E>, released: DeviceResult<()>) -> Result<T, E>
where
    E: From<DeviceError>,
{
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(release_err)) => {
            warn!("Release failed after scope body error: {}", release_err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Allocate(u32),
        Op(u32, &'static str),
        Reset(u32),
        Deallocate(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct RecordingQubit {
        id: u32,
        log: Log,
    }

    impl RecordingQubit {
        fn record(&self, op: &'static str) -> DeviceResult<()> {
            self.log.borrow_mut().push(Event::Op(self.id, op));
            Ok(())
        }
    }

    impl Qubit for RecordingQubit {
        fn swap(&mut self, other: &mut Self) -> DeviceResult<()> {
            if !Rc::ptr_eq(&self.log, &other.log) {
                return Err(DeviceError::InvalidOperation("foreign qubit".into()));
            }
            self.record("swap")
        }

        fn h(&mut self) -> DeviceResult<()> {
            self.record("h")
        }

        fn x(&mut self) -> DeviceResult<()> {
            self.record("x")
        }

        fn y(&mut self) -> DeviceResult<()> {
            self.record("y")
        }

        fn z(&mut self) -> DeviceResult<()> {
            self.record("z")
        }

        fn ry(&mut self, _angle: f64) -> DeviceResult<()> {
            self.record("ry")
        }

        fn measure(&mut self) -> DeviceResult<bool> {
            self.record("measure")?;
            Ok(false)
        }

        fn reset(&mut self) {
            self.log.borrow_mut().push(Event::Reset(self.id));
        }
    }

    /// Device that logs every call and can fail a chosen allocation.
    struct RecordingDevice {
        capabilities: Capabilities,
        log: Log,
        next_id: u32,
        allocations: usize,
        /// 1-indexed allocation that fails with a backend error.
        fail_at: Option<usize>,
        /// Deallocation of this unit id is rejected.
        reject_release_of: Option<u32>,
    }

    impl RecordingDevice {
        fn new() -> Self {
            Self {
                capabilities: Capabilities::simulator(16).with_name("recording"),
                log: Rc::default(),
                next_id: 0,
                allocations: 0,
                fail_at: None,
                reject_release_of: None,
            }
        }

        fn failing_at(allocation: usize) -> Self {
            Self {
                fail_at: Some(allocation),
                ..Self::new()
            }
        }

        fn events(&self) -> Vec<Event> {
            self.log.borrow().clone()
        }

        fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
            self.log.borrow().iter().filter(|e| pred(e)).count()
        }
    }

    impl QuantumDevice for RecordingDevice {
        type Qubit = RecordingQubit;

        fn name(&self) -> &str {
            &self.capabilities.name
        }

        fn capabilities(&self) -> &Capabilities {
            &self.capabilities
        }

        fn allocate_qubit(&mut self) -> DeviceResult<RecordingQubit> {
            self.allocations += 1;
            if self.fail_at == Some(self.allocations) {
                return Err(DeviceError::Backend("calibration lost".into()));
            }
            let id = self.next_id;
            self.next_id += 1;
            self.log.borrow_mut().push(Event::Allocate(id));
            Ok(RecordingQubit {
                id,
                log: Rc::clone(&self.log),
            })
        }

        fn deallocate_qubit(&mut self, qubit: RecordingQubit) -> DeviceResult<()> {
            if self.reject_release_of == Some(qubit.id) {
                return Err(DeviceError::InvalidArgument(format!(
                    "qubit {} is not owned",
                    qubit.id
                )));
            }
            self.log.borrow_mut().push(Event::Deallocate(qubit.id));
            Ok(())
        }
    }

    #[derive(Debug, PartialEq)]
    enum AppError {
        Device(String),
        Body(&'static str),
    }

    impl From<DeviceError> for AppError {
        fn from(err: DeviceError) -> Self {
            AppError::Device(err.to_string())
        }
    }

    #[test]
    fn test_using_qubit_call_order() {
        let mut device = RecordingDevice::new();
        let bit = device
            .using_qubit(|q| -> DeviceResult<bool> {
                q.h()?;
                q.measure()
            })
            .unwrap();

        assert!(!bit);
        assert_eq!(
            device.events(),
            vec![
                Event::Allocate(0),
                Event::Op(0, "h"),
                Event::Op(0, "measure"),
                Event::Reset(0),
                Event::Deallocate(0),
            ]
        );
    }

    #[test]
    fn test_using_qubit_body_error_still_releases() {
        let mut device = RecordingDevice::new();
        let result: Result<(), AppError> = device.using_qubit(|q| {
            q.x()?;
            Err(AppError::Body("boom"))
        });

        assert_eq!(result, Err(AppError::Body("boom")));
        assert_eq!(
            device.events(),
            vec![
                Event::Allocate(0),
                Event::Op(0, "x"),
                Event::Reset(0),
                Event::Deallocate(0),
            ]
        );
    }

    #[test]
    fn test_using_qubit_allocation_failure_skips_body() {
        let mut device = RecordingDevice::failing_at(1);
        let mut ran = false;
        let result: DeviceResult<()> = device.using_qubit(|_| {
            ran = true;
            Ok(())
        });

        assert!(matches!(result, Err(DeviceError::Backend(_))));
        assert!(!ran);
        assert!(device.events().is_empty());
    }

    #[test]
    fn test_using_qubit_release_error_surfaces_on_success() {
        let mut device = RecordingDevice::new();
        device.reject_release_of = Some(0);
        let result: DeviceResult<u8> = device.using_qubit(|_| Ok(7));
        assert!(matches!(result, Err(DeviceError::InvalidArgument(_))));
    }

    #[test]
    fn test_using_qubit_body_error_wins_over_release_error() {
        let mut device = RecordingDevice::new();
        device.reject_release_of = Some(0);
        let result: Result<(), AppError> = device.using_qubit(|_| Err(AppError::Body("first")));
        assert_eq!(result, Err(AppError::Body("first")));
        assert_eq!(device.count(|e| matches!(e, Event::Reset(0))), 1);
    }

    #[test]
    fn test_using_register_releases_every_unit() {
        let mut device = RecordingDevice::new();
        let len = device
            .using_register(3, |qubits| -> DeviceResult<usize> {
                let (first, rest) = qubits.split_at_mut(1);
                first[0].swap(&mut rest[1])?;
                Ok(qubits.len())
            })
            .unwrap();

        assert_eq!(len, 3);
        assert_eq!(device.count(|e| matches!(e, Event::Allocate(_))), 3);
        for id in 0..3 {
            assert_eq!(device.count(|e| *e == Event::Reset(id)), 1);
            assert_eq!(device.count(|e| *e == Event::Deallocate(id)), 1);
        }
        assert_eq!(device.events()[3], Event::Op(0, "swap"));
    }

    #[test]
    fn test_using_register_resets_before_deallocating() {
        let mut device = RecordingDevice::new();
        let _: DeviceResult<()> = device.using_register(2, |_| Ok(()));

        let events = device.events();
        for id in 0..2 {
            let reset = events.iter().position(|e| *e == Event::Reset(id)).unwrap();
            let dealloc = events
                .iter()
                .position(|e| *e == Event::Deallocate(id))
                .unwrap();
            assert!(reset < dealloc);
        }
    }

    #[test]
    fn test_using_register_body_error_releases_every_unit() {
        let mut device = RecordingDevice::new();
        let result: Result<(), AppError> = device.using_register(4, |qubits| {
            qubits[2].z()?;
            Err(AppError::Body("halfway"))
        });

        assert_eq!(result, Err(AppError::Body("halfway")));
        assert_eq!(device.count(|e| matches!(e, Event::Reset(_))), 4);
        assert_eq!(device.count(|e| matches!(e, Event::Deallocate(_))), 4);
    }

    #[test]
    fn test_using_register_partial_allocation_rolls_back() {
        const K: usize = 5;
        for j in 1..=K {
            // The j-th allocation fails: j - 1 units were taken and must come back.
            let mut device = RecordingDevice::failing_at(j);
            let mut ran = false;
            let result: Result<(), AppError> = device.using_register(K, |_| {
                ran = true;
                Ok(())
            });

            assert_eq!(
                result,
                Err(AppError::Device("Backend error: calibration lost".into())),
                "j = {j}"
            );
            assert!(!ran, "body ran when allocation {j} failed");
            assert_eq!(device.count(|e| matches!(e, Event::Allocate(_))), j - 1);
            assert_eq!(device.count(|e| matches!(e, Event::Op(..))), 0);
            for id in 0..(j - 1) as u32 {
                assert_eq!(device.count(|e| *e == Event::Reset(id)), 1, "j = {j}");
                assert_eq!(device.count(|e| *e == Event::Deallocate(id)), 1, "j = {j}");
            }
            assert_eq!(device.count(|e| matches!(e, Event::Reset(_))), j - 1);
            assert_eq!(device.count(|e| matches!(e, Event::Deallocate(_))), j - 1);
            if j == 1 {
                assert!(device.events().is_empty());
            }
        }
    }

    #[test]
    fn test_using_register_rejects_empty_request() {
        let mut device = RecordingDevice::new();
        let result: DeviceResult<()> = device.using_register(0, |_| Ok(()));
        assert!(matches!(result, Err(DeviceError::InvalidArgument(_))));
        assert!(device.events().is_empty());
    }

    #[test]
    fn test_using_register_release_continues_past_failure() {
        let mut device = RecordingDevice::new();
        device.reject_release_of = Some(1);
        let result: DeviceResult<()> = device.using_register(3, |_| Ok(()));

        assert!(matches!(result, Err(DeviceError::InvalidArgument(_))));
        assert_eq!(device.count(|e| matches!(e, Event::Reset(_))), 3);
        assert_eq!(device.count(|e| *e == Event::Deallocate(0)), 1);
        assert_eq!(device.count(|e| *e == Event::Deallocate(2)), 1);
    }

    #[test]
    fn test_device_introspection() {
        let device = RecordingDevice::new();
        assert_eq!(device.name(), "recording");
        assert_eq!(device.capabilities().num_qubits, 16);
    }
}
