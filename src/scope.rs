//! Scope guards for allocated units.
//!
//! A guard holds units on behalf of a caller and gives every one of them
//! back to its device exactly once: reset first, then deallocate. The
//! release happens in [`ScopedQubit::release`] / [`ScopedRegister::release`]
//! when the caller wants to see errors, and in `Drop` otherwise, which also
//! covers early returns and unwinding.
//!
//! Per-unit lifecycle inside a guard:
//!
//! ```text
//!   unallocated ──→ allocated(ready) ──→ allocated(in use)
//!                                              │
//!                     deallocated ←── reset-in-progress
//! ```

use std::ops::{Deref, DerefMut};

use tracing::{debug, error, warn};

use crate::device::QuantumDevice;
use crate::error::{DeviceError, DeviceResult};
use crate::qubit::Qubit;

// `qubit` is only `None` inside `release()` and `drop()`, both of which
// consume or end the guard, so `Deref` never observes it empty.
const HELD: &str = "guard holds its qubit until released";

/// Reset a unit and hand it back to its device.
fn release_unit<D>(device: &mut D, mut qubit: D::Qubit) -> DeviceResult<()>
where
    D: QuantumDevice + ?Sized,
{
    qubit.reset();
    device.deallocate_qubit(qubit)
}

/// One allocated unit, released when the guard goes out of scope.
///
/// Dereferences to the device's qubit type. The guard borrows the device
/// mutably for its whole lifetime, so the unit cannot outlive the device.
pub struct ScopedQubit<'d, D>
where
    D: QuantumDevice + ?Sized,
{
    device: &'d mut D,
    qubit: Option<D::Qubit>,
}

impl<'d, D> ScopedQubit<'d, D>
where
    D: QuantumDevice + ?Sized,
{
    /// Allocate one unit from `device`.
    pub fn acquire(device: &'d mut D) -> DeviceResult<Self> {
        let qubit = device.allocate_qubit()?;
        debug!("Acquired scoped qubit on {}", device.name());
        Ok(Self {
            device,
            qubit: Some(qubit),
        })
    }

    /// The device the unit was allocated from.
    pub fn device(&self) -> &D {
        &*self.device
    }

    /// Reset and deallocate the unit now, reporting any deallocation error.
    pub fn release(mut self) -> DeviceResult<()> {
        match self.qubit.take() {
            Some(qubit) => release_unit(&mut *self.device, qubit),
            None => Ok(()),
        }
    }
}

impl<D> Deref for ScopedQubit<'_, D>
where
    D: QuantumDevice + ?Sized,
{
    type Target = D::Qubit;

    fn deref(&self) -> &D::Qubit {
        self.qubit.as_ref().expect(HELD)
    }
}

impl<D> DerefMut for ScopedQubit<'_, D>
where
    D: QuantumDevice + ?Sized,
{
    fn deref_mut(&mut self) -> &mut D::Qubit {
        self.qubit.as_mut().expect(HELD)
    }
}

impl<D> Drop for ScopedQubit<'_, D>
where
    D: QuantumDevice + ?Sized,
{
    fn drop(&mut self) {
        if let Some(qubit) = self.qubit.take() {
            if let Err(e) = release_unit(&mut *self.device, qubit) {
                error!("Failed to release scoped qubit on {}: {}", self.device.name(), e);
            }
        }
    }
}

/// An ordered set of allocated units, all released when the guard goes out
/// of scope.
///
/// Dereferences to a slice in allocation order.
pub struct ScopedRegister<'d, D>
where
    D: QuantumDevice + ?Sized,
{
    device: &'d mut D,
    qubits: Vec<D::Qubit>,
}

impl<'d, D> ScopedRegister<'d, D>
where
    D: QuantumDevice + ?Sized,
{
    /// Allocate `n_qubits` units from `device`, sequentially.
    ///
    /// The first allocation failure aborts the request. Units this call
    /// already took are reset and released before the error is returned.
    pub fn acquire(device: &'d mut D, n_qubits: usize) -> DeviceResult<Self> {
        if n_qubits == 0 {
            return Err(DeviceError::InvalidArgument(
                "register must hold at least one qubit".into(),
            ));
        }

        let mut register = Self {
            device,
            qubits: Vec::with_capacity(n_qubits),
        };
        for index in 0..n_qubits {
            match register.device.allocate_qubit() {
                Ok(qubit) => register.qubits.push(qubit),
                Err(err) => {
                    debug!(
                        "Allocation {} of {} failed on {}, rolling back",
                        index + 1,
                        n_qubits,
                        register.device.name()
                    );
                    if let Err(rollback_err) = register.release() {
                        warn!("Rollback after failed allocation reported: {}", rollback_err);
                    }
                    return Err(err);
                }
            }
        }
        debug!(
            "Acquired scoped register of {} qubits on {}",
            n_qubits,
            register.device.name()
        );
        Ok(register)
    }

    /// The device the units were allocated from.
    pub fn device(&self) -> &D {
        &*self.device
    }

    /// Reset and deallocate every unit now.
    ///
    /// Every unit is released even if some deallocations fail; the first
    /// failure is returned and later ones are logged.
    pub fn release(mut self) -> DeviceResult<()> {
        self.release_all()
    }

    fn release_all(&mut self) -> DeviceResult<()> {
        let mut first_err = None;
        for qubit in std::mem::take(&mut self.qubits) {
            if let Err(e) = release_unit(&mut *self.device, qubit) {
                if first_err.is_none() {
                    first_err = Some(e);
                } else {
                    warn!("Additional release failure on {}: {}", self.device.name(), e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl<D> Deref for ScopedRegister<'_, D>
where
    D: QuantumDevice + ?Sized,
{
    type Target = [D::Qubit];

    fn deref(&self) -> &[D::Qubit] {
        &self.qubits
    }
}

impl<D> DerefMut for ScopedRegister<'_, D>
where
    D: QuantumDevice + ?Sized,
{
    fn deref_mut(&mut self) -> &mut [D::Qubit] {
        &mut self.qubits
    }
}

impl<D> Drop for ScopedRegister<'_, D>
where
    D: QuantumDevice + ?Sized,
{
    fn drop(&mut self) {
        if let Err(e) = self.release_all() {
            error!("Failed to release scoped register on {}: {}", self.device.name(), e);
        }
    }
}
