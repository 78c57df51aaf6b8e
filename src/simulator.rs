//! In-process reference device.
//!
//! [`StateVectorDevice`] keeps a pool of independent single-qubit state
//! vectors. The only two-qubit operation in the [`Qubit`] surface is `swap`,
//! which never entangles, so each unit can own its two amplitudes outright.
//!
//! Every handed-out [`SimulatedQubit`] carries its device id, pool slot and
//! an allocation generation. Deallocation checks all three, so a unit from
//! another device or a stale handle to a released slot is rejected without
//! touching the pool.
//!
//! Units hold a weak handle to the pool they came from. A unit dropped
//! without deallocation hands its slot back and logs a warning. A unit that
//! outlives its device rejects every operation except `reset()` with
//! [`DeviceError::Backend`].

use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::capability::Capabilities;
use crate::config::DeviceConfig;
use crate::device::QuantumDevice;
use crate::error::{DeviceError, DeviceResult};
use crate::qubit::{Qubit, check_angle};

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// `|0⟩`
const CANONICAL: [Complex64; 2] = [ONE, ZERO];

/// Slot bookkeeping shared between a device and the units it handed out.
#[derive(Debug)]
struct Pool {
    name: String,
    /// Free slots; the most recently released slot is reused first.
    free: Vec<u32>,
    /// Live slots and the generation of the unit occupying them.
    live: FxHashMap<u32, u64>,
    next_generation: u64,
}

impl Pool {
    /// Return `slot` to the free list if `generation` still occupies it.
    fn release(&mut self, slot: u32, generation: u64) -> bool {
        if self.live.get(&slot) != Some(&generation) {
            return false;
        }
        self.live.remove(&slot);
        self.free.push(slot);
        true
    }
}

fn lock(pool: &Mutex<Pool>) -> MutexGuard<'_, Pool> {
    pool.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A simulated pool of qubits.
#[derive(Debug)]
pub struct StateVectorDevice {
    id: u64,
    config: DeviceConfig,
    capabilities: Capabilities,
    pool: Arc<Mutex<Pool>>,
    rng: StdRng,
}

impl StateVectorDevice {
    /// Create an entropy-seeded device with `num_qubits` units.
    pub fn new(num_qubits: u32) -> Self {
        Self::build(DeviceConfig::new(num_qubits))
    }

    /// Create a deterministic device with `num_qubits` units.
    pub fn seeded(num_qubits: u32, seed: u64) -> Self {
        Self::build(DeviceConfig::new(num_qubits).with_seed(seed))
    }

    /// Create a device from a validated configuration.
    pub fn from_config(config: DeviceConfig) -> DeviceResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: DeviceConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let capabilities = Capabilities::simulator(config.num_qubits).with_name(&config.name);
        let pool = Pool {
            name: config.name.clone(),
            free: (0..config.num_qubits).rev().collect(),
            live: FxHashMap::default(),
            next_generation: 0,
        };
        Self {
            id: NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed),
            pool: Arc::new(Mutex::new(pool)),
            capabilities,
            config,
            rng,
        }
    }

    /// The configuration this device was built from.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Total number of units in the pool.
    pub fn capacity(&self) -> u32 {
        self.config.num_qubits
    }

    /// Number of units available for allocation.
    pub fn free_qubits(&self) -> usize {
        lock(&self.pool).free.len()
    }

    /// Number of units currently allocated.
    pub fn allocated_qubits(&self) -> usize {
        lock(&self.pool).live.len()
    }
}

impl QuantumDevice for StateVectorDevice {
    type Qubit = SimulatedQubit;

    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn allocate_qubit(&mut self) -> DeviceResult<SimulatedQubit> {
        let (slot, generation) = {
            let mut pool = lock(&self.pool);
            let slot = pool.free.pop().ok_or(DeviceError::ResourceExhausted {
                capacity: self.config.num_qubits,
            })?;
            let generation = pool.next_generation;
            pool.next_generation += 1;
            pool.live.insert(slot, generation);
            (slot, generation)
        };
        debug!("Allocated qubit {} (generation {}) on {}", slot, generation, self.config.name);

        Ok(SimulatedQubit {
            device: self.id,
            pool: Arc::downgrade(&self.pool),
            slot,
            generation,
            state: CANONICAL,
            rng: StdRng::seed_from_u64(self.rng.r#gen()),
            released: false,
        })
    }

    fn deallocate_qubit(&mut self, mut qubit: SimulatedQubit) -> DeviceResult<()> {
        if qubit.device != self.id {
            return Err(DeviceError::InvalidArgument(format!(
                "qubit {} belongs to another device, not {}",
                qubit.slot, self.config.name
            )));
        }
        if !lock(&self.pool).release(qubit.slot, qubit.generation) {
            return Err(DeviceError::InvalidArgument(format!(
                "qubit {} is not allocated on {}",
                qubit.slot, self.config.name
            )));
        }
        qubit.released = true;
        debug!("Deallocated qubit {} on {}", qubit.slot, self.config.name);
        Ok(())
    }
}

/// A unit handed out by [`StateVectorDevice`].
#[derive(Debug)]
pub struct SimulatedQubit {
    device: u64,
    pool: Weak<Mutex<Pool>>,
    slot: u32,
    generation: u64,
    /// Amplitudes of `|0⟩` and `|1⟩`.
    state: [Complex64; 2],
    rng: StdRng,
    /// Set once the device has taken the slot back.
    released: bool,
}

impl SimulatedQubit {
    /// Pool slot this unit occupies.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Current amplitudes of `|0⟩` and `|1⟩`.
    pub fn amplitudes(&self) -> [Complex64; 2] {
        self.state
    }

    /// Probability of measuring `true`.
    pub fn probability_one(&self) -> f64 {
        self.state[1].norm_sqr()
    }

    /// Whether the unit is exactly in `|0⟩`.
    pub fn is_canonical(&self) -> bool {
        self.state == CANONICAL
    }

    /// Whether the device that allocated this unit still exists.
    pub fn is_attached(&self) -> bool {
        self.pool.strong_count() > 0
    }

    fn ensure_attached(&self) -> DeviceResult<()> {
        if self.is_attached() {
            Ok(())
        } else {
            Err(DeviceError::Backend(format!(
                "qubit {} outlived its device",
                self.slot
            )))
        }
    }

    fn transform(&mut self, m: [[Complex64; 2]; 2]) -> DeviceResult<()> {
        self.ensure_attached()?;
        let [a, b] = self.state;
        self.state = [m[0][0] * a + m[0][1] * b, m[1][0] * a + m[1][1] * b];
        Ok(())
    }
}

impl Drop for SimulatedQubit {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Some(pool) = self.pool.upgrade() {
            let mut pool = lock(&pool);
            if pool.release(self.slot, self.generation) {
                warn!(
                    "Qubit {} dropped without deallocation, reclaimed by {}",
                    self.slot, pool.name
                );
            }
        }
    }
}

impl Qubit for SimulatedQubit {
    fn swap(&mut self, other: &mut Self) -> DeviceResult<()> {
        if self.device != other.device {
            return Err(DeviceError::InvalidOperation(format!(
                "cannot swap qubit {} with qubit {} of another device",
                self.slot, other.slot
            )));
        }
        self.ensure_attached()?;
        std::mem::swap(&mut self.state, &mut other.state);
        Ok(())
    }

    fn h(&mut self) -> DeviceResult<()> {
        let s = Complex64::new(FRAC_1_SQRT_2, 0.0);
        self.transform([[s, s], [s, -s]])
    }

    fn x(&mut self) -> DeviceResult<()> {
        self.ensure_attached()?;
        self.state.swap(0, 1);
        Ok(())
    }

    fn y(&mut self) -> DeviceResult<()> {
        self.transform([[ZERO, -I], [I, ZERO]])
    }

    fn z(&mut self) -> DeviceResult<()> {
        self.ensure_attached()?;
        self.state[1] = -self.state[1];
        Ok(())
    }

    fn ry(&mut self, angle: f64) -> DeviceResult<()> {
        let half = check_angle(angle)? / 2.0;
        let (s, c) = half.sin_cos();
        let (s, c) = (Complex64::new(s, 0.0), Complex64::new(c, 0.0));
        self.transform([[c, -s], [s, c]])
    }

    fn measure(&mut self) -> DeviceResult<bool> {
        self.ensure_attached()?;
        let norm = self.state[0].norm_sqr() + self.state[1].norm_sqr();
        if norm <= f64::EPSILON {
            return Err(DeviceError::Backend(format!(
                "qubit {} has a degenerate state",
                self.slot
            )));
        }
        let r: f64 = self.rng.r#gen();
        let outcome = r < self.probability_one() / norm;
        self.state = if outcome { [ZERO, ONE] } else { CANONICAL };
        Ok(outcome)
    }

    fn reset(&mut self) {
        self.state = CANONICAL;
    }
}
