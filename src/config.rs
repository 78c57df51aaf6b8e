//! Device configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};

/// Configuration for constructing a simulated device.
///
/// ```
/// use qubit_contract::DeviceConfig;
///
/// let config = DeviceConfig::from_json(r#"{"name": "bench", "num_qubits": 4, "seed": 7}"#)?;
/// assert_eq!(config.num_qubits, 4);
/// assert_eq!(config.seed, Some(7));
/// # Ok::<(), qubit_contract::DeviceError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name, reported through capabilities and logs.
    #[serde(default = "default_name")]
    pub name: String,
    /// Number of units in the pool.
    pub num_qubits: u32,
    /// Seed for measurement sampling. Entropy-seeded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_name() -> String {
    "statevector".into()
}

impl DeviceConfig {
    /// Create a configuration for a pool of `num_qubits` units.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            name: default_name(),
            num_qubits,
            seed: None,
        }
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> DeviceResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DeviceError::Configuration(format!("invalid device config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the device name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Fix the measurement seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that the configuration describes a usable device.
    pub fn validate(&self) -> DeviceResult<()> {
        if self.name.trim().is_empty() {
            return Err(DeviceError::Configuration("device name is empty".into()));
        }
        if self.num_qubits == 0 {
            return Err(DeviceError::Configuration(
                "device must hold at least one qubit".into(),
            ));
        }
        Ok(())
    }
}
