//! Quantum random number generator on top of the Qubit Contract.
//!
//! Draws random bytes one qubit at a time through `using_qubit`, then shows a
//! register scope moving a prepared state with `swap`. Set `RUST_LOG=debug`
//! to watch every allocation and release, and `QRNG_CONFIG` to a JSON device
//! configuration to change the pool.

use qubit_contract::{
    DeviceConfig, DeviceResult, QuantumDevice, Qubit, SingleQubitGate, StateVectorDevice,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// One unbiased random bit: prepare |+⟩ and measure.
fn random_bit<D: QuantumDevice>(device: &mut D) -> DeviceResult<bool> {
    device.using_qubit(|q| {
        q.h()?;
        q.measure()
    })
}

fn random_byte<D: QuantumDevice>(device: &mut D) -> DeviceResult<u8> {
    let mut byte = 0u8;
    for _ in 0..8 {
        byte = (byte << 1) | u8::from(random_bit(device)?);
    }
    Ok(byte)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match std::env::var("QRNG_CONFIG") {
        Ok(json) => DeviceConfig::from_json(&json)?,
        Err(_) => DeviceConfig::new(2).with_name("qrng-sim").with_seed(2024),
    };
    let mut device = StateVectorDevice::from_config(config)?;
    info!("Using device {} with {} qubits", device.name(), device.capacity());

    println!("Device:  {}", device.name());
    println!("Qubits:  {}", device.capabilities().num_qubits);
    println!();

    let bytes = (0..8)
        .map(|_| random_byte(&mut device))
        .collect::<DeviceResult<Vec<_>>>()?;
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    println!("Random bytes: {hex}");

    // Prepare a biased state on the first unit and move it to the second.
    let program = [SingleQubitGate::Ry(2.0 * std::f64::consts::FRAC_PI_3)];
    let moved = device.using_register(2, |qubits| -> DeviceResult<f64> {
        for gate in program {
            qubits[0].apply(gate)?;
        }
        let (source, target) = qubits.split_at_mut(1);
        source[0].swap(&mut target[0])?;
        Ok(target[0].probability_one())
    })?;
    println!("P(1) after swap: {moved:.3}");

    println!();
    println!(
        "Free after scopes: {}/{}",
        device.free_qubits(),
        device.capacity()
    );

    Ok(())
}
