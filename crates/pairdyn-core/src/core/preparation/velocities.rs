use crate::core::models::atoms::AtomStore;
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VelocityError {
    #[error("Target temperature must be finite and non-negative (found {0})")]
    InvalidTemperature(f64),
    #[error("Boltzmann constant must be positive (found {0})")]
    InvalidBoltzmann(f64),
}

/// Draws Maxwell-Boltzmann velocities for the mobile atoms.
///
/// Each component is sampled from a normal distribution of variance `BK·T`
/// (unit mass), the centre-of-mass velocity is removed, and the set is scaled
/// so the instantaneous temperature equals `temperature` exactly. Frozen atoms
/// stay at rest.
pub fn maxwell_velocities<R: Rng + ?Sized>(
    atoms: &mut AtomStore,
    temperature: f64,
    boltzmann: f64,
    rng: &mut R,
) -> Result<(), VelocityError> {
    if !(temperature.is_finite() && temperature >= 0.0) {
        return Err(VelocityError::InvalidTemperature(temperature));
    }
    if !(boltzmann.is_finite() && boltzmann > 0.0) {
        return Err(VelocityError::InvalidBoltzmann(boltzmann));
    }

    let velocities = atoms.mobile_velocities_mut();
    if temperature == 0.0 || velocities.is_empty() {
        velocities.fill(Vector3::zeros());
        return Ok(());
    }

    let normal = Normal::new(0.0, (boltzmann * temperature).sqrt())
        .map_err(|_| VelocityError::InvalidTemperature(temperature))?;
    for v in velocities.iter_mut() {
        *v = Vector3::new(normal.sample(rng), normal.sample(rng), normal.sample(rng));
    }

    if velocities.len() > 1 {
        let drift = velocities.iter().sum::<Vector3<f64>>() / velocities.len() as f64;
        for v in velocities.iter_mut() {
            *v -= drift;
        }
    }

    let current = atoms.temperature(boltzmann);
    if current > 0.0 {
        let scale = (temperature / current).sqrt();
        for v in atoms.mobile_velocities_mut() {
            *v *= scale;
        }
    }
    Ok(())
}
