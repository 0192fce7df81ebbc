use super::device::{
    Device, DeviceBox, DeviceBuffers, DevicePotential, compute_forces, kick, kick_drift,
};
use super::{BatchSummary, ForceEvaluator};
use crate::core::forcefield::params::PotentialParams;
use crate::core::models::atoms::AtomStore;
use crate::core::models::system::ParticleSystem;
use crate::engine::error::{DeviceError, EngineError};
use tracing::trace;

/// Single-precision evaluation with one worker per mobile atom.
///
/// State is marshalled to the device once per call. [`advance_batch`]
/// keeps the whole velocity-Verlet loop on the device for up to
/// `batch_steps` steps before copying the final state back.
///
/// [`advance_batch`]: ForceEvaluator::advance_batch
#[derive(Debug)]
pub struct ParallelEvaluator {
    device: Device,
    potential: DevicePotential,
    buffers: Option<DeviceBuffers>,
    batch_steps: u64,
}

impl ParallelEvaluator {
    pub fn new(
        params: &PotentialParams,
        batch_steps: usize,
        threads: Option<usize>,
    ) -> Result<Self, DeviceError> {
        Ok(Self {
            device: Device::new(threads)?,
            potential: DevicePotential::new(params),
            buffers: None,
            batch_steps: batch_steps.max(1) as u64,
        })
    }
}

/// Reuses the resident buffers when their shape still fits the atom store.
fn resident_buffers<'b>(
    device: &Device,
    slot: &'b mut Option<DeviceBuffers>,
    atoms: &AtomStore,
) -> Result<&'b mut DeviceBuffers, DeviceError> {
    let (n, mobile) = (atoms.len(), atoms.mobile_count());
    let buffers = match slot.take() {
        Some(b) if b.atom_count() == n && b.mobile() == mobile => b,
        _ => device.allocate(n, mobile)?,
    };
    Ok(slot.insert(buffers))
}

impl ForceEvaluator for ParallelEvaluator {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn max_batch_steps(&self) -> u64 {
        self.batch_steps
    }

    fn evaluate(&mut self, system: &mut ParticleSystem) -> Result<f64, EngineError> {
        let Self {
            device,
            potential,
            buffers,
            ..
        } = self;
        let cell = DeviceBox::new(system.boundary());
        let atoms = system.atoms_mut();
        let buffers = resident_buffers(device, buffers, atoms)?;

        let potential: &DevicePotential = potential;
        buffers.upload_positions(atoms.positions())?;
        device.launch("forces", || compute_forces(&mut *buffers, &cell, potential))?;
        buffers.download_forces(atoms)?;
        Ok(atoms.potential_energy())
    }

    fn advance_batch(
        &mut self,
        system: &mut ParticleSystem,
        steps: u64,
        dt: f64,
    ) -> Result<BatchSummary, EngineError> {
        let Self {
            device,
            potential,
            buffers,
            ..
        } = self;
        let cell = DeviceBox::new(system.boundary());
        let atoms = system.atoms_mut();
        let buffers = resident_buffers(device, buffers, atoms)?;
        let potential: &DevicePotential = potential;
        let dt = dt as f32;

        buffers.upload_state(atoms)?;
        let mut summary = BatchSummary::default();
        for _ in 0..steps {
            device.launch("kick-drift", || kick_drift(&mut *buffers, &cell, dt))?;
            device.launch("forces", || compute_forces(&mut *buffers, &cell, potential))?;
            device.launch("kick", || kick(&mut *buffers, dt))?;
            summary.push(buffers.potential_energy(), buffers.kinetic_energy());
        }
        buffers.download_state(atoms)?;
        trace!(steps, "Device batch complete.");
        Ok(summary)
    }
}
