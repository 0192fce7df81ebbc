use super::ForceEvaluator;
use crate::core::forcefield::params::PotentialParams;
use crate::core::forcefield::potentials::PotentialModel;
use crate::core::models::system::ParticleSystem;
use crate::engine::error::EngineError;
use nalgebra::Vector3;

/// Double-precision evaluation on the calling thread.
///
/// Mobile atoms are visited in index order and, for each, every other atom in
/// ascending index order, so results are reproducible bit for bit.
#[derive(Debug, Clone)]
pub struct SequentialEvaluator {
    model: PotentialModel,
}

impl SequentialEvaluator {
    pub fn new(params: &PotentialParams) -> Self {
        Self {
            model: PotentialModel::new(params),
        }
    }
}

impl ForceEvaluator for SequentialEvaluator {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn evaluate(&mut self, system: &mut ParticleSystem) -> Result<f64, EngineError> {
        let floor = self.model.distance_floor();
        let (atoms, boundary) = system.split_mut();
        let mobile = atoms.mobile_count();
        let (positions, forces, energies) = atoms.force_view();

        let mut total = 0.0;
        for i in 0..mobile {
            let mut force = Vector3::zeros();
            let mut energy = 0.0;
            for (j, xj) in positions.iter().enumerate() {
                if j == i {
                    continue;
                }
                let d = boundary.displacement_between(&positions[i], xj);
                let (u, f) = self.model.evaluate(d.r);
                force += d.delta * (f / d.r.max(floor));
                energy += if j < mobile { 0.5 * u } else { u };
            }
            forces[i] = force;
            energies[i] = energy;
            total += energy;
        }
        Ok(total)
    }
}
