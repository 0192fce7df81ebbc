//! Force and energy evaluation backends.
//!
//! Both backends implement [`ForceEvaluator`] and compute the same quantity:
//! for every mobile atom the summed pair force from all other atoms and its
//! share of the pair energies. A mobile–mobile pair gives half of its energy
//! to each partner, a mobile–frozen pair gives all of it to the mobile atom,
//! so the per-atom energies add up to the potential energy of the system.

pub mod device;
pub mod parallel;
pub mod sequential;

use super::config::Backend;
use super::dynamics;
use super::error::EngineError;
use crate::core::forcefield::params::PotentialParams;
use crate::core::models::system::ParticleSystem;
use parallel::ParallelEvaluator;
use sequential::SequentialEvaluator;

/// Energies of the steps advanced by one call to [`ForceEvaluator::advance_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchSummary {
    pub steps: u64,
    /// Sum of the potential energy over every step of the batch.
    pub potential_sum: f64,
    /// Sum of the kinetic energy over every step of the batch.
    pub kinetic_sum: f64,
    pub last_potential: f64,
    pub last_kinetic: f64,
}

impl BatchSummary {
    pub(crate) fn push(&mut self, potential: f64, kinetic: f64) {
        self.steps += 1;
        self.potential_sum += potential;
        self.kinetic_sum += kinetic;
        self.last_potential = potential;
        self.last_kinetic = kinetic;
    }
}

pub trait ForceEvaluator: Send {
    fn name(&self) -> &'static str;

    /// Largest number of steps one [`advance_batch`](Self::advance_batch) call may run.
    fn max_batch_steps(&self) -> u64 {
        1
    }

    /// Recomputes forces and per-atom energies for the current positions and
    /// returns the total potential energy.
    fn evaluate(&mut self, system: &mut ParticleSystem) -> Result<f64, EngineError>;

    /// Advances `steps` velocity-Verlet steps of length `dt`.
    ///
    /// Forces in `system` must belong to its positions on entry. The default
    /// runs the host kernels around [`evaluate`](Self::evaluate), one step at a time.
    fn advance_batch(
        &mut self,
        system: &mut ParticleSystem,
        steps: u64,
        dt: f64,
    ) -> Result<BatchSummary, EngineError> {
        let mut summary = BatchSummary::default();
        for _ in 0..steps {
            let potential = dynamics::velocity_verlet_step(system, dt, |s| self.evaluate(s))?;
            summary.push(potential, system.atoms().kinetic_energy());
        }
        Ok(summary)
    }
}

/// Builds the evaluator for a backend.
pub fn create_evaluator(
    backend: &Backend,
    params: &PotentialParams,
) -> Result<Box<dyn ForceEvaluator>, EngineError> {
    Ok(match *backend {
        Backend::Sequential => Box::new(SequentialEvaluator::new(params)),
        Backend::Parallel {
            batch_steps,
            threads,
        } => Box::new(ParallelEvaluator::new(params, batch_steps, threads)?),
    })
}
