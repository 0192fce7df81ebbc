use super::config::{Backend, SimulationConfig};
use super::error::EngineError;
use super::evaluator::create_evaluator;
use super::integrator::Integrator;
use super::observer::NullObserver;
use crate::core::models::system::ParticleSystem;
use tracing::{info, warn};

/// Relative potential-energy tolerance used when none is given.
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// Result of running the same configuration on both backends.
///
/// A report that did not pass is not an error: the caller decides what a
/// divergence means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsistencyReport {
    /// Steps both backends advanced before comparison.
    pub steps: u64,
    pub potential_sequential: f64,
    pub potential_parallel: f64,
    /// `|EPOT_seq − EPOT_par| / |EPOT_seq|`.
    pub relative_error: f64,
    /// Largest component difference of any mobile-atom force.
    pub max_force_error: f64,
    pub tolerance: f64,
    pub passed: bool,
}

/// Advances two copies of `system` for `steps` steps, one per backend, and
/// compares their potential energies and forces.
///
/// `parallel` supplies the parallel backend settings; the thermostat,
/// averaging and reporting intervals of `config` apply to both copies.
pub fn compare_backends(
    config: &SimulationConfig,
    system: &ParticleSystem,
    parallel: Backend,
    steps: u64,
    tolerance: f64,
) -> Result<ConsistencyReport, EngineError> {
    let run = |backend: Backend| -> Result<ParticleSystem, EngineError> {
        let mut config = config.clone();
        config.backend = backend;
        config.total_steps = steps;
        let evaluator = create_evaluator(&backend, &config.params)?;
        let mut integrator = Integrator::new(config, system.clone(), evaluator)?;
        integrator.prepare()?;
        integrator.advance(steps, &mut NullObserver)?;
        Ok(integrator.into_system())
    };

    let sequential = run(Backend::Sequential)?;
    let parallel = run(parallel)?;

    let potential_sequential = sequential.atoms().potential_energy();
    let potential_parallel = parallel.atoms().potential_energy();
    let scale = potential_sequential.abs().max(f64::MIN_POSITIVE);
    let relative_error = (potential_sequential - potential_parallel).abs() / scale;
    let mobile = sequential.mobile_count();
    let max_force_error = sequential.atoms().forces()[..mobile]
        .iter()
        .zip(&parallel.atoms().forces()[..mobile])
        .map(|(a, b)| (a - b).amax())
        .fold(0.0, f64::max);
    let passed = relative_error <= tolerance;

    let report = ConsistencyReport {
        steps,
        potential_sequential,
        potential_parallel,
        relative_error,
        max_force_error,
        tolerance,
        passed,
    };
    if passed {
        info!(relative_error, max_force_error, "Backends agree.");
    } else {
        warn!(
            relative_error,
            tolerance, "Backends diverge beyond the tolerance."
        );
    }
    Ok(report)
}
