use crate::core::models::system::ParticleSystem;
use crate::engine::config::SimulationConfig;
use crate::engine::error::EngineError;
use crate::engine::evaluator::create_evaluator;
use crate::engine::integrator::Integrator;
use crate::engine::observer::Observer;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::RunSummary;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub summary: RunSummary,
    /// The system after the last step.
    pub system: ParticleSystem,
}

/// Runs a complete trajectory on the backend named in `config`.
///
/// The system is validated against the configuration before any force is
/// evaluated. The observer receives the initial snapshot, one snapshot per
/// report interval and the final snapshot.
#[instrument(
    skip_all,
    name = "simulation_workflow",
    fields(title = %config.title, backend = config.backend.name())
)]
pub fn run<'r>(
    system: ParticleSystem,
    config: &SimulationConfig,
    observer: &mut dyn Observer,
    reporter: ProgressReporter<'r>,
) -> Result<SimulationResult, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let evaluator = create_evaluator(&config.backend, &config.params)?;
    info!(
        backend = evaluator.name(),
        atoms = system.len(),
        mobile = system.mobile_count(),
        "Backend ready."
    );
    reporter.report(Progress::PhaseFinish);

    let mut integrator = Integrator::new(config.clone(), system, evaluator)?.with_progress(reporter);
    let summary = integrator.run(observer)?;
    Ok(SimulationResult {
        summary,
        system: integrator.into_system(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::PotentialParams;
    use crate::core::preparation::lattice::FccLattice;
    use crate::engine::config::{Backend, ConfigError, SimulationConfigBuilder};
    use crate::engine::observer::{EnergyHistory, NullObserver};
    use std::sync::Mutex;

    fn lattice() -> ParticleSystem {
        FccLattice::new(2, PotentialParams::copper().reference_length)
            .unwrap()
            .build(true)
            .unwrap()
    }

    #[test]
    fn run_reports_progress_and_returns_final_system() {
        let config = SimulationConfigBuilder::new()
            .params(PotentialParams::copper())
            .total_steps(6)
            .report_interval(3)
            .target_temperature(0.0)
            .backend(Backend::Parallel {
                batch_steps: 2,
                threads: Some(2),
            })
            .build()
            .unwrap();
        let advanced = Mutex::new(0u64);
        let status_steps = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| match event {
            Progress::TaskAdvance { steps } => *advanced.lock().unwrap() += steps,
            Progress::Status {
                step, temperature, ..
            } => {
                assert!(temperature.is_finite());
                status_steps.lock().unwrap().push(step);
            }
            _ => {}
        }));
        let mut history = EnergyHistory::default();

        let result = run(lattice(), &config, &mut history, reporter).unwrap();
        assert_eq!(result.summary.state.step, 6);
        assert_eq!(result.summary.backend, "parallel");
        assert_eq!(result.system.len(), 32);
        assert_eq!(history.periodic.len(), 2);
        assert_eq!(advanced.into_inner().unwrap(), 6);
        // Batches of two are cut at the report step.
        assert_eq!(status_steps.into_inner().unwrap(), vec![2, 3, 5, 6]);
    }

    #[test]
    fn run_rejects_oversized_system() {
        let config = SimulationConfigBuilder::new()
            .params(PotentialParams::copper())
            .total_steps(1)
            .target_temperature(0.0)
            .max_atoms(10)
            .build()
            .unwrap();
        let err = run(lattice(), &config, &mut NullObserver, ProgressReporter::new()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config(ConfigError::CapacityExceeded {
                atoms: 32,
                capacity: 10
            })
        ));
    }
}
