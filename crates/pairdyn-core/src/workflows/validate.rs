use crate::core::models::system::ParticleSystem;
use crate::engine::config::{Backend, SimulationConfig};
use crate::engine::consistency::{ConsistencyReport, compare_backends};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::instrument;

/// Cross-checks the sequential backend against the parallel one.
///
/// When `config` already selects the parallel backend its batch size and pool
/// size are used; otherwise one step per batch on a default pool.
#[instrument(skip_all, name = "validation_workflow", fields(steps = steps, tolerance = tolerance))]
pub fn run(
    system: &ParticleSystem,
    config: &SimulationConfig,
    steps: u64,
    tolerance: f64,
    reporter: &ProgressReporter,
) -> Result<ConsistencyReport, EngineError> {
    let parallel = match config.backend {
        parallel @ Backend::Parallel { .. } => parallel,
        Backend::Sequential => Backend::Parallel {
            batch_steps: 1,
            threads: None,
        },
    };
    reporter.report(Progress::PhaseStart {
        name: "Backend Consistency",
    });
    let report = compare_backends(config, system, parallel, steps, tolerance)?;
    reporter.report(Progress::PhaseFinish);
    Ok(report)
}
