use super::GlobalOptions;
use crate::cli::CheckArgs;
use crate::config::PartialRunConfig;
use crate::config::defaults::DefaultsConfig;
use crate::error::{CliError, Result};
use crate::structure::build_system;
use pairdyn::engine::consistency::DEFAULT_TOLERANCE;
use pairdyn::workflows;
use tracing::{info, warn};

pub fn run(args: CheckArgs, options: GlobalOptions) -> Result<()> {
    let tolerance = args.tolerance.unwrap_or(DEFAULT_TOLERANCE);
    if !(tolerance.is_finite() && tolerance >= 0.0) {
        return Err(CliError::Argument(format!(
            "tolerance must be a non-negative number (found {})",
            tolerance
        )));
    }
    let steps = args
        .steps
        .unwrap_or_else(|| DefaultsConfig::default().check_steps);

    let partial_config = PartialRunConfig::from_file(&args.config)?;
    let config = partial_config.merge_with_check_args(&args, options.threads)?;
    let system = build_system(&config)?;

    info!(steps, tolerance, "Comparing sequential and parallel backends...");
    let report = workflows::validate::run(
        &system,
        &config.simulation,
        steps,
        tolerance,
        &options.reporter(),
    )?;

    println!("Backend consistency after {} steps:", report.steps);
    println!("  sequential potential energy: {:.10}", report.potential_sequential);
    println!("  parallel potential energy:   {:.10}", report.potential_parallel);
    println!("  relative difference:         {:.3e}", report.relative_error);
    println!("  largest force difference:    {:.3e}", report.max_force_error);

    if report.passed {
        println!("✓ Backends agree within {:.1e}.", report.tolerance);
        Ok(())
    } else {
        warn!(relative_error = report.relative_error, "Consistency check failed.");
        Err(CliError::Divergence {
            relative_error: report.relative_error,
            tolerance: report.tolerance,
        })
    }
}
