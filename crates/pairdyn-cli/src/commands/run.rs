use super::GlobalOptions;
use crate::cli::RunArgs;
use crate::config::PartialRunConfig;
use crate::error::{CliError, Result};
use crate::report::{OutputPaths, ReportWriter};
use crate::structure::build_system;
use pairdyn::core::io::ball_stick::BallStickFile;
use pairdyn::core::io::traits::StructureFile;
use pairdyn::core::io::xyz::XyzFile;
use pairdyn::workflows;
use tracing::info;

/// Bonds in the ball-and-stick scene reach past the first neighbour shell
/// but stop short of the second at `sqrt(2)` times the reference length.
const BOND_SCALE: f64 = 1.2;

pub fn run(args: RunArgs, options: GlobalOptions) -> Result<()> {
    if args.output.as_os_str().is_empty() {
        return Err(CliError::Argument("output prefix must not be empty".to_string()));
    }

    let partial_config = PartialRunConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_run_args(&args, options.threads)?;

    let system = build_system(&config)?;
    let paths = OutputPaths::from_prefix(&args.output);
    let mut writer = ReportWriter::create(&paths, config.print_distances)?;

    if !options.quiet {
        println!(
            "Running {} steps of '{}' ({} atoms, {} backend)...",
            config.simulation.total_steps,
            config.simulation.title,
            system.len(),
            config.simulation.backend.name()
        );
    }
    info!("Invoking the core simulation workflow...");
    let result =
        workflows::simulate::run(system, &config.simulation, &mut writer, options.reporter())?;

    let state = &result.summary.state;
    XyzFile::write_to_path(&result.system, state.step, &paths.final_structure)?;
    BallStickFile::new(BOND_SCALE * config.simulation.params.reference_length)
        .write_to_path(&result.system, &paths.ball_stick)?;
    info!(
        frames = writer.frames(),
        "Final structure written to {:?}", &paths.final_structure
    );

    if !options.quiet {
        println!(
            "✓ Step {}: E_total = {:.6}, T = {:.2} K, <T> = {:.2} K ({:.2?}, {} backend)",
            state.step,
            state.total_energy,
            state.temperature,
            state.average_temperature,
            result.summary.elapsed,
            result.summary.backend
        );
        println!("  Report written to: {}", paths.report.display());
        println!("  Energy log written to: {}", paths.energy.display());
        println!("  Trajectory written to: {}", paths.trajectory.display());
        println!("  Final structure written to: {}", paths.final_structure.display());
        println!("  Ball-and-stick scene written to: {}", paths.ball_stick.display());
    }
    Ok(())
}
