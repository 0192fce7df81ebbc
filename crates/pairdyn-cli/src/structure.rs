use crate::config::{RunConfig, StructureSpec};
use crate::error::{CliError, Result};
use pairdyn::core::io::traits::StructureFile;
use pairdyn::core::io::xyz::XyzFile;
use pairdyn::core::models::boundary::PeriodicBoundary;
use pairdyn::core::models::system::ParticleSystem;
use pairdyn::core::preparation::lattice::{FccLattice, partition_frozen};
use pairdyn::core::preparation::velocities::maxwell_velocities;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn thermalize(system: &mut ParticleSystem, config: &RunConfig, seed: Option<u64>) -> Result<()> {
    let params = &config.simulation.params;
    maxwell_velocities(
        system.atoms_mut(),
        config.simulation.target_temperature,
        params.boltzmann,
        &mut seeded_rng(seed),
    )
    .map_err(|e| CliError::Config(e.to_string()))
}

/// Builds the starting system described by the run configuration.
pub fn build_system(config: &RunConfig) -> Result<ParticleSystem> {
    match &config.structure {
        StructureSpec::Lattice {
            layers,
            frozen_layers,
            axis,
            velocity_seed,
        } => {
            let periodic = config.periodic.unwrap_or(true);
            let mut system = FccLattice::new(*layers, config.simulation.params.reference_length)
                .and_then(|lattice| lattice.build(periodic))
                .map_err(|e| CliError::Config(e.to_string()))?;
            let mobile = partition_frozen(system.atoms_mut(), *axis, *frozen_layers)
                .map_err(|e| CliError::Config(e.to_string()))?;
            thermalize(&mut system, config, *velocity_seed)?;
            info!(
                atoms = system.len(),
                mobile, periodic, "Built FCC lattice of {} layers.", layers
            );
            Ok(system)
        }
        StructureSpec::File {
            path,
            mobile_atoms,
            velocity_seed,
        } => {
            let mut system =
                XyzFile::read_from_path(path).map_err(|e| CliError::FileParsing {
                    path: path.clone(),
                    source: e.into(),
                })?;
            if let Some(periodic) = config.periodic {
                let boundary = PeriodicBoundary::new(*system.boundary().cell(), periodic);
                let species = system.species().to_string();
                system = ParticleSystem::new(system.atoms().clone(), boundary).with_species(&species);
            }
            if let Some(mobile) = mobile_atoms {
                system
                    .atoms_mut()
                    .set_mobile_count(*mobile)
                    .map_err(|e| CliError::Config(e.to_string()))?;
            }
            if velocity_seed.is_some() {
                thermalize(&mut system, config, *velocity_seed)?;
            }
            info!(
                atoms = system.len(),
                mobile = system.mobile_count(),
                "Loaded structure from {:?}", path
            );
            Ok(system)
        }
    }
}
