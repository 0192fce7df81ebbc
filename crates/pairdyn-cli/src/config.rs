pub mod defaults;

use crate::cli::{BackendKind, CheckArgs, RunArgs};
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use pairdyn::core::forcefield::params::PotentialParams;
use pairdyn::core::preparation::lattice::Axis;
use pairdyn::engine::config::{self as core_config, SimulationConfig, SimulationConfigBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialRunSection {
    steps: Option<u64>,
    averaging_window: Option<u64>,
    report_interval: Option<u64>,
    rescale_interval: Option<u64>,
    target_temperature: Option<f64>,
    periodic: Option<bool>,
    print_distances: Option<bool>,
    max_atoms: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialBackendConfig {
    kind: Option<BackendKind>,
    batch_steps: Option<usize>,
    threads: Option<usize>,
}

/// Where the starting configuration comes from.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum StructureSpec {
    /// A cubic FCC block built from the potential's reference length.
    #[serde(rename_all = "kebab-case")]
    Lattice {
        layers: usize,
        #[serde(default)]
        frozen_layers: usize,
        #[serde(default)]
        axis: Axis,
        velocity_seed: Option<u64>,
    },
    /// An XYZ file; a seed replaces its velocities with freshly drawn ones.
    #[serde(rename_all = "kebab-case")]
    File {
        path: PathBuf,
        mobile_atoms: Option<usize>,
        velocity_seed: Option<u64>,
    },
}

/// The run file as written, every field optional.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialRunConfig {
    title: Option<String>,
    run: Option<PartialRunSection>,
    backend: Option<PartialBackendConfig>,
    potential: Option<PotentialParams>,
    potential_file: Option<PathBuf>,
    structure: Option<StructureSpec>,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// A fully resolved run: engine configuration plus the inputs only the CLI needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    pub structure: StructureSpec,
    /// Explicit boundary choice; `None` keeps the structure's own.
    pub periodic: Option<bool>,
    pub print_distances: bool,
}

/// Command-line values that take precedence over the run file.
#[derive(Debug, Default, Clone, Copy)]
struct Overrides {
    steps: Option<u64>,
    backend: Option<BackendKind>,
    batch_steps: Option<usize>,
    temperature: Option<f64>,
    threads: Option<usize>,
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        let mut partial: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        partial.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        debug!("Parsed run configuration from {:?}", path);
        Ok(partial)
    }

    pub fn merge_with_run_args(
        mut self,
        args: &RunArgs,
        threads: Option<usize>,
    ) -> Result<RunConfig> {
        self.apply_set_values(&args.set_values)?;
        self.resolve(Overrides {
            steps: args.steps,
            backend: args.backend,
            batch_steps: args.batch_steps,
            temperature: args.temperature,
            threads,
        })
    }

    pub fn merge_with_check_args(
        mut self,
        args: &CheckArgs,
        threads: Option<usize>,
    ) -> Result<RunConfig> {
        self.apply_set_values(&args.set_values)?;
        self.resolve(Overrides {
            threads,
            ..Overrides::default()
        })
    }

    fn resolve(self, overrides: Overrides) -> Result<RunConfig> {
        let defaults = DefaultsConfig::default();
        let run = self.run.unwrap_or_default();
        let backend = self.backend.unwrap_or_default();

        let params = match (self.potential, self.potential_file) {
            (Some(_), Some(_)) => {
                return Err(CliError::Config(
                    "Use either a `potential` section or `potential-file`, not both".to_string(),
                ));
            }
            (Some(params), None) => params,
            (None, Some(file)) => PotentialParams::load(&self.base_dir.join(file))?,
            (None, None) => {
                return Err(CliError::Config(
                    "A `potential` section or `potential-file` is required".to_string(),
                ));
            }
        };

        let structure = match self.structure {
            Some(StructureSpec::File {
                path,
                mobile_atoms,
                velocity_seed,
            }) => StructureSpec::File {
                path: self.base_dir.join(path),
                mobile_atoms,
                velocity_seed,
            },
            Some(lattice) => lattice,
            None => {
                return Err(CliError::Config(
                    "A `structure` section is required".to_string(),
                ));
            }
        };

        let backend = match overrides
            .backend
            .or(backend.kind)
            .unwrap_or(defaults.backend)
        {
            BackendKind::Sequential => core_config::Backend::Sequential,
            BackendKind::Parallel => core_config::Backend::Parallel {
                batch_steps: overrides
                    .batch_steps
                    .or(backend.batch_steps)
                    .unwrap_or(defaults.batch_steps),
                threads: backend.threads.or(overrides.threads),
            },
        };

        let mut builder = SimulationConfigBuilder::new()
            .title(self.title.unwrap_or(defaults.title))
            .params(params)
            .total_steps(overrides.steps.or(run.steps).unwrap_or(defaults.steps))
            .averaging_window(run.averaging_window.unwrap_or(defaults.averaging_window))
            .report_interval(run.report_interval.unwrap_or(defaults.report_interval))
            .rescale_interval(run.rescale_interval.unwrap_or(defaults.rescale_interval))
            .backend(backend);
        if let Some(temperature) = overrides.temperature.or(run.target_temperature) {
            builder = builder.target_temperature(temperature);
        }
        if let Some(capacity) = run.max_atoms {
            builder = builder.max_atoms(capacity);
        }
        let simulation = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let periodic = match structure {
            StructureSpec::Lattice { .. } => Some(run.periodic.unwrap_or(defaults.periodic)),
            StructureSpec::File { .. } => run.periodic,
        };

        Ok(RunConfig {
            simulation,
            structure,
            periodic,
            print_distances: run.print_distances.unwrap_or(defaults.print_distances),
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "title" => self.title = Some(value_str.to_string()),
                "run.steps" => {
                    self.run.get_or_insert_with(Default::default).steps =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "run.averaging-window" => {
                    self.run.get_or_insert_with(Default::default).averaging_window =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "run.report-interval" => {
                    self.run.get_or_insert_with(Default::default).report_interval =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "run.rescale-interval" => {
                    self.run.get_or_insert_with(Default::default).rescale_interval =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "run.target-temperature" => {
                    self.run.get_or_insert_with(Default::default).target_temperature =
                        Some(parse_value(key, value_str, "float")?);
                }
                "run.periodic" => {
                    self.run.get_or_insert_with(Default::default).periodic =
                        Some(parse_value(key, value_str, "boolean")?);
                }
                "run.print-distances" => {
                    self.run.get_or_insert_with(Default::default).print_distances =
                        Some(parse_value(key, value_str, "boolean")?);
                }
                "run.max-atoms" => {
                    self.run.get_or_insert_with(Default::default).max_atoms =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "backend.kind" => {
                    let kind = match value_str {
                        "sequential" => BackendKind::Sequential,
                        "parallel" => BackendKind::Parallel,
                        _ => {
                            return Err(CliError::Config(format!(
                                "Invalid backend for {}: {}",
                                key, value_str
                            )));
                        }
                    };
                    self.backend.get_or_insert_with(Default::default).kind = Some(kind);
                }
                "backend.batch-steps" => {
                    self.backend.get_or_insert_with(Default::default).batch_steps =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "backend.threads" => {
                    self.backend.get_or_insert_with(Default::default).threads =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "potential.time-step" => {
                    let potential = self.potential.as_mut().ok_or_else(|| {
                        CliError::Config(format!("{} needs a `potential` section", key))
                    })?;
                    potential.time_step = parse_value(key, value_str, "float")?;
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
