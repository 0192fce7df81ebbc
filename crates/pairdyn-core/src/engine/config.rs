use crate::core::forcefield::params::{ParamError, PotentialParams};
use crate::core::models::system::ParticleSystem;
use thiserror::Error;

/// Atom capacity used when a run does not state one.
pub const DEFAULT_MAX_ATOMS: usize = 5000;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("System holds {atoms} atoms but the configured capacity is {capacity}")]
    CapacityExceeded { atoms: usize, capacity: usize },

    #[error("System contains no atoms")]
    EmptySystem,

    #[error("Atom {atom} at ({x}, {y}, {z}) lies outside the periodic box")]
    AtomOutsideBox { atom: usize, x: f64, y: f64, z: f64 },

    #[error("Target temperature must be finite and non-negative (found {0})")]
    InvalidTemperature(f64),

    #[error("Parallel backend needs at least one step per batch")]
    InvalidBatchSize,

    #[error("Parallel backend needs at least one worker thread")]
    InvalidThreadCount,

    #[error(transparent)]
    Params(#[from] ParamError),
}

/// The execution path that evaluates forces, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Single-threaded double-precision evaluation, one step per call.
    #[default]
    Sequential,
    /// Single-precision evaluation on a dedicated worker pool.
    Parallel {
        /// Integration steps executed per dispatch.
        batch_steps: usize,
        /// Pool size; `None` lets the pool pick.
        threads: Option<usize>,
    },
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Sequential => "sequential",
            Backend::Parallel { .. } => "parallel",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub title: String,
    pub params: PotentialParams,
    /// `MDSL`, the last step of the run.
    pub total_steps: u64,
    /// `ISCAL`; zero disables the thermostat.
    pub rescale_interval: u64,
    /// `IAVL`; zero disables rolling averages.
    pub averaging_window: u64,
    /// `IPPL`; zero disables periodic reports.
    pub report_interval: u64,
    /// `TE`
    pub target_temperature: f64,
    pub backend: Backend,
    pub max_atoms: usize,
}

impl SimulationConfig {
    /// Checks the parameters that do not depend on the system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate()?;
        if !(self.target_temperature.is_finite() && self.target_temperature >= 0.0) {
            return Err(ConfigError::InvalidTemperature(self.target_temperature));
        }
        if let Backend::Parallel {
            batch_steps,
            threads,
        } = self.backend
        {
            if batch_steps == 0 {
                return Err(ConfigError::InvalidBatchSize);
            }
            if threads == Some(0) {
                return Err(ConfigError::InvalidThreadCount);
            }
        }
        Ok(())
    }

    /// Checks that a prepared system can be advanced under this configuration.
    ///
    /// With periodic wrapping on, every atom must lie in `[PA, PB]` so that one
    /// minimum-image shift per axis suffices.
    pub fn validate_system(&self, system: &ParticleSystem) -> Result<(), ConfigError> {
        if system.is_empty() {
            return Err(ConfigError::EmptySystem);
        }
        if system.len() > self.max_atoms {
            return Err(ConfigError::CapacityExceeded {
                atoms: system.len(),
                capacity: self.max_atoms,
            });
        }
        if system.boundary().is_periodic() {
            let cell = system.boundary().cell();
            if let Some((atom, p)) = system
                .atoms()
                .positions()
                .iter()
                .enumerate()
                .find(|(_, p)| !cell.contains(p))
            {
                return Err(ConfigError::AtomOutsideBox {
                    atom,
                    x: p.x,
                    y: p.y,
                    z: p.z,
                });
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    title: Option<String>,
    params: Option<PotentialParams>,
    total_steps: Option<u64>,
    rescale_interval: Option<u64>,
    averaging_window: Option<u64>,
    report_interval: Option<u64>,
    target_temperature: Option<f64>,
    backend: Option<Backend>,
    max_atoms: Option<usize>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
    pub fn params(mut self, params: PotentialParams) -> Self {
        self.params = Some(params);
        self
    }
    pub fn total_steps(mut self, steps: u64) -> Self {
        self.total_steps = Some(steps);
        self
    }
    pub fn rescale_interval(mut self, interval: u64) -> Self {
        self.rescale_interval = Some(interval);
        self
    }
    pub fn averaging_window(mut self, window: u64) -> Self {
        self.averaging_window = Some(window);
        self
    }
    pub fn report_interval(mut self, interval: u64) -> Self {
        self.report_interval = Some(interval);
        self
    }
    pub fn target_temperature(mut self, temperature: f64) -> Self {
        self.target_temperature = Some(temperature);
        self
    }
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }
    pub fn max_atoms(mut self, capacity: usize) -> Self {
        self.max_atoms = Some(capacity);
        self
    }

    /// Assembles and validates the configuration.
    ///
    /// Intervals default to zero (event disabled), the backend to
    /// [`Backend::Sequential`] and the capacity to [`DEFAULT_MAX_ATOMS`].
    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let config = SimulationConfig {
            title: self.title.unwrap_or_default(),
            params: self.params.ok_or(ConfigError::MissingParameter("params"))?,
            total_steps: self
                .total_steps
                .ok_or(ConfigError::MissingParameter("total_steps"))?,
            rescale_interval: self.rescale_interval.unwrap_or(0),
            averaging_window: self.averaging_window.unwrap_or(0),
            report_interval: self.report_interval.unwrap_or(0),
            target_temperature: self
                .target_temperature
                .ok_or(ConfigError::MissingParameter("target_temperature"))?,
            backend: self.backend.unwrap_or_default(),
            max_atoms: self.max_atoms.unwrap_or(DEFAULT_MAX_ATOMS),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atoms::AtomStore;
    use crate::core::models::boundary::{PeriodicBoundary, PeriodicBox};
    use nalgebra::Vector3;

    fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
            .params(PotentialParams::copper())
            .total_steps(100)
            .target_temperature(300.0)
    }

    fn system(positions: Vec<Vector3<f64>>, periodic: bool) -> ParticleSystem {
        let cell = PeriodicBox::new(Vector3::zeros(), Vector3::repeat(10.0)).unwrap();
        ParticleSystem::new(
            AtomStore::from_positions(positions),
            PeriodicBoundary::new(cell, periodic),
        )
    }

    #[test]
    fn build_applies_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.backend, Backend::Sequential);
        assert_eq!(config.max_atoms, DEFAULT_MAX_ATOMS);
        assert_eq!(config.rescale_interval, 0);
        assert_eq!(config.title, "");
    }

    #[test]
    fn build_reports_missing_parameters() {
        let result = SimulationConfigBuilder::new()
            .params(PotentialParams::copper())
            .target_temperature(300.0)
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("total_steps")));

        let result = SimulationConfigBuilder::new().total_steps(1).build();
        assert_eq!(result, Err(ConfigError::MissingParameter("params")));
    }

    #[test]
    fn build_rejects_zero_batch_and_zero_threads() {
        let result = builder()
            .backend(Backend::Parallel {
                batch_steps: 0,
                threads: None,
            })
            .build();
        assert_eq!(result, Err(ConfigError::InvalidBatchSize));

        let result = builder()
            .backend(Backend::Parallel {
                batch_steps: 4,
                threads: Some(0),
            })
            .build();
        assert_eq!(result, Err(ConfigError::InvalidThreadCount));
    }

    #[test]
    fn build_rejects_negative_temperature() {
        let result = builder().target_temperature(-5.0).build();
        assert_eq!(result, Err(ConfigError::InvalidTemperature(-5.0)));
    }

    #[test]
    fn build_rejects_inconsistent_secondary_decay() {
        let mut params = PotentialParams::copper();
        params.secondary_decay_1 = Some(1.0);
        let result = builder().params(params).build();
        assert!(matches!(
            result,
            Err(ConfigError::Params(ParamError::InconsistentSecondaryDecay { term: 1, .. }))
        ));
    }

    #[test]
    fn validate_system_enforces_capacity() {
        let config = builder().max_atoms(2).build().unwrap();
        let positions = vec![Vector3::repeat(1.0), Vector3::repeat(2.0), Vector3::repeat(3.0)];
        assert_eq!(
            config.validate_system(&system(positions, true)),
            Err(ConfigError::CapacityExceeded {
                atoms: 3,
                capacity: 2
            })
        );
    }

    #[test]
    fn validate_system_rejects_empty_system() {
        let config = builder().build().unwrap();
        assert_eq!(
            config.validate_system(&system(Vec::new(), true)),
            Err(ConfigError::EmptySystem)
        );
    }

    #[test]
    fn validate_system_rejects_atoms_outside_box_only_when_periodic() {
        let config = builder().build().unwrap();
        let positions = vec![Vector3::repeat(1.0), Vector3::new(11.0, 1.0, 1.0)];
        assert!(matches!(
            config.validate_system(&system(positions.clone(), true)),
            Err(ConfigError::AtomOutsideBox { atom: 1, .. })
        ));
        assert_eq!(config.validate_system(&system(positions, false)), Ok(()));
    }
}
