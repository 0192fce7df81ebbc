use super::config::SimulationConfig;
use crate::core::io::energy_log::EnergyRecord;
use crate::core::models::atoms::AtomStore;
use crate::core::models::system::ParticleSystem;
use std::time::Duration;

/// Sums collected over the steps of the current averaging window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Window {
    steps: u64,
    potential: f64,
    kinetic: f64,
    temperature: f64,
}

/// Step counter, energies and temperature accumulators of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationState {
    /// `MDS`
    pub step: u64,
    pub potential_energy: f64,
    pub kinetic_energy: f64,
    pub total_energy: f64,
    pub temperature: f64,
    /// Mean temperature of the last completed averaging window.
    pub average_temperature: f64,
    /// Mean kinetic energy of the last completed averaging window.
    pub average_kinetic_energy: f64,
    /// Mean potential energy of the last completed averaging window.
    pub average_potential_energy: f64,
    /// `SCFAC` of the most recent rescale, 1 until one happens.
    pub scale_factor: f64,
    window: Window,
}

impl SimulationState {
    /// Captures the state at step zero. Averages start at the instantaneous values.
    pub(crate) fn initial(potential: f64, kinetic: f64, temperature: f64) -> Self {
        Self {
            step: 0,
            potential_energy: potential,
            kinetic_energy: kinetic,
            total_energy: potential + kinetic,
            temperature,
            average_temperature: temperature,
            average_kinetic_energy: kinetic,
            average_potential_energy: potential,
            scale_factor: 1.0,
            window: Window::default(),
        }
    }

    /// Folds the per-step sums of a batch into the window and stores the
    /// instantaneous values of its last step.
    pub(crate) fn record_batch(
        &mut self,
        steps: u64,
        sums: (f64, f64),
        last: (f64, f64),
        temperature_per_kinetic: f64,
    ) {
        let (potential_sum, kinetic_sum) = sums;
        let (potential, kinetic) = last;
        self.step += steps;
        self.window.steps += steps;
        self.window.potential += potential_sum;
        self.window.kinetic += kinetic_sum;
        self.window.temperature += kinetic_sum * temperature_per_kinetic;
        self.set_instantaneous(potential, kinetic, kinetic * temperature_per_kinetic);
    }

    pub(crate) fn set_instantaneous(&mut self, potential: f64, kinetic: f64, temperature: f64) {
        self.potential_energy = potential;
        self.kinetic_energy = kinetic;
        self.total_energy = potential + kinetic;
        self.temperature = temperature;
    }

    /// Turns the window sums into averages and starts a new window.
    pub(crate) fn close_window(&mut self) {
        if self.window.steps == 0 {
            return;
        }
        let n = self.window.steps as f64;
        self.average_temperature = self.window.temperature / n;
        self.average_kinetic_energy = self.window.kinetic / n;
        self.average_potential_energy = self.window.potential / n;
        self.window = Window::default();
    }

    /// Number of steps collected in the open averaging window.
    pub fn window_steps(&self) -> u64 {
        self.window.steps
    }
}

/// A read-only view of a run, handed to report writers.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub system: &'a ParticleSystem,
    pub state: &'a SimulationState,
    pub config: &'a SimulationConfig,
}

impl<'a> Snapshot<'a> {
    pub fn step(&self) -> u64 {
        self.state.step
    }

    pub fn atoms(&self) -> &'a AtomStore {
        self.system.atoms()
    }

    pub fn energy_record(&self) -> EnergyRecord {
        EnergyRecord::from(self.state)
    }
}

impl From<&SimulationState> for EnergyRecord {
    fn from(state: &SimulationState) -> Self {
        EnergyRecord {
            step: state.step,
            potential: state.potential_energy,
            kinetic: state.kinetic_energy,
            total: state.total_energy,
            temperature: state.temperature,
            average_temperature: state.average_temperature,
            scale_factor: state.scale_factor,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub backend: &'static str,
    pub state: SimulationState,
    pub elapsed: Duration,
}
