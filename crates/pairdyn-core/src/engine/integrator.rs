use super::config::SimulationConfig;
use super::error::EngineError;
use super::evaluator::ForceEvaluator;
use super::observer::Observer;
use super::progress::{Progress, ProgressReporter};
use super::state::{RunSummary, SimulationState, Snapshot};
use crate::core::models::system::ParticleSystem;
use std::time::Instant;
use tracing::{debug, debug_span, info, warn};

/// Steps remaining until the next multiple of `interval`; `None` when the
/// event is disabled.
fn steps_to_boundary(step: u64, interval: u64) -> Option<u64> {
    (interval > 0).then(|| interval - step % interval)
}

fn is_due(step: u64, interval: u64) -> bool {
    interval > 0 && step % interval == 0
}

/// Drives a [`ParticleSystem`] from step `0` to `MDSL`.
///
/// Each iteration asks the evaluator for a batch of velocity-Verlet steps,
/// folds the batch energies into the [`SimulationState`], and then runs the
/// interval events of the last step in the batch: thermostat rescaling,
/// closing the averaging window, and the periodic report. Batches are cut
/// short so that no event step falls inside one.
pub struct Integrator<'r> {
    config: SimulationConfig,
    system: ParticleSystem,
    evaluator: Box<dyn ForceEvaluator>,
    state: SimulationState,
    prepared: bool,
    progress: ProgressReporter<'r>,
}

impl<'r> Integrator<'r> {
    /// Validates `config` against `system` and takes ownership of both.
    pub fn new(
        config: SimulationConfig,
        system: ParticleSystem,
        evaluator: Box<dyn ForceEvaluator>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        config.validate_system(&system)?;
        Ok(Self {
            config,
            system,
            evaluator,
            state: SimulationState::default(),
            prepared: false,
            progress: ProgressReporter::new(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressReporter<'r>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn system(&self) -> &ParticleSystem {
        &self.system
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn backend_name(&self) -> &'static str {
        self.evaluator.name()
    }

    pub fn is_finished(&self) -> bool {
        self.state.step >= self.config.total_steps
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            system: &self.system,
            state: &self.state,
            config: &self.config,
        }
    }

    pub fn into_system(self) -> ParticleSystem {
        self.system
    }

    /// Evaluates the initial forces and fills in the step-zero state.
    ///
    /// Called lazily by [`advance`](Self::advance); repeated calls do nothing.
    pub fn prepare(&mut self) -> Result<(), EngineError> {
        if self.prepared {
            return Ok(());
        }
        let potential = self.evaluator.evaluate(&mut self.system)?;
        self.check_finite()?;
        let kinetic = self.system.atoms().kinetic_energy();
        let temperature = kinetic * self.temperature_per_kinetic();
        self.state = SimulationState::initial(potential, kinetic, temperature);
        self.prepared = true;
        debug!(
            potential,
            kinetic, temperature, "Initial forces evaluated on the {} backend.",
            self.evaluator.name()
        );
        Ok(())
    }

    /// Advances up to `steps` steps, stopping at `MDSL`. Returns the number of
    /// steps taken. Zero steps leave the run untouched.
    pub fn advance(&mut self, steps: u64, observer: &mut dyn Observer) -> Result<u64, EngineError> {
        if steps == 0 {
            return Ok(0);
        }
        self.prepare()?;
        let start = self.state.step;
        let target = start.saturating_add(steps).min(self.config.total_steps);

        while self.state.step < target {
            let batch = self.next_batch_len(target);
            let summary = debug_span!("batch", start = self.state.step, steps = batch)
                .in_scope(|| {
                    self.evaluator
                        .advance_batch(&mut self.system, batch, self.config.params.time_step)
                })?;
            if summary.steps != batch {
                return Err(EngineError::Internal(format!(
                    "evaluator advanced {} steps, {} requested",
                    summary.steps, batch
                )));
            }
            self.state.record_batch(
                batch,
                (summary.potential_sum, summary.kinetic_sum),
                (summary.last_potential, summary.last_kinetic),
                self.temperature_per_kinetic(),
            );
            self.check_finite()?;
            self.run_events(observer)?;
            self.progress.report(Progress::Status {
                step: self.state.step,
                temperature: self.state.temperature,
                total_energy: self.state.total_energy,
            });
            self.progress.report(Progress::TaskAdvance { steps: batch });
        }
        Ok(self.state.step - start)
    }

    /// Runs the whole trajectory: initial report, every remaining step, final report.
    pub fn run(&mut self, observer: &mut dyn Observer) -> Result<RunSummary, EngineError> {
        let started = Instant::now();
        self.prepare()?;
        info!(
            atoms = self.system.len(),
            mobile = self.system.mobile_count(),
            steps = self.config.total_steps,
            backend = self.evaluator.name(),
            "Starting molecular dynamics run."
        );
        observer
            .initial(&self.snapshot())
            .map_err(EngineError::Report)?;

        let remaining = self.config.total_steps - self.state.step;
        self.progress.report(Progress::TaskStart {
            total_steps: remaining,
        });
        self.advance(remaining, observer)?;
        self.progress.report(Progress::TaskFinish);

        observer
            .finished(&self.snapshot())
            .map_err(EngineError::Report)?;
        let elapsed = started.elapsed();
        info!(
            step = self.state.step,
            total_energy = self.state.total_energy,
            temperature = self.state.temperature,
            elapsed_ms = elapsed.as_millis() as u64,
            "Run finished."
        );
        Ok(RunSummary {
            backend: self.evaluator.name(),
            state: self.state.clone(),
            elapsed,
        })
    }

    fn temperature_per_kinetic(&self) -> f64 {
        let mobile = self.system.mobile_count();
        if mobile == 0 {
            return 0.0;
        }
        2.0 / (3.0 * mobile as f64 * self.config.params.boltzmann)
    }

    fn next_batch_len(&self, target: u64) -> u64 {
        let step = self.state.step;
        [
            self.config.rescale_interval,
            self.config.averaging_window,
            self.config.report_interval,
        ]
        .into_iter()
        .filter_map(|interval| steps_to_boundary(step, interval))
        .fold(
            self.evaluator.max_batch_steps().max(1).min(target - step),
            u64::min,
        )
    }

    fn check_finite(&self) -> Result<(), EngineError> {
        match self.system.atoms().first_non_finite() {
            Some((quantity, atom)) => Err(EngineError::NonFinite {
                step: self.state.step,
                quantity,
                atom,
            }),
            None => Ok(()),
        }
    }

    fn run_events(&mut self, observer: &mut dyn Observer) -> Result<(), EngineError> {
        let step = self.state.step;
        if is_due(step, self.config.rescale_interval) {
            self.rescale();
        }
        if is_due(step, self.config.averaging_window) {
            self.state.close_window();
            debug!(
                step,
                average_temperature = self.state.average_temperature,
                "Averaging window closed."
            );
        }
        if is_due(step, self.config.report_interval) {
            observer
                .periodic(&self.snapshot())
                .map_err(EngineError::Report)?;
        }
        Ok(())
    }

    /// Scales mobile velocities by `sqrt(TE / T)`.
    fn rescale(&mut self) {
        let temperature = self.state.temperature;
        if temperature <= 0.0 {
            warn!(
                step = self.state.step,
                "Temperature is zero; skipping velocity rescale."
            );
            self.state.scale_factor = 1.0;
            return;
        }
        let factor = (self.config.target_temperature / temperature).sqrt();
        for v in self.system.atoms_mut().mobile_velocities_mut() {
            *v *= factor;
        }
        let kinetic = self.system.atoms().kinetic_energy();
        self.state.set_instantaneous(
            self.state.potential_energy,
            kinetic,
            kinetic * self.temperature_per_kinetic(),
        );
        self.state.scale_factor = factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::PotentialParams;
    use crate::core::models::atoms::AtomStore;
    use crate::core::models::boundary::{PeriodicBoundary, PeriodicBox};
    use crate::engine::config::{Backend, SimulationConfigBuilder};
    use crate::engine::evaluator::{BatchSummary, create_evaluator};
    use crate::engine::observer::{EnergyHistory, NullObserver, ObserverError};
    use nalgebra::Vector3;

    fn dimer() -> ParticleSystem {
        let mut atoms = AtomStore::from_positions(vec![
            Vector3::new(4.0, 5.0, 5.0),
            Vector3::new(6.4, 5.0, 5.0),
        ]);
        atoms
            .set_velocities(vec![Vector3::new(0.05, 0.01, 0.0), Vector3::new(-0.05, 0.0, 0.02)])
            .unwrap();
        let cell = PeriodicBox::new(Vector3::zeros(), Vector3::repeat(10.0)).unwrap();
        ParticleSystem::new(atoms, PeriodicBoundary::new(cell, true))
    }

    fn integrator(
        steps: u64,
        rescale: u64,
        window: u64,
        report: u64,
        backend: Backend,
    ) -> Integrator<'static> {
        let params = PotentialParams::copper();
        let config = SimulationConfigBuilder::new()
            .params(params)
            .total_steps(steps)
            .rescale_interval(rescale)
            .averaging_window(window)
            .report_interval(report)
            .target_temperature(300.0)
            .backend(backend)
            .build()
            .unwrap();
        let evaluator = create_evaluator(&config.backend, &params).unwrap();
        Integrator::new(config, dimer(), evaluator).unwrap()
    }

    #[test]
    fn steps_to_boundary_counts_to_next_multiple() {
        assert_eq!(steps_to_boundary(0, 10), Some(10));
        assert_eq!(steps_to_boundary(7, 10), Some(3));
        assert_eq!(steps_to_boundary(10, 10), Some(10));
        assert_eq!(steps_to_boundary(3, 0), None);
    }

    #[test]
    fn zero_steps_is_a_no_op() {
        let mut md = integrator(10, 0, 0, 0, Backend::Sequential);
        let before_system = md.system().clone();
        let before_state = md.state().clone();
        assert_eq!(md.advance(0, &mut NullObserver).unwrap(), 0);
        assert_eq!(md.system(), &before_system);
        assert_eq!(md.state(), &before_state);

        md.advance(3, &mut NullObserver).unwrap();
        let system = md.system().clone();
        let state = md.state().clone();
        md.advance(0, &mut NullObserver).unwrap();
        assert_eq!(md.system(), &system);
        assert_eq!(md.state(), &state);
    }

    #[test]
    fn advance_is_clamped_to_total_steps() {
        let mut md = integrator(5, 0, 0, 0, Backend::Sequential);
        assert_eq!(md.advance(3, &mut NullObserver).unwrap(), 3);
        assert_eq!(md.advance(10, &mut NullObserver).unwrap(), 2);
        assert!(md.is_finished());
        assert_eq!(md.advance(1, &mut NullObserver).unwrap(), 0);
    }

    #[test]
    fn thermostat_sets_target_temperature_on_rescale_steps() {
        let mut md = integrator(20, 5, 0, 5, Backend::Sequential);
        let mut history = EnergyHistory::default();
        md.run(&mut history).unwrap();
        assert_eq!(history.periodic.len(), 4);
        for record in &history.periodic {
            assert!(
                (record.temperature - 300.0).abs() < 1e-9,
                "step {}: {}",
                record.step,
                record.temperature
            );
            assert_ne!(record.scale_factor, 1.0);
        }
    }

    #[test]
    fn observer_sees_initial_periodic_and_final_snapshots() {
        let mut md = integrator(12, 0, 4, 4, Backend::Sequential);
        let mut history = EnergyHistory::default();
        let summary = md.run(&mut history).unwrap();

        assert_eq!(history.initial.map(|r| r.step), Some(0));
        let steps: Vec<u64> = history.periodic.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![4, 8, 12]);
        assert_eq!(history.finished.map(|r| r.step), Some(12));
        assert_eq!(summary.state.step, 12);
        assert_eq!(summary.backend, "sequential");
    }

    #[test]
    fn batches_stop_at_event_boundaries() {
        let mut md = integrator(
            20,
            7,
            0,
            0,
            Backend::Parallel {
                batch_steps: 5,
                threads: Some(1),
            },
        );
        md.prepare().unwrap();
        let mut lengths = Vec::new();
        while !md.is_finished() {
            let len = md.next_batch_len(md.config().total_steps);
            lengths.push(len);
            md.advance(len, &mut NullObserver).unwrap();
        }
        assert_eq!(lengths, vec![5, 2, 5, 2, 5, 1]);
    }

    #[test]
    fn averaging_window_reports_mean_temperature() {
        let mut md = integrator(4, 0, 4, 0, Backend::Sequential);
        let mut temperatures = Vec::new();
        for _ in 0..4 {
            md.advance(1, &mut NullObserver).unwrap();
            temperatures.push(md.state().temperature);
        }
        let mean = temperatures.iter().sum::<f64>() / 4.0;
        assert!((md.state().average_temperature - mean).abs() < 1e-9 * mean);
        assert_eq!(md.state().window_steps(), 0);
    }

    struct Exploding;

    impl ForceEvaluator for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn evaluate(&mut self, system: &mut ParticleSystem) -> Result<f64, EngineError> {
            let (_, forces, _) = system.atoms_mut().force_view();
            forces.fill(Vector3::zeros());
            Ok(0.0)
        }

        fn advance_batch(
            &mut self,
            system: &mut ParticleSystem,
            steps: u64,
            _dt: f64,
        ) -> Result<BatchSummary, EngineError> {
            system.atoms_mut().mobile_velocities_mut()[1].z = f64::NAN;
            let mut summary = BatchSummary::default();
            for _ in 0..steps {
                summary.push(0.0, f64::NAN);
            }
            Ok(summary)
        }
    }

    #[test]
    fn non_finite_velocity_halts_the_run() {
        let config = SimulationConfigBuilder::new()
            .params(PotentialParams::copper())
            .total_steps(10)
            .target_temperature(300.0)
            .build()
            .unwrap();
        let mut md = Integrator::new(config, dimer(), Box::new(Exploding)).unwrap();
        let err = md.advance(1, &mut NullObserver).unwrap_err();
        assert!(matches!(
            err,
            EngineError::NonFinite {
                step: 1,
                quantity: "velocity",
                atom: 1
            }
        ));
    }

    struct Failing;

    impl Observer for Failing {
        fn periodic(&mut self, _snapshot: &Snapshot<'_>) -> Result<(), ObserverError> {
            Err("disk full".into())
        }
    }

    #[test]
    fn observer_failure_aborts_the_run() {
        let mut md = integrator(10, 0, 0, 2, Backend::Sequential);
        let err = md.run(&mut Failing).unwrap_err();
        assert!(matches!(err, EngineError::Report(_)));
        assert_eq!(md.state().step, 2);
    }
}
