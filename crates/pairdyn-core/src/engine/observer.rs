use super::state::Snapshot;
use crate::core::io::energy_log::EnergyRecord;

pub type ObserverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Receives snapshots of a run: once before the first step, every report
/// interval, and once after the last step.
///
/// All hooks default to doing nothing. An error aborts the run with
/// [`EngineError::Report`](super::error::EngineError::Report).
pub trait Observer {
    fn initial(&mut self, _snapshot: &Snapshot<'_>) -> Result<(), ObserverError> {
        Ok(())
    }

    fn periodic(&mut self, _snapshot: &Snapshot<'_>) -> Result<(), ObserverError> {
        Ok(())
    }

    fn finished(&mut self, _snapshot: &Snapshot<'_>) -> Result<(), ObserverError> {
        Ok(())
    }
}

/// An observer that ignores every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// Keeps the energy record of every snapshot in memory.
#[derive(Debug, Default, Clone)]
pub struct EnergyHistory {
    pub initial: Option<EnergyRecord>,
    pub periodic: Vec<EnergyRecord>,
    pub finished: Option<EnergyRecord>,
}

impl Observer for EnergyHistory {
    fn initial(&mut self, snapshot: &Snapshot<'_>) -> Result<(), ObserverError> {
        self.initial = Some(snapshot.energy_record());
        Ok(())
    }

    fn periodic(&mut self, snapshot: &Snapshot<'_>) -> Result<(), ObserverError> {
        self.periodic.push(snapshot.energy_record());
        Ok(())
    }

    fn finished(&mut self, snapshot: &Snapshot<'_>) -> Result<(), ObserverError> {
        self.finished = Some(snapshot.energy_record());
        Ok(())
    }
}
