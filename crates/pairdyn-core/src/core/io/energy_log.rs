use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnergyLogError {
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("CSV error: {0}")]
    Write(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of the energy history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyRecord {
    pub step: u64,
    pub potential: f64,
    pub kinetic: f64,
    pub total: f64,
    pub temperature: f64,
    pub average_temperature: f64,
    pub scale_factor: f64,
}

/// Streams [`EnergyRecord`]s as CSV with a header row.
pub struct EnergyLogWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl EnergyLogWriter<File> {
    pub fn create(path: &Path) -> Result<Self, EnergyLogError> {
        let writer = csv::Writer::from_path(path).map_err(|e| EnergyLogError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Ok(Self { writer })
    }
}

impl<W: Write> EnergyLogWriter<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    pub fn append(&mut self, record: &EnergyRecord) -> Result<(), EnergyLogError> {
        self.writer.serialize(record)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), EnergyLogError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, EnergyLogError> {
        self.writer
            .into_inner()
            .map_err(|e| EnergyLogError::Io(e.into_error()))
    }
}

/// Reads a complete energy history back from disk.
pub fn read_energy_log(path: &Path) -> Result<Vec<EnergyRecord>, EnergyLogError> {
    let csv_error = |source| EnergyLogError::Csv {
        path: path.to_string_lossy().to_string(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    reader
        .deserialize::<EnergyRecord>()
        .map(|row| row.map_err(csv_error))
        .collect()
}
