use pairdyn::core::forcefield::params::ParamLoadError;
use pairdyn::core::io::energy_log::EnergyLogError;
use pairdyn::core::io::xyz::XyzError;
use pairdyn::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Params(#[from] ParamLoadError),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Structure file error: {0}")]
    Structure(#[from] XyzError),

    #[error("Energy log error: {0}")]
    EnergyLog(#[from] EnergyLogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backends diverge: relative error {relative_error:.3e} exceeds tolerance {tolerance:.3e}")]
    Divergence { relative_error: f64, tolerance: f64 },

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
