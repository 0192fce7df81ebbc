use thiserror::Error;

use super::config::ConfigError;
use super::observer::ObserverError;

/// A failure of the accelerator, named after the operation that failed.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DeviceError {
    #[error("Device allocation of {elements} elements for '{buffer}' failed: {reason}")]
    Allocation {
        buffer: &'static str,
        elements: usize,
        reason: String,
    },

    #[error("Device dispatch of kernel '{kernel}' failed: {reason}")]
    Dispatch { kernel: &'static str, reason: String },

    #[error("Device transfer of '{buffer}' failed: host has {host} elements, device has {device}")]
    Transfer {
        buffer: &'static str,
        host: usize,
        device: usize,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Accelerator failure: {0}")]
    Device(#[from] DeviceError),

    #[error("Non-finite {quantity} on atom {atom} at step {step}")]
    NonFinite {
        step: u64,
        quantity: &'static str,
        atom: usize,
    },

    #[error("Report writer failed: {0}")]
    Report(#[source] ObserverError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_message_names_step_quantity_and_atom() {
        let err = EngineError::NonFinite {
            step: 17,
            quantity: "velocity",
            atom: 3,
        };
        assert_eq!(err.to_string(), "Non-finite velocity on atom 3 at step 17");
    }

    #[test]
    fn device_errors_convert_into_engine_errors() {
        let err: EngineError = DeviceError::Dispatch {
            kernel: "forces",
            reason: "worker panicked".into(),
        }
        .into();
        assert!(matches!(err, EngineError::Device(DeviceError::Dispatch { .. })));
        assert!(err.to_string().contains("forces"));
    }
}
