//! # Workflows Module
//!
//! High-level entry points that take a prepared system and a validated
//! configuration through a complete procedure.
//!
//! - **Simulation** ([`simulate`]) - Builds the selected backend and runs the
//!   integrator from step zero to the last step, feeding an observer.
//! - **Validation** ([`validate`]) - Runs the same input through both backends
//!   and reports whether they agree within a tolerance.

pub mod simulate;
pub mod validate;
