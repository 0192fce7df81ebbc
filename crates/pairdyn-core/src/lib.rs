//! # pairdyn Core Library
//!
//! Molecular dynamics of a particle ensemble interacting through a pairwise
//! two-exponential potential under periodic boundary conditions. Forces can be
//! evaluated by a sequential host evaluator or by a data-parallel device
//! evaluator working in single precision; the two are required to agree within
//! a stated tolerance.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`AtomStore`,
//!   `PeriodicBox`, `ParticleSystem`), the pure potential law, structure
//!   preparation helpers and file formats.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer: force evaluators
//!   (sequential and parallel), the velocity-Verlet integrator with thermostat
//!   and rolling statistics, run configuration, and the consistency check
//!   between backends.
//!
//! - **[`workflows`]: The Public API.** Ties `engine` and `core` together into
//!   complete procedures: running a simulation and cross-validating backends.

pub mod core;
pub mod engine;
pub mod workflows;
