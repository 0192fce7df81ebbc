//! # Engine Module
//!
//! The stateful layer that advances a prepared [`ParticleSystem`](crate::core::models::system::ParticleSystem)
//! through time.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Run length, interval events, target temperature and backend choice
//! - **Force Evaluation** ([`evaluator`]) - The sequential and parallel backends behind one trait
//! - **Time Stepping** ([`dynamics`], [`integrator`]) - Velocity Verlet, thermostat and rolling averages
//! - **Run State** ([`state`]) - Energies, temperatures and the snapshots given to report writers
//! - **Reporting** ([`observer`], [`progress`]) - Hooks for file writers and progress displays
//! - **Validation** ([`consistency`]) - Cross-checks the two backends on the same input
//! - **Error Handling** ([`error`]) - Engine and accelerator error types
//!
//! The engine assumes mobile atoms precede frozen ones and, for periodic runs,
//! that every atom starts inside the box. It checks these properties but never
//! repairs them.

pub mod config;
pub mod consistency;
pub mod dynamics;
pub mod error;
pub mod evaluator;
pub mod integrator;
pub mod observer;
pub mod progress;
pub mod state;
