//! # Force Field Module
//!
//! The interaction law of pairdyn: a two-term exponential pair potential
//!
//! ```text
//! U(r) = A1·r^(-RL1)·exp(-AL1·r²) + A2·r^(-RL2)·exp(-AL2·r²)
//! ```
//!
//! with its force `-dU/dr`, both evaluated from a fixed [`params::PotentialParams`]
//! set that is shared read-only by every evaluator of a run.
//!
//! ## Key Components
//!
//! - [`params`] - Potential coefficients, run constants, TOML loading and validation
//! - [`potentials`] - The double-precision `PotentialModel`
//!
//! Separations below the configured distance floor are clamped rather than
//! evaluated, so coincident atoms produce a large but finite repulsion.

pub mod params;
pub mod potentials;
