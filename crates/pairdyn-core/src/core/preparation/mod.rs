//! Builds starting configurations for the engine.
//!
//! These helpers produce a [`ParticleSystem`](crate::core::models::system::ParticleSystem)
//! that satisfies the engine's invariants: mobile atoms ahead of frozen ones and
//! every coordinate inside the periodic box. The engine validates only that
//! shape, not how it was produced.

pub mod lattice;
pub mod velocities;
