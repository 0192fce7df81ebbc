//! # Core Models Module
//!
//! Data structures describing the particles of a run and the space they occupy.
//!
//! ## Key Components
//!
//! - [`atoms`] - `AtomStore`, the owned position/velocity/force/energy arrays with
//!   mobile atoms ahead of frozen boundary atoms
//! - [`boundary`] - `PeriodicBox` and the minimum-image `PeriodicBoundary`
//! - [`system`] - `ParticleSystem`, the aggregate handed to the engine
//!
//! ```ignore
//! use pairdyn::core::models::{atoms::AtomStore, boundary::*, system::ParticleSystem};
//!
//! let cell = PeriodicBox::new(Vector3::zeros(), Vector3::repeat(10.0))?;
//! let atoms = AtomStore::new(positions, mobile_count)?;
//! let system = ParticleSystem::new(atoms, PeriodicBoundary::new(cell, true));
//! let r = system.distance(0, 1);
//! ```

pub mod atoms;
pub mod boundary;
pub mod system;
