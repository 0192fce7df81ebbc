//! # Core Module
//!
//! Fundamental building blocks shared by every layer of pairdyn.
//!
//! ## Architecture
//!
//! - **Particle Representation** ([`models`]) - Atom storage, periodic box and the
//!   combined particle system
//! - **Interaction Law** ([`forcefield`]) - Potential parameters and the pairwise
//!   energy/force function
//! - **Structure Preparation** ([`preparation`]) - Lattice generation, frozen-layer
//!   partitioning and initial velocities
//! - **File I/O** ([`io`]) - Structure files and energy logs
//!
//! Nothing in this module keeps hidden state: every function takes the data it
//! works on explicitly, so independent runs can coexist in one process.

pub mod forcefield;
pub mod io;
pub mod models;
pub mod preparation;
