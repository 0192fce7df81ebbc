use crate::core::models::atoms::{AtomStore, AtomStoreError};
use crate::core::models::boundary::{BoxError, PeriodicBoundary, PeriodicBox};
use crate::core::models::system::ParticleSystem;
use nalgebra::Vector3;
use serde::Deserialize;
use std::f64::consts::SQRT_2;
use std::str::FromStr;
use thiserror::Error;

/// Coordinates closer than this are treated as lying on the same atomic plane.
const PLANE_TOLERANCE: f64 = 1e-6;

const FCC_BASIS: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [0.5, 0.5, 0.0],
    [0.5, 0.0, 0.5],
    [0.0, 0.5, 0.5],
];

#[derive(Debug, Error, PartialEq)]
pub enum LatticeError {
    #[error("A lattice needs at least one layer of unit cells")]
    NoLayers,
    #[error("Nearest-neighbour distance must be positive and finite (found {0})")]
    InvalidSpacing(f64),
    #[error("Cannot freeze {requested} layers of a structure with {available} atomic planes")]
    TooManyFrozenLayers { requested: usize, available: usize },
    #[error(transparent)]
    Box(#[from] BoxError),
    #[error(transparent)]
    Atoms(#[from] AtomStoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("Unknown axis '{other}', expected x, y or z")),
        }
    }
}

/// A cubic block of face-centred cubic unit cells.
///
/// The lattice constant is `√2·RM`, so `RM` is the nearest-neighbour distance.
/// Atoms are generated with the first cell at the origin and the block repeats
/// itself exactly across the periodic box returned by [`FccLattice::cell`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FccLattice {
    pub layers: usize,
    pub nearest_neighbour: f64,
}

impl FccLattice {
    pub fn new(layers: usize, nearest_neighbour: f64) -> Result<Self, LatticeError> {
        if layers == 0 {
            return Err(LatticeError::NoLayers);
        }
        if !(nearest_neighbour.is_finite() && nearest_neighbour > 0.0) {
            return Err(LatticeError::InvalidSpacing(nearest_neighbour));
        }
        Ok(Self {
            layers,
            nearest_neighbour,
        })
    }

    pub fn lattice_constant(&self) -> f64 {
        SQRT_2 * self.nearest_neighbour
    }

    pub fn atom_count(&self) -> usize {
        4 * self.layers.pow(3)
    }

    pub fn positions(&self) -> Vec<Vector3<f64>> {
        let a = self.lattice_constant();
        let n = self.layers;
        let mut positions = Vec::with_capacity(self.atom_count());
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    let corner = Vector3::new(i as f64, j as f64, k as f64);
                    for basis in &FCC_BASIS {
                        positions.push((corner + Vector3::from(*basis)) * a);
                    }
                }
            }
        }
        positions
    }

    /// The periodic box in which the block tiles space.
    pub fn cell(&self) -> Result<PeriodicBox, LatticeError> {
        let a = self.lattice_constant();
        Ok(PeriodicBox::new(
            Vector3::zeros(),
            Vector3::repeat(a * self.layers as f64),
        )?)
    }

    /// Builds a system with every atom mobile and at rest.
    pub fn build(&self, periodic: bool) -> Result<ParticleSystem, LatticeError> {
        let atoms = AtomStore::from_positions(self.positions());
        Ok(ParticleSystem::new(
            atoms,
            PeriodicBoundary::new(self.cell()?, periodic),
        ))
    }
}

/// Sorts atoms along `axis` and freezes the lowest `frozen_layers` atomic planes.
///
/// Atoms are stably sorted by ascending coordinate; atoms of the frozen planes
/// are then moved behind all mobile atoms, keeping their sorted order. Returns
/// the resulting mobile count.
pub fn partition_frozen(
    atoms: &mut AtomStore,
    axis: Axis,
    frozen_layers: usize,
) -> Result<usize, LatticeError> {
    let a = axis.index();
    let positions = atoms.positions();
    let mut order: Vec<usize> = (0..positions.len()).collect();
    order.sort_by(|&i, &j| positions[i][a].total_cmp(&positions[j][a]));

    let mut planes = 0;
    let mut last_plane = f64::NEG_INFINITY;
    let mut frozen_end = 0;
    for (rank, &i) in order.iter().enumerate() {
        let coordinate = positions[i][a];
        if coordinate - last_plane > PLANE_TOLERANCE {
            planes += 1;
            last_plane = coordinate;
            if planes == frozen_layers + 1 {
                frozen_end = rank;
                break;
            }
        }
    }

    if frozen_layers > 0 && planes <= frozen_layers {
        return Err(LatticeError::TooManyFrozenLayers {
            requested: frozen_layers,
            available: planes,
        });
    }

    let (frozen, mobile) = order.split_at(frozen_end);
    let permutation: Vec<usize> = mobile.iter().chain(frozen.iter()).copied().collect();
    let mobile_count = mobile.len();
    atoms.reorder(&permutation)?;
    atoms.set_mobile_count(mobile_count)?;
    Ok(mobile_count)
}
