use super::atoms::AtomStore;
use super::boundary::{Displacement, PeriodicBoundary};

/// Default chemical symbol written to structure files.
pub const DEFAULT_SPECIES: &str = "Cu";

/// Represents a complete particle system: the atoms and the boundary they live in.
///
/// This struct is the aggregate that preparation code produces and that the
/// engine advances. It owns all per-atom arrays; nothing about a run is kept
/// in process-wide state.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSystem {
    atoms: AtomStore,
    boundary: PeriodicBoundary,
    species: String,
}

impl ParticleSystem {
    /// Creates a new particle system.
    ///
    /// # Arguments
    ///
    /// * `atoms` - The atom store with mobile atoms first.
    /// * `boundary` - The periodic box and wrapping convention of the run.
    pub fn new(atoms: AtomStore, boundary: PeriodicBoundary) -> Self {
        Self {
            atoms,
            boundary,
            species: DEFAULT_SPECIES.to_string(),
        }
    }

    /// Sets the chemical symbol used when the system is written to disk.
    pub fn with_species(mut self, species: &str) -> Self {
        self.species = species.to_string();
        self
    }

    pub fn atoms(&self) -> &AtomStore {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut AtomStore {
        &mut self.atoms
    }

    pub fn boundary(&self) -> &PeriodicBoundary {
        &self.boundary
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    /// Splits the system into a mutable atom store and the shared boundary.
    ///
    /// # Return
    ///
    /// A tuple of `(&mut AtomStore, &PeriodicBoundary)` for code that updates
    /// atoms while applying the boundary convention.
    pub fn split_mut(&mut self) -> (&mut AtomStore, &PeriodicBoundary) {
        (&mut self.atoms, &self.boundary)
    }

    /// Returns the number of atoms (`NN`).
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Returns the number of mobile atoms (`NA`).
    pub fn mobile_count(&self) -> usize {
        self.atoms.mobile_count()
    }

    /// Computes the minimum-image displacement `x_i - x_j`.
    ///
    /// # Arguments
    ///
    /// * `i` - Index of the first atom.
    /// * `j` - Index of the second atom.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn displacement(&self, i: usize, j: usize) -> Displacement {
        let positions = self.atoms.positions();
        self.boundary.displacement_between(&positions[i], &positions[j])
    }

    /// Returns the minimum-image distance between atoms `i` and `j`.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.displacement(i, j).r
    }
}
