use nalgebra::Vector3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AtomStoreError {
    #[error("Mobile atom count {mobile} exceeds the total atom count {total}")]
    MobileExceedsTotal { mobile: usize, total: usize },
    #[error("Expected {expected} {quantity} entries, found {found}")]
    LengthMismatch {
        quantity: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Order must be a permutation of 0..{0}")]
    InvalidPermutation(usize),
}

/// The dynamic state of every atom in a run, stored as parallel arrays.
///
/// The first `mobile` atoms are integrated; the remaining atoms are frozen
/// boundary atoms that only act as interaction partners. Frozen atoms keep
/// zero velocity, force and energy.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomStore {
    positions: Vec<Vector3<f64>>,
    velocities: Vec<Vector3<f64>>,
    forces: Vec<Vector3<f64>>,
    energies: Vec<f64>,
    mobile: usize,
}

impl AtomStore {
    /// Creates a store where every atom is mobile and at rest.
    pub fn from_positions(positions: Vec<Vector3<f64>>) -> Self {
        let n = positions.len();
        Self {
            positions,
            velocities: vec![Vector3::zeros(); n],
            forces: vec![Vector3::zeros(); n],
            energies: vec![0.0; n],
            mobile: n,
        }
    }

    /// Creates a store with `mobile` leading mobile atoms.
    ///
    /// # Errors
    ///
    /// Returns [`AtomStoreError::MobileExceedsTotal`] if `mobile > positions.len()`.
    pub fn new(positions: Vec<Vector3<f64>>, mobile: usize) -> Result<Self, AtomStoreError> {
        let mut store = Self::from_positions(positions);
        store.set_mobile_count(mobile)?;
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of integrated atoms (`NA`).
    pub fn mobile_count(&self) -> usize {
        self.mobile
    }

    pub fn frozen_count(&self) -> usize {
        self.len() - self.mobile
    }

    /// Changes the number of leading mobile atoms, zeroing the dynamic state of
    /// atoms that become frozen.
    pub fn set_mobile_count(&mut self, mobile: usize) -> Result<(), AtomStoreError> {
        if mobile > self.len() {
            return Err(AtomStoreError::MobileExceedsTotal {
                mobile,
                total: self.len(),
            });
        }
        self.mobile = mobile;
        for i in mobile..self.len() {
            self.velocities[i] = Vector3::zeros();
            self.forces[i] = Vector3::zeros();
            self.energies[i] = 0.0;
        }
        Ok(())
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.positions
    }

    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }

    /// Velocities of the mobile atoms only.
    pub fn mobile_velocities_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.velocities[..self.mobile]
    }

    pub fn forces(&self) -> &[Vector3<f64>] {
        &self.forces
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// Replaces all velocities. Entries for frozen atoms are ignored and kept at zero.
    pub fn set_velocities(&mut self, velocities: Vec<Vector3<f64>>) -> Result<(), AtomStoreError> {
        if velocities.len() != self.len() {
            return Err(AtomStoreError::LengthMismatch {
                quantity: "velocity",
                expected: self.len(),
                found: velocities.len(),
            });
        }
        self.velocities = velocities;
        for v in &mut self.velocities[self.mobile..] {
            *v = Vector3::zeros();
        }
        Ok(())
    }

    /// Borrows positions read-only together with the force and energy slots.
    ///
    /// This is the view a force evaluation works on: positions form an immutable
    /// snapshot while the outputs are written.
    pub fn force_view(&mut self) -> (&[Vector3<f64>], &mut [Vector3<f64>], &mut [f64]) {
        (&self.positions, &mut self.forces, &mut self.energies)
    }

    /// Borrows mobile velocities mutably together with the forces.
    pub fn kick_view(&mut self) -> (&mut [Vector3<f64>], &[Vector3<f64>]) {
        let mobile = self.mobile;
        (&mut self.velocities[..mobile], &self.forces[..mobile])
    }

    /// Borrows mobile positions mutably together with their velocities.
    pub fn drift_view(&mut self) -> (&mut [Vector3<f64>], &[Vector3<f64>]) {
        let mobile = self.mobile;
        (&mut self.positions[..mobile], &self.velocities[..mobile])
    }

    /// Borrows the position, velocity, force and energy slots of the mobile atoms.
    ///
    /// Used when a complete dynamic state is copied back from an external buffer.
    pub fn mobile_state_mut(
        &mut self,
    ) -> (
        &mut [Vector3<f64>],
        &mut [Vector3<f64>],
        &mut [Vector3<f64>],
        &mut [f64],
    ) {
        let mobile = self.mobile;
        (
            &mut self.positions[..mobile],
            &mut self.velocities[..mobile],
            &mut self.forces[..mobile],
            &mut self.energies[..mobile],
        )
    }

    /// Kinetic energy `½·Σ|v|²` of the mobile atoms (unit mass).
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.velocities[..self.mobile]
            .iter()
            .map(|v| v.norm_squared())
            .sum::<f64>()
    }

    /// Instantaneous temperature `2·EKIN / (3·NA·BK)`; zero when nothing is mobile.
    pub fn temperature(&self, boltzmann: f64) -> f64 {
        if self.mobile == 0 {
            return 0.0;
        }
        2.0 * self.kinetic_energy() / (3.0 * self.mobile as f64 * boltzmann)
    }

    /// Sum of the per-atom potential energies.
    pub fn potential_energy(&self) -> f64 {
        self.energies.iter().sum()
    }

    /// Finds the first non-finite entry, reported as `(quantity, atom index)`.
    pub fn first_non_finite(&self) -> Option<(&'static str, usize)> {
        let arrays: [(&'static str, &[Vector3<f64>]); 3] = [
            ("position", &self.positions),
            ("velocity", &self.velocities),
            ("force", &self.forces),
        ];
        arrays.into_iter().find_map(|(quantity, values)| {
            values
                .iter()
                .position(|v| !v.iter().all(|c| c.is_finite()))
                .map(|index| (quantity, index))
        })
    }

    /// Reorders all arrays so that new atom `k` is old atom `order[k]`.
    ///
    /// The mobile count is left untouched; callers reassign it afterwards.
    pub fn reorder(&mut self, order: &[usize]) -> Result<(), AtomStoreError> {
        let n = self.len();
        let mut seen = vec![false; n];
        if order.len() != n {
            return Err(AtomStoreError::InvalidPermutation(n));
        }
        for &i in order {
            if i >= n || std::mem::replace(&mut seen[i], true) {
                return Err(AtomStoreError::InvalidPermutation(n));
            }
        }
        self.positions = order.iter().map(|&i| self.positions[i]).collect();
        self.velocities = order.iter().map(|&i| self.velocities[i]).collect();
        self.forces = order.iter().map(|&i| self.forces[i]).collect();
        self.energies = order.iter().map(|&i| self.energies[i]).collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_of_atoms(n: usize) -> Vec<Vector3<f64>> {
        (0..n).map(|i| Vector3::new(i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn from_positions_marks_every_atom_mobile() {
        let store = AtomStore::from_positions(line_of_atoms(4));
        assert_eq!(store.len(), 4);
        assert_eq!(store.mobile_count(), 4);
        assert_eq!(store.frozen_count(), 0);
        assert!(store.velocities().iter().all(|v| *v == Vector3::zeros()));
    }

    #[test]
    fn new_rejects_more_mobile_than_total_atoms() {
        let result = AtomStore::new(line_of_atoms(3), 4);
        assert_eq!(
            result,
            Err(AtomStoreError::MobileExceedsTotal {
                mobile: 4,
                total: 3
            })
        );
    }

    #[test]
    fn set_velocities_keeps_frozen_atoms_at_rest() {
        let mut store = AtomStore::new(line_of_atoms(3), 2).unwrap();
        store
            .set_velocities(vec![Vector3::repeat(1.0); 3])
            .unwrap();
        assert_eq!(store.velocities()[1], Vector3::repeat(1.0));
        assert_eq!(store.velocities()[2], Vector3::zeros());
    }

    #[test]
    fn set_velocities_rejects_wrong_length() {
        let mut store = AtomStore::from_positions(line_of_atoms(3));
        let result = store.set_velocities(vec![Vector3::zeros(); 2]);
        assert!(matches!(
            result,
            Err(AtomStoreError::LengthMismatch {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn kinetic_energy_counts_only_mobile_atoms() {
        let mut store = AtomStore::new(line_of_atoms(3), 3).unwrap();
        store
            .set_velocities(vec![
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
                Vector3::new(0.0, 0.0, 3.0),
            ])
            .unwrap();
        assert_eq!(store.kinetic_energy(), 7.0);
        store.set_mobile_count(2).unwrap();
        assert_eq!(store.kinetic_energy(), 2.5);
    }

    #[test]
    fn first_non_finite_reports_quantity_and_index() {
        let mut store = AtomStore::from_positions(line_of_atoms(3));
        assert_eq!(store.first_non_finite(), None);
        store.mobile_velocities_mut()[2].y = f64::NAN;
        assert_eq!(store.first_non_finite(), Some(("velocity", 2)));
        store.positions_mut()[1].z = f64::INFINITY;
        assert_eq!(store.first_non_finite(), Some(("position", 1)));
    }

    #[test]
    fn reorder_permutes_every_array() {
        let mut store = AtomStore::from_positions(line_of_atoms(3));
        store.mobile_velocities_mut()[0] = Vector3::new(5.0, 0.0, 0.0);
        store.reorder(&[2, 0, 1]).unwrap();
        assert_eq!(store.positions()[0].x, 2.0);
        assert_eq!(store.positions()[1].x, 0.0);
        assert_eq!(store.velocities()[1].x, 5.0);
    }

    #[test]
    fn reorder_rejects_duplicate_indices() {
        let mut store = AtomStore::from_positions(line_of_atoms(3));
        assert_eq!(
            store.reorder(&[0, 0, 1]),
            Err(AtomStoreError::InvalidPermutation(3))
        );
    }
}
