use nalgebra::Vector3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BoxError {
    #[error("Box length along axis {axis} must be positive and finite (found {length})")]
    InvalidLength { axis: usize, length: f64 },
    #[error("Cannot derive box boundaries from an empty set of positions")]
    NoPositions,
}

/// An orthorhombic periodic cell.
///
/// Stores, per axis, the length `PP`, the lower bound `PA`, the upper bound
/// `PB = PA + PP` and the half-length `PL = PP / 2`. The derived quantities are
/// computed once on construction so the invariants cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBox {
    lengths: Vector3<f64>,
    lower: Vector3<f64>,
    upper: Vector3<f64>,
    half: Vector3<f64>,
}

impl PeriodicBox {
    /// Creates a box from its lower corner and its edge lengths.
    ///
    /// # Arguments
    ///
    /// * `lower` - The lowest coordinate on each axis (`PA`).
    /// * `lengths` - The periodic length on each axis (`PP`).
    ///
    /// # Errors
    ///
    /// Returns [`BoxError::InvalidLength`] if any length is not a positive finite number.
    pub fn new(lower: Vector3<f64>, lengths: Vector3<f64>) -> Result<Self, BoxError> {
        for axis in 0..3 {
            let length = lengths[axis];
            if !(length.is_finite() && length > 0.0) {
                return Err(BoxError::InvalidLength { axis, length });
            }
        }
        Ok(Self {
            lengths,
            lower,
            upper: lower + lengths,
            half: lengths * 0.5,
        })
    }

    /// Derives a box from the extent of a set of positions.
    ///
    /// The lower bound is the per-axis minimum coordinate and the length is the
    /// coordinate span plus `padding`, which for a crystal is the lattice repeat
    /// left over between the last plane and the first periodic image.
    ///
    /// # Errors
    ///
    /// Returns [`BoxError::NoPositions`] for an empty slice and
    /// [`BoxError::InvalidLength`] if the padded span is not positive.
    pub fn enclosing(positions: &[Vector3<f64>], padding: Vector3<f64>) -> Result<Self, BoxError> {
        let first = positions.first().ok_or(BoxError::NoPositions)?;
        let (min, max) = positions
            .iter()
            .fold((*first, *first), |(min, max), p| (min.inf(p), max.sup(p)));
        Self::new(min, max - min + padding)
    }

    pub fn lengths(&self) -> &Vector3<f64> {
        &self.lengths
    }

    pub fn lower(&self) -> &Vector3<f64> {
        &self.lower
    }

    pub fn upper(&self) -> &Vector3<f64> {
        &self.upper
    }

    pub fn half_lengths(&self) -> &Vector3<f64> {
        &self.half
    }

    pub fn volume(&self) -> f64 {
        self.lengths.x * self.lengths.y * self.lengths.z
    }

    /// Returns `true` if the point lies inside the closed box `[PA, PB]`.
    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        (0..3).all(|axis| point[axis] >= self.lower[axis] && point[axis] <= self.upper[axis])
    }

    /// Maps a point back into the box along every axis.
    pub fn wrap_position(&self, point: &mut Vector3<f64>) {
        for axis in 0..3 {
            let offset = (point[axis] - self.lower[axis]).rem_euclid(self.lengths[axis]);
            point[axis] = self.lower[axis] + offset;
        }
    }

    /// Applies the minimum-image correction to one displacement component.
    ///
    /// A single full-length shift is applied, which is exact as long as both
    /// endpoints lie inside the box. The result lies in `(-PL, PL]`.
    #[inline]
    pub fn minimum_image(&self, component: f64, axis: usize) -> f64 {
        if component > self.half[axis] {
            component - self.lengths[axis]
        } else if component <= -self.half[axis] {
            component + self.lengths[axis]
        } else {
            component
        }
    }
}

/// The separation between two atoms as seen by the potential.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement {
    /// Components of `x_i - x_j` after any periodic correction.
    pub delta: Vector3<f64>,
    pub r2: f64,
    pub r: f64,
}

/// The boundary convention of a run: a periodic box and whether wrapping is on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBoundary {
    cell: PeriodicBox,
    periodic: bool,
}

impl PeriodicBoundary {
    pub fn new(cell: PeriodicBox, periodic: bool) -> Self {
        Self { cell, periodic }
    }

    pub fn cell(&self) -> &PeriodicBox {
        &self.cell
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Computes the displacement `a - b`, wrapped to the nearest periodic image
    /// when wrapping is enabled.
    #[inline]
    pub fn displacement_between(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> Displacement {
        let mut delta = a - b;
        if self.periodic {
            for axis in 0..3 {
                delta[axis] = self.cell.minimum_image(delta[axis], axis);
            }
        }
        let r2 = delta.norm_squared();
        Displacement {
            delta,
            r2,
            r: r2.sqrt(),
        }
    }

    /// Folds a moved position back into the box. Does nothing for open boundaries.
    #[inline]
    pub fn wrap_position(&self, point: &mut Vector3<f64>) {
        if self.periodic {
            self.cell.wrap_position(point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn cube(length: f64) -> PeriodicBox {
        PeriodicBox::new(Vector3::zeros(), Vector3::repeat(length)).unwrap()
    }

    #[test]
    fn new_derives_upper_bound_and_half_length() {
        let cell = PeriodicBox::new(Vector3::new(-1.0, 0.0, 2.0), Vector3::new(4.0, 6.0, 8.0))
            .unwrap();
        assert_eq!(*cell.upper(), Vector3::new(3.0, 6.0, 10.0));
        assert_eq!(*cell.half_lengths(), Vector3::new(2.0, 3.0, 4.0));
        assert_eq!(cell.volume(), 192.0);
    }

    #[test]
    fn new_rejects_non_positive_length() {
        let result = PeriodicBox::new(Vector3::zeros(), Vector3::new(1.0, 0.0, 1.0));
        assert_eq!(
            result,
            Err(BoxError::InvalidLength {
                axis: 1,
                length: 0.0
            })
        );
    }

    #[test]
    fn enclosing_adds_padding_to_coordinate_span() {
        let positions = vec![
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(4.0, -1.0, 5.0),
            Vector3::new(2.0, 0.0, 3.5),
        ];
        let cell = PeriodicBox::enclosing(&positions, Vector3::repeat(0.5)).unwrap();
        assert_eq!(*cell.lower(), Vector3::new(1.0, -1.0, 3.0));
        assert_eq!(*cell.lengths(), Vector3::new(3.5, 3.5, 2.5));
    }

    #[test]
    fn enclosing_fails_for_empty_positions() {
        assert_eq!(
            PeriodicBox::enclosing(&[], Vector3::repeat(1.0)),
            Err(BoxError::NoPositions)
        );
    }

    #[test]
    fn minimum_image_maps_boundary_value_to_positive_half() {
        let cell = cube(10.0);
        assert_eq!(cell.minimum_image(-5.0, 0), 5.0);
        assert_eq!(cell.minimum_image(5.0, 0), 5.0);
        assert_eq!(cell.minimum_image(6.0, 1), -4.0);
        assert_eq!(cell.minimum_image(-7.5, 2), 2.5);
        assert_eq!(cell.minimum_image(1.0, 2), 1.0);
    }

    #[test]
    fn wrapped_components_lie_in_half_open_interval_for_random_pairs() {
        let cell = PeriodicBox::new(Vector3::new(-3.0, 1.0, 0.0), Vector3::new(7.0, 11.0, 5.0))
            .unwrap();
        let boundary = PeriodicBoundary::new(cell, true);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..2000 {
            let sample = |rng: &mut StdRng| {
                Vector3::from_fn(|axis, _| {
                    rng.gen_range(cell.lower()[axis]..=cell.upper()[axis])
                })
            };
            let a = sample(&mut rng);
            let b = sample(&mut rng);
            let d = boundary.displacement_between(&a, &b);
            for axis in 0..3 {
                let half = cell.half_lengths()[axis];
                assert!(d.delta[axis] > -half && d.delta[axis] <= half);
            }
            assert!((d.r2 - d.delta.norm_squared()).abs() < 1e-12);
        }
    }

    #[test]
    fn displacement_is_not_wrapped_for_open_boundaries() {
        let boundary = PeriodicBoundary::new(cube(10.0), false);
        let d = boundary.displacement_between(&Vector3::new(9.0, 0.0, 0.0), &Vector3::zeros());
        assert_eq!(d.delta.x, 9.0);
        assert_eq!(d.r, 9.0);
    }

    #[test]
    fn displacement_picks_nearest_image() {
        let boundary = PeriodicBoundary::new(cube(10.0), true);
        let d = boundary.displacement_between(&Vector3::new(9.5, 0.0, 0.0), &Vector3::new(0.5, 0.0, 0.0));
        assert!((d.delta.x + 1.0).abs() < 1e-12);
        assert!((d.r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrap_position_folds_points_into_box() {
        let cell = cube(4.0);
        let mut p = Vector3::new(-0.5, 4.5, 2.0);
        cell.wrap_position(&mut p);
        assert!((p - Vector3::new(3.5, 0.5, 2.0)).norm() < 1e-12);
        assert!(cell.contains(&p));
    }

    #[test]
    fn open_boundary_does_not_wrap_positions() {
        let boundary = PeriodicBoundary::new(cube(4.0), false);
        let mut p = Vector3::new(-0.5, 4.5, 2.0);
        boundary.wrap_position(&mut p);
        assert_eq!(p, Vector3::new(-0.5, 4.5, 2.0));
    }
}
