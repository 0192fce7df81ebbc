use super::params::PotentialParams;

/// Default minimum separation, in length units, fed to the potential.
pub const DEFAULT_DISTANCE_FLOOR: f64 = 1.0e-2;

/// One `A·r^(-λ)·exp(-α·r²)` term of the pair potential.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairTerm {
    pub amplitude: f64,
    pub exponent: f64,
    pub decay: f64,
    pub secondary_decay: f64,
}

impl PairTerm {
    #[inline]
    pub fn energy(&self, r: f64) -> f64 {
        self.amplitude * r.powf(-self.exponent) * (-self.decay * r * r).exp()
    }

    /// Returns `(energy, -dU/dr)` of this term.
    #[inline]
    pub fn evaluate(&self, r: f64) -> (f64, f64) {
        let energy = self.energy(r);
        (
            energy,
            energy * (self.exponent / r + self.secondary_decay * r),
        )
    }
}

/// The host (double precision) implementation of the pair potential.
///
/// `U(r) = Σ_k A_k·r^(-RL_k)·exp(-AL_k·r²)` and the returned force magnitude is
/// `-dU/dr = Σ_k U_k(r)·(RL_k/r + D2_k·r)`, positive when repulsive. The device
/// kernel carries a single-precision copy of the same law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialModel {
    terms: [PairTerm; 2],
    floor: f64,
}

impl PotentialModel {
    pub fn new(params: &PotentialParams) -> Self {
        Self {
            terms: [
                PairTerm {
                    amplitude: params.amplitude_1,
                    exponent: params.exponent_1,
                    decay: params.decay_1,
                    secondary_decay: params.secondary_decay_1(),
                },
                PairTerm {
                    amplitude: params.amplitude_2,
                    exponent: params.exponent_2,
                    decay: params.decay_2,
                    secondary_decay: params.secondary_decay_2(),
                },
            ],
            floor: params.distance_floor,
        }
    }

    pub fn terms(&self) -> &[PairTerm; 2] {
        &self.terms
    }

    pub fn distance_floor(&self) -> f64 {
        self.floor
    }

    /// Evaluates `(energy, force magnitude)` at separation `r`.
    #[inline]
    pub fn evaluate(&self, r: f64) -> (f64, f64) {
        let r = r.max(self.floor);
        let (e1, f1) = self.terms[0].evaluate(r);
        let (e2, f2) = self.terms[1].evaluate(r);
        (e1 + e2, f1 + f2)
    }

    #[inline]
    pub fn energy(&self, r: f64) -> f64 {
        self.evaluate(r).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE * a.abs().max(1.0)
    }

    fn copper() -> PotentialModel {
        PotentialModel::new(&PotentialParams::copper())
    }

    #[test]
    fn energy_matches_closed_form_two_term_expression() {
        let p = PotentialParams::copper();
        let r: f64 = 2.5;
        let expected = p.amplitude_1 * r.powf(-p.exponent_1) * (-p.decay_1 * r * r).exp()
            + p.amplitude_2 * r.powf(-p.exponent_2) * (-p.decay_2 * r * r).exp();
        assert!(f64_approx_equal(copper().energy(r), expected));
    }

    #[test]
    fn force_is_negative_derivative_of_energy() {
        let model = copper();
        let h = 1e-6;
        for &r in &[1.2, 2.0, 2.5, 3.3, 5.0] {
            let numeric = -(model.energy(r + h) - model.energy(r - h)) / (2.0 * h);
            let (_, force) = model.evaluate(r);
            assert!(
                (numeric - force).abs() < 1e-5 * force.abs().max(1.0),
                "r = {r}: numeric {numeric}, analytic {force}"
            );
        }
    }

    #[test]
    fn potential_is_repulsive_at_short_range_and_attractive_at_long_range() {
        let model = copper();
        let (_, short) = model.evaluate(1.5);
        let (_, long) = model.evaluate(3.0);
        assert!(short > 0.0);
        assert!(long < 0.0);
        assert!(model.energy(2.2) < model.energy(1.8));
        assert!(model.energy(2.2) < model.energy(3.0));
    }

    #[test]
    fn separations_below_floor_are_clamped() {
        let model = copper();
        let at_floor = model.evaluate(DEFAULT_DISTANCE_FLOOR);
        assert_eq!(model.evaluate(0.0), at_floor);
        assert_eq!(model.evaluate(1e-9), at_floor);
        assert!(at_floor.0.is_finite() && at_floor.1.is_finite());
    }

    #[test]
    fn energy_vanishes_at_large_separation() {
        assert!(copper().energy(20.0).abs() < 1e-30);
    }
}
