//! Host-side velocity-Verlet kernels (unit mass).

use crate::core::models::atoms::AtomStore;
use crate::core::models::system::ParticleSystem;

/// `v += f·dt/2` for every mobile atom.
pub fn half_kick(atoms: &mut AtomStore, dt: f64) {
    let (velocities, forces) = atoms.kick_view();
    let half_dt = 0.5 * dt;
    for (v, f) in velocities.iter_mut().zip(forces) {
        *v += f * half_dt;
    }
}

/// `x += v·dt` for every mobile atom, folded back into the periodic box.
pub fn drift(system: &mut ParticleSystem, dt: f64) {
    let (atoms, boundary) = system.split_mut();
    let (positions, velocities) = atoms.drift_view();
    for (x, v) in positions.iter_mut().zip(velocities) {
        *x += v * dt;
        boundary.wrap_position(x);
    }
}

/// Runs one velocity-Verlet step around a force evaluation on the drifted positions.
///
/// Forces in the store must belong to the current positions on entry; on
/// return they belong to the new positions. Returns the potential energy
/// reported by `evaluate`.
pub fn velocity_verlet_step<E>(
    system: &mut ParticleSystem,
    dt: f64,
    evaluate: impl FnOnce(&mut ParticleSystem) -> Result<f64, E>,
) -> Result<f64, E> {
    half_kick(system.atoms_mut(), dt);
    drift(system, dt);
    let potential = evaluate(system)?;
    half_kick(system.atoms_mut(), dt);
    Ok(potential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::boundary::{PeriodicBoundary, PeriodicBox};
    use nalgebra::Vector3;
    use std::convert::Infallible;

    fn single_atom(periodic: bool) -> ParticleSystem {
        let mut atoms = AtomStore::new(
            vec![Vector3::new(9.9, 5.0, 5.0), Vector3::new(1.0, 1.0, 1.0)],
            1,
        )
        .unwrap();
        atoms
            .set_velocities(vec![Vector3::new(1.0, 0.0, 0.0), Vector3::zeros()])
            .unwrap();
        let cell = PeriodicBox::new(Vector3::zeros(), Vector3::repeat(10.0)).unwrap();
        ParticleSystem::new(atoms, PeriodicBoundary::new(cell, periodic))
    }

    #[test]
    fn drift_wraps_mobile_atoms_into_the_box() {
        let mut system = single_atom(true);
        drift(&mut system, 0.2);
        let x = system.atoms().positions()[0].x;
        assert!((x - 0.1).abs() < 1e-12);
    }

    #[test]
    fn drift_leaves_open_boundaries_unwrapped_and_frozen_atoms_fixed() {
        let mut system = single_atom(false);
        drift(&mut system, 0.2);
        assert!((system.atoms().positions()[0].x - 10.1).abs() < 1e-12);
        assert_eq!(system.atoms().positions()[1], Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn constant_force_step_matches_closed_form() {
        let mut system = single_atom(false);
        let force = Vector3::new(0.0, -2.0, 0.0);
        let apply = |s: &mut ParticleSystem| -> Result<f64, Infallible> {
            let (_, forces, _) = s.atoms_mut().force_view();
            forces[0] = force;
            Ok(-1.0)
        };
        apply(&mut system).unwrap();

        let dt = 0.1;
        let energy = velocity_verlet_step(&mut system, dt, apply).unwrap();
        assert_eq!(energy, -1.0);

        let atoms = system.atoms();
        // x(t) = x0 + v0·t + f·t²/2, v(t) = v0 + f·t
        assert!((atoms.positions()[0].y - (5.0 - 0.01)).abs() < 1e-12);
        assert!((atoms.velocities()[0].y + 0.2).abs() < 1e-12);
        assert!((atoms.positions()[0].x - 10.0).abs() < 1e-12);
    }
}
