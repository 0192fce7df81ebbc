//! The single-precision accelerator behind the parallel backend.
//!
//! A [`Device`] owns a dedicated worker pool. Dynamic state lives in
//! [`DeviceBuffers`] as `f32` and is copied to and from the host
//! [`AtomStore`] only at dispatch boundaries. Every kernel is one parallel pass
//! over the mobile slots; a worker writes only its own slot and reads the
//! position buffer, and the pass returns only when every slot is done.

use crate::core::forcefield::params::PotentialParams;
use crate::core::models::atoms::AtomStore;
use crate::core::models::boundary::PeriodicBoundary;
use crate::engine::error::DeviceError;
use nalgebra::Vector3;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
struct DeviceTerm {
    amplitude: f32,
    exponent: f32,
    decay: f32,
    secondary_decay: f32,
}

/// Single-precision copy of the pair potential law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DevicePotential {
    terms: [DeviceTerm; 2],
    floor: f32,
}

impl DevicePotential {
    pub fn new(params: &PotentialParams) -> Self {
        Self {
            terms: [
                DeviceTerm {
                    amplitude: params.amplitude_1 as f32,
                    exponent: params.exponent_1 as f32,
                    decay: params.decay_1 as f32,
                    secondary_decay: params.secondary_decay_1() as f32,
                },
                DeviceTerm {
                    amplitude: params.amplitude_2 as f32,
                    exponent: params.exponent_2 as f32,
                    decay: params.decay_2 as f32,
                    secondary_decay: params.secondary_decay_2() as f32,
                },
            ],
            floor: params.distance_floor as f32,
        }
    }

    pub fn distance_floor(&self) -> f32 {
        self.floor
    }

    /// Returns `(energy, -dU/dr)` at `r`, clamped to the distance floor.
    #[inline]
    pub fn evaluate(&self, r: f32) -> (f32, f32) {
        let r = r.max(self.floor);
        self.terms.iter().fold((0.0, 0.0), |(e, f), t| {
            let u = t.amplitude * r.powf(-t.exponent) * (-t.decay * r * r).exp();
            (e + u, f + u * (t.exponent / r + t.secondary_decay * r))
        })
    }
}

/// Single-precision copy of the boundary convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceBox {
    lower: [f32; 3],
    lengths: [f32; 3],
    half: [f32; 3],
    periodic: bool,
}

impl DeviceBox {
    pub fn new(boundary: &PeriodicBoundary) -> Self {
        let cell = boundary.cell();
        Self {
            lower: narrow(cell.lower()),
            lengths: narrow(cell.lengths()),
            half: narrow(cell.half_lengths()),
            periodic: boundary.is_periodic(),
        }
    }

    /// Minimum-image displacement `a - b` and its length.
    #[inline]
    pub fn displacement(&self, a: &[f32; 3], b: &[f32; 3]) -> ([f32; 3], f32) {
        let mut d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
        if self.periodic {
            for axis in 0..3 {
                if d[axis] > self.half[axis] {
                    d[axis] -= self.lengths[axis];
                } else if d[axis] <= -self.half[axis] {
                    d[axis] += self.lengths[axis];
                }
            }
        }
        let r = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
        (d, r)
    }

    #[inline]
    pub fn wrap(&self, p: &mut [f32; 3]) {
        if self.periodic {
            for axis in 0..3 {
                p[axis] = self.lower[axis] + (p[axis] - self.lower[axis]).rem_euclid(self.lengths[axis]);
            }
        }
    }
}

/// Device-resident dynamic state. Velocities, forces and energies cover the
/// mobile atoms only; positions cover every atom.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceBuffers {
    positions: Vec<[f32; 3]>,
    velocities: Vec<[f32; 3]>,
    forces: Vec<[f32; 3]>,
    energies: Vec<f32>,
}

#[inline]
fn narrow(v: &Vector3<f64>) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

#[inline]
fn widen(v: &[f32; 3]) -> Vector3<f64> {
    Vector3::new(v[0] as f64, v[1] as f64, v[2] as f64)
}

fn upload(buffer: &'static str, host: &[Vector3<f64>], device: &mut [[f32; 3]]) -> Result<(), DeviceError> {
    if host.len() != device.len() {
        return Err(DeviceError::Transfer {
            buffer,
            host: host.len(),
            device: device.len(),
        });
    }
    for (d, h) in device.iter_mut().zip(host) {
        *d = narrow(h);
    }
    Ok(())
}

fn download(buffer: &'static str, device: &[[f32; 3]], host: &mut [Vector3<f64>]) -> Result<(), DeviceError> {
    if host.len() != device.len() {
        return Err(DeviceError::Transfer {
            buffer,
            host: host.len(),
            device: device.len(),
        });
    }
    for (h, d) in host.iter_mut().zip(device) {
        *h = widen(d);
    }
    Ok(())
}

impl DeviceBuffers {
    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }

    pub fn mobile(&self) -> usize {
        self.velocities.len()
    }

    pub fn upload_positions(&mut self, host: &[Vector3<f64>]) -> Result<(), DeviceError> {
        upload("positions", host, &mut self.positions)
    }

    /// Copies positions, mobile velocities and mobile forces to the device.
    pub fn upload_state(&mut self, atoms: &AtomStore) -> Result<(), DeviceError> {
        let mobile = atoms.mobile_count();
        self.upload_positions(atoms.positions())?;
        upload("velocities", &atoms.velocities()[..mobile], &mut self.velocities)?;
        upload("forces", &atoms.forces()[..mobile], &mut self.forces)
    }

    /// Copies forces and energies of the mobile atoms back to the host.
    pub fn download_forces(&self, atoms: &mut AtomStore) -> Result<(), DeviceError> {
        let (_, _, forces, energies) = atoms.mobile_state_mut();
        download("forces", &self.forces, forces)?;
        self.download_energies(energies)
    }

    /// Copies the complete mobile state back to the host.
    pub fn download_state(&self, atoms: &mut AtomStore) -> Result<(), DeviceError> {
        let (positions, velocities, forces, energies) = atoms.mobile_state_mut();
        let mobile = self.mobile().min(self.atom_count());
        download("positions", &self.positions[..mobile], positions)?;
        download("velocities", &self.velocities, velocities)?;
        download("forces", &self.forces, forces)?;
        self.download_energies(energies)
    }

    fn download_energies(&self, host: &mut [f64]) -> Result<(), DeviceError> {
        if host.len() != self.energies.len() {
            return Err(DeviceError::Transfer {
                buffer: "energies",
                host: host.len(),
                device: self.energies.len(),
            });
        }
        for (h, d) in host.iter_mut().zip(&self.energies) {
            *h = *d as f64;
        }
        Ok(())
    }

    /// Sum of the per-atom energies, accumulated in double precision.
    pub fn potential_energy(&self) -> f64 {
        self.energies.iter().map(|&e| e as f64).sum()
    }

    /// Kinetic energy of the mobile atoms, accumulated in double precision.
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self
            .velocities
            .iter()
            .map(|v| {
                let (x, y, z) = (v[0] as f64, v[1] as f64, v[2] as f64);
                x * x + y * y + z * z
            })
            .sum::<f64>()
    }
}

fn reserve<T: Clone + Default>(buffer: &'static str, elements: usize) -> Result<Vec<T>, DeviceError> {
    let mut v = Vec::new();
    v.try_reserve_exact(elements)
        .map_err(|e| DeviceError::Allocation {
            buffer,
            elements,
            reason: e.to_string(),
        })?;
    v.resize(elements, T::default());
    Ok(v)
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

pub struct Device {
    pool: ThreadPool,
}

impl Device {
    /// Starts a worker pool; `None` sizes it like the global rayon pool.
    pub fn new(threads: Option<usize>) -> Result<Self, DeviceError> {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|i| format!("pairdyn-device-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder.build().map_err(|e| DeviceError::Dispatch {
            kernel: "pool",
            reason: e.to_string(),
        })?;
        debug!(threads = pool.current_num_threads(), "Device pool started.");
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Reserves buffers for `atoms` atoms of which the first `mobile` move.
    pub fn allocate(&self, atoms: usize, mobile: usize) -> Result<DeviceBuffers, DeviceError> {
        debug!(atoms, mobile, "Allocating device buffers.");
        Ok(DeviceBuffers {
            positions: reserve("positions", atoms)?,
            velocities: reserve("velocities", mobile)?,
            forces: reserve("forces", mobile)?,
            energies: reserve("energies", mobile)?,
        })
    }

    /// Runs a kernel on the pool, reporting a panic as a dispatch failure.
    pub fn launch<R: Send>(
        &self,
        kernel: &'static str,
        work: impl FnOnce() -> R + Send,
    ) -> Result<R, DeviceError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.pool.install(work))).map_err(|payload| {
            DeviceError::Dispatch {
                kernel,
                reason: panic_reason(payload),
            }
        })
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("threads", &self.threads())
            .finish()
    }
}

/// Computes the force and energy share of every mobile atom.
pub fn compute_forces(buffers: &mut DeviceBuffers, cell: &DeviceBox, potential: &DevicePotential) {
    let DeviceBuffers {
        positions,
        forces,
        energies,
        ..
    } = buffers;
    let mobile = forces.len();
    let floor = potential.distance_floor();
    let positions: &[[f32; 3]] = positions;
    forces
        .par_iter_mut()
        .zip(energies.par_iter_mut())
        .enumerate()
        .for_each(|(i, (force, energy))| {
            let xi = &positions[i];
            let mut f = [0.0f32; 3];
            let mut e = 0.0f32;
            for (j, xj) in positions.iter().enumerate() {
                if j == i {
                    continue;
                }
                let (d, r) = cell.displacement(xi, xj);
                let (u, magnitude) = potential.evaluate(r);
                let scale = magnitude / r.max(floor);
                f[0] += d[0] * scale;
                f[1] += d[1] * scale;
                f[2] += d[2] * scale;
                e += if j < mobile { 0.5 * u } else { u };
            }
            *force = f;
            *energy = e;
        });
}

/// Half kick followed by a drift of every mobile atom.
pub fn kick_drift(buffers: &mut DeviceBuffers, cell: &DeviceBox, dt: f32) {
    let DeviceBuffers {
        positions,
        velocities,
        forces,
        ..
    } = buffers;
    let mobile = velocities.len();
    let half_dt = 0.5 * dt;
    positions[..mobile]
        .par_iter_mut()
        .zip(velocities.par_iter_mut())
        .zip(forces.par_iter())
        .for_each(|((x, v), f)| {
            for axis in 0..3 {
                v[axis] += f[axis] * half_dt;
                x[axis] += v[axis] * dt;
            }
            cell.wrap(x);
        });
}

/// Half kick of every mobile atom.
pub fn kick(buffers: &mut DeviceBuffers, dt: f32) {
    let half_dt = 0.5 * dt;
    buffers
        .velocities
        .par_iter_mut()
        .zip(buffers.forces.par_iter())
        .for_each(|(v, f)| {
            for axis in 0..3 {
                v[axis] += f[axis] * half_dt;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::potentials::PotentialModel;
    use crate::core::models::boundary::PeriodicBox;

    fn boundary(periodic: bool) -> PeriodicBoundary {
        let cell = PeriodicBox::new(Vector3::zeros(), Vector3::repeat(10.0)).unwrap();
        PeriodicBoundary::new(cell, periodic)
    }

    #[test]
    fn device_potential_tracks_host_potential() {
        let params = PotentialParams::copper();
        let host = PotentialModel::new(&params);
        let device = DevicePotential::new(&params);
        for &r in &[1.5, 2.0, 2.3, 2.8, 4.0, 6.0] {
            let (eh, fh) = host.evaluate(r);
            let (ed, fd) = device.evaluate(r as f32);
            assert!((eh - ed as f64).abs() < 1e-5 * eh.abs().max(1.0), "energy at {r}");
            assert!((fh - fd as f64).abs() < 1e-5 * fh.abs().max(1.0), "force at {r}");
        }
    }

    #[test]
    fn device_box_matches_host_minimum_image() {
        let host = boundary(true);
        let device = DeviceBox::new(&host);
        let a = Vector3::new(0.5, 9.5, 5.0);
        let b = Vector3::new(9.0, 0.5, 0.2);
        let expected = host.displacement_between(&a, &b);
        let (d, r) = device.displacement(&narrow(&a), &narrow(&b));
        for axis in 0..3 {
            assert!((expected.delta[axis] - d[axis] as f64).abs() < 1e-5);
        }
        assert!((expected.r - r as f64).abs() < 1e-5);
    }

    #[test]
    fn device_box_wrap_folds_into_cell() {
        let device = DeviceBox::new(&boundary(true));
        let mut p = [10.5f32, -0.5, 3.0];
        device.wrap(&mut p);
        assert!((p[0] - 0.5).abs() < 1e-5);
        assert!((p[1] - 9.5).abs() < 1e-5);
        assert_eq!(p[2], 3.0);
    }

    #[test]
    fn state_survives_upload_and_download_through_single_precision() {
        let device = Device::new(Some(2)).unwrap();
        let mut atoms = AtomStore::new(
            vec![
                Vector3::new(1.25, 2.5, 3.75),
                Vector3::new(4.0, 5.0, 6.0),
                Vector3::new(7.0, 8.0, 9.0),
            ],
            2,
        )
        .unwrap();
        atoms
            .set_velocities(vec![Vector3::new(0.5, -0.25, 0.125); 3])
            .unwrap();
        let mut buffers = device.allocate(atoms.len(), atoms.mobile_count()).unwrap();
        buffers.upload_state(&atoms).unwrap();

        let mut copy = atoms.clone();
        copy.mobile_velocities_mut().fill(Vector3::zeros());
        buffers.download_state(&mut copy).unwrap();
        assert_eq!(copy.positions(), atoms.positions());
        assert_eq!(copy.velocities(), atoms.velocities());
    }

    #[test]
    fn transfer_into_mismatched_buffers_fails() {
        let device = Device::new(Some(1)).unwrap();
        let mut buffers = device.allocate(3, 3).unwrap();
        let host = vec![Vector3::zeros(); 2];
        assert_eq!(
            buffers.upload_positions(&host),
            Err(DeviceError::Transfer {
                buffer: "positions",
                host: 2,
                device: 3
            })
        );
    }

    #[test]
    fn impossible_allocation_is_reported() {
        let device = Device::new(Some(1)).unwrap();
        let result = device.allocate(usize::MAX, 0);
        assert!(matches!(
            result,
            Err(DeviceError::Allocation {
                buffer: "positions",
                ..
            })
        ));
    }

    #[test]
    fn panicking_kernel_becomes_dispatch_error() {
        let device = Device::new(Some(2)).unwrap();
        let result: Result<(), _> = device.launch("faulty", || panic!("bad slot"));
        match result {
            Err(DeviceError::Dispatch { kernel, reason }) => {
                assert_eq!(kernel, "faulty");
                assert!(reason.contains("bad slot"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn kick_drift_then_kick_follows_constant_force() {
        let device = Device::new(Some(2)).unwrap();
        let cell = DeviceBox::new(&boundary(false));
        let mut buffers = device.allocate(1, 1).unwrap();
        buffers.positions[0] = [1.0, 1.0, 1.0];
        buffers.forces[0] = [2.0, 0.0, 0.0];
        device
            .launch("kick-drift", || kick_drift(&mut buffers, &cell, 0.5))
            .unwrap();
        device.launch("kick", || kick(&mut buffers, 0.5)).unwrap();
        // x = 1 + f·dt²/2, v = f·dt
        assert!((buffers.positions[0][0] - 1.25).abs() < 1e-6);
        assert!((buffers.velocities[0][0] - 1.0).abs() < 1e-6);
    }
}
