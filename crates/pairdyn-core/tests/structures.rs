use pairdyn::core::forcefield::params::PotentialParams;
use pairdyn::core::io::traits::StructureFile;
use pairdyn::core::io::xyz::XyzFile;
use pairdyn::core::preparation::lattice::{Axis, FccLattice, partition_frozen};
use pairdyn::core::preparation::velocities::maxwell_velocities;
use pairdyn::engine::config::SimulationConfigBuilder;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::tempdir;

#[test]
fn prepared_lattice_round_trips_through_xyz_and_validates() {
    let params = PotentialParams::copper();
    let mut system = FccLattice::new(2, params.reference_length)
        .unwrap()
        .build(true)
        .unwrap();
    let mobile = partition_frozen(system.atoms_mut(), Axis::Z, 1).unwrap();
    maxwell_velocities(
        system.atoms_mut(),
        300.0,
        params.boltzmann,
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("start.xyz");
    XyzFile::write_to_path(&system, 0, &path).unwrap();
    let loaded = XyzFile::read_from_path(&path).unwrap();

    assert_eq!(loaded.len(), system.len());
    assert_eq!(loaded.mobile_count(), mobile);
    assert!(loaded.boundary().is_periodic());
    for (a, b) in loaded
        .atoms()
        .positions()
        .iter()
        .zip(system.atoms().positions())
    {
        assert!((a - b).norm() < 1e-9);
    }
    assert!((loaded.atoms().temperature(params.boltzmann) - 300.0).abs() < 1e-3);

    let config = SimulationConfigBuilder::new()
        .params(params)
        .total_steps(1)
        .target_temperature(300.0)
        .build()
        .unwrap();
    assert_eq!(config.validate_system(&loaded), Ok(()));
}
