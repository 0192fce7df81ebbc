use crate::core::models::system::ParticleSystem;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const ATOM_RADIUS: f64 = 0.5;
const BOND_RADIUS: f64 = 0.1;
const MOBILE_SHADE: f64 = 0.7;
const FROZEN_SHADE: f64 = 0.4;

/// Ball-and-stick scene for `xbs`-style viewers.
///
/// Mobile atoms keep the system's species label; frozen atoms are written as
/// `<species>_f` so a viewer shades them apart. Bonds are drawn between any
/// two atoms closer than `bond_length`.
///
/// ```text
/// atom  Cu    0.000000    0.000000    0.000000
/// atom  Cu_f  1.805000    1.805000    0.000000
/// spec  Cu    0.50 0.70
/// spec  Cu_f  0.50 0.40
/// bonds Cu    Cu    0.000 3.063 0.10 1.00
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallStickFile {
    pub bond_length: f64,
}

impl BallStickFile {
    pub fn new(bond_length: f64) -> Self {
        Self { bond_length }
    }

    pub fn write_to(&self, system: &ParticleSystem, writer: &mut impl Write) -> io::Result<()> {
        let mobile = system.species().to_string();
        let frozen = format!("{mobile}_f");
        let mobile_count = system.mobile_count();

        for (i, p) in system.atoms().positions().iter().enumerate() {
            let label = if i < mobile_count { &mobile } else { &frozen };
            writeln!(writer, "atom  {:<5} {:>12.6} {:>12.6} {:>12.6}", label, p.x, p.y, p.z)?;
        }

        let mut species = vec![(&mobile, MOBILE_SHADE)];
        if system.atoms().frozen_count() > 0 {
            species.push((&frozen, FROZEN_SHADE));
        }
        for (label, shade) in &species {
            writeln!(writer, "spec  {:<5} {:.2} {:.2}", label, ATOM_RADIUS, shade)?;
        }
        for (a, (first, _)) in species.iter().enumerate() {
            for (second, _) in &species[a..] {
                writeln!(
                    writer,
                    "bonds {:<5} {:<5} {:.3} {:.3} {:.2} 1.00",
                    first, second, 0.0, self.bond_length, BOND_RADIUS
                )?;
            }
        }
        Ok(())
    }

    pub fn write_to_path(&self, system: &ParticleSystem, path: impl AsRef<Path>) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(system, &mut writer)?;
        writer.flush()
    }
}
