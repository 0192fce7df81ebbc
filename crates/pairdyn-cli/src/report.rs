use crate::error::Result;
use pairdyn::core::io::energy_log::EnergyLogWriter;
use pairdyn::core::io::traits::StructureFile;
use pairdyn::core::io::xyz::XyzFile;
use pairdyn::engine::observer::{Observer, ObserverError};
use pairdyn::engine::state::Snapshot;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The files written for one run, all sharing a user-given prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub report: PathBuf,
    pub energy: PathBuf,
    pub trajectory: PathBuf,
    pub final_structure: PathBuf,
    pub ball_stick: PathBuf,
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

impl OutputPaths {
    pub fn from_prefix(prefix: &Path) -> Self {
        Self {
            report: with_suffix(prefix, ".out"),
            energy: with_suffix(prefix, ".ene"),
            trajectory: with_suffix(prefix, ".pic"),
            final_structure: with_suffix(prefix, ".final.xyz"),
            ball_stick: with_suffix(prefix, ".bs"),
        }
    }
}

/// Writes the human-readable report, the energy log and the trajectory as
/// snapshots arrive.
pub struct ReportWriter {
    report: BufWriter<File>,
    energy: EnergyLogWriter<File>,
    trajectory: BufWriter<File>,
    print_distances: bool,
    initial_total: f64,
    frames: usize,
}

impl ReportWriter {
    pub fn create(paths: &OutputPaths, print_distances: bool) -> Result<Self> {
        if let Some(parent) = paths.report.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            report: BufWriter::new(File::create(&paths.report)?),
            energy: EnergyLogWriter::create(&paths.energy)?,
            trajectory: BufWriter::new(File::create(&paths.trajectory)?),
            print_distances,
            initial_total: 0.0,
            frames: 0,
        })
    }

    /// Number of trajectory frames written so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    fn write_parameters(&mut self, snapshot: &Snapshot<'_>) -> std::io::Result<()> {
        let config = snapshot.config;
        let params = &config.params;
        let system = snapshot.system;
        let cell = system.boundary().cell();
        let w = &mut self.report;

        writeln!(w, "{}", config.title)?;
        writeln!(w)?;
        writeln!(w, "backend               {}", config.backend.name())?;
        writeln!(w, "atoms                 {}", system.len())?;
        writeln!(w, "mobile atoms          {}", system.mobile_count())?;
        writeln!(w, "periodic              {}", system.boundary().is_periodic())?;
        writeln!(
            w,
            "box lengths           {:.6} {:.6} {:.6}",
            cell.lengths().x,
            cell.lengths().y,
            cell.lengths().z
        )?;
        writeln!(w, "steps                 {}", config.total_steps)?;
        writeln!(w, "time step             {:e}", params.time_step)?;
        writeln!(w, "target temperature    {}", config.target_temperature)?;
        writeln!(w, "rescale interval      {}", config.rescale_interval)?;
        writeln!(w, "averaging window      {}", config.averaging_window)?;
        writeln!(w, "report interval       {}", config.report_interval)?;
        writeln!(w)?;
        writeln!(w, "potential terms       A            RL        AL        D2")?;
        writeln!(
            w,
            "  1               {:>12.5} {:>9.4} {:>9.4} {:>9.4}",
            params.amplitude_1,
            params.exponent_1,
            params.decay_1,
            params.secondary_decay_1()
        )?;
        writeln!(
            w,
            "  2               {:>12.5} {:>9.4} {:>9.4} {:>9.4}",
            params.amplitude_2,
            params.exponent_2,
            params.decay_2,
            params.secondary_decay_2()
        )?;
        writeln!(w, "reference length      {}", params.reference_length)?;
        writeln!(w, "boltzmann constant    {:e}", params.boltzmann)?;
        writeln!(w)?;
        Ok(())
    }

    fn write_distances(&mut self, snapshot: &Snapshot<'_>) -> std::io::Result<()> {
        let system = snapshot.system;
        writeln!(self.report, "pair distances")?;
        for i in 0..system.len() {
            for j in (i + 1)..system.len() {
                writeln!(self.report, "{:>6} {:>6} {:>14.6}", i, j, system.distance(i, j))?;
            }
        }
        writeln!(self.report)?;
        Ok(())
    }

    fn write_status(&mut self, snapshot: &Snapshot<'_>) -> std::io::Result<()> {
        let s = snapshot.state;
        writeln!(
            self.report,
            "{:>10} {:>16.8} {:>16.8} {:>16.8} {:>12.4} {:>12.4} {:>10.6}",
            s.step,
            s.potential_energy,
            s.kinetic_energy,
            s.total_energy,
            s.temperature,
            s.average_temperature,
            s.scale_factor
        )
    }

    /// Coordinates, forces and pair energies of every atom; frozen atoms are flagged.
    fn write_atoms(&mut self, snapshot: &Snapshot<'_>) -> std::io::Result<()> {
        let atoms = snapshot.system.atoms();
        let w = &mut self.report;
        writeln!(w, "coordinates, forces and energies")?;
        writeln!(
            w,
            "{:>6} {:>14} {:>14} {:>14} {:>15} {:>15} {:>15} {:>15}",
            "atom", "x", "y", "z", "fx", "fy", "fz", "energy"
        )?;
        for (i, ((p, f), e)) in atoms
            .positions()
            .iter()
            .zip(atoms.forces())
            .zip(atoms.energies())
            .enumerate()
        {
            let marker = if i < atoms.mobile_count() { ' ' } else { '*' };
            writeln!(
                w,
                "{:>5}{} {:>14.6} {:>14.6} {:>14.6} {:>15.6e} {:>15.6e} {:>15.6e} {:>15.6e}",
                i, marker, p.x, p.y, p.z, f.x, f.y, f.z, e
            )?;
        }
        if atoms.frozen_count() > 0 {
            writeln!(w, "* frozen")?;
        }
        Ok(())
    }

    fn write_frame(&mut self, snapshot: &Snapshot<'_>) -> std::result::Result<(), ObserverError> {
        XyzFile::write_to(snapshot.system, snapshot.step(), &mut self.trajectory)?;
        self.frames += 1;
        Ok(())
    }
}

impl Observer for ReportWriter {
    fn initial(&mut self, snapshot: &Snapshot<'_>) -> std::result::Result<(), ObserverError> {
        self.write_parameters(snapshot)?;
        if self.print_distances {
            self.write_distances(snapshot)?;
        }
        writeln!(
            self.report,
            "{:>10} {:>16} {:>16} {:>16} {:>12} {:>12} {:>10}",
            "step", "potential", "kinetic", "total", "T", "T avg", "scale"
        )?;
        self.write_status(snapshot)?;
        self.write_frame(snapshot)?;
        self.initial_total = snapshot.state.total_energy;
        Ok(())
    }

    fn periodic(&mut self, snapshot: &Snapshot<'_>) -> std::result::Result<(), ObserverError> {
        self.write_status(snapshot)?;
        self.energy.append(&snapshot.energy_record())?;
        self.write_frame(snapshot)?;
        debug!(step = snapshot.step(), "Report written.");
        Ok(())
    }

    fn finished(&mut self, snapshot: &Snapshot<'_>) -> std::result::Result<(), ObserverError> {
        let s = snapshot.state;
        let drift = s.total_energy - self.initial_total;
        writeln!(self.report)?;
        writeln!(self.report, "final step            {}", s.step)?;
        writeln!(self.report, "potential energy      {:.8}", s.potential_energy)?;
        writeln!(self.report, "kinetic energy        {:.8}", s.kinetic_energy)?;
        writeln!(self.report, "total energy          {:.8}", s.total_energy)?;
        writeln!(self.report, "energy drift          {:.3e}", drift)?;
        writeln!(self.report, "temperature           {:.4}", s.temperature)?;
        writeln!(self.report, "average temperature   {:.4}", s.average_temperature)?;
        writeln!(self.report, "trajectory frames     {}", self.frames)?;
        writeln!(self.report)?;
        self.write_atoms(snapshot)?;
        self.report.flush()?;
        self.energy.flush()?;
        self.trajectory.flush()?;
        Ok(())
    }
}
