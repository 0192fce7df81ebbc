use crate::core::models::system::ParticleSystem;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing particle structure files.
///
/// Implementors handle the format-specific parsing and serialization; the
/// provided methods add the file-path plumbing.
pub trait StructureFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a particle system from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<ParticleSystem, Self::Error>;

    /// Writes a particle system, labelled with a step number, to a writer.
    ///
    /// # Arguments
    ///
    /// * `system` - The system to write.
    /// * `step` - The integration step the configuration belongs to.
    /// * `writer` - The writer to output to.
    fn write_to(
        system: &ParticleSystem,
        step: u64,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Reads a particle system from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<ParticleSystem, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a particle system to a file path, replacing any existing file.
    fn write_to_path<P: AsRef<Path>>(
        system: &ParticleSystem,
        step: u64,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(system, step, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
