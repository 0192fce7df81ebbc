use super::traits::StructureFile;
use crate::core::models::atoms::{AtomStore, AtomStoreError};
use crate::core::models::boundary::{BoxError, PeriodicBoundary, PeriodicBox};
use crate::core::models::system::ParticleSystem;
use nalgebra::Vector3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Missing required header field '{0}'")]
    MissingField(&'static str),
    #[error("Header announces {expected} atoms but {found} were read")]
    CountMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Box(#[from] BoxError),
    #[error(transparent)]
    Atoms(#[from] AtomStoreError),
}

/// Plain XYZ with a `key=value` comment line carrying the boundary.
///
/// ```text
/// 4
/// box=10,10,10 origin=0,0,0 periodic=true mobile=3 step=0
/// Cu 0.0 0.0 0.0
/// Cu 1.8 1.8 0.0 0.01 0.0 0.0
/// ...
/// ```
///
/// Atom lines carry a symbol and three coordinates, optionally followed by three
/// velocity components. `origin` defaults to zero, `periodic` to true and
/// `mobile` to every atom; `step` is informational.
pub struct XyzFile;

const PREALLOCATE_LIMIT: usize = 4096;

#[derive(Debug, Default)]
struct Header {
    lengths: Option<Vector3<f64>>,
    origin: Option<Vector3<f64>>,
    periodic: Option<bool>,
    mobile: Option<usize>,
}

fn parse_error(line: usize, message: impl Into<String>) -> XyzError {
    XyzError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_vector(value: &str, line: usize) -> Result<Vector3<f64>, XyzError> {
    let parts: Vec<&str> = value.split(',').collect();
    if parts.len() != 3 {
        return Err(parse_error(line, format!("expected three comma-separated numbers, found '{value}'")));
    }
    let mut v = Vector3::zeros();
    for (axis, part) in parts.iter().enumerate() {
        v[axis] = part
            .trim()
            .parse()
            .map_err(|_| parse_error(line, format!("invalid number '{part}'")))?;
    }
    Ok(v)
}

fn parse_header(content: &str, line: usize) -> Result<Header, XyzError> {
    let mut header = Header::default();
    for token in content.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        match key {
            "box" => header.lengths = Some(parse_vector(value, line)?),
            "origin" => header.origin = Some(parse_vector(value, line)?),
            "periodic" => {
                header.periodic = Some(value.parse().map_err(|_| {
                    parse_error(line, format!("invalid boolean '{value}' for 'periodic'"))
                })?)
            }
            "mobile" => {
                header.mobile = Some(value.parse().map_err(|_| {
                    parse_error(line, format!("invalid count '{value}' for 'mobile'"))
                })?)
            }
            _ => {}
        }
    }
    Ok(header)
}

fn parse_numbers(fields: &[&str], line: usize) -> Result<Vec<f64>, XyzError> {
    fields
        .iter()
        .map(|f| {
            f.parse::<f64>()
                .map_err(|_| parse_error(line, format!("invalid number '{f}'")))
        })
        .collect()
}

impl StructureFile for XyzFile {
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<ParticleSystem, Self::Error> {
        let mut lines = reader.lines().enumerate();

        let (_, count_line) = lines.next().ok_or_else(|| parse_error(1, "file is empty"))?;
        let count_line = count_line?;
        let expected: usize = count_line
            .trim()
            .parse()
            .map_err(|_| parse_error(1, format!("invalid atom count '{}'", count_line.trim())))?;

        let (_, header_line) = lines
            .next()
            .ok_or_else(|| parse_error(2, "missing comment line"))?;
        let header = parse_header(&header_line?, 2)?;

        let mut species: Option<String> = None;
        // The count line is untrusted; storage grows with the atoms actually read.
        let mut positions = Vec::with_capacity(expected.min(PREALLOCATE_LIMIT));
        let mut velocities = Vec::with_capacity(expected.min(PREALLOCATE_LIMIT));
        for (index, line_res) in lines {
            if positions.len() == expected {
                break;
            }
            let line_num = index + 1;
            let line = line_res?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let numbers = match fields.len() {
                4 | 7 => parse_numbers(&fields[1..], line_num)?,
                n => {
                    return Err(parse_error(
                        line_num,
                        format!("expected 4 or 7 columns, found {n}"),
                    ));
                }
            };
            species.get_or_insert_with(|| fields[0].to_string());
            positions.push(Vector3::new(numbers[0], numbers[1], numbers[2]));
            velocities.push(if numbers.len() == 6 {
                Vector3::new(numbers[3], numbers[4], numbers[5])
            } else {
                Vector3::zeros()
            });
        }

        if positions.len() != expected {
            return Err(XyzError::CountMismatch {
                expected,
                found: positions.len(),
            });
        }

        let lengths = header.lengths.ok_or(XyzError::MissingField("box"))?;
        let cell = PeriodicBox::new(header.origin.unwrap_or_else(Vector3::zeros), lengths)?;
        let mobile = header.mobile.unwrap_or(expected);
        let mut atoms = AtomStore::new(positions, mobile)?;
        atoms.set_velocities(velocities)?;

        let system = ParticleSystem::new(
            atoms,
            PeriodicBoundary::new(cell, header.periodic.unwrap_or(true)),
        );
        Ok(match species {
            Some(symbol) => system.with_species(&symbol),
            None => system,
        })
    }

    fn write_to(
        system: &ParticleSystem,
        step: u64,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let cell = system.boundary().cell();
        let (l, o) = (cell.lengths(), cell.lower());
        writeln!(writer, "{}", system.len())?;
        writeln!(
            writer,
            "box={},{},{} origin={},{},{} periodic={} mobile={} step={}",
            l.x,
            l.y,
            l.z,
            o.x,
            o.y,
            o.z,
            system.boundary().is_periodic(),
            system.mobile_count(),
            step
        )?;
        let atoms = system.atoms();
        for (p, v) in atoms.positions().iter().zip(atoms.velocities()) {
            writeln!(
                writer,
                "{:<3} {:>24.17e} {:>24.17e} {:>24.17e} {:>24.17e} {:>24.17e} {:>24.17e}",
                system.species(),
                p.x,
                p.y,
                p.z,
                v.x,
                v.y,
                v.z
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    const SAMPLE: &str = "3
box=10,12,14 origin=-1,0,0 periodic=false mobile=2 step=5
Ni 0.0 0.0 0.0
Ni 1.5 0.5 0.0 0.1 0.2 0.3
Ni 3.0 0.0 1.0
";

    #[test]
    fn read_from_parses_header_positions_and_velocities() {
        let mut reader = BufReader::new(SAMPLE.as_bytes());
        let system = XyzFile::read_from(&mut reader).unwrap();

        assert_eq!(system.len(), 3);
        assert_eq!(system.mobile_count(), 2);
        assert_eq!(system.species(), "Ni");
        assert!(!system.boundary().is_periodic());
        assert_eq!(*system.boundary().cell().lower(), Vector3::new(-1.0, 0.0, 0.0));
        assert_eq!(*system.boundary().cell().lengths(), Vector3::new(10.0, 12.0, 14.0));
        assert_eq!(system.atoms().positions()[1], Vector3::new(1.5, 0.5, 0.0));
        assert_eq!(system.atoms().velocities()[1], Vector3::new(0.1, 0.2, 0.3));
        assert_eq!(system.atoms().velocities()[0], Vector3::zeros());
    }

    #[test]
    fn written_structure_reads_back_equal() {
        let mut reader = BufReader::new(SAMPLE.as_bytes());
        let system = XyzFile::read_from(&mut reader).unwrap();

        let mut buffer = Vec::new();
        XyzFile::write_to(&system, 7, &mut buffer).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.lines().nth(1).unwrap().contains("step=7"));

        let reread = XyzFile::read_from(&mut BufReader::new(buffer.as_slice())).unwrap();
        assert_eq!(reread.mobile_count(), system.mobile_count());
        assert_eq!(reread.boundary(), system.boundary());
        for (a, b) in reread
            .atoms()
            .positions()
            .iter()
            .zip(system.atoms().positions())
        {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn restart_keeps_full_precision() {
        let text = "1\nbox=5,5,5\nCu 0.1 0.30000000000000004 2.220446049250313e-16 1e-17 -0.7 3.3333333333333335\n";
        let system = XyzFile::read_from(&mut BufReader::new(text.as_bytes())).unwrap();
        let mut buffer = Vec::new();
        XyzFile::write_to(&system, 0, &mut buffer).unwrap();
        let reread = XyzFile::read_from(&mut BufReader::new(buffer.as_slice())).unwrap();
        assert_eq!(reread.atoms().positions(), system.atoms().positions());
        assert_eq!(reread.atoms().velocities(), system.atoms().velocities());
    }

    #[test]
    fn huge_atom_count_is_a_count_mismatch() {
        let text = "2000000000000000\nbox=1,1,1\nCu 0 0 0\n";
        let result = XyzFile::read_from(&mut BufReader::new(text.as_bytes()));
        assert!(matches!(
            result,
            Err(XyzError::CountMismatch {
                expected: 2000000000000000,
                found: 1
            })
        ));
    }

    #[test]
    fn missing_box_is_reported() {
        let text = "1\nperiodic=true\nCu 0 0 0\n";
        let result = XyzFile::read_from(&mut BufReader::new(text.as_bytes()));
        assert!(matches!(result, Err(XyzError::MissingField("box"))));
    }

    #[test]
    fn truncated_atom_list_is_reported() {
        let text = "3\nbox=5,5,5\nCu 0 0 0\nCu 1 1 1\n";
        let result = XyzFile::read_from(&mut BufReader::new(text.as_bytes()));
        assert!(matches!(
            result,
            Err(XyzError::CountMismatch {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn malformed_coordinate_reports_line_number() {
        let text = "2\nbox=5,5,5\nCu 0 0 0\nCu 1 x 1\n";
        let result = XyzFile::read_from(&mut BufReader::new(text.as_bytes()));
        assert!(matches!(result, Err(XyzError::Parse { line: 4, .. })));
    }

    #[test]
    fn mobile_count_larger_than_atoms_is_rejected() {
        let text = "1\nbox=5,5,5 mobile=2\nCu 0 0 0\n";
        let result = XyzFile::read_from(&mut BufReader::new(text.as_bytes()));
        assert!(matches!(result, Err(XyzError::Atoms(_))));
    }
}
