//! Reads and writes the files a run consumes and produces.
//!
//! Structures use an extended XYZ layout whose comment line carries the periodic
//! box and the mobile-atom count, so a saved final state can seed a later run.
//! Energy histories are CSV tables with one row per report. Ball-and-stick
//! scenes are write-only and meant for viewing.

pub mod ball_stick;
pub mod energy_log;
pub mod traits;
pub mod xyz;
