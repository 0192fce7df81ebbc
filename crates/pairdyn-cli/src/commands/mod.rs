pub mod check;
pub mod run;

use crate::utils::progress::RunProgress;
use pairdyn::engine::progress::ProgressReporter;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalOptions {
    pub threads: Option<usize>,
    pub quiet: bool,
}

impl GlobalOptions {
    /// A progress reporter that draws a bar unless output is suppressed.
    pub fn reporter(&self) -> ProgressReporter<'static> {
        if self.quiet {
            ProgressReporter::new()
        } else {
            ProgressReporter::with_callback(RunProgress::new().callback())
        }
    }
}
