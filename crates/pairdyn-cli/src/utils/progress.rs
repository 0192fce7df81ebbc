use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use pairdyn::engine::progress::{Progress, ProgressCallback};
use std::time::Duration;

const SPINNER_TICK_MS: u64 = 80;

fn status_message(temperature: f64, total_energy: f64) -> String {
    format!("T = {:.2} K, E = {:.6}", temperature, total_energy)
}

/// Terminal view of a run.
///
/// A spinner covers backend preparation; the integration itself gets a step
/// bar whose message follows the temperature and total energy reported after
/// every batch.
#[derive(Clone)]
pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target).with_style(Self::spinner_style());
        bar.finish_and_clear();
        Self { bar }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let view = self.clone();
        Box::new(move |event| view.handle(event))
    }

    fn handle(&self, event: Progress) {
        let bar = &self.bar;
        match event {
            Progress::PhaseStart { name } => {
                bar.reset();
                bar.set_length(0);
                bar.set_style(Self::spinner_style());
                bar.set_prefix(name);
                bar.set_message("");
                bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
            }
            Progress::PhaseFinish => {
                bar.disable_steady_tick();
                bar.finish_with_message("done");
            }
            Progress::TaskStart { total_steps } => {
                bar.disable_steady_tick();
                bar.reset();
                bar.set_length(total_steps);
                bar.set_style(Self::bar_style());
                bar.set_prefix("Integrating");
                bar.set_message("");
            }
            Progress::TaskAdvance { steps } => bar.inc(steps),
            Progress::Status {
                temperature,
                total_energy,
                ..
            } => bar.set_message(status_message(temperature, total_energy)),
            Progress::TaskFinish => {
                if let Some(length) = bar.length() {
                    bar.set_position(length);
                }
                bar.finish();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {prefix} {msg}")
            .expect("Failed to create spinner style template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{prefix:<12} [{bar:32.cyan/blue}] {pos}/{len} steps {msg} ({rate}, {eta})",
        )
        .expect("Failed to create bar style template")
        .with_key(
            "rate",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.0} steps/s", state.per_sec());
            },
        )
        .with_key(
            "eta",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            },
        )
        .progress_chars("=>-")
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}
