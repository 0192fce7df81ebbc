use crate::cli::BackendKind;

/// Values used when neither the run file nor the command line sets them.
pub struct DefaultsConfig {
    pub title: String,
    pub steps: u64,
    pub averaging_window: u64,
    pub report_interval: u64,
    pub rescale_interval: u64,
    pub periodic: bool,
    pub print_distances: bool,
    pub backend: BackendKind,
    pub batch_steps: usize,
    pub check_steps: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            title: "pairdyn run".to_string(),
            steps: 1000,
            averaging_window: 100,
            report_interval: 100,
            rescale_interval: 0,
            periodic: true,
            print_distances: false,
            backend: BackendKind::Sequential,
            batch_steps: 10,
            check_steps: 10,
        }
    }
}
