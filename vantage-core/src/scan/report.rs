use chrono::{DateTime, Utc};

/// What the phase executor got through.
///
/// A scan that loses modules or its crawler to transport failures still
/// ends `Completed`; this record is where the difference shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub links_discovered: usize,
    pub crawl_error: Option<String>,
    pub hosts_audited: usize,
    pub directories_audited: usize,
    pub module_invocations: usize,
    pub module_failures: usize,
    pub panicked: bool,
}

impl ScanReport {
    /// True when any part of the pipeline failed rather than ran clean.
    pub fn is_degraded(&self) -> bool {
        self.crawl_error.is_some() || self.module_failures > 0 || self.panicked
    }
}
