use url::Url;
use vantage_model::{ScanDirectory, ScanHost};

/// Discovery graph fed by the crawler and queried by the audit phases.
///
/// Implementations must tolerate concurrent `add_discovered_uri` calls from
/// crawler workers while the executor reads.
pub trait ScanModel: Send + Sync {
    fn add_discovered_uri(&self, uri: &Url);

    fn unscanned_hosts(&self) -> Vec<ScanHost>;

    fn unscanned_directories(&self) -> Vec<ScanDirectory>;

    fn mark_host_scanned(&self, host: &ScanHost);

    fn mark_directory_scanned(&self, directory: &ScanDirectory);
}
