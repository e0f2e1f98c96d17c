use vantage_model::{ScanId, ScanStatus};

use crate::request_engine::RequestOrigin;

/// Workspace a scan's alerts and requests are recorded into.
///
/// `lock`/`unlock` are a reference count keeping the workspace open while
/// any scan runs against it.
pub trait Workspace: Send + Sync {
    fn lock(&self);

    fn unlock(&self);

    /// Scan new alerts are attributed to, or `None` once it finishes.
    fn set_active_scan_instance(&self, scan: Option<ScanId>);

    fn request_origin(&self, scan: ScanId) -> RequestOrigin {
        RequestOrigin::scanner(scan)
    }
}

/// Persistent record of one scan run.
pub trait ScanInstance: Send + Sync {
    fn scan_id(&self) -> ScanId;

    fn update_status(&self, status: ScanStatus);
}
