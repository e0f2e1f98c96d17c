use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use vantage_contracts::{CrawlerFactory, RequestEngineFactory, ScanInstance, ScanModel, Workspace};
use vantage_model::ScanId;

use crate::{
    error::{Result, ScanError},
    modules::ModuleRegistry,
    scan::Scan,
};

/// Shared factories every scan on one scanner draws from.
#[derive(Clone)]
pub struct ScannerServices {
    pub request_engines: Arc<dyn RequestEngineFactory>,
    pub crawlers: Arc<dyn CrawlerFactory>,
    pub modules: Arc<ModuleRegistry>,
    pub model: Arc<dyn ScanModel>,
}

impl fmt::Debug for ScannerServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerServices")
            .field("request_engines", &"RequestEngineFactory")
            .field("crawlers", &"CrawlerFactory")
            .field("modules", &self.modules)
            .field("model", &"ScanModel")
            .finish()
    }
}

/// Single-flight lock authority over the shared scan resources.
///
/// At most one [`Scan`] holds the lock at a time; only the holder may send
/// probe requests or run its pipeline.
#[derive(Clone)]
pub struct Scanner {
    inner: Arc<ScannerInner>,
}

struct ScannerInner {
    services: ScannerServices,
    holder: Mutex<Option<ScanId>>,
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("services", &self.inner.services)
            .field("lock_holder", &*self.inner.holder.lock())
            .finish()
    }
}

impl Scanner {
    pub fn new(services: ScannerServices) -> Self {
        Self {
            inner: Arc::new(ScannerInner {
                services,
                holder: Mutex::new(None),
            }),
        }
    }

    pub fn services(&self) -> &ScannerServices {
        &self.inner.services
    }

    pub fn module_registry(&self) -> &Arc<ModuleRegistry> {
        &self.inner.services.modules
    }

    pub fn scan_model(&self) -> &Arc<dyn ScanModel> {
        &self.inner.services.model
    }

    /// Creates a session bound to `instance` and `workspace`. The workspace
    /// lock is taken here and released when the scan finishes.
    pub fn create_scan(
        &self,
        instance: Arc<dyn ScanInstance>,
        workspace: Arc<dyn Workspace>,
    ) -> Arc<Scan> {
        workspace.lock();
        let scan = Scan::new(self.clone(), instance, workspace);
        info!(target: "scan::lifecycle", scan = %scan.id(), "scan session created");
        scan
    }

    /// Acquires the scanner lock for `scan`. Re-locking by the current holder
    /// succeeds. A finished scan can never lock again, since nothing would
    /// release it.
    pub fn lock(&self, scan: &Scan) -> Result<()> {
        let mut holder = self.inner.holder.lock();
        // Checked under the holder mutex: `finish` releases through the same
        // mutex after the terminal status is published.
        let status = scan.status();
        if status.is_terminal() {
            debug!(target: "scan::lifecycle", scan = %scan.id(), %status, "refusing to lock a finished scan");
            return Err(ScanError::invalid_state(format!(
                "scan already {status}, cannot take the scanner lock"
            )));
        }
        match *holder {
            Some(current) if current != scan.id() => {
                debug!(target: "scan::lifecycle", scan = %scan.id(), holder = %current, "scanner lock contended");
                Err(ScanError::LockedState)
            }
            Some(_) => Ok(()),
            None => {
                *holder = Some(scan.id());
                debug!(target: "scan::lifecycle", scan = %scan.id(), "scanner locked");
                Ok(())
            }
        }
    }

    pub fn is_locked(&self, scan: &Scan) -> bool {
        *self.inner.holder.lock() == Some(scan.id())
    }

    pub fn lock_holder(&self) -> Option<ScanId> {
        *self.inner.holder.lock()
    }

    /// Releases the lock whoever holds it. Releasing an unheld lock is a
    /// logged no-op.
    pub fn unlock(&self) {
        match self.inner.holder.lock().take() {
            Some(previous) => {
                debug!(target: "scan::lifecycle", scan = %previous, "scanner unlocked")
            }
            None => warn!(target: "scan::lifecycle", "unlock called on an unlocked scanner"),
        }
    }

    /// Releases the lock only if `scan` holds it, so a finishing session never
    /// drops another session's lock.
    pub(crate) fn release(&self, scan: ScanId) -> bool {
        let mut holder = self.inner.holder.lock();
        if *holder == Some(scan) {
            *holder = None;
            debug!(target: "scan::lifecycle", scan = %scan, "scanner lock released");
            true
        } else {
            false
        }
    }
}
