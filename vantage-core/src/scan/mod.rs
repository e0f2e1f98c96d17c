//! Scan session: configuration, lifecycle state machine, probe and pipeline
//! launch, cooperative cancellation and the exactly-once teardown.

mod executor;
mod probe;
mod report;
mod response_pipeline;
mod status;

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::{Mutex, RwLock};
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;
use vantage_contracts::{RequestEngine, ScanInstance, Workspace};
use vantage_model::{
    RequestEngineConfig, ScanConfiguration, ScanId, ScanProbeResult, ScanStatus,
};

use crate::{
    error::{Result, ScanError},
    modules::{ModuleHandle, ModuleSet},
    scanner::Scanner,
};

use executor::PhaseExecutor;
pub use probe::ScanProbe;
pub use report::ScanReport;
use status::StatusCell;

/// State guarded by the control lock. Every precondition check and the
/// launch of a probe or the executor happen under it, so `stop` always sees
/// a consistent picture of what is running.
#[derive(Default)]
struct ScanControl {
    request_engine: Option<Arc<dyn RequestEngine>>,
    modules: ModuleSet,
    probe: Option<CancellationToken>,
    worker: Option<JoinHandle<()>>,
}

/// One end-to-end scan session.
pub struct Scan {
    id: ScanId,
    scanner: Scanner,
    instance: Arc<dyn ScanInstance>,
    workspace: Arc<dyn Workspace>,
    config: RwLock<ScanConfiguration>,
    status: StatusCell,
    control: Mutex<ScanControl>,
    cancel: CancellationToken,
    report: Mutex<ScanReport>,
    finish_claimed: AtomicBool,
    finished: watch::Sender<bool>,
}

impl fmt::Debug for Scan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let control = self.control.try_lock();
        f.debug_struct("Scan")
            .field("id", &self.id)
            .field("status", &self.status.get())
            .field("probe_in_flight", &control.as_ref().map(|c| c.probe.is_some()))
            .field("executor_launched", &control.as_ref().map(|c| c.worker.is_some()))
            .field("cancel_requested", &self.cancel.is_cancelled())
            .field("finished", &*self.finished.borrow())
            .finish()
    }
}

impl Scan {
    pub(crate) fn new(
        scanner: Scanner,
        instance: Arc<dyn ScanInstance>,
        workspace: Arc<dyn Workspace>,
    ) -> Arc<Self> {
        let modules = scanner.module_registry().module_set();
        let (finished, _rx) = watch::channel(false);
        Arc::new(Self {
            id: instance.scan_id(),
            scanner,
            instance,
            workspace,
            config: RwLock::new(ScanConfiguration::default()),
            status: StatusCell::new(),
            control: Mutex::new(ScanControl {
                modules,
                ..ScanControl::default()
            }),
            cancel: CancellationToken::new(),
            report: Mutex::new(ScanReport::default()),
            finish_claimed: AtomicBool::new(false),
            finished,
        })
    }

    pub fn id(&self) -> ScanId {
        self.id
    }

    pub fn status(&self) -> ScanStatus {
        self.status.get()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ScanStatus> {
        self.status.subscribe()
    }

    pub fn configuration(&self) -> ScanConfiguration {
        self.config.read().clone()
    }

    /// Edits the configuration. Only allowed while the scan is idle; a
    /// request engine built by an earlier probe is discarded so the next use
    /// picks up the new settings.
    pub fn configure<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut ScanConfiguration),
    {
        let mut control = self.control.lock();
        if self.status() != ScanStatus::Idle {
            return Err(ScanError::invalid_state(
                "configuration is frozen once a scan has started",
            ));
        }
        if control.probe.is_some() {
            return Err(ScanError::invalid_state(
                "configuration cannot change while a probe is in progress",
            ));
        }
        edit(&mut *self.config.write());
        control.request_engine = None;
        Ok(())
    }

    pub fn set_configuration(&self, config: ScanConfiguration) -> Result<()> {
        self.configure(|current| *current = config)
    }

    pub fn report(&self) -> ScanReport {
        self.report.lock().clone()
    }

    /// Reconciles the held modules against the registry and lists them all.
    pub fn list_modules(&self) -> Vec<ModuleHandle> {
        let mut control = self.control.lock();
        self.reload_modules(&mut control);
        control.modules.handles()
    }

    /// Sends a single reachability check to `uri` and waits for it.
    pub async fn probe(&self, uri: Url) -> Result<ScanProbeResult> {
        let probe = {
            let mut control = self.control.lock();
            if !self.scanner.is_locked(self) {
                return Err(ScanError::LockedState);
            }
            if self.status() != ScanStatus::Idle {
                return Err(ScanError::invalid_state(
                    "unable to probe for a scan that is already running or complete",
                ));
            }
            if control.probe.is_some() {
                return Err(ScanError::invalid_state("another probe is already in progress"));
            }

            let request_engine = self.request_engine(&mut control)?;
            let abort = self.cancel.child_token();
            control.probe = Some(abort.clone());
            ScanProbe::with_abort_token(uri, request_engine, abort)
        };

        let _slot = ProbeSlot { scan: self };
        Ok(probe.run().await)
    }

    /// Launches the crawl and audit pipeline on its own task and returns
    /// without waiting for it.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut control = self.control.lock();
        if !self.scanner.is_locked(self) {
            return Err(ScanError::LockedState);
        }
        if self.status() != ScanStatus::Idle {
            return Err(ScanError::invalid_state("scan is already running or complete"));
        }
        if control.probe.is_some() {
            return Err(ScanError::invalid_state("a probe is in progress"));
        }
        let config = self.configuration();
        let Some(base_uri) = config.base_uri.clone() else {
            return Err(ScanError::InvalidConfiguration(
                "cannot start scan because no base URI was specified".into(),
            ));
        };
        let runtime = Handle::try_current().map_err(|_| {
            ScanError::invalid_state("starting a scan requires a tokio runtime")
        })?;

        let request_engine = self.request_engine(&mut control)?;
        self.reload_modules(&mut control);
        control.modules.disable(&config.disabled_modules);

        self.workspace.set_active_scan_instance(Some(self.id));
        self.report.lock().started_at = Some(chrono::Utc::now());
        self.set_status(ScanStatus::Starting);

        let executor = PhaseExecutor::new(
            Arc::clone(self),
            base_uri.clone(),
            request_engine,
            control.modules.clone(),
            config.log_all_requests,
        );
        let span = info_span!("scan", scan = %self.id, base_uri = %base_uri);
        control.worker = Some(runtime.spawn(executor.run().instrument(span)));
        info!(target: "scan::lifecycle", scan = %self.id, base_uri = %base_uri, "scan started");
        Ok(())
    }

    /// Requests cooperative cancellation. Safe to call at any time and from
    /// any thread; repeated calls and calls after the scan has finished are
    /// no-ops.
    pub fn stop(&self) {
        let control = self.control.lock();
        if self.status().is_terminal() {
            debug!(target: "scan::lifecycle", scan = %self.id, "stop ignored, scan already finished");
            return;
        }

        self.cancel.cancel();
        if let Some(probe) = control.probe.as_ref() {
            info!(target: "scan::lifecycle", scan = %self.id, "aborting probe in flight");
            probe.cancel();
        }
        if control.worker.is_some() {
            info!(target: "scan::lifecycle", scan = %self.id, "stop requested, executor will wind down");
            return;
        }

        // Nothing was launched; cancel and tear down right here.
        self.set_status(ScanStatus::Cancelled);
        drop(control);
        self.finish();
    }

    /// Resolves once teardown has run.
    pub async fn wait_finished(&self) {
        let mut rx = self.finished.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|finished| *finished).await;
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.borrow()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub(crate) fn record<F>(&self, update: F)
    where
        F: FnOnce(&mut ScanReport),
    {
        update(&mut self.report.lock());
    }

    pub(crate) fn set_status(&self, next: ScanStatus) {
        match self.status.transition(next) {
            Some(previous) => {
                self.instance.update_status(next);
                info!(
                    target: "scan::lifecycle",
                    scan = %self.id,
                    from = %previous,
                    to = %next,
                    "scan status changed"
                );
            }
            None => debug!(
                target: "scan::lifecycle",
                scan = %self.id,
                current = %self.status(),
                rejected = %next,
                "status transition rejected"
            ),
        }
    }

    /// Clears the active scan pointer and releases the scanner and workspace
    /// locks. Effects run once; later calls return immediately.
    pub(crate) fn finish(&self) {
        if self.finish_claimed.swap(true, Ordering::SeqCst) {
            debug!(target: "scan::lifecycle", scan = %self.id, "finish already ran");
            return;
        }

        self.workspace.set_active_scan_instance(None);
        if !self.scanner.release(self.id) {
            debug!(target: "scan::lifecycle", scan = %self.id, "scan did not hold the scanner lock at finish");
        }
        self.workspace.unlock();
        self.report.lock().finished_at = Some(chrono::Utc::now());
        self.finished.send_replace(true);
        info!(target: "scan::lifecycle", scan = %self.id, status = %self.status(), "scan finished");
    }

    fn request_engine(&self, control: &mut ScanControl) -> Result<Arc<dyn RequestEngine>> {
        if let Some(engine) = control.request_engine.as_ref() {
            return Ok(Arc::clone(engine));
        }

        let factory = &self.scanner.services().request_engines;
        let config = engine_config(factory.create_config(), &self.config.read());
        let origin = self.workspace.request_origin(self.id);
        let engine = factory.create_request_engine(config, origin).map_err(|err| {
            warn!(target: "scan::lifecycle", scan = %self.id, error = %err, "failed to build request engine");
            ScanError::from(err)
        })?;
        control.request_engine = Some(Arc::clone(&engine));
        Ok(engine)
    }

    fn reload_modules(&self, control: &mut ScanControl) {
        control.modules = self
            .scanner
            .module_registry()
            .update_module_set(&control.modules);
    }
}

/// Clears the probe slot however the probe future ends, including when the
/// caller drops it.
struct ProbeSlot<'a> {
    scan: &'a Scan,
}

impl Drop for ProbeSlot<'_> {
    fn drop(&mut self) {
        self.scan.control.lock().probe = None;
    }
}

/// Applies a scan's limits on top of the factory's defaults.
fn engine_config(
    mut base: RequestEngineConfig,
    config: &ScanConfiguration,
) -> RequestEngineConfig {
    for cookie in &config.cookies {
        base.add_cookie(cookie.clone());
    }
    if config.max_requests_per_second > 0 {
        base.requests_per_minute = Some(config.max_requests_per_second.saturating_mul(60));
    }
    base.max_connections = config.max_connections;
    base.max_connections_per_route = config.max_connections;
    base.max_response_kilobytes = config.max_response_kilobytes;
    base
}
