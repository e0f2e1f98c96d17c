//! Hand-written collaborators for driving scans without a network.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;
use vantage_core::contracts::{
    Crawler, CrawlerConfig, CrawlerFactory, CrawlError, ModuleError, PerDirectoryModule,
    PerHostModule, RequestEngine, RequestEngineFactory, RequestOrigin,
    ResponseProcessingModule, ResponseProcessor, ScanInstance, ScanModel, ScannerModule,
    TransportError, Workspace,
};
use vantage_core::model::{
    HttpRequest, HttpResponse, ModuleId, RequestEngineConfig, ScanDirectory, ScanHost, ScanId,
    ScanStatus,
};

/// Request engine answering from a table, 200 for anything unlisted.
#[derive(Default)]
pub struct FakeRequestEngine {
    config: RequestEngineConfig,
    responses: Mutex<HashMap<String, Result<HttpResponse, TransportError>>>,
    hang: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    sent: Mutex<Vec<Url>>,
    processors: Mutex<Vec<Arc<dyn ResponseProcessor>>>,
}

impl FakeRequestEngine {
    pub fn with_config(config: RequestEngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn respond(&self, url: &str, response: Result<HttpResponse, TransportError>) {
        self.responses.lock().insert(url.to_string(), response);
    }

    /// Makes every later `send` wait forever.
    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    /// Holds the next `send` until the returned gate is notified.
    pub fn gate_next(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub fn sent(&self) -> Vec<Url> {
        self.sent.lock().clone()
    }

    pub fn processor_count(&self) -> usize {
        self.processors.lock().len()
    }
}

#[async_trait]
impl RequestEngine for FakeRequestEngine {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.lock().push(request.url.clone());
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let canned = self.responses.lock().get(request.url.as_str()).cloned();
        let response = canned.unwrap_or_else(|| Ok(HttpResponse::new(request.url.clone(), 200)))?;

        let processors = self.processors.lock().clone();
        for processor in processors {
            processor.process_response(&request, &response);
        }
        Ok(response)
    }

    fn register_response_processor(&self, processor: Arc<dyn ResponseProcessor>) {
        self.processors.lock().push(processor);
    }

    fn config(&self) -> RequestEngineConfig {
        self.config.clone()
    }
}

/// Hands out one shared engine and records what it was asked for.
#[derive(Default)]
pub struct FakeRequestEngineFactory {
    pub engine: Arc<FakeRequestEngine>,
    pub fail_with: Mutex<Option<TransportError>>,
    pub configs: Mutex<Vec<RequestEngineConfig>>,
    pub origins: Mutex<Vec<RequestOrigin>>,
}

impl FakeRequestEngineFactory {
    pub fn created(&self) -> usize {
        self.configs.lock().len()
    }
}

impl RequestEngineFactory for FakeRequestEngineFactory {
    fn create_request_engine(
        &self,
        config: RequestEngineConfig,
        origin: RequestOrigin,
    ) -> Result<Arc<dyn RequestEngine>, TransportError> {
        if let Some(err) = self.fail_with.lock().clone() {
            return Err(err);
        }
        self.configs.lock().push(config);
        self.origins.lock().push(origin);
        Ok(self.engine.clone())
    }
}

#[derive(Debug, Clone)]
pub enum CrawlBehavior {
    /// Reports every link, then finishes.
    Emit,
    /// Reports every link, then fails.
    Fail(String),
    /// Refuses to start.
    FailToStart(String),
    /// Reports every link, then waits until stopped.
    BlockUntilStopped,
    /// Panics while crawling.
    Panic,
}

/// Fetches each configured link through the scan's engine and reports it.
pub struct FakeCrawler {
    config: CrawlerConfig,
    request_engine: Arc<dyn RequestEngine>,
    links: Vec<Url>,
    behavior: CrawlBehavior,
    stop: CancellationToken,
    stop_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Crawler for FakeCrawler {
    fn start(&self) -> Result<(), CrawlError> {
        match &self.behavior {
            CrawlBehavior::FailToStart(reason) => Err(CrawlError::Failed(reason.clone())),
            _ => Ok(()),
        }
    }

    async fn wait_finished(&self) -> Result<(), CrawlError> {
        if matches!(self.behavior, CrawlBehavior::Panic) {
            panic!("crawler panicked");
        }
        for link in &self.links {
            // Fetch failures still count as discovered links.
            let _ = self.request_engine.send(HttpRequest::get(link.clone())).await;
            self.config.notify_link(link);
        }
        match &self.behavior {
            CrawlBehavior::Fail(reason) => Err(CrawlError::Failed(reason.clone())),
            CrawlBehavior::BlockUntilStopped => {
                self.stop.cancelled().await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stop.cancel();
    }
}

pub struct FakeCrawlerFactory {
    links: Vec<Url>,
    behavior: CrawlBehavior,
    pub created: AtomicUsize,
    pub stop_calls: Arc<AtomicUsize>,
}

impl FakeCrawlerFactory {
    pub fn new(links: &[&str], behavior: CrawlBehavior) -> Self {
        Self {
            links: links
                .iter()
                .map(|link| Url::parse(link).expect("valid crawl link"))
                .collect(),
            behavior,
            created: AtomicUsize::new(0),
            stop_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl CrawlerFactory for FakeCrawlerFactory {
    fn create(
        &self,
        config: CrawlerConfig,
        request_engine: Arc<dyn RequestEngine>,
    ) -> Arc<dyn Crawler> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Arc::new(FakeCrawler {
            config,
            request_engine,
            links: self.links.clone(),
            behavior: self.behavior.clone(),
            stop: CancellationToken::new(),
            stop_calls: self.stop_calls.clone(),
        })
    }
}

/// Workspace that counts lock depth and remembers every active-scan change.
#[derive(Default)]
pub struct CountingWorkspace {
    locks: AtomicIsize,
    unlocks: AtomicUsize,
    active: Mutex<Vec<Option<ScanId>>>,
}

impl CountingWorkspace {
    pub fn lock_depth(&self) -> isize {
        self.locks.load(Ordering::SeqCst)
    }

    pub fn unlocks(&self) -> usize {
        self.unlocks.load(Ordering::SeqCst)
    }

    pub fn active_history(&self) -> Vec<Option<ScanId>> {
        self.active.lock().clone()
    }
}

impl Workspace for CountingWorkspace {
    fn lock(&self) {
        self.locks.fetch_add(1, Ordering::SeqCst);
    }

    fn unlock(&self) {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
        self.locks.fetch_sub(1, Ordering::SeqCst);
    }

    fn set_active_scan_instance(&self, scan: Option<ScanId>) {
        self.active.lock().push(scan);
    }
}

/// Persisted record stand-in that keeps every status it was given.
pub struct RecordingInstance {
    id: ScanId,
    statuses: Mutex<Vec<ScanStatus>>,
}

impl RecordingInstance {
    pub fn new() -> Self {
        Self {
            id: ScanId::new(),
            statuses: Mutex::new(Vec::new()),
        }
    }

    pub fn statuses(&self) -> Vec<ScanStatus> {
        self.statuses.lock().clone()
    }
}

impl ScanInstance for RecordingInstance {
    fn scan_id(&self) -> ScanId {
        self.id
    }

    fn update_status(&self, status: ScanStatus) {
        self.statuses.lock().push(status);
    }
}

/// What a recording module does when invoked.
#[derive(Clone)]
pub enum ModuleBehavior {
    Succeed,
    Fail,
    Panic,
    /// Signals `entered`, then waits on `release` before succeeding.
    Gate {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    },
}

/// Call log shared by every instance a factory builds.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Active or passive module that logs `"<id> <target>"` per invocation.
pub struct RecordingModule {
    id: ModuleId,
    enabled: AtomicBool,
    behavior: ModuleBehavior,
    calls: CallLog,
}

impl RecordingModule {
    pub fn new(id: &'static str, behavior: ModuleBehavior, calls: CallLog) -> Self {
        Self {
            id: ModuleId::from_static(id),
            enabled: AtomicBool::new(true),
            behavior,
            calls,
        }
    }

    async fn run(&self, target: String) -> Result<(), ModuleError> {
        self.calls.lock().push(format!("{} {}", self.id, target));
        match &self.behavior {
            ModuleBehavior::Succeed => Ok(()),
            ModuleBehavior::Fail => Err(ModuleError::failed(&self.id, "boom")),
            ModuleBehavior::Panic => panic!("module {} panicked", self.id),
            ModuleBehavior::Gate { entered, release } => {
                entered.notify_one();
                release.notified().await;
                Ok(())
            }
        }
    }
}

impl ScannerModule for RecordingModule {
    fn id(&self) -> &ModuleId {
        &self.id
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

#[async_trait]
impl PerHostModule for RecordingModule {
    async fn run_scan(
        &self,
        host: &ScanHost,
        _request_engine: &dyn RequestEngine,
        _model: &dyn ScanModel,
    ) -> Result<(), ModuleError> {
        self.run(host.to_string()).await
    }
}

#[async_trait]
impl PerDirectoryModule for RecordingModule {
    async fn run_scan(
        &self,
        directory: &ScanDirectory,
        _request_engine: &dyn RequestEngine,
        _model: &dyn ScanModel,
    ) -> Result<(), ModuleError> {
        self.run(directory.to_string()).await
    }
}

impl ResponseProcessingModule for RecordingModule {
    fn process_response(
        &self,
        _request: &HttpRequest,
        response: &HttpResponse,
        _model: &dyn ScanModel,
    ) -> Result<(), ModuleError> {
        self.calls.lock().push(format!("{} {}", self.id, response.url));
        match self.behavior {
            ModuleBehavior::Fail => Err(ModuleError::failed(&self.id, "boom")),
            ModuleBehavior::Panic => panic!("module {} panicked", self.id),
            _ => Ok(()),
        }
    }
}
