//! Shared harness for scan lifecycle integration tests.
#![allow(dead_code)]

pub mod fakes;

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use url::Url;
use vantage_core::{
    InMemoryScanModel, ModuleRegistry, Scan, Scanner, ScannerServices,
    contracts::{PerDirectoryModule, PerHostModule, ResponseProcessingModule},
    model::{ModuleId, ScanStatus},
};

use fakes::{
    CallLog, CountingWorkspace, CrawlBehavior, FakeCrawlerFactory, FakeRequestEngine,
    FakeRequestEngineFactory, ModuleBehavior, RecordingInstance, RecordingModule,
};

/// Upper bound for anything a test awaits on the background executor.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub scanner: Scanner,
    pub engines: Arc<FakeRequestEngineFactory>,
    pub crawlers: Arc<FakeCrawlerFactory>,
    pub registry: Arc<ModuleRegistry>,
    pub model: Arc<InMemoryScanModel>,
    pub workspace: Arc<CountingWorkspace>,
    pub calls: CallLog,
}

impl Harness {
    pub fn new(crawlers: FakeCrawlerFactory) -> Self {
        let engines = Arc::new(FakeRequestEngineFactory::default());
        let crawlers = Arc::new(crawlers);
        let registry = Arc::new(ModuleRegistry::new());
        let model = Arc::new(InMemoryScanModel::new());

        let scanner = Scanner::new(ScannerServices {
            request_engines: engines.clone(),
            crawlers: crawlers.clone(),
            modules: registry.clone(),
            model: model.clone(),
        });

        Self {
            scanner,
            engines,
            crawlers,
            registry,
            model,
            workspace: Arc::new(CountingWorkspace::default()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Crawler that reports `links` and finishes cleanly.
    pub fn crawling(links: &[&str]) -> Self {
        Self::new(FakeCrawlerFactory::new(links, CrawlBehavior::Emit))
    }

    pub fn engine(&self) -> &Arc<FakeRequestEngine> {
        &self.engines.engine
    }

    pub fn register_per_host(&self, id: &'static str, behavior: ModuleBehavior) {
        let calls = self.calls.clone();
        self.registry
            .register_per_host_module(ModuleId::from_static(id), move || {
                Arc::new(RecordingModule::new(id, behavior.clone(), calls.clone()))
                    as Arc<dyn PerHostModule>
            });
    }

    pub fn register_per_directory(&self, id: &'static str, behavior: ModuleBehavior) {
        let calls = self.calls.clone();
        self.registry
            .register_per_directory_module(ModuleId::from_static(id), move || {
                Arc::new(RecordingModule::new(id, behavior.clone(), calls.clone()))
                    as Arc<dyn PerDirectoryModule>
            });
    }

    pub fn register_response_processing(&self, id: &'static str, behavior: ModuleBehavior) {
        let calls = self.calls.clone();
        self.registry
            .register_response_processing_module(ModuleId::from_static(id), move || {
                Arc::new(RecordingModule::new(id, behavior.clone(), calls.clone()))
                    as Arc<dyn ResponseProcessingModule>
            });
    }

    pub fn create_scan(&self) -> (Arc<Scan>, Arc<RecordingInstance>) {
        let instance = Arc::new(RecordingInstance::new());
        let scan = self
            .scanner
            .create_scan(instance.clone(), self.workspace.clone());
        (scan, instance)
    }

    /// Locked scan configured against `base_uri`.
    pub fn ready_scan(&self, base_uri: &str) -> (Arc<Scan>, Arc<RecordingInstance>) {
        let (scan, instance) = self.create_scan();
        scan.configure(|config| config.base_uri = Some(url(base_uri)))
            .expect("idle scan accepts configuration");
        self.scanner.lock(&scan).expect("scanner lock is free");
        (scan, instance)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, id: &str) -> Vec<String> {
        let prefix = format!("{id} ");
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(&prefix))
            .collect()
    }
}

pub fn url(raw: &str) -> Url {
    Url::parse(raw).expect("valid test url")
}

pub async fn wait_finished(scan: &Scan) {
    tokio::time::timeout(SETTLE_TIMEOUT, scan.wait_finished())
        .await
        .expect("scan finished in time");
}

pub async fn wait_for_status(scan: &Scan, status: ScanStatus) {
    let mut rx = scan.subscribe_status();
    tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(|current| *current == status))
        .await
        .expect("status reached in time")
        .expect("status channel open");
}
