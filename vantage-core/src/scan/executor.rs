use std::{
    fmt,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::FutureExt;
use tracing::{debug, info, warn};
use url::Url;
use vantage_contracts::{
    Crawler, CrawlerEventHandler, ModuleError, RequestEngine, ScanModel, ScannerModule,
};
use vantage_model::ScanStatus;

use super::{Scan, response_pipeline::ResponsePipeline};
use crate::modules::ModuleSet;

/// Forwards crawler discoveries into the shared scan model.
struct DiscoverySink {
    model: Arc<dyn ScanModel>,
    links: AtomicUsize,
}

impl CrawlerEventHandler for DiscoverySink {
    fn link_discovered(&self, link: &Url) {
        self.links.fetch_add(1, Ordering::Relaxed);
        debug!(target: "scan::crawl", link = %link, "link discovered");
        self.model.add_discovered_uri(link);
    }
}

/// Stops a started crawler unless its crawl settled. Covers the unwind out
/// of `wait_finished`, where the crawler may still be sending requests.
struct RunningCrawler {
    crawler: Arc<dyn Crawler>,
    settled: bool,
}

impl RunningCrawler {
    fn new(crawler: Arc<dyn Crawler>) -> Self {
        Self {
            crawler,
            settled: false,
        }
    }

    fn stop(&mut self) {
        self.settled = true;
        self.crawler.stop();
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for RunningCrawler {
    fn drop(&mut self) {
        if !self.settled {
            warn!(target: "scan::crawl", "crawl unwound, stopping crawler");
            self.crawler.stop();
        }
    }
}

/// Background task driving one scan through crawl, per-host audit and
/// per-directory audit.
pub(super) struct PhaseExecutor {
    scan: Arc<Scan>,
    base_uri: Url,
    request_engine: Arc<dyn RequestEngine>,
    modules: ModuleSet,
    model: Arc<dyn ScanModel>,
    log_all_requests: bool,
}

impl fmt::Debug for PhaseExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseExecutor")
            .field("scan", &self.scan.id())
            .field("base_uri", &self.base_uri.as_str())
            .field("modules", &self.modules)
            .field("log_all_requests", &self.log_all_requests)
            .finish()
    }
}

impl PhaseExecutor {
    pub(super) fn new(
        scan: Arc<Scan>,
        base_uri: Url,
        request_engine: Arc<dyn RequestEngine>,
        modules: ModuleSet,
        log_all_requests: bool,
    ) -> Self {
        let model = Arc::clone(scan.scanner().scan_model());
        Self {
            scan,
            base_uri,
            request_engine,
            modules,
            model,
            log_all_requests,
        }
    }

    /// Runs every phase, then settles the terminal status and tears the
    /// scan down. A panic anywhere in the phases ends the scan cancelled.
    pub(super) async fn run(self) {
        let outcome = AssertUnwindSafe(self.execute()).catch_unwind().await;

        let terminal = match outcome {
            Ok(()) if self.cancelled() => ScanStatus::Cancelled,
            Ok(()) => ScanStatus::Completed,
            Err(_) => {
                warn!(target: "scan::lifecycle", scan = %self.scan.id(), "scan executor panicked");
                self.scan.record(|report| report.panicked = true);
                ScanStatus::Cancelled
            }
        };

        let report = self.scan.report();
        info!(
            target: "scan::lifecycle",
            scan = %self.scan.id(),
            status = %terminal,
            links = report.links_discovered,
            hosts = report.hosts_audited,
            directories = report.directories_audited,
            module_failures = report.module_failures,
            degraded = report.is_degraded(),
            "scan pipeline finished"
        );
        self.scan.set_status(terminal);
        self.scan.finish();
    }

    async fn execute(&self) {
        self.request_engine.register_response_processor(Arc::new(ResponsePipeline::new(
            self.scan.id(),
            self.modules.response_processing.clone(),
            Arc::clone(&self.model),
            self.log_all_requests,
        )));
        self.model.add_discovered_uri(&self.base_uri);
        if self.cancelled() {
            return;
        }

        self.scan.set_status(ScanStatus::Crawling);
        self.crawl().await;
        if self.cancelled() {
            return;
        }

        self.scan.set_status(ScanStatus::Auditing);
        self.audit_hosts().await;
        if self.cancelled() {
            return;
        }
        self.audit_directories().await;
    }

    fn cancelled(&self) -> bool {
        self.scan.cancel_token().is_cancelled()
    }

    async fn crawl(&self) {
        let factory = &self.scan.scanner().services().crawlers;
        let sink = Arc::new(DiscoverySink {
            model: Arc::clone(&self.model),
            links: AtomicUsize::new(0),
        });
        let mut config = factory.create_config(&self.base_uri);
        config.add_event_handler(sink.clone());

        let crawler = factory.create(config, Arc::clone(&self.request_engine));
        info!(target: "scan::crawl", base_uri = %self.base_uri, "crawler starting");

        let result = match crawler.start() {
            Ok(()) => {
                let mut running = RunningCrawler::new(Arc::clone(&crawler));
                let finished = crawler.wait_finished();
                tokio::pin!(finished);
                let result = tokio::select! {
                    result = &mut finished => result,
                    _ = self.scan.cancel_token().cancelled() => {
                        info!(target: "scan::crawl", "stopping crawler");
                        running.stop();
                        finished.await
                    }
                };
                running.settle();
                result
            }
            Err(err) => Err(err),
        };

        let links = sink.links.load(Ordering::Relaxed);
        self.scan.record(|report| report.links_discovered = links);
        match result {
            Ok(()) => info!(target: "scan::crawl", links, "crawl finished"),
            Err(err) => {
                warn!(target: "scan::crawl", links, error = %err, "crawl failed, continuing with what was discovered");
                self.scan.record(|report| report.crawl_error = Some(err.to_string()));
            }
        }
    }

    async fn audit_hosts(&self) {
        let hosts = self.model.unscanned_hosts();
        info!(target: "scan::audit", count = hosts.len(), "auditing hosts");

        for host in hosts {
            if self.cancelled() {
                return;
            }
            for module in &self.modules.per_host {
                self.invoke(module.as_ref(), &host, || {
                    module.run_scan(&host, self.request_engine.as_ref(), self.model.as_ref())
                })
                .await;
                if self.cancelled() {
                    return;
                }
            }
            self.model.mark_host_scanned(&host);
            self.scan.record(|report| report.hosts_audited += 1);
        }
    }

    async fn audit_directories(&self) {
        let directories = self.model.unscanned_directories();
        info!(target: "scan::audit", count = directories.len(), "auditing directories");

        for directory in directories {
            if self.cancelled() {
                return;
            }
            for module in &self.modules.per_directory {
                self.invoke(module.as_ref(), &directory, || {
                    module.run_scan(&directory, self.request_engine.as_ref(), self.model.as_ref())
                })
                .await;
                if self.cancelled() {
                    return;
                }
            }
            self.model.mark_directory_scanned(&directory);
            self.scan.record(|report| report.directories_audited += 1);
        }
    }

    /// Runs one module against one target. Failures and panics are logged
    /// and counted; they never end the phase.
    async fn invoke<M, T, F, Fut>(&self, module: &M, target: &T, call: F)
    where
        M: ScannerModule + ?Sized,
        T: fmt::Display + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ModuleError>>,
    {
        if !module.is_enabled() {
            debug!(target: "scan::modules", module = %module.id(), "skipping disabled module");
            return;
        }

        debug!(target: "scan::modules", module = %module.id(), scan_target = %target, "running module");
        self.scan.record(|report| report.module_invocations += 1);
        let outcome = AssertUnwindSafe(async move { call().await })
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err.to_string(),
            Err(_) => "module panicked".to_string(),
        };
        warn!(
            target: "scan::modules",
            module = %module.id(),
            scan_target = %target,
            error = %failure,
            "module failed, continuing"
        );
        self.scan.record(|report| report.module_failures += 1);
    }
}
