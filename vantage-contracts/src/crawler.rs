use std::{fmt, sync::Arc};

use async_trait::async_trait;
use url::Url;

use crate::{error::CrawlError, request_engine::RequestEngine};

/// Receives crawler notifications as they happen.
pub trait CrawlerEventHandler: Send + Sync {
    fn link_discovered(&self, link: &Url);
}

/// Seed and event sinks for one crawler run.
#[derive(Clone)]
pub struct CrawlerConfig {
    base_uri: Url,
    handlers: Vec<Arc<dyn CrawlerEventHandler>>,
}

impl fmt::Debug for CrawlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlerConfig")
            .field("base_uri", &self.base_uri.as_str())
            .field("handler_count", &self.handlers.len())
            .finish()
    }
}

impl CrawlerConfig {
    pub fn new(base_uri: Url) -> Self {
        Self {
            base_uri,
            handlers: Vec::new(),
        }
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    pub fn add_event_handler(&mut self, handler: Arc<dyn CrawlerEventHandler>) {
        self.handlers.push(handler);
    }

    /// Fans a discovered link out to every registered handler.
    pub fn notify_link(&self, link: &Url) {
        for handler in &self.handlers {
            handler.link_discovered(link);
        }
    }
}

/// A running (or runnable) crawl.
///
/// `start` launches the crawl in the background and returns; `wait_finished`
/// resolves once the crawl has drained or been stopped. `stop` may be called
/// from any thread at any time and must be idempotent.
#[async_trait]
pub trait Crawler: Send + Sync {
    fn start(&self) -> Result<(), CrawlError>;

    async fn wait_finished(&self) -> Result<(), CrawlError>;

    fn stop(&self);
}

pub trait CrawlerFactory: Send + Sync {
    fn create_config(&self, base_uri: &Url) -> CrawlerConfig {
        CrawlerConfig::new(base_uri.clone())
    }

    fn create(
        &self,
        config: CrawlerConfig,
        request_engine: Arc<dyn RequestEngine>,
    ) -> Arc<dyn Crawler>;
}
