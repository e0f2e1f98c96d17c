use std::{fmt, sync::Arc};

use async_trait::async_trait;
use vantage_model::{HttpRequest, HttpResponse, RequestEngineConfig, ScanId};

use crate::error::TransportError;

/// Who a request is attributed to in the workspace's request log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestOrigin {
    pub scan_id: ScanId,
}

impl RequestOrigin {
    pub fn scanner(scan_id: ScanId) -> Self {
        Self { scan_id }
    }
}

impl fmt::Display for RequestOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scanner:{}", self.scan_id)
    }
}

/// Hook the request engine calls for every response it receives.
pub trait ResponseProcessor: Send + Sync {
    fn process_response(&self, request: &HttpRequest, response: &HttpResponse);
}

/// Rate limited, connection pooled HTTP client shared by the crawler and
/// every module invocation of one scan.
#[async_trait]
pub trait RequestEngine: Send + Sync {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError>;

    fn register_response_processor(&self, processor: Arc<dyn ResponseProcessor>);

    fn config(&self) -> RequestEngineConfig;
}

/// Builds request engines. The factory owns client construction; callers
/// only describe limits and attribution.
pub trait RequestEngineFactory: Send + Sync {
    fn create_config(&self) -> RequestEngineConfig {
        RequestEngineConfig::default()
    }

    fn create_request_engine(
        &self,
        config: RequestEngineConfig,
        origin: RequestOrigin,
    ) -> Result<Arc<dyn RequestEngine>, TransportError>;
}
