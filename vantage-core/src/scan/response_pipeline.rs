use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tracing::{info, trace, warn};
use vantage_contracts::{ResponseProcessingModule, ResponseProcessor, ScanModel};
use vantage_model::{HttpRequest, HttpResponse, ScanId};

/// Hands every response the request engine sees to the scan's enabled
/// response-processing modules.
pub(crate) struct ResponsePipeline {
    scan_id: ScanId,
    modules: Vec<Arc<dyn ResponseProcessingModule>>,
    model: Arc<dyn ScanModel>,
    log_all_requests: bool,
}

impl fmt::Debug for ResponsePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponsePipeline")
            .field("scan_id", &self.scan_id)
            .field("module_count", &self.modules.len())
            .field("log_all_requests", &self.log_all_requests)
            .finish()
    }
}

impl ResponsePipeline {
    pub(crate) fn new(
        scan_id: ScanId,
        modules: Vec<Arc<dyn ResponseProcessingModule>>,
        model: Arc<dyn ScanModel>,
        log_all_requests: bool,
    ) -> Self {
        Self {
            scan_id,
            modules,
            model,
            log_all_requests,
        }
    }
}

impl ResponseProcessor for ResponsePipeline {
    fn process_response(&self, request: &HttpRequest, response: &HttpResponse) {
        if self.log_all_requests {
            info!(
                target: "scan::requests",
                scan = %self.scan_id,
                method = %request.method,
                url = %request.url,
                status = response.status,
                "scanner request"
            );
        } else {
            trace!(
                target: "scan::requests",
                scan = %self.scan_id,
                method = %request.method,
                url = %request.url,
                status = response.status,
                "scanner request"
            );
        }

        for module in self.modules.iter().filter(|module| module.is_enabled()) {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                module.process_response(request, response, self.model.as_ref())
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(
                    target: "scan::modules",
                    scan = %self.scan_id,
                    module = %module.id(),
                    url = %response.url,
                    error = %err,
                    "response processing module failed"
                ),
                Err(_) => warn!(
                    target: "scan::modules",
                    scan = %self.scan_id,
                    module = %module.id(),
                    url = %response.url,
                    "response processing module panicked"
                ),
            }
        }
    }
}
