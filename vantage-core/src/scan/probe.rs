use std::{fmt, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;
use vantage_contracts::{RequestEngine, TransportError};
use vantage_model::{HttpRequest, HttpResponse, ScanProbeResult};

/// One-shot reachability check against a candidate target.
///
/// Has no lifecycle beyond running or finished; `abort` cancels the pending
/// request and the probe reports [`vantage_model::ProbeOutcome::Aborted`].
pub struct ScanProbe {
    uri: Url,
    request_engine: Arc<dyn RequestEngine>,
    abort: CancellationToken,
}

impl fmt::Debug for ScanProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanProbe")
            .field("uri", &self.uri.as_str())
            .field("aborted", &self.abort.is_cancelled())
            .finish()
    }
}

impl ScanProbe {
    pub fn new(uri: Url, request_engine: Arc<dyn RequestEngine>) -> Self {
        Self::with_abort_token(uri, request_engine, CancellationToken::new())
    }

    pub(crate) fn with_abort_token(
        uri: Url,
        request_engine: Arc<dyn RequestEngine>,
        abort: CancellationToken,
    ) -> Self {
        Self {
            uri,
            request_engine,
            abort,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn abort(&self) {
        self.abort.cancel();
    }

    pub async fn run(&self) -> ScanProbeResult {
        let request = HttpRequest::get(self.uri.clone());
        debug!(target: "scan::probe", uri = %self.uri, "sending probe request");

        let result = tokio::select! {
            biased;
            _ = self.abort.cancelled() => {
                info!(target: "scan::probe", uri = %self.uri, "probe aborted");
                return ScanProbeResult::aborted(self.uri.clone());
            }
            response = self.request_engine.send(request) => response,
        };

        let probe_result = classify(&self.uri, result);
        info!(
            target: "scan::probe",
            uri = %self.uri,
            outcome = ?probe_result.outcome,
            status = ?probe_result.status_code,
            "probe finished"
        );
        probe_result
    }
}

fn classify(
    uri: &Url,
    result: Result<HttpResponse, TransportError>,
) -> ScanProbeResult {
    let response = match result {
        Ok(response) => response,
        Err(TransportError::Aborted) => return ScanProbeResult::aborted(uri.clone()),
        Err(err) => return ScanProbeResult::connect_failed(uri.clone(), err.to_string()),
    };

    if response.status == 404 {
        return ScanProbeResult::page_not_found(uri.clone());
    }

    if response.is_redirect() {
        let location = response
            .header("location")
            .and_then(|location| uri.join(location).ok());
        return match location {
            Some(location) if &location != uri => {
                ScanProbeResult::redirect(uri.clone(), response.status, location)
            }
            Some(_) => ScanProbeResult::reachable(uri.clone(), response.status)
                .with_detail("redirect points back at the probed uri"),
            None => ScanProbeResult::reachable(uri.clone(), response.status)
                .with_detail("redirect without a usable Location header"),
        };
    }

    ScanProbeResult::reachable(uri.clone(), response.status)
}

#[cfg(test)]
mod tests {
    use vantage_model::ProbeOutcome;

    use super::*;

    fn target() -> Url {
        Url::parse("http://example.test/app/").expect("valid test url")
    }

    #[test]
    fn ok_response_is_reachable() {
        let result = classify(&target(), Ok(HttpResponse::new(target(), 200)));
        assert!(result.is_success());
        assert_eq!(result.status_code, Some(200));
    }

    #[test]
    fn relative_redirect_is_resolved() {
        let response = HttpResponse::new(target(), 302).with_header("Location", "/login");
        let result = classify(&target(), Ok(response));
        assert_eq!(result.outcome, ProbeOutcome::Redirect);
        assert_eq!(
            result.redirect_location.map(|url| url.to_string()),
            Some("http://example.test/login".to_string())
        );
    }

    #[test]
    fn not_found_and_transport_failures_are_classified() {
        let missing = classify(&target(), Ok(HttpResponse::new(target(), 404)));
        assert_eq!(missing.outcome, ProbeOutcome::PageNotFound);

        let refused = classify(
            &target(),
            Err(TransportError::Connect("connection refused".into())),
        );
        assert_eq!(refused.outcome, ProbeOutcome::ConnectFailed);
        assert_eq!(
            refused.detail.as_deref(),
            Some("connection failed: connection refused")
        );

        let aborted = classify(&target(), Err(TransportError::Aborted));
        assert_eq!(aborted.outcome, ProbeOutcome::Aborted);
    }
}
