use url::Url;

/// Classification of a one-shot reachability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProbeOutcome {
    /// Target answered with a usable response.
    Reachable,
    /// Target answered with a redirect to a different location.
    Redirect,
    /// Target answered 404.
    PageNotFound,
    /// Transport level failure: DNS, refused connection, TLS, timeout.
    ConnectFailed,
    /// Probe was aborted before the response arrived.
    Aborted,
}

impl ProbeOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}

/// Result of `Scan::probe`. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanProbeResult {
    pub uri: Url,
    pub outcome: ProbeOutcome,
    pub status_code: Option<u16>,
    pub redirect_location: Option<Url>,
    pub detail: Option<String>,
}

impl ScanProbeResult {
    pub fn reachable(uri: Url, status_code: u16) -> Self {
        Self {
            uri,
            outcome: ProbeOutcome::Reachable,
            status_code: Some(status_code),
            redirect_location: None,
            detail: None,
        }
    }

    pub fn redirect(uri: Url, status_code: u16, location: Url) -> Self {
        Self {
            uri,
            outcome: ProbeOutcome::Redirect,
            status_code: Some(status_code),
            redirect_location: Some(location),
            detail: None,
        }
    }

    pub fn page_not_found(uri: Url) -> Self {
        Self {
            uri,
            outcome: ProbeOutcome::PageNotFound,
            status_code: Some(404),
            redirect_location: None,
            detail: None,
        }
    }

    pub fn connect_failed(uri: Url, detail: impl Into<String>) -> Self {
        Self {
            uri,
            outcome: ProbeOutcome::ConnectFailed,
            status_code: None,
            redirect_location: None,
            detail: Some(detail.into()),
        }
    }

    pub fn aborted(uri: Url) -> Self {
        Self {
            uri,
            outcome: ProbeOutcome::Aborted,
            status_code: None,
            redirect_location: None,
            detail: Some("probe aborted".to_string()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}
