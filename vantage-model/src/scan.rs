use std::fmt;

use url::Url;

use crate::ids::ModuleId;

pub const DEFAULT_MAX_CONNECTIONS: usize = 16;
pub const DEFAULT_MAX_RESPONSE_KILOBYTES: u32 = 1024;

/// Lifecycle of a single scan session.
///
/// Progression is one-way: `Idle -> Starting -> Crawling -> Auditing ->
/// Completed`, with `Cancelled` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScanStatus {
    #[default]
    Idle,
    Starting,
    Crawling,
    Auditing,
    Completed,
    Cancelled,
}

impl ScanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Cancelled)
    }

    /// Position in the forward progression. `Cancelled` shares the terminal
    /// rank with `Completed`.
    fn rank(self) -> u8 {
        match self {
            ScanStatus::Idle => 0,
            ScanStatus::Starting => 1,
            ScanStatus::Crawling => 2,
            ScanStatus::Auditing => 3,
            ScanStatus::Completed | ScanStatus::Cancelled => 4,
        }
    }

    /// Whether moving from `self` to `next` respects the lifecycle.
    pub fn can_transition_to(self, next: ScanStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == ScanStatus::Cancelled {
            return true;
        }
        next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Idle => "idle",
            ScanStatus::Starting => "starting",
            ScanStatus::Crawling => "crawling",
            ScanStatus::Auditing => "auditing",
            ScanStatus::Completed => "completed",
            ScanStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cookie injected into the request engine's cookie store before a scan
/// sends its first request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub domain: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub path: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Operator supplied settings for one scan. Freely mutable until the scan
/// leaves `Idle`; frozen afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScanConfiguration {
    pub base_uri: Option<Url>,
    pub cookies: Vec<Cookie>,
    pub max_connections: usize,
    /// Zero leaves the request engine's own rate limit untouched.
    pub max_requests_per_second: u32,
    pub max_response_kilobytes: u32,
    pub log_all_requests: bool,
    /// Modules switched off when the scan starts.
    pub disabled_modules: Vec<ModuleId>,
}

impl Default for ScanConfiguration {
    fn default() -> Self {
        Self {
            base_uri: None,
            cookies: Vec::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_requests_per_second: 0,
            max_response_kilobytes: DEFAULT_MAX_RESPONSE_KILOBYTES,
            log_all_requests: false,
            disabled_modules: Vec::new(),
        }
    }
}

impl ScanConfiguration {
    pub fn with_base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = Some(base_uri);
        self
    }

    pub fn base_uri(&self) -> Option<&Url> {
        self.base_uri.as_ref()
    }

    pub fn is_module_disabled(&self, id: &ModuleId) -> bool {
        self.disabled_modules.iter().any(|disabled| disabled == id)
    }
}
