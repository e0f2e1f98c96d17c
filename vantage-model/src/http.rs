use url::Url;

use crate::scan::{Cookie, DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_RESPONSE_KILOBYTES};

/// Request handed to the request engine. Only the pieces the orchestration
/// core and modules need to agree on; wire encoding belongs to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            headers: Vec::new(),
        }
    }
}

/// Response as delivered by the request engine, after its size cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(url: Url, status: u16) -> Self {
        Self {
            url,
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

/// Tunables a request engine is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEngineConfig {
    pub cookies: Vec<Cookie>,
    pub max_connections: usize,
    pub max_connections_per_route: usize,
    /// `None` means the engine applies no request rate limit.
    pub requests_per_minute: Option<u32>,
    pub max_response_kilobytes: u32,
}

impl Default for RequestEngineConfig {
    fn default() -> Self {
        Self {
            cookies: Vec::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_connections_per_route: DEFAULT_MAX_CONNECTIONS,
            requests_per_minute: None,
            max_response_kilobytes: DEFAULT_MAX_RESPONSE_KILOBYTES,
        }
    }
}

impl RequestEngineConfig {
    pub fn add_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }
}
