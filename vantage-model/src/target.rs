use std::fmt;

use url::Url;

use crate::error::{ModelError, Result};

/// Origin a per-host module runs against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanHost {
    scheme: String,
    host: String,
    port: u16,
}

impl ScanHost {
    pub fn from_url(url: &Url) -> Result<Self> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ModelError::UnsupportedScheme(scheme.to_string()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ModelError::InvalidUri(format!("{url} has no host")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ModelError::InvalidUri(format!("{url} has no port")))?;

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_ascii_lowercase(),
            port,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn is_default_port(&self) -> bool {
        matches!(
            (self.scheme.as_str(), self.port),
            ("http", 80) | ("https", 443)
        )
    }

    /// Root URI of this host.
    pub fn uri(&self) -> Result<Url> {
        Ok(Url::parse(&format!("{self}/"))?)
    }
}

impl fmt::Display for ScanHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default_port() {
            write!(f, "{}://{}", self.scheme, self.host)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

/// Directory on a host a per-directory module runs against. The path always
/// starts and ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanDirectory {
    host: ScanHost,
    path: String,
}

impl ScanDirectory {
    pub fn new(host: ScanHost, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        Self { host, path }
    }

    /// Every directory containing `url`, outermost first. `/a/b/page.html`
    /// yields `/`, `/a/`, `/a/b/`.
    pub fn ancestors_of(url: &Url) -> Result<Vec<Self>> {
        let host = ScanHost::from_url(url)?;
        let path = url.path();
        let dir_end = path.rfind('/').map(|idx| idx + 1).unwrap_or(0);

        let mut directories = vec![Self::new(host.clone(), "/")];
        let mut current = String::from("/");
        for segment in path[..dir_end].split('/').filter(|s| !s.is_empty()) {
            current.push_str(segment);
            current.push('/');
            directories.push(Self::new(host.clone(), current.clone()));
        }
        Ok(directories)
    }

    pub fn host(&self) -> &ScanHost {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn uri(&self) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.host, self.path))?)
    }
}

impl fmt::Display for ScanDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.host, self.path)
    }
}
