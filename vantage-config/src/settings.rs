use anyhow::{Context, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};
use tracing::info;
use url::Url;
use vantage_model::{
    Cookie, ModuleId, ScanConfiguration,
    scan::{DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_RESPONSE_KILOBYTES},
};

pub const CONFIG_PATH_ENV: &str = "VANTAGE_SCANNER_CONFIG_PATH";
pub const CONFIG_JSON_ENV: &str = "VANTAGE_SCANNER_CONFIG_JSON";

/// Source that produced the scanner settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScannerSettingsSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

impl fmt::Display for ScannerSettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("built-in defaults"),
            Self::EnvPath(path) => write!(f, "{CONFIG_PATH_ENV}={}", path.display()),
            Self::EnvInline => f.write_str(CONFIG_JSON_ENV),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Operator-facing scan settings. Every field is optional in the file;
/// missing ones fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Where crawling starts. Must be `http` or `https` when present.
    pub base_uri: Option<String>,
    /// Cookies loaded into the request engine before the first request.
    pub cookies: Vec<Cookie>,
    /// Cap on concurrent connections, applied both globally and per route.
    pub max_connections: usize,
    /// Request rate cap. `0` leaves the engine's own limit alone.
    pub max_requests_per_second: u32,
    /// Responses larger than this are cut off by the request engine.
    pub max_response_kilobytes: u32,
    /// Log every scanner request at `info` instead of `trace`.
    pub log_all_requests: bool,
    /// Module ids disabled when the scan starts.
    pub excluded_modules: Vec<String>,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            base_uri: None,
            cookies: Vec::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_requests_per_second: 0,
            max_response_kilobytes: DEFAULT_MAX_RESPONSE_KILOBYTES,
            log_all_requests: false,
            excluded_modules: Vec::new(),
        }
    }
}

impl ScannerSettings {
    /// Load scanner settings using environment variables.
    /// Evaluation order:
    /// 1) `$VANTAGE_SCANNER_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$VANTAGE_SCANNER_CONFIG_JSON` (inline JSON),
    /// 3) the first default file found in the working directory,
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, ScannerSettingsSource)> {
        let (settings, source) =
            Self::load_with(|key| env::var(key).ok(), Self::find_default_file)?;
        info!(target: "scan::config", source = %source, "scanner settings loaded");
        Ok((settings, source))
    }

    fn load_with<E, F>(
        lookup: E,
        default_file: F,
    ) -> anyhow::Result<(Self, ScannerSettingsSource)>
    where
        E: Fn(&str) -> Option<String>,
        F: FnOnce() -> Option<PathBuf>,
    {
        if let Some(path_str) = lookup(CONFIG_PATH_ENV)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, ScannerSettingsSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_ENV)
            && !raw.trim().is_empty()
        {
            let parsed = SettingsFormat::Json
                .decode(&raw)
                .with_context(|| format!("{CONFIG_JSON_ENV} is not valid scanner settings"))?;
            return Ok((parsed, ScannerSettingsSource::EnvInline));
        }

        if let Some(path) = default_file() {
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, ScannerSettingsSource::File(path)));
        }

        Ok((Self::default(), ScannerSettingsSource::Default))
    }

    /// Reads a settings file. The extension picks the format; anything else
    /// is sniffed with [`ScannerSettings::parse`].
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::parse(&contents, SettingsFormat::from_path(path))
            .with_context(|| format!("bad scanner settings in {}", path.display()))
    }

    /// Decodes `contents` in `format`, or tries TOML then JSON when the
    /// format is unknown.
    pub fn parse(contents: &str, format: Option<SettingsFormat>) -> anyhow::Result<Self> {
        if let Some(format) = format {
            return format.decode(contents);
        }
        SettingsFormat::Toml.decode(contents).or_else(|as_toml| {
            SettingsFormat::Json.decode(contents).map_err(|as_json| {
                anyhow!("neither TOML ({as_toml:#}) nor JSON ({as_json:#})")
            })
        })
    }

    /// Validates the settings and converts them into a scan configuration.
    pub fn into_scan_configuration(self) -> anyhow::Result<ScanConfiguration> {
        let base_uri = match self.base_uri.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let url = Url::parse(raw)
                    .with_context(|| format!("invalid base_uri {raw:?}"))?;
                if !matches!(url.scheme(), "http" | "https") {
                    bail!("base_uri must use http or https, got {}", url.scheme());
                }
                Some(url)
            }
        };

        if self.max_connections == 0 {
            bail!("max_connections must be at least 1");
        }

        let disabled_modules = self
            .excluded_modules
            .into_iter()
            .map(|id| {
                ModuleId::new(id).context("excluded_modules contains a blank module id")
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(ScanConfiguration {
            base_uri,
            cookies: self.cookies,
            max_connections: self.max_connections,
            max_requests_per_second: self.max_requests_per_second,
            max_response_kilobytes: self.max_response_kilobytes,
            log_all_requests: self.log_all_requests,
            disabled_modules,
        })
    }

    /// `scanner.{toml,json}` in the working directory, then under `config/`.
    fn find_default_file() -> Option<PathBuf> {
        ["", "config"]
            .into_iter()
            .flat_map(|dir| {
                [SettingsFormat::Toml, SettingsFormat::Json]
                    .map(|format| Path::new(dir).join(format!("scanner.{}", format.extension())))
            })
            .find(|candidate| candidate.is_file())
    }
}

/// On-disk encodings the settings loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Toml,
    Json,
}

impl SettingsFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }

    fn decode(self, contents: &str) -> anyhow::Result<ScannerSettings> {
        let settings: ScannerSettings = match self {
            Self::Toml => toml::from_str(contents)?,
            Self::Json => serde_json::from_str(contents)?,
        };
        Ok(settings)
    }
}
