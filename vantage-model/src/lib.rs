//! Core data model definitions shared across Vantage crates.
#![allow(missing_docs)]

pub mod error;
pub mod http;
pub mod ids;
pub mod probe;
pub mod scan;
pub mod target;

// Intentionally curated re-exports for downstream consumers.
pub use error::ModelError;
pub use http::{HttpRequest, HttpResponse, RequestEngineConfig};
pub use ids::{ModuleId, ScanId};
pub use probe::{ProbeOutcome, ScanProbeResult};
pub use scan::{Cookie, ScanConfiguration, ScanStatus};
pub use target::{ScanDirectory, ScanHost};
