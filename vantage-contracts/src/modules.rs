use std::fmt;

use async_trait::async_trait;
use vantage_model::{
    HttpRequest, HttpResponse, ModuleId, ScanDirectory, ScanHost,
};

use crate::{error::ModuleError, request_engine::RequestEngine, scan_model::ScanModel};

/// Capability role a module is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleCategory {
    ResponseProcessing,
    Basic,
    PerHost,
    PerDirectory,
}

impl ModuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleCategory::ResponseProcessing => "response_processing",
            ModuleCategory::Basic => "basic",
            ModuleCategory::PerHost => "per_host",
            ModuleCategory::PerDirectory => "per_directory",
        }
    }
}

impl fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour shared by every module role.
///
/// The enabled flag is the per-instance configuration reconciliation
/// preserves; implementations keep it behind interior mutability.
pub trait ScannerModule: Send + Sync {
    fn id(&self) -> &ModuleId;

    fn name(&self) -> &str {
        self.id().as_str()
    }

    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);
}

/// Passive module fed every response the request engine receives.
pub trait ResponseProcessingModule: ScannerModule {
    fn process_response(
        &self,
        request: &HttpRequest,
        response: &HttpResponse,
        model: &dyn ScanModel,
    ) -> Result<(), ModuleError>;
}

/// Module without a fixed target kind. Listed and configurable alongside the
/// others; the embedding application decides when it runs.
pub trait BasicModule: ScannerModule {}

/// Active module run once per discovered host.
#[async_trait]
pub trait PerHostModule: ScannerModule {
    async fn run_scan(
        &self,
        host: &ScanHost,
        request_engine: &dyn RequestEngine,
        model: &dyn ScanModel,
    ) -> Result<(), ModuleError>;
}

/// Active module run once per discovered directory.
#[async_trait]
pub trait PerDirectoryModule: ScannerModule {
    async fn run_scan(
        &self,
        directory: &ScanDirectory,
        request_engine: &dyn RequestEngine,
        model: &dyn ScanModel,
    ) -> Result<(), ModuleError>;
}
