//! Contracts for the collaborators the scan orchestration core consumes.
//!
//! The core never reaches into transport, crawling, persistence or module
//! internals; it only speaks these traits. Implementations live with the
//! embedding application (or in test doubles).
#![allow(missing_docs)]

pub mod crawler;
pub mod error;
pub mod modules;
pub mod request_engine;
pub mod scan_model;
pub mod workspace;

pub use crawler::{Crawler, CrawlerConfig, CrawlerEventHandler, CrawlerFactory};
pub use error::{CrawlError, ModuleError, TransportError};
pub use modules::{
    BasicModule, ModuleCategory, PerDirectoryModule, PerHostModule,
    ResponseProcessingModule, ScannerModule,
};
pub use request_engine::{
    RequestEngine, RequestEngineFactory, RequestOrigin, ResponseProcessor,
};
pub use scan_model::ScanModel;
pub use workspace::{ScanInstance, Workspace};
