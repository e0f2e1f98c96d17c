//! Settings loading and tracing setup for embedding the Vantage scanner.
#![allow(missing_docs)]

pub mod logging;
pub mod settings;

pub use logging::init_tracing;
pub use settings::{ScannerSettings, ScannerSettingsSource, SettingsFormat};
