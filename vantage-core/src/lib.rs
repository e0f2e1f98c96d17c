//! # Vantage Core
//!
//! Scan lifecycle and phase orchestration for the Vantage web application
//! scanner.
//!
//! A [`Scanner`] owns the shared factories (request engines, crawlers, the
//! module registry and the scan model) and a single-flight lock. Each
//! [`Scan`] created from it moves through
//! `Idle -> Starting -> Crawling -> Auditing -> Completed`, or to `Cancelled`
//! from any non-terminal state, and releases every lock it took exactly once
//! when it ends.
//!
//! ## Architecture
//!
//! - [`scanner`]: engine lock authority and scan factory
//! - [`scan`]: the session, its probe and its background phase executor
//! - [`modules`]: module registry and held-set reconciliation
//! - [`discovery`]: in-memory scan model
//!
//! Transport, crawling, persistence and the modules themselves sit behind the
//! traits in [`contracts`].
#![allow(missing_docs)]

pub mod discovery;
pub mod error;
pub mod modules;
pub mod scan;
pub mod scanner;

pub use vantage_contracts as contracts;
pub use vantage_model as model;

pub use discovery::InMemoryScanModel;
pub use error::{Result, ScanError};
pub use modules::{ModuleHandle, ModuleRegistry, ModuleSet, reconcile};
pub use scan::{Scan, ScanProbe, ScanReport};
pub use scanner::{Scanner, ScannerServices};
