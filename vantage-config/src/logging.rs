use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset: lifecycle and phase summaries at
/// info, per-request logging only when the scan asks for it.
pub const DEFAULT_FILTER: &str =
    "info,scan::lifecycle=info,scan::crawl=info,scan::audit=info,scan::requests=info,scan::modules=warn";

/// Installs the global subscriber. Returns false when one was already set,
/// so embedding applications and tests can call it freely.
pub fn init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
