use std::sync::Arc;

use vantage_contracts::ScannerModule;
use vantage_model::ModuleId;

/// Refreshes a held module collection against the registry's live entries.
///
/// The result follows `live` order. Modules the caller already holds keep
/// their existing instance (and with it any configuration applied to it);
/// ids missing from `held` are built with `fresh`; held modules no longer
/// registered are dropped. Reconciling the output again against the same
/// `live` list returns the same instances.
pub fn reconcile<M, L, F>(held: &[Arc<M>], live: &[L], mut fresh: F) -> Vec<Arc<M>>
where
    M: ScannerModule + ?Sized,
    L: AsRef<ModuleId>,
    F: FnMut(&L) -> Arc<M>,
{
    live.iter()
        .map(|entry| {
            let id = entry.as_ref();
            held.iter()
                .find(|module| module.id() == id)
                .cloned()
                .unwrap_or_else(|| fresh(entry))
        })
        .collect()
}
