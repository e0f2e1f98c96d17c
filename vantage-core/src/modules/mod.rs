//! Module registry, held module sets and the reconciliation protocol.

mod reconcile;
mod registry;

use std::{fmt, sync::Arc};

use vantage_contracts::{
    BasicModule, ModuleCategory, PerDirectoryModule, PerHostModule,
    ResponseProcessingModule, ScannerModule,
};
use vantage_model::ModuleId;

pub use reconcile::reconcile;
pub use registry::ModuleRegistry;

/// The four categorized module collections a scan holds.
#[derive(Clone, Default)]
pub struct ModuleSet {
    pub response_processing: Vec<Arc<dyn ResponseProcessingModule>>,
    pub basic: Vec<Arc<dyn BasicModule>>,
    pub per_host: Vec<Arc<dyn PerHostModule>>,
    pub per_directory: Vec<Arc<dyn PerDirectoryModule>>,
}

impl fmt::Debug for ModuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn ids<M: ScannerModule + ?Sized>(modules: &[Arc<M>]) -> Vec<&str> {
            modules.iter().map(|module| module.id().as_str()).collect()
        }

        f.debug_struct("ModuleSet")
            .field("response_processing", &ids(&self.response_processing))
            .field("basic", &ids(&self.basic))
            .field("per_host", &ids(&self.per_host))
            .field("per_directory", &ids(&self.per_directory))
            .finish()
    }
}

impl ModuleSet {
    pub fn len(&self) -> usize {
        self.response_processing.len()
            + self.basic.len()
            + self.per_host.len()
            + self.per_directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union of every category, in category then registration order.
    pub fn handles(&self) -> Vec<ModuleHandle> {
        let mut handles = Vec::with_capacity(self.len());
        handles.extend(
            self.response_processing
                .iter()
                .cloned()
                .map(ModuleHandle::ResponseProcessing),
        );
        handles.extend(self.basic.iter().cloned().map(ModuleHandle::Basic));
        handles.extend(self.per_host.iter().cloned().map(ModuleHandle::PerHost));
        handles.extend(
            self.per_directory
                .iter()
                .cloned()
                .map(ModuleHandle::PerDirectory),
        );
        handles
    }

    /// Switches off every held module whose id is listed.
    pub fn disable(&self, ids: &[ModuleId]) {
        for handle in self.handles() {
            if ids.contains(handle.id()) {
                handle.set_enabled(false);
            }
        }
    }
}

/// A held module of any category.
#[derive(Clone)]
pub enum ModuleHandle {
    ResponseProcessing(Arc<dyn ResponseProcessingModule>),
    Basic(Arc<dyn BasicModule>),
    PerHost(Arc<dyn PerHostModule>),
    PerDirectory(Arc<dyn PerDirectoryModule>),
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("id", &self.id().as_str())
            .field("category", &self.category())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl ModuleHandle {
    pub fn category(&self) -> ModuleCategory {
        match self {
            ModuleHandle::ResponseProcessing(_) => ModuleCategory::ResponseProcessing,
            ModuleHandle::Basic(_) => ModuleCategory::Basic,
            ModuleHandle::PerHost(_) => ModuleCategory::PerHost,
            ModuleHandle::PerDirectory(_) => ModuleCategory::PerDirectory,
        }
    }

    fn module(&self) -> &dyn ScannerModule {
        match self {
            ModuleHandle::ResponseProcessing(module) => module.as_ref(),
            ModuleHandle::Basic(module) => module.as_ref(),
            ModuleHandle::PerHost(module) => module.as_ref(),
            ModuleHandle::PerDirectory(module) => module.as_ref(),
        }
    }

    pub fn id(&self) -> &ModuleId {
        self.module().id()
    }

    pub fn name(&self) -> &str {
        self.module().name()
    }

    pub fn is_enabled(&self) -> bool {
        self.module().is_enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.module().set_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use vantage_contracts::{ModuleError, RequestEngine, ScanModel};
    use vantage_model::{ScanDirectory, ScanHost};

    use super::*;

    struct NullHostModule {
        id: ModuleId,
        enabled: AtomicBool,
    }

    impl NullHostModule {
        fn new(name: &'static str) -> Self {
            Self {
                id: ModuleId::from_static(name),
                enabled: AtomicBool::new(true),
            }
        }

        fn shared(name: &'static str) -> Arc<dyn PerHostModule> {
            Arc::new(Self::new(name))
        }
    }

    impl ScannerModule for NullHostModule {
        fn id(&self) -> &ModuleId {
            &self.id
        }

        fn is_enabled(&self) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        fn set_enabled(&self, enabled: bool) {
            self.enabled.store(enabled, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PerHostModule for NullHostModule {
        async fn run_scan(
            &self,
            _host: &ScanHost,
            _request_engine: &dyn RequestEngine,
            _model: &dyn ScanModel,
        ) -> Result<(), ModuleError> {
            Ok(())
        }
    }

    #[async_trait]
    impl PerDirectoryModule for NullHostModule {
        async fn run_scan(
            &self,
            _directory: &ScanDirectory,
            _request_engine: &dyn RequestEngine,
            _model: &dyn ScanModel,
        ) -> Result<(), ModuleError> {
            Ok(())
        }
    }

    fn registry_with(names: &[&'static str]) -> ModuleRegistry {
        let registry = ModuleRegistry::new();
        for name in names {
            let name = *name;
            registry.register_per_host_module(ModuleId::from_static(name), move || {
                NullHostModule::shared(name)
            });
        }
        registry
    }

    #[test]
    fn registry_hands_out_fresh_instances() {
        let registry = registry_with(&["banner", "methods"]);
        let first = registry.per_host_modules();
        let second = registry.per_host_modules();
        assert_eq!(first.len(), 2);
        assert!(!Arc::ptr_eq(&first[0], &second[0]));
        assert_eq!(
            registry.category_of(&ModuleId::from_static("methods")),
            Some(ModuleCategory::PerHost)
        );
    }

    #[test]
    fn update_preserves_disabled_flag_across_reload() {
        let registry = registry_with(&["banner", "methods"]);
        let held = registry.module_set();
        held.disable(&[ModuleId::from_static("banner")]);

        let refreshed = registry.update_module_set(&held);
        let handles = refreshed.handles();
        assert_eq!(handles.len(), 2);
        assert!(!handles[0].is_enabled());
        assert!(handles[1].is_enabled());
        assert!(Arc::ptr_eq(&held.per_host[0], &refreshed.per_host[0]));
    }

    #[test]
    fn update_tracks_registry_membership() {
        let registry = registry_with(&["banner", "methods"]);
        let held = registry.module_set();

        assert!(registry.unregister(&ModuleId::from_static("banner")));
        registry.register_per_host_module(ModuleId::from_static("trace"), || {
            NullHostModule::shared("trace")
        });

        let refreshed = registry.update_module_set(&held);
        let names: Vec<&str> = refreshed.per_host.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["methods", "trace"]);
        assert!(Arc::ptr_eq(&held.per_host[1], &refreshed.per_host[0]));
        assert!(!registry.unregister(&ModuleId::from_static("banner")));
    }

    #[test]
    fn registering_under_another_category_moves_the_module() {
        let registry = registry_with(&["banner", "methods"]);
        let banner = ModuleId::from_static("banner");
        registry.register_per_directory_module(banner.clone(), || {
            Arc::new(NullHostModule::new("banner")) as Arc<dyn PerDirectoryModule>
        });

        assert_eq!(registry.category_of(&banner), Some(ModuleCategory::PerDirectory));
        let set = registry.module_set();
        assert_eq!(set.per_host.len(), 1);
        assert_eq!(set.per_directory.len(), 1);

        set.disable(&[banner.clone()]);
        let disabled = set.handles().iter().filter(|m| !m.is_enabled()).count();
        assert_eq!(disabled, 1);

        assert!(registry.unregister(&banner));
        assert_eq!(registry.category_of(&banner), None);
    }
}
