use std::{fmt, sync::Arc};

use parking_lot::{Mutex, RwLock};
use tracing::debug;
use vantage_contracts::{
    BasicModule, ModuleCategory, PerDirectoryModule, PerHostModule,
    ResponseProcessingModule, ScannerModule,
};
use vantage_model::ModuleId;

use super::{ModuleSet, reconcile::reconcile};

type ModuleFactory<M> = Arc<dyn Fn() -> Arc<M> + Send + Sync>;

struct Registration<M: ?Sized> {
    id: ModuleId,
    factory: ModuleFactory<M>,
}

impl<M: ?Sized> AsRef<ModuleId> for Registration<M> {
    fn as_ref(&self) -> &ModuleId {
        &self.id
    }
}

/// Live modules of one category, in registration order.
struct CategoryRegistry<M: ?Sized> {
    entries: Vec<Registration<M>>,
}

impl<M: ScannerModule + ?Sized> CategoryRegistry<M> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Replaces an existing registration with the same id in place so the
    /// module keeps its position.
    fn register(&mut self, id: ModuleId, factory: ModuleFactory<M>) {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(existing) => existing.factory = factory,
            None => self.entries.push(Registration { id, factory }),
        }
    }

    fn unregister(&mut self, id: &ModuleId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.id != id);
        before != self.entries.len()
    }

    fn contains(&self, id: &ModuleId) -> bool {
        self.entries.iter().any(|entry| &entry.id == id)
    }

    fn ids(&self) -> Vec<ModuleId> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }

    fn instantiate(&self) -> Vec<Arc<M>> {
        self.entries.iter().map(|entry| (entry.factory)()).collect()
    }

    fn update(&self, held: &[Arc<M>]) -> Vec<Arc<M>> {
        reconcile(held, &self.entries, |entry| (entry.factory)())
    }
}

/// Source of truth for which scan modules exist.
///
/// Each category keeps factories rather than instances: `*_modules` hands
/// out fresh instances, `update_*_modules` reconciles a caller's held
/// instances against whatever is registered right now. An id lives in one
/// category at a time; registering it under another category moves it.
pub struct ModuleRegistry {
    response_processing: RwLock<CategoryRegistry<dyn ResponseProcessingModule>>,
    basic: RwLock<CategoryRegistry<dyn BasicModule>>,
    per_host: RwLock<CategoryRegistry<dyn PerHostModule>>,
    per_directory: RwLock<CategoryRegistry<dyn PerDirectoryModule>>,
    membership: Mutex<()>,
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("response_processing", &self.response_processing.read().ids())
            .field("basic", &self.basic.read().ids())
            .field("per_host", &self.per_host.read().ids())
            .field("per_directory", &self.per_directory.read().ids())
            .finish()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            response_processing: RwLock::new(CategoryRegistry::new()),
            basic: RwLock::new(CategoryRegistry::new()),
            per_host: RwLock::new(CategoryRegistry::new()),
            per_directory: RwLock::new(CategoryRegistry::new()),
            membership: Mutex::new(()),
        }
    }

    /// `factory` must build modules whose `id()` equals `id`; reconciliation
    /// matches instances by that key.
    pub fn register_response_processing_module<F>(&self, id: ModuleId, factory: F)
    where
        F: Fn() -> Arc<dyn ResponseProcessingModule> + Send + Sync + 'static,
    {
        debug!(target: "scan::modules", module = %id, category = %ModuleCategory::ResponseProcessing, "registering module");
        let _membership = self.membership.lock();
        self.evict(&id, ModuleCategory::ResponseProcessing);
        self.response_processing.write().register(id, Arc::new(factory));
    }

    pub fn register_basic_module<F>(&self, id: ModuleId, factory: F)
    where
        F: Fn() -> Arc<dyn BasicModule> + Send + Sync + 'static,
    {
        debug!(target: "scan::modules", module = %id, category = %ModuleCategory::Basic, "registering module");
        let _membership = self.membership.lock();
        self.evict(&id, ModuleCategory::Basic);
        self.basic.write().register(id, Arc::new(factory));
    }

    pub fn register_per_host_module<F>(&self, id: ModuleId, factory: F)
    where
        F: Fn() -> Arc<dyn PerHostModule> + Send + Sync + 'static,
    {
        debug!(target: "scan::modules", module = %id, category = %ModuleCategory::PerHost, "registering module");
        let _membership = self.membership.lock();
        self.evict(&id, ModuleCategory::PerHost);
        self.per_host.write().register(id, Arc::new(factory));
    }

    pub fn register_per_directory_module<F>(&self, id: ModuleId, factory: F)
    where
        F: Fn() -> Arc<dyn PerDirectoryModule> + Send + Sync + 'static,
    {
        debug!(target: "scan::modules", module = %id, category = %ModuleCategory::PerDirectory, "registering module");
        let _membership = self.membership.lock();
        self.evict(&id, ModuleCategory::PerDirectory);
        self.per_directory.write().register(id, Arc::new(factory));
    }

    /// Drops `id` from whichever other category holds it.
    fn evict(&self, id: &ModuleId, keep: ModuleCategory) {
        let Some(previous) = self.category_of(id).filter(|category| *category != keep) else {
            return;
        };
        let moved = match previous {
            ModuleCategory::ResponseProcessing => self.response_processing.write().unregister(id),
            ModuleCategory::Basic => self.basic.write().unregister(id),
            ModuleCategory::PerHost => self.per_host.write().unregister(id),
            ModuleCategory::PerDirectory => self.per_directory.write().unregister(id),
        };
        if moved {
            debug!(target: "scan::modules", module = %id, from = %previous, to = %keep, "module moved between categories");
        }
    }

    /// Removes `id` from whichever category holds it.
    pub fn unregister(&self, id: &ModuleId) -> bool {
        let _membership = self.membership.lock();
        let removed = self.response_processing.write().unregister(id)
            | self.basic.write().unregister(id)
            | self.per_host.write().unregister(id)
            | self.per_directory.write().unregister(id);
        if removed {
            debug!(target: "scan::modules", module = %id, "unregistered module");
        }
        removed
    }

    pub fn category_of(&self, id: &ModuleId) -> Option<ModuleCategory> {
        if self.response_processing.read().contains(id) {
            Some(ModuleCategory::ResponseProcessing)
        } else if self.basic.read().contains(id) {
            Some(ModuleCategory::Basic)
        } else if self.per_host.read().contains(id) {
            Some(ModuleCategory::PerHost)
        } else if self.per_directory.read().contains(id) {
            Some(ModuleCategory::PerDirectory)
        } else {
            None
        }
    }

    pub fn response_processing_modules(&self) -> Vec<Arc<dyn ResponseProcessingModule>> {
        self.response_processing.read().instantiate()
    }

    pub fn basic_modules(&self) -> Vec<Arc<dyn BasicModule>> {
        self.basic.read().instantiate()
    }

    pub fn per_host_modules(&self) -> Vec<Arc<dyn PerHostModule>> {
        self.per_host.read().instantiate()
    }

    pub fn per_directory_modules(&self) -> Vec<Arc<dyn PerDirectoryModule>> {
        self.per_directory.read().instantiate()
    }

    pub fn update_response_processing_modules(
        &self,
        held: &[Arc<dyn ResponseProcessingModule>],
    ) -> Vec<Arc<dyn ResponseProcessingModule>> {
        self.response_processing.read().update(held)
    }

    pub fn update_basic_modules(
        &self,
        held: &[Arc<dyn BasicModule>],
    ) -> Vec<Arc<dyn BasicModule>> {
        self.basic.read().update(held)
    }

    pub fn update_per_host_modules(
        &self,
        held: &[Arc<dyn PerHostModule>],
    ) -> Vec<Arc<dyn PerHostModule>> {
        self.per_host.read().update(held)
    }

    pub fn update_per_directory_modules(
        &self,
        held: &[Arc<dyn PerDirectoryModule>],
    ) -> Vec<Arc<dyn PerDirectoryModule>> {
        self.per_directory.read().update(held)
    }

    /// Fresh instances of every registered module.
    pub fn module_set(&self) -> ModuleSet {
        ModuleSet {
            response_processing: self.response_processing_modules(),
            basic: self.basic_modules(),
            per_host: self.per_host_modules(),
            per_directory: self.per_directory_modules(),
        }
    }

    /// Reconciles every category of `held` at once. The returned set is
    /// complete; callers swap it in wholesale.
    pub fn update_module_set(&self, held: &ModuleSet) -> ModuleSet {
        ModuleSet {
            response_processing: self
                .update_response_processing_modules(&held.response_processing),
            basic: self.update_basic_modules(&held.basic),
            per_host: self.update_per_host_modules(&held.per_host),
            per_directory: self.update_per_directory_modules(&held.per_directory),
        }
    }
}
