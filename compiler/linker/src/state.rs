//! The process-wide state shared by every construction pass and the compactor.

use crate::{compaction::CompactionConfig, compilation::CompilationInner, symbol::AssemblySymbol};
use metadata::{AssemblyImage, ModuleImage};
use std::{
    ops::{Deref, DerefMut},
    sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, Weak},
};
use utility::{default, path::NormalizedPathBuf, HashMap};

static STATE: LazyLock<Mutex<GlobalState>> = LazyLock::new(default);

/// Acquire the global lock.
///
/// A panic during a construction pass (for example on reentrance) poisons the lock. The state
/// stays consistent in that case since nothing is published before a pass completes.
pub(crate) fn lock() -> Guard<'static> {
    Guard(STATE.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Proof that the global lock is held.
pub(crate) struct Guard<'a>(MutexGuard<'a, GlobalState>);

impl Deref for Guard<'_> {
    type Target = GlobalState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Guard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[derive(Default)]
pub(crate) struct GlobalState {
    /// Compilations whose retargeting cache is non-empty.
    pub(crate) registry: Vec<Weak<CompilationInner>>,
    pub(crate) compactor_running: bool,
    pub(crate) config: CompactionConfig,
    pub(crate) assemblies: HashMap<NormalizedPathBuf, Weak<AssemblyMetadata>>,
    pub(crate) modules: HashMap<NormalizedPathBuf, Weak<ModuleMetadata>>,
}

impl GlobalState {
    pub(crate) fn is_registered(&self, compilation: &Arc<CompilationInner>) -> bool {
        self.registry.iter().any(|entry| std::ptr::eq(entry.as_ptr(), Arc::as_ptr(compilation)))
    }

    /// Remember file-backed assembly metadata and forget reclaimed entries.
    pub(crate) fn cache_assembly(&mut self, path: NormalizedPathBuf, metadata: &Arc<AssemblyMetadata>) {
        self.assemblies.retain(|_, metadata| metadata.strong_count() > 0);
        self.assemblies.insert(path, Arc::downgrade(metadata));
    }

    pub(crate) fn cache_module(&mut self, path: NormalizedPathBuf, metadata: &Arc<ModuleMetadata>) {
        self.modules.retain(|_, metadata| metadata.strong_count() > 0);
        self.modules.insert(path, Arc::downgrade(metadata));
    }
}

/// The metadata of an assembly together with the symbols created for it.
pub(crate) struct AssemblyMetadata {
    pub(crate) image: AssemblyImage,
    pub(crate) cached_symbols: Mutex<Vec<Weak<AssemblySymbol>>>,
}

impl AssemblyMetadata {
    pub(crate) fn new(image: AssemblyImage) -> Arc<Self> {
        Arc::new(Self { image, cached_symbols: default() })
    }

    pub(crate) fn cached_symbols(&self) -> Vec<Arc<AssemblySymbol>> {
        self.cached_symbols
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub(crate) fn cache(&self, symbol: &Arc<AssemblySymbol>) {
        let mut symbols = self.cached_symbols.lock().unwrap_or_else(PoisonError::into_inner);
        prune(&mut symbols);
        symbols.push(Arc::downgrade(symbol));
    }

    /// Remove reclaimed symbols and return how many there were.
    pub(crate) fn prune(&self) -> usize {
        let mut symbols = self.cached_symbols.lock().unwrap_or_else(PoisonError::into_inner);
        prune(&mut symbols)
    }
}

pub(crate) struct ModuleMetadata {
    pub(crate) image: ModuleImage,
}

impl ModuleMetadata {
    pub(crate) fn new(image: ModuleImage) -> Arc<Self> {
        Arc::new(Self { image })
    }
}

/// Drop dead entries and release excess storage if there were any.
pub(crate) fn prune<T>(entries: &mut Vec<Weak<T>>) -> usize {
    let length = entries.len();
    entries.retain(|entry| entry.strong_count() > 0);
    let pruned = length - entries.len();

    if pruned > 0 {
        entries.shrink_to_fit();
    }

    pruned
}
