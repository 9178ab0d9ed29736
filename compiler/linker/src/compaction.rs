//! Pruning the weak caches of reclaimed symbols.
//!
//! Compilations whose source symbol is wrapped by retargeting symbols are registered with the
//! compactor. A compaction pass visits every registered compilation, drops the reclaimed
//! entries of its retargeting cache and deregisters it once the cache is empty. The global lock
//! is released between compilations.
//!
//! Unless disabled through [`configure`], a background thread runs a pass periodically while
//! any compilation is registered.

use crate::{
    compilation::{Compilation, CompilationInner},
    state::{self, prune, Guard},
    symbol::AssemblySymbol,
};
use std::{
    sync::{Arc, PoisonError},
    thread,
    time::Duration,
};
use tracing::debug;

#[derive(Clone, Copy, Debug)]
pub struct CompactionConfig {
    /// The time the background compactor sleeps between passes.
    pub interval: Duration,
    /// Whether a background thread is started when a compilation is registered.
    pub background: bool,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(5), background: true }
    }
}

pub fn configure(config: CompactionConfig) {
    state::lock().config = config;
}

/// Statistics of a single compaction pass.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct CompactionStats {
    pub visited: usize,
    pub pruned: usize,
    pub deregistered: usize,
    /// The number of compilations still registered after the pass.
    pub remaining: usize,
}

/// Run a compaction pass.
pub fn compact() -> CompactionStats {
    let mut stats = CompactionStats::default();
    let mut index = 0;

    loop {
        let mut state = state::lock();

        let Some(entry) = state.registry.get(index) else {
            state.assemblies.retain(|_, metadata| match metadata.upgrade() {
                Some(metadata) => {
                    stats.pruned += metadata.prune();
                    true
                }
                None => false,
            });
            state.modules.retain(|_, metadata| metadata.strong_count() > 0);

            stats.remaining = state.registry.len();
            if stats.remaining == 0 {
                state.compactor_running = false;
            }
            break;
        };

        stats.visited += 1;

        let empty = match entry.upgrade() {
            Some(compilation) => {
                let mut cache =
                    compilation.retargeting_cache.lock().unwrap_or_else(PoisonError::into_inner);
                stats.pruned += prune(&mut cache);
                cache.is_empty()
            }
            None => true,
        };

        if empty {
            state.registry.swap_remove(index);
            stats.deregistered += 1;
        } else {
            index += 1;
        }
    }

    debug!(
        visited = stats.visited,
        pruned = stats.pruned,
        deregistered = stats.deregistered,
        remaining = stats.remaining,
        "compacted caches"
    );

    stats
}

pub fn is_registered(compilation: &Compilation) -> bool {
    state::lock().is_registered(&compilation.0)
}

/// The live compilations currently registered with the compactor.
pub fn registered_compilations() -> Vec<Compilation> {
    state::lock().registry.iter().filter_map(|entry| entry.upgrade()).map(Compilation).collect()
}

/// Add a retargeting symbol to the cache of the compilation it wraps.
pub(crate) fn register(
    compilation: &Compilation,
    symbol: &Arc<AssemblySymbol>,
    guard: &mut Guard<'_>,
) {
    compilation
        .0
        .retargeting_cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Arc::downgrade(symbol));

    if !guard.is_registered(&compilation.0) {
        guard.registry.push(compilation.downgrade());
        debug!(compilation = %compilation.identity().name(), "registered for compaction");
    }

    if !guard.compactor_running && guard.config.background {
        start(guard);
    }
}

fn start(guard: &mut Guard<'_>) {
    let interval = guard.config.interval;
    let spawned = thread::Builder::new().name("retargeting-compactor".into()).spawn(move || {
        loop {
            thread::sleep(interval);

            if compact().remaining == 0 {
                break;
            }
        }
    });

    match spawned {
        Ok(_) => guard.compactor_running = true,
        Err(error) => debug!(%error, "could not start the compactor"),
    }
}

impl CompilationInner {
    #[cfg(test)]
    pub(crate) fn retargeting_cache_len(&self) -> usize {
        self.retargeting_cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
