use crate::symbol::AssemblySymbol;
use identity::AssemblyIdentity;
use std::{collections::hash_map::Entry, sync::Arc};
use utility::HashMap;

/// State scoped to a single construction pass.
#[derive(Clone, Default)]
pub(crate) struct BuildContext {
    /// Keyed by normalized identity.
    missing: HashMap<AssemblyIdentity, Arc<AssemblySymbol>>,
    /// The missing symbols created during the pass in order of creation.
    pub(crate) created: Vec<Arc<AssemblySymbol>>,
}

impl BuildContext {
    /// The placeholder for an identity that could not be bound.
    ///
    /// Repeated requests for the same identity yield the same symbol.
    pub(crate) fn missing(&mut self, identity: &AssemblyIdentity) -> Arc<AssemblySymbol> {
        let key = identity.normalized();

        if let Some(symbol) = self.missing.get(&key) {
            return symbol.clone();
        }

        let symbol = AssemblySymbol::missing(identity.clone());
        self.missing.insert(key, symbol.clone());
        self.created.push(symbol.clone());
        symbol
    }

    /// Take over a placeholder held by a symbol reused in this pass.
    ///
    /// Fails if the pass already uses a different placeholder for the same identity.
    pub(crate) fn adopt(&mut self, symbol: &Arc<AssemblySymbol>) -> bool {
        match self.missing.entry(symbol.identity().normalized()) {
            Entry::Occupied(entry) => Arc::ptr_eq(entry.get(), symbol),
            Entry::Vacant(entry) => {
                entry.insert(symbol.clone());
                true
            }
        }
    }
}
