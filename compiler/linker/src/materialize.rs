//! Materializing symbols for bound candidates.
//!
//! A candidate is backed by a symbol created in an earlier pass if the wiring of that symbol
//! agrees with the bindings of this pass all the way down. Otherwise a new symbol is created
//! and wired.

use crate::{
    bind::{Bindings, Candidate, CandidateIndex, CandidateSource, Candidates},
    compaction,
    missing::BuildContext,
    reference::same_documentation,
    state::Guard,
    symbol::{missing_core_library, AssemblySymbol, CoreLibrary, SymbolKind},
};
use index_map::{Index as _, IndexMap};
use std::{collections::VecDeque, sync::Arc};
use tracing::{debug, trace};
use utility::HashSet;

pub(crate) type Symbols = IndexMap<CandidateIndex, Arc<AssemblySymbol>>;

/// The symbols chosen for reuse so far together with the placeholders they hold.
#[derive(Clone)]
struct Tentative {
    assigned: Vec<Option<Arc<AssemblySymbol>>>,
    context: BuildContext,
}

/// Provide a symbol for every candidate, the given source symbol for the assembly being built.
pub(crate) fn materialize(
    candidates: &Candidates,
    bindings: &Bindings,
    source: Arc<AssemblySymbol>,
    guard: &mut Guard<'_>,
) -> Symbols {
    let materializer = Materializer { candidates, bindings };

    let mut tentative = Tentative { assigned: vec![None; candidates.len()], context: BuildContext::default() };
    tentative.assigned[CandidateIndex::BEING_BUILT.value()] = Some(source);

    for (index, candidate) in candidates.iter().skip(1) {
        if tentative.assigned[index.value()].is_some() {
            continue;
        }

        for symbol in materializer.available(candidate) {
            let mut attempt = tentative.clone();

            if materializer.try_assign(&symbol, index, &mut attempt) {
                trace!(candidate = ?candidate.identity, kind = symbol.kind().name(), "reusing symbol");
                tentative = attempt;
                break;
            }
        }
    }

    let Tentative { assigned, mut context } = tentative;

    let mut created = Vec::new();
    let symbols: Symbols = candidates
        .iter()
        .zip(assigned)
        .map(|((index, candidate), symbol)| match symbol {
            Some(symbol) if index != CandidateIndex::BEING_BUILT => symbol,
            symbol => {
                let symbol = symbol.unwrap_or_else(|| create(candidate));
                created.push((index, symbol.clone()));
                symbol
            }
        })
        .collect();

    for (index, symbol) in &created {
        let mut references = bindings[*index].references.iter();

        for module in symbol.modules() {
            let table = module
                .referenced_identities()
                .iter()
                .map(|identity| match references.next().copied().flatten() {
                    Some(target) => symbols[target].clone(),
                    None => context.missing(identity),
                })
                .collect();

            module.set_referenced_symbols(table);
        }
    }

    let core_library = bindings
        .iter()
        .find(|(_, binding)| binding.is_core_library)
        .map(|(index, _)| symbols[index].clone());

    for symbol in created.iter().map(|(_, symbol)| symbol).chain(&context.created) {
        let core_library = match &core_library {
            Some(core_library) if Arc::ptr_eq(core_library, symbol) => CoreLibrary::Itself,
            Some(core_library) => CoreLibrary::Assembly(core_library.clone()),
            None => CoreLibrary::Assembly(missing_core_library()),
        };

        symbol.set_core_library(core_library);
    }

    for (index, symbol) in &created {
        let linked = materializer.linked(*index);

        if !linked.is_empty() {
            let mut seen = HashSet::default();
            let linked = linked
                .into_iter()
                .map(|index| &symbols[index])
                .filter(|symbol| seen.insert(Arc::as_ptr(symbol)))
                .map(Arc::downgrade)
                .collect();

            symbol.set_linked_assemblies(linked);
        }
    }

    for (index, symbol) in &created {
        match &candidates[*index].source {
            CandidateSource::Metadata(metadata) => metadata.cache(symbol),
            CandidateSource::Sibling { compilation, .. } => {
                compaction::register(compilation, symbol, guard);
            }
            CandidateSource::BeingBuilt { .. } => {}
        }
    }

    debug!(
        reused = candidates.len() - created.len(),
        created = created.len(),
        missing = context.created.len(),
        "materialized symbols"
    );

    symbols
}

fn create(candidate: &Candidate) -> Arc<AssemblySymbol> {
    match &candidate.source {
        CandidateSource::Metadata(metadata) => AssemblySymbol::metadata(
            metadata.clone(),
            candidate.embed_by_value,
            candidate.documentation.clone(),
        ),
        CandidateSource::Sibling { assembly, .. } => {
            AssemblySymbol::retargeting(assembly.clone(), candidate.embed_by_value)
        }
        CandidateSource::BeingBuilt { .. } => {
            unreachable!("the symbol of the assembly being built is created up front")
        }
    }
}

struct Materializer<'a> {
    candidates: &'a Candidates,
    bindings: &'a Bindings,
}

impl Materializer<'_> {
    /// The previously created symbols that might back the candidate.
    fn available(&self, candidate: &Candidate) -> Vec<Arc<AssemblySymbol>> {
        match &candidate.source {
            CandidateSource::BeingBuilt { .. } => Vec::new(),
            CandidateSource::Metadata(metadata) => metadata.cached_symbols(),
            CandidateSource::Sibling { compilation, assembly } => {
                let mut symbols = vec![assembly.clone()];
                symbols.extend(compilation.0.retargeting_symbols());
                symbols
            }
        }
    }

    fn is_usable(&self, symbol: &Arc<AssemblySymbol>, candidate: &Candidate) -> bool {
        match &candidate.source {
            CandidateSource::BeingBuilt { .. } => false,
            CandidateSource::Metadata(metadata) => {
                symbol.metadata_origin().is_some_and(|origin| Arc::ptr_eq(origin, metadata))
                    && symbol.embed_by_value() == candidate.embed_by_value
                    && same_documentation(symbol.documentation(), candidate.documentation.as_ref())
            }
            CandidateSource::Sibling { assembly, .. } => {
                if Arc::ptr_eq(symbol, assembly) {
                    return !candidate.embed_by_value;
                }

                symbol.underlying().is_some_and(|underlying| Arc::ptr_eq(underlying, assembly))
                    && symbol.embed_by_value() == candidate.embed_by_value
            }
        }
    }

    /// Tentatively back the candidate with the symbol and recursively check its wiring.
    fn try_assign(
        &self,
        symbol: &Arc<AssemblySymbol>,
        index: CandidateIndex,
        tentative: &mut Tentative,
    ) -> bool {
        if let Some(assigned) = &tentative.assigned[index.value()] {
            return Arc::ptr_eq(assigned, symbol);
        }

        let candidate = &self.candidates[index];

        if !self.is_usable(symbol, candidate) {
            return false;
        }

        if candidate.has_embedded_local_types {
            let linked = self.linked(index);
            let existing = symbol.linked_assemblies();

            if linked.len() != existing.len()
                || !linked
                    .iter()
                    .zip(&existing)
                    .all(|(&index, symbol)| self.candidates[index].identity == *symbol.identity())
            {
                return false;
            }
        }

        tentative.assigned[index.value()] = Some(symbol.clone());

        let mut bindings = self.bindings[index].references.iter();

        for module in symbol.modules() {
            if module.referenced_symbols().len() != module.referenced_identities().len() {
                return false;
            }

            for target in module.referenced_symbols() {
                let consistent = match bindings.next() {
                    Some(None) => {
                        target.kind() == SymbolKind::Missing && tentative.context.adopt(target)
                    }
                    Some(&Some(CandidateIndex::BEING_BUILT)) | None => false,
                    Some(&Some(bound)) => self.try_assign(target, bound, tentative),
                };

                if !consistent {
                    return false;
                }
            }
        }

        bindings.next().is_none()
    }

    /// The embedded-by-value candidates reachable from the given one, itself first.
    fn linked(&self, index: CandidateIndex) -> Vec<CandidateIndex> {
        let mut linked = Vec::new();
        let mut visited = HashSet::default();
        let mut queue = VecDeque::from([index]);
        visited.insert(index);

        while let Some(index) = queue.pop_front() {
            if self.candidates[index].embed_by_value {
                linked.push(index);
            }

            for &target in self.bindings[index].references.iter().flatten() {
                if visited.insert(target) {
                    queue.push_back(target);
                }
            }
        }

        linked
    }
}
