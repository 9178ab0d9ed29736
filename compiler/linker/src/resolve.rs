//! A single construction pass.

use crate::{
    bind::{self, Candidate, CandidateIndex, CandidateSource, Candidates},
    classify::{self, Entry, EntryKind},
    compilation::{BoundReferences, Compilation, UnifiedReference},
    dedup::{self, Deduplicator},
    materialize,
    state::Guard,
    symbol::{AssemblySymbol, ModuleSymbol},
};
use diagnostics::{reporter::Buffer, Reporter};
use index_map::Index as _;
use std::sync::PoisonError;
use tracing::{debug, debug_span};
use utility::HashMap;

/// Bind the references of the compilation.
///
/// Diagnostics are collected into the returned value instead of being reported right away.
pub(crate) fn resolve(compilation: &Compilation, guard: &mut Guard<'_>) -> BoundReferences {
    let identity = compilation.identity();
    let span = debug_span!("bind_references", assembly = %identity.name());
    let _entered = span.enter();

    let buffer = Buffer::default();
    let reporter = Reporter::buffer(buffer.clone());
    let options = compilation.options();

    let mut deduplicator = Deduplicator::default();
    let classified = classify::classify(compilation, &reporter);
    let classified = deduplicator.by_path(classified, &reporter);
    let entries = classified
        .into_iter()
        .filter_map(|classified| classify::load(classified, compilation, guard, &reporter).ok())
        .collect();
    let (assemblies, modules) =
        deduplicator.by_identity(entries, identity, &options.comparer, &reporter);
    dedup::check_module_names(&modules, &compilation.module_name(), &reporter);

    let referenced: Vec<_> = assemblies.iter().map(|entry| candidate(entry, guard)).collect();

    let mut source_modules = vec![ModuleSymbol::new(
        compilation.module_name(),
        referenced.iter().map(|candidate| candidate.identity.clone()).collect(),
    )];
    source_modules.extend(modules.iter().filter_map(|entry| match &entry.kind {
        EntryKind::Module(metadata) => Some(ModuleSymbol::new(
            metadata.image.name.clone(),
            metadata.image.referenced_assemblies.clone(),
        )),
        _ => None,
    }));

    let mut candidates = Candidates::with_capacity(referenced.len() + 1);
    candidates.insert(Candidate {
        identity: identity.clone(),
        references: source_modules
            .iter()
            .flat_map(|module| module.referenced_identities())
            .cloned()
            .collect(),
        source: CandidateSource::BeingBuilt { direct: referenced.len() },
        embed_by_value: false,
        documentation: None,
        has_embedded_local_types: modules.iter().any(|entry| {
            matches!(&entry.kind, EntryKind::Module(metadata) if metadata.image.has_embedded_local_types)
        }),
        declares_root_type: options.declares_root_type,
    });
    for candidate in referenced {
        candidates.insert(candidate);
    }

    let (bindings, unifications) = bind::bind(&candidates, &options.comparer);
    let assembly = AssemblySymbol::source(identity.clone(), source_modules);
    let symbols = materialize::materialize(&candidates, &bindings, assembly.clone(), guard);

    let mut assembly_symbols = HashMap::default();
    let mut module_symbols = HashMap::default();
    let mut directives = HashMap::default();
    let mut aliases = HashMap::default();

    for (position, entry) in assemblies.iter().enumerate() {
        let symbol = &symbols[CandidateIndex::new(position + 1)];
        assembly_symbols.insert(entry.reference().clone(), symbol.clone());
        assembly_symbols.insert(entry.resolved().clone(), symbol.clone());
    }

    for (position, entry) in modules.iter().enumerate() {
        module_symbols.insert(entry.reference().clone(), position + 1);
        module_symbols.insert(entry.resolved().clone(), position + 1);
    }

    for entry in assemblies.iter().chain(&modules) {
        if let Some(span) = entry.span() {
            directives.insert(span, entry.resolved().clone());
        }

        let merged = deduplicator.aliases(entry);

        if !merged.is_empty() {
            aliases.insert(entry.reference().clone(), merged);
        }
    }

    for duplicate in &deduplicator.duplicates {
        if let Some(symbol) = assembly_symbols.get(&duplicate.original).cloned() {
            assembly_symbols.insert(duplicate.reference.clone(), symbol);
        }

        if let Some(&index) = module_symbols.get(&duplicate.original) {
            module_symbols.insert(duplicate.reference.clone(), index);
        }
    }

    let extern_aliases = aliases.values().flatten().cloned().collect();

    let unified = unifications
        .into_iter()
        .map(|unification| UnifiedReference {
            referencing: candidates[unification.referencing].identity.clone(),
            reference: unification.reference,
            definition: candidates[unification.definition].identity.clone(),
        })
        .collect();

    let diagnostics = std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner));

    debug!(
        assemblies = assemblies.len(),
        modules = modules.len(),
        duplicates = deduplicator.duplicates.len(),
        diagnostics = diagnostics.len(),
        "bound references"
    );

    BoundReferences {
        referenced: symbols.values().skip(1).cloned().collect(),
        assembly,
        assemblies: assembly_symbols,
        modules: module_symbols,
        aliases,
        extern_aliases,
        directives,
        duplicates: deduplicator.duplicates,
        unified,
        diagnostics,
    }
}

fn candidate(entry: &Entry, guard: &mut Guard<'_>) -> Candidate {
    let documentation = entry.resolved().documentation().cloned();

    match &entry.kind {
        EntryKind::Assembly(metadata) => Candidate {
            identity: metadata.image.identity.clone(),
            references: metadata.image.referenced_assemblies().cloned().collect(),
            source: CandidateSource::Metadata(metadata.clone()),
            embed_by_value: entry.embed_by_value(),
            documentation,
            has_embedded_local_types: metadata.image.has_embedded_local_types(),
            declares_root_type: metadata.image.declares_root_type(),
        },
        EntryKind::Compilation(compilation) => {
            let assembly = compilation.bind(guard).assembly().clone();

            Candidate {
                identity: compilation.identity().clone(),
                references: assembly
                    .modules()
                    .iter()
                    .flat_map(|module| module.referenced_identities())
                    .cloned()
                    .collect(),
                source: CandidateSource::Sibling { compilation: compilation.clone(), assembly },
                embed_by_value: entry.embed_by_value(),
                documentation,
                has_embedded_local_types: false,
                declares_root_type: compilation.options().declares_root_type,
            }
        }
        EntryKind::Module(_) => unreachable!("module references are not assembly candidates"),
    }
}

