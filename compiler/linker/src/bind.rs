//! Binding the referenced identities of candidates to other candidates.

use crate::{
    compilation::Compilation, reference::DocumentationProvider, state::AssemblyMetadata,
    symbol::AssemblySymbol,
};
use identity::{AssemblyIdentity, IdentityComparer, Match, Version};
use index_map::{Index as _, IndexMap};
use std::sync::Arc;
use tracing::{debug, trace};
use utility::SmallVec;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, index_map::Index)]
pub(crate) struct CandidateIndex(u32);

impl CandidateIndex {
    pub(crate) const BEING_BUILT: Self = Self(0);
}

/// An assembly taking part in a construction pass.
pub(crate) struct Candidate {
    pub(crate) identity: AssemblyIdentity,
    /// The referenced identities of all modules in module order.
    pub(crate) references: Vec<AssemblyIdentity>,
    pub(crate) source: CandidateSource,
    pub(crate) embed_by_value: bool,
    pub(crate) documentation: Option<Arc<dyn DocumentationProvider>>,
    pub(crate) has_embedded_local_types: bool,
    pub(crate) declares_root_type: bool,
}

pub(crate) enum CandidateSource {
    /// The assembly being built.
    ///
    /// The first `direct` references are the identities of the other candidates in order.
    BeingBuilt { direct: usize },
    Metadata(Arc<AssemblyMetadata>),
    /// Another compilation together with its source symbol.
    Sibling { compilation: Compilation, assembly: Arc<AssemblySymbol> },
}

/// The outcome of binding a single candidate.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct Binding {
    /// The candidate each referenced identity is bound to, index-aligned with the references.
    pub(crate) references: Vec<Option<CandidateIndex>>,
    pub(crate) is_core_library: bool,
}

/// A strong-named reference bound to a definition of a different version.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct Unification {
    pub(crate) referencing: CandidateIndex,
    pub(crate) reference: AssemblyIdentity,
    pub(crate) definition: CandidateIndex,
}

pub(crate) type Candidates = IndexMap<CandidateIndex, Candidate>;
pub(crate) type Bindings = IndexMap<CandidateIndex, Binding>;

/// Bind every referenced identity of every candidate.
///
/// This is a pure function of the candidates and the comparer.
///
/// # Panics
///
/// If a reference matches more than one candidate equally well. Candidates are deduplicated
/// by identity beforehand which rules this out.
pub(crate) fn bind(
    candidates: &Candidates,
    comparer: &IdentityComparer,
) -> (Bindings, Vec<Unification>) {
    let mut unifications = Vec::new();
    let mut core_library = None;

    let bindings: Bindings = candidates
        .iter()
        .map(|(index, candidate)| {
            let direct = match candidate.source {
                CandidateSource::BeingBuilt { direct } => direct,
                _ => 0,
            };

            let references = candidate
                .references
                .iter()
                .enumerate()
                .map(|(position, reference)| {
                    if position < direct {
                        return Some(CandidateIndex::new(position + 1));
                    }

                    let (definition, kind) = match_reference(reference, candidates, comparer)?;

                    if kind == Match::Unified {
                        unifications.push(Unification {
                            referencing: index,
                            reference: reference.clone(),
                            definition,
                        });
                    }

                    Some(definition)
                })
                .collect();

            let is_core_library = core_library.is_none()
                && candidate.declares_root_type
                && candidate.references.is_empty();

            if is_core_library {
                core_library = Some(index);
            }

            Binding { references, is_core_library }
        })
        .collect();

    debug!(
        candidates = candidates.len(),
        unified = unifications.len(),
        core_library = ?core_library.map(|index| &candidates[index].identity),
        "bound identities"
    );

    (bindings, unifications)
}

fn match_reference(
    reference: &AssemblyIdentity,
    candidates: &Candidates,
    comparer: &IdentityComparer,
) -> Option<(CandidateIndex, Match)> {
    let matches: SmallVec<_, 2> = candidates
        .iter()
        .filter_map(|(index, candidate)| {
            let kind = comparer.reference_matches_definition(reference, &candidate.identity)?;
            Some((index, kind, candidate.identity.version()))
        })
        .collect();

    let mut exact = matches.iter().filter(|(_, kind, _)| *kind == Match::Exact);

    if let Some(&(index, ..)) = exact.next() {
        assert!(
            exact.next().is_none(),
            "the reference {reference:?} matches several candidates exactly"
        );
        return Some((index, Match::Exact));
    }

    // prefer the closest higher version falling back to the closest lower one
    let versions = || matches.iter().map(|&(.., version)| version);
    let version: Version = versions()
        .filter(|&version| version > reference.version())
        .min()
        .or_else(|| versions().max())?;

    let mut unified = matches.iter().filter(|&&(.., candidate)| candidate == version);
    let &(index, ..) = unified.next()?;
    assert!(
        unified.next().is_none(),
        "the reference {reference:?} is ambiguous between several candidates of version {version}"
    );

    trace!(?reference, definition = ?candidates[index].identity, "unified reference");

    Some((index, Match::Unified))
}
