//! Deduplicating references by path and by identity.

use crate::{
    classify::{locate, Classified, Entry, EntryKind, Target},
    compilation::{CompilationInner, Duplicate},
    reference::Reference,
};
use diagnostics::{Diagnostic, ErrorCode, LintCode, Reporter};
use identity::{AssemblyIdentity, Equivalence, IdentityComparer};
use std::sync::Arc;
use tracing::trace;
use utility::{path::NormalizedPathBuf, HashMap, HashSet, QuoteExt, SmallVec, Str};

/// Records dropped duplicates and the aliases they contribute to the references they duplicate.
#[derive(Default)]
pub(crate) struct Deduplicator {
    pub(crate) duplicates: Vec<Duplicate>,
    merged_aliases: HashMap<Reference, SmallVec<Str, 1>>,
}

#[derive(PartialEq, Eq, Hash)]
enum PathKey {
    File(NormalizedPathBuf),
    Module(NormalizedPathBuf),
    Compilation(*const CompilationInner),
}

impl Deduplicator {
    /// Drop every reference to a file or compilation that was already referenced before.
    pub(crate) fn by_path(
        &mut self,
        classified: Vec<Classified>,
        reporter: &Reporter,
    ) -> Vec<Classified> {
        let mut seen = HashMap::default();
        let mut accepted: Vec<Classified> = Vec::with_capacity(classified.len());

        for reference in classified {
            let key = match &reference.target {
                Target::File { path, .. } => PathKey::File(path.clone()),
                Target::Module { path } => PathKey::Module(path.clone()),
                Target::Compilation(compilation) => PathKey::Compilation(Arc::as_ptr(&compilation.0)),
                Target::Bytes(_) => {
                    accepted.push(reference);
                    continue;
                }
            };

            let Some(&index) = seen.get(&key) else {
                seen.insert(key, accepted.len());
                accepted.push(reference);
                continue;
            };

            let original: &Classified = &accepted[index];

            if original.resolved.embed_by_value() != reference.resolved.embed_by_value() {
                Diagnostic::error()
                    .code(ErrorCode::E006)
                    .message(format!("{} is both linked and referenced", (&reference.resolved).quote()))
                    .with(|it| locate(it, reference.span))
                    .report(reporter);
                continue;
            }

            Diagnostic::warning()
                .code(LintCode::DuplicateReference)
                .message(format!("{} is referenced more than once", (&reference.resolved).quote()))
                .with(|it| locate(it, reference.span))
                .report(reporter);

            let original = original.reference.clone();
            self.merge(&reference.resolved, &original);
            self.duplicates.push(Duplicate { reference: reference.reference, original });
        }

        accepted
    }

    /// Drop assemblies whose identity is equivalent to one that was accepted before.
    ///
    /// Returns the accepted assembly entries followed by the module entries.
    pub(crate) fn by_identity(
        &mut self,
        entries: Vec<Entry>,
        own: &AssemblyIdentity,
        comparer: &IdentityComparer,
        reporter: &Reporter,
    ) -> (Vec<Entry>, Vec<Entry>) {
        let mut seen: HashMap<String, Vec<usize>> = HashMap::default();
        let mut assemblies: Vec<Entry> = Vec::new();
        let mut modules = Vec::new();

        for entry in entries {
            let Some(identity) = entry.identity() else {
                modules.push(entry);
                continue;
            };

            if comparer.equivalence(own, identity).is_some() {
                entry
                    .diagnostic(Diagnostic::error())
                    .code(ErrorCode::E005)
                    .message(format!(
                        "the referenced assembly {} has the same name as the assembly being built",
                        identity.name().quote()
                    ))
                    .report(reporter);
                continue;
            }

            let key = identity.simple_name_key();
            let equivalent = seen.get(&key).into_iter().flatten().find_map(|&index| {
                let original: &Entry = &assemblies[index];
                Some((original, comparer.equivalence(original.identity()?, identity)?))
            });

            match equivalent {
                Some((original, _)) if original.embed_by_value() != entry.embed_by_value() => {
                    entry
                        .diagnostic(Diagnostic::error())
                        .code(ErrorCode::E006)
                        .message(format!(
                            "the assembly {} is both linked and referenced",
                            identity.name().quote()
                        ))
                        .report(reporter);
                }
                Some((original, Equivalence::Weak)) => {
                    entry
                        .diagnostic(Diagnostic::error())
                        .code(ErrorCode::E005)
                        .message(format!(
                            "an assembly with the simple name {} has already been imported",
                            identity.name().quote()
                        ))
                        .note(format!(
                            "the previously imported assembly is {}",
                            original.resolved().quote()
                        ))
                        .report(reporter);
                }
                Some((original, Equivalence::Strong)) => {
                    trace!(
                        reference = %entry.reference(),
                        original = %original.reference(),
                        "dropping equivalent reference"
                    );

                    let original = original.reference().clone();
                    self.merge(entry.resolved(), &original);
                    self.duplicates.push(Duplicate { reference: entry.reference().clone(), original });
                }
                None => {
                    seen.entry(key).or_default().push(assemblies.len());
                    assemblies.push(entry);
                }
            }
        }

        (assemblies, modules)
    }

    fn merge(&mut self, duplicate: &Reference, original: &Reference) {
        let merged = self.merged_aliases.entry(original.clone()).or_default();

        for alias in duplicate.aliases() {
            if !merged.contains(alias) {
                merged.push(alias.clone());
            }
        }
    }

    /// The aliases of the accepted entry including the ones merged from its duplicates.
    pub(crate) fn aliases(&self, entry: &Entry) -> SmallVec<Str, 1> {
        let mut aliases: SmallVec<Str, 1> = entry.resolved().aliases().iter().cloned().collect();

        for alias in self.merged_aliases.get(entry.reference()).into_iter().flatten() {
            if !aliases.contains(alias) {
                aliases.push(alias.clone());
            }
        }

        aliases
    }
}

/// Diagnose modules whose names clash with the manifest module or with each other.
///
/// The modules are kept nonetheless.
pub(crate) fn check_module_names(modules: &[Entry], manifest_module: &str, reporter: &Reporter) {
    let mut names = HashSet::default();
    names.insert(manifest_module.to_ascii_lowercase());

    for entry in modules {
        let EntryKind::Module(metadata) = &entry.kind else { continue };
        let name = &metadata.image.name;

        if !names.insert(name.to_ascii_lowercase()) {
            entry
                .diagnostic(Diagnostic::error())
                .code(ErrorCode::E007)
                .message(format!("the module name {} is not unique", name.quote()))
                .report(reporter);
        }
    }
}
