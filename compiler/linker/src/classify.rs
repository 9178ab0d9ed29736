//! Classifying references and loading their metadata.

use crate::{
    compilation::Compilation,
    reference::{Reference, ReferenceKind, Snapshot},
    state::{AssemblyMetadata, Guard, ModuleMetadata},
};
use diagnostics::{error::Result, Diagnostic, ErrorCode, Reporter};
use identity::AssemblyIdentity;
use metadata::{BadImageFormat, Image, ImageKind};
use span::Span;
use std::{
    path::Path,
    sync::{Arc, PoisonError},
};
use tracing::trace;
use utility::{path::NormalizedPathBuf, FormatError, QuoteExt};

/// A reference whose name (if any) has been resolved.
pub(crate) struct Classified {
    /// The reference as it was passed to the compilation.
    pub(crate) reference: Reference,
    /// The reference a bare name resolved to or the reference itself.
    pub(crate) resolved: Reference,
    /// The location of the include directive the reference comes from.
    pub(crate) span: Option<Span>,
    pub(crate) target: Target,
}

pub(crate) enum Target {
    Bytes(Arc<[u8]>),
    File { path: NormalizedPathBuf, immediate: bool },
    Module { path: NormalizedPathBuf },
    Compilation(Compilation),
}

impl Target {
    pub(crate) fn path(&self) -> Option<&NormalizedPathBuf> {
        match self {
            Self::File { path, .. } | Self::Module { path } => Some(path),
            Self::Bytes(_) | Self::Compilation(_) => None,
        }
    }
}

/// Resolve the explicit references followed by the directive references of the compilation.
///
/// References that cannot be resolved are reported and skipped.
pub(crate) fn classify(compilation: &Compilation, reporter: &Reporter) -> Vec<Classified> {
    let explicit = compilation.references().iter().map(|reference| (reference, None));
    let directives =
        compilation.directives().iter().map(|directive| (&directive.bare, Some(directive.span)));

    explicit
        .chain(directives)
        .filter_map(|(reference, span)| classify_reference(compilation, reference, span, reporter).ok())
        .collect()
}

fn classify_reference(
    compilation: &Compilation,
    reference: &Reference,
    span: Option<Span>,
    reporter: &Reporter,
) -> Result<Classified> {
    let options = compilation.options();

    let resolved = match reference.kind() {
        ReferenceKind::Name(name) => match options.resolver.resolve_assembly_name(name) {
            Some(resolved) if !matches!(resolved.kind(), ReferenceKind::Name(_)) => resolved
                .with_aliases(reference.aliases().iter().cloned())
                .with_embed_by_value(reference.embed_by_value()),
            _ => {
                return Err(Diagnostic::error()
                    .code(ErrorCode::E001)
                    .message(format!("the assembly {} could not be found", name.quote()))
                    .with(|it| locate(it, span))
                    .report(reporter));
            }
        },
        _ => reference.clone(),
    };

    let target = match resolved.kind() {
        ReferenceKind::EmbeddedBytes { bytes, .. } => Target::Bytes(bytes.clone()),
        &ReferenceKind::File { ref path, immediate } => {
            Target::File { path: resolve_path(path, compilation, span, reporter)?, immediate }
        }
        ReferenceKind::ModuleFile { path } => {
            Target::Module { path: resolve_path(path, compilation, span, reporter)? }
        }
        ReferenceKind::Compilation(compilation) => Target::Compilation(compilation.clone()),
        ReferenceKind::Name(_) => unreachable!("bare names are resolved to other references"),
    };

    Ok(Classified { reference: reference.clone(), resolved, span, target })
}

fn resolve_path(
    path: &Path,
    compilation: &Compilation,
    span: Option<Span>,
    reporter: &Reporter,
) -> Result<NormalizedPathBuf> {
    let options = compilation.options();

    match options.resolver.resolve_path(path, &options.base_directory) {
        Some(resolved) => Ok(NormalizedPathBuf::new(resolved, &options.base_directory)),
        None => Err(Diagnostic::error()
            .code(ErrorCode::E001)
            .message(format!("the metadata file {} could not be found", path.display().quote()))
            .with(|it| locate(it, span))
            .report(reporter)),
    }
}

pub(crate) fn locate<T: diagnostics::Tag>(diagnostic: Diagnostic<T>, span: Option<Span>) -> Diagnostic<T> {
    match span {
        Some(span) => diagnostic.span(span),
        None => diagnostic,
    }
}

/// A classified reference together with its metadata.
pub(crate) struct Entry {
    pub(crate) classified: Classified,
    pub(crate) kind: EntryKind,
}

pub(crate) enum EntryKind {
    Assembly(Arc<AssemblyMetadata>),
    Module(Arc<ModuleMetadata>),
    /// A sibling compilation whose references are already bound.
    Compilation(Compilation),
}

impl Entry {
    pub(crate) fn reference(&self) -> &Reference {
        &self.classified.reference
    }

    pub(crate) fn resolved(&self) -> &Reference {
        &self.classified.resolved
    }

    pub(crate) fn span(&self) -> Option<Span> {
        self.classified.span
    }

    pub(crate) fn embed_by_value(&self) -> bool {
        self.classified.resolved.embed_by_value()
    }

    /// The identity of the referenced assembly, `None` for module references.
    pub(crate) fn identity(&self) -> Option<&AssemblyIdentity> {
        match &self.kind {
            EntryKind::Assembly(metadata) => Some(&metadata.image.identity),
            EntryKind::Module(_) => None,
            EntryKind::Compilation(compilation) => Some(compilation.identity()),
        }
    }

    pub(crate) fn diagnostic<T: diagnostics::Tag>(&self, diagnostic: Diagnostic<T>) -> Diagnostic<T> {
        locate(diagnostic, self.span())
    }
}

/// Load the metadata of the reference or bind the sibling compilation it refers to.
///
/// Metadata is looked up in the following order: the metadata the compilation (or its
/// predecessor) has already observed for the reference, the snapshot pinned to the reference,
/// the process-wide metadata cache and finally the file provider and the reader.
pub(crate) fn load(
    classified: Classified,
    compilation: &Compilation,
    guard: &mut Guard<'_>,
    reporter: &Reporter,
) -> Result<Entry> {
    let kind = match &classified.target {
        Target::Compilation(sibling) => {
            sibling.bind(guard);
            EntryKind::Compilation(sibling.clone())
        }
        Target::Module { .. } => {
            load_snapshot(&classified, ImageKind::Module, compilation, guard, reporter)?.into()
        }
        Target::Bytes(_) | Target::File { .. } => {
            load_snapshot(&classified, ImageKind::Assembly, compilation, guard, reporter)?.into()
        }
    };

    Ok(Entry { classified, kind })
}

impl From<Snapshot> for EntryKind {
    fn from(snapshot: Snapshot) -> Self {
        match snapshot {
            Snapshot::Assembly(metadata) => Self::Assembly(metadata),
            Snapshot::Module(metadata) => Self::Module(metadata),
        }
    }
}

fn load_snapshot(
    classified: &Classified,
    kind: ImageKind,
    compilation: &Compilation,
    guard: &mut Guard<'_>,
    reporter: &Reporter,
) -> Result<Snapshot> {
    let mut observed = compilation.0.observed.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(snapshot) = observed.get(&classified.reference) {
        trace!(reference = %classified.reference, "reusing observed metadata");
        return Ok(snapshot.clone());
    }

    let snapshot = match classified.resolved.snapshot() {
        Some(snapshot) => snapshot.clone(),
        None => {
            let snapshot = read(classified, kind, compilation, guard, reporter)?;

            if classified.resolved.pins_metadata() {
                classified.resolved.pin_snapshot(snapshot).clone()
            } else {
                snapshot
            }
        }
    };

    observed.insert(classified.reference.clone(), snapshot.clone());
    Ok(snapshot)
}

fn read(
    classified: &Classified,
    kind: ImageKind,
    compilation: &Compilation,
    guard: &mut Guard<'_>,
    reporter: &Reporter,
) -> Result<Snapshot> {
    let options = compilation.options();
    let shared_path = match &classified.target {
        Target::File { path, immediate: false } | Target::Module { path } => Some(path),
        _ => None,
    };

    if let Some(snapshot) = shared_path.and_then(|path| cached(guard, path, kind)) {
        trace!(reference = %classified.resolved, "reusing cached metadata");
        return Ok(snapshot);
    }

    let bytes = match &classified.target {
        Target::Bytes(bytes) => bytes.clone(),
        Target::File { path, .. } | Target::Module { path } => {
            options.file_provider.provide_file(path.as_path()).map_err(|error| {
                Diagnostic::error()
                    .code(ErrorCode::E002)
                    .message(format!("could not open the metadata file {}", path.quote()))
                    .path(path.as_path().to_owned())
                    .note(error.format())
                    .with(|it| locate(it, classified.span))
                    .report(reporter)
            })?
        }
        Target::Compilation(_) => unreachable!("sibling compilations have no metadata"),
    };

    let image = options
        .reader
        .read(&bytes, kind)
        .map_err(|error| report_bad_image(classified, kind, error, reporter))?;

    let snapshot = match image {
        Image::Assembly(image) => Snapshot::Assembly(AssemblyMetadata::new(image)),
        Image::Module(image) => Snapshot::Module(ModuleMetadata::new(image)),
    };

    if let Some(path) = shared_path {
        cache(guard, path, &snapshot);
    }

    Ok(snapshot)
}

fn cached(guard: &Guard<'_>, path: &NormalizedPathBuf, kind: ImageKind) -> Option<Snapshot> {
    match kind {
        ImageKind::Assembly => guard.assemblies.get(path)?.upgrade().map(Snapshot::Assembly),
        ImageKind::Module => guard.modules.get(path)?.upgrade().map(Snapshot::Module),
    }
}

fn cache(guard: &mut Guard<'_>, path: &NormalizedPathBuf, snapshot: &Snapshot) {
    match snapshot {
        Snapshot::Assembly(metadata) => guard.cache_assembly(path.clone(), metadata),
        Snapshot::Module(metadata) => guard.cache_module(path.clone(), metadata),
    }
}

fn report_bad_image(
    classified: &Classified,
    kind: ImageKind,
    error: BadImageFormat,
    reporter: &Reporter,
) -> diagnostics::reporter::ErasedReportedError {
    let code = match kind {
        ImageKind::Assembly => ErrorCode::E003,
        ImageKind::Module => ErrorCode::E004,
    };

    Diagnostic::error()
        .code(code)
        .message(format!("{} is not a valid {}", (&classified.resolved).quote(), kind.name()))
        .with(|it| match classified.target.path() {
            Some(path) => it.path(path.as_path().to_owned()),
            None => it,
        })
        .note(error.to_string())
        .with(|it| locate(it, classified.span))
        .report(reporter)
}
