//! References and how bare names are resolved.

use crate::{
    compilation::Compilation,
    state::{AssemblyMetadata, ModuleMetadata},
};
use std::{
    fmt,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};
use utility::{SmallVec, Str};

/// A reference to an assembly or module.
///
/// References are compared by identity, not by content: two references created separately
/// for the same file are different references (they are deduplicated during binding though).
#[derive(Clone)]
pub struct Reference(Arc<ReferenceInner>);

struct ReferenceInner {
    kind: ReferenceKind,
    aliases: SmallVec<Str, 1>,
    embed_by_value: bool,
    documentation: Option<Arc<dyn DocumentationProvider>>,
    snapshot: OnceLock<Snapshot>,
}

#[derive(Clone)]
pub enum ReferenceKind {
    /// An assembly image held in memory.
    EmbeddedBytes { display: Str, bytes: Arc<[u8]> },
    /// An assembly image on disk.
    ///
    /// An *immediate* reference reads the file once and then sticks to that snapshot for its
    /// entire lifetime even if the file changes. Other file references share metadata through a
    /// process-wide cache.
    File { path: PathBuf, immediate: bool },
    /// A module image on disk contributing a module to the assembly being built.
    ModuleFile { path: PathBuf },
    /// The assembly built by another compilation.
    Compilation(Compilation),
    /// A bare assembly name to be resolved by a [`ReferenceResolver`].
    Name(Str),
}

impl Reference {
    fn new(kind: ReferenceKind) -> Self {
        Self(Arc::new(ReferenceInner {
            kind,
            aliases: SmallVec::new(),
            embed_by_value: false,
            documentation: None,
            snapshot: OnceLock::new(),
        }))
    }

    pub fn embedded_bytes(display: impl Into<Str>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(ReferenceKind::EmbeddedBytes { display: display.into(), bytes: bytes.into() })
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(ReferenceKind::File { path: path.into(), immediate: false })
    }

    /// A file reference that reads the file once and never observes later changes.
    pub fn immediate(path: impl Into<PathBuf>) -> Self {
        Self::new(ReferenceKind::File { path: path.into(), immediate: true })
    }

    pub fn module_file(path: impl Into<PathBuf>) -> Self {
        Self::new(ReferenceKind::ModuleFile { path: path.into() })
    }

    pub fn compilation(compilation: &Compilation) -> Self {
        Self::new(ReferenceKind::Compilation(compilation.clone()))
    }

    pub fn name(name: impl Into<Str>) -> Self {
        Self::new(ReferenceKind::Name(name.into()))
    }

    /// Create a new reference with the given aliases.
    ///
    /// The metadata snapshot of immediate references is not carried over.
    #[must_use]
    pub fn with_aliases<A: Into<Str>>(&self, aliases: impl IntoIterator<Item = A>) -> Self {
        self.modify(|inner| inner.aliases = aliases.into_iter().map(Into::into).collect())
    }

    /// Create a new reference that embeds the referenced assembly by value (or not).
    #[must_use]
    pub fn with_embed_by_value(&self, embed_by_value: bool) -> Self {
        self.modify(|inner| inner.embed_by_value = embed_by_value)
    }

    #[must_use]
    pub fn with_documentation(&self, documentation: Arc<dyn DocumentationProvider>) -> Self {
        self.modify(|inner| inner.documentation = Some(documentation))
    }

    fn modify(&self, modify: impl FnOnce(&mut ReferenceInner)) -> Self {
        let mut inner = ReferenceInner {
            kind: self.0.kind.clone(),
            aliases: self.0.aliases.clone(),
            embed_by_value: self.0.embed_by_value,
            documentation: self.0.documentation.clone(),
            snapshot: OnceLock::new(),
        };
        modify(&mut inner);
        Self(Arc::new(inner))
    }

    pub fn kind(&self) -> &ReferenceKind {
        &self.0.kind
    }

    pub fn aliases(&self) -> &[Str] {
        &self.0.aliases
    }

    pub fn embed_by_value(&self) -> bool {
        self.0.embed_by_value
    }

    pub fn documentation(&self) -> Option<&Arc<dyn DocumentationProvider>> {
        self.0.documentation.as_ref()
    }

    /// Whether the metadata of this reference is pinned to the reference itself.
    pub(crate) fn pins_metadata(&self) -> bool {
        matches!(
            self.0.kind,
            ReferenceKind::EmbeddedBytes { .. } | ReferenceKind::File { immediate: true, .. }
        )
    }

    pub(crate) fn snapshot(&self) -> Option<&Snapshot> {
        self.0.snapshot.get()
    }

    pub(crate) fn pin_snapshot(&self, snapshot: Snapshot) -> &Snapshot {
        self.0.snapshot.get_or_init(|| snapshot)
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            ReferenceKind::EmbeddedBytes { display, .. } => write!(f, "{display}"),
            ReferenceKind::File { path, .. } | ReferenceKind::ModuleFile { path } => {
                write!(f, "{}", path.display())
            }
            ReferenceKind::Compilation(compilation) => write!(f, "{}", compilation.identity().name()),
            ReferenceKind::Name(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.0.kind {
            ReferenceKind::EmbeddedBytes { .. } => "bytes",
            ReferenceKind::File { immediate: false, .. } => "file",
            ReferenceKind::File { immediate: true, .. } => "immediate file",
            ReferenceKind::ModuleFile { .. } => "module",
            ReferenceKind::Compilation(_) => "compilation",
            ReferenceKind::Name(_) => "name",
        };

        write!(f, "{kind} ‘{self}’")
    }
}

/// Metadata read once and pinned to a reference.
#[derive(Clone)]
pub(crate) enum Snapshot {
    Assembly(Arc<AssemblyMetadata>),
    Module(Arc<ModuleMetadata>),
}

pub(crate) fn same_documentation(
    left: Option<&Arc<dyn DocumentationProvider>>,
    right: Option<&Arc<dyn DocumentationProvider>>,
) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => Arc::ptr_eq(left, right),
        _ => false,
    }
}

/// Provides documentation for the entities of a referenced assembly.
///
/// Symbols are only shared between references with the very same provider instance.
pub trait DocumentationProvider: Send + Sync {
    fn documentation(&self, entity: &str) -> Option<String>;
}

/// Resolves bare assembly names and reference paths.
pub trait ReferenceResolver: Send + Sync {
    /// Resolve the name to a reference of any other kind.
    fn resolve_assembly_name(&self, name: &str) -> Option<Reference>;

    /// Resolve the path of a file or module reference relative to the given base directory.
    fn resolve_path(&self, path: &Path, base_directory: &Path) -> Option<PathBuf>;
}

/// Resolves names and paths against the file system.
///
/// A name `N` resolves to the relative path `N.dll`. A relative path is looked up in the base
/// directory and then in the search directories, in that order. Relative search directories
/// are themselves relative to the base directory.
#[derive(Clone, Debug, Default)]
pub struct FileSystemResolver {
    search_directories: Vec<PathBuf>,
}

impl FileSystemResolver {
    pub const EXTENSION: &'static str = "dll";

    pub fn new(search_directories: Vec<PathBuf>) -> Self {
        Self { search_directories }
    }
}

impl ReferenceResolver for FileSystemResolver {
    fn resolve_assembly_name(&self, name: &str) -> Option<Reference> {
        if name.is_empty() {
            return None;
        }

        Some(Reference::file(format!("{name}.{}", Self::EXTENSION)))
    }

    fn resolve_path(&self, path: &Path, base_directory: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            return path.is_file().then(|| path.to_owned());
        }

        std::iter::once(base_directory.to_owned())
            .chain(self.search_directories.iter().map(|directory| base_directory.join(directory)))
            .map(|directory| directory.join(path))
            .find(|candidate| candidate.is_file())
    }
}
