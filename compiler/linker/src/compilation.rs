//! Compilations and their bound references.

use crate::{
    reference::{FileSystemResolver, Reference, ReferenceResolver, Snapshot},
    resolve,
    state::{self, Guard},
    symbol::{AssemblySymbol, ModuleSymbol},
};
use derivation::Str;
use diagnostics::UntaggedDiagnostic;
use identity::{AssemblyIdentity, IdentityComparer};
use metadata::{FileProvider, FileSystemProvider, ManifestReader, MetadataReader};
use span::{Span, Spanned};
use std::{
    collections::BTreeSet,
    fmt,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, OnceLock, PoisonError, Weak,
    },
};
use utility::{default, HashMap, SmallVec, Str};

/// A compilation producing an assembly.
///
/// This is a cheap handle, clones refer to the same compilation.
#[derive(Clone)]
pub struct Compilation(pub(crate) Arc<CompilationInner>);

pub(crate) struct CompilationInner {
    pub(crate) identity: AssemblyIdentity,
    pub(crate) references: Vec<Reference>,
    /// References added by include directives in the source code.
    pub(crate) directives: Vec<Spanned<Reference>>,
    pub(crate) options: CompilationOptions,
    bound: OnceLock<Arc<BoundReferences>>,
    in_progress: AtomicBool,
    /// The retargeting symbols wrapping the source symbol of this compilation.
    pub(crate) retargeting_cache: Mutex<Vec<Weak<AssemblySymbol>>>,
    /// The metadata this compilation has read, by the reference it was read for.
    pub(crate) observed: Mutex<HashMap<Reference, Snapshot>>,
}

impl Compilation {
    pub fn new(identity: AssemblyIdentity, references: Vec<Reference>, options: CompilationOptions) -> Self {
        Self::with_directives(identity, references, Vec::new(), options)
    }

    pub fn with_directives(
        identity: AssemblyIdentity,
        references: Vec<Reference>,
        directives: Vec<Spanned<Reference>>,
        options: CompilationOptions,
    ) -> Self {
        Self::from_parts(identity, references, directives, options, default())
    }

    fn from_parts(
        identity: AssemblyIdentity,
        references: Vec<Reference>,
        directives: Vec<Spanned<Reference>>,
        options: CompilationOptions,
        observed: HashMap<Reference, Snapshot>,
    ) -> Self {
        Self(Arc::new(CompilationInner {
            identity,
            references,
            directives,
            options,
            bound: OnceLock::new(),
            in_progress: AtomicBool::new(false),
            retargeting_cache: default(),
            observed: Mutex::new(observed),
        }))
    }

    /// Create a new compilation with a different list of references.
    ///
    /// References kept from this compilation continue to see the metadata this compilation
    /// has observed for them even if the underlying files have changed in the meantime.
    #[must_use]
    pub fn with_references(&self, references: Vec<Reference>) -> Self {
        let observed = {
            let observed = self.0.observed.lock().unwrap_or_else(PoisonError::into_inner);
            let directives = self.0.directives.iter().map(|directive| &directive.bare);

            references
                .iter()
                .chain(directives)
                .filter_map(|reference| Some((reference.clone(), observed.get(reference)?.clone())))
                .collect()
        };

        Self::from_parts(
            self.0.identity.clone(),
            references,
            self.0.directives.clone(),
            self.0.options.clone(),
            observed,
        )
    }

    pub fn identity(&self) -> &AssemblyIdentity {
        &self.0.identity
    }

    pub fn references(&self) -> &[Reference] {
        &self.0.references
    }

    pub fn directives(&self) -> &[Spanned<Reference>] {
        &self.0.directives
    }

    pub fn options(&self) -> &CompilationOptions {
        &self.0.options
    }

    /// The name of the manifest module of the assembly being built.
    pub fn module_name(&self) -> String {
        format!("{}.dll", self.0.identity.name())
    }

    /// Bind the references of this compilation unless that already happened.
    ///
    /// # Panics
    ///
    /// If the references of this compilation are bound while they are being bound, for
    /// example because the compilation references itself.
    pub fn bound_references(&self) -> Arc<BoundReferences> {
        if let Some(bound) = self.0.bound.get() {
            return bound.clone();
        }

        let mut guard = state::lock();
        self.bind(&mut guard)
    }

    pub(crate) fn bind(&self, guard: &mut Guard<'_>) -> Arc<BoundReferences> {
        if let Some(bound) = self.0.bound.get() {
            return bound.clone();
        }

        if self.0.in_progress.swap(true, Ordering::SeqCst) {
            panic!("the references of ‘{}’ are bound reentrantly", self.0.identity.name());
        }

        let _progress = ProgressReset(&self.0.in_progress);
        let bound = Arc::new(resolve::resolve(self, guard));
        self.0.bound.get_or_init(|| bound).clone()
    }

    /// The symbol of the assembly being built.
    pub fn assembly(&self) -> Arc<AssemblySymbol> {
        self.bound_references().assembly.clone()
    }

    pub fn state(&self) -> BindingState {
        if self.0.bound.get().is_some() {
            BindingState::Ready
        } else if self.0.in_progress.load(Ordering::SeqCst) {
            BindingState::InProgress
        } else {
            BindingState::Uninitialized
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<CompilationInner> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Compilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compilation ‘{}’ ({})", self.0.identity.name(), self.state().name())
    }
}

impl CompilationInner {
    /// Live retargeting symbols wrapping the source symbol.
    pub(crate) fn retargeting_symbols(&self) -> Vec<Arc<AssemblySymbol>> {
        self.retargeting_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

/// Clears the reentrance flag even if the pass panics.
struct ProgressReset<'a>(&'a AtomicBool);

impl Drop for ProgressReset<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Str)]
#[format(dash_case)]
pub enum BindingState {
    Uninitialized,
    InProgress,
    Ready,
}

/// The collaborators and settings of a compilation.
#[derive(Clone)]
pub struct CompilationOptions {
    pub resolver: Arc<dyn ReferenceResolver>,
    pub file_provider: Arc<dyn FileProvider>,
    pub reader: Arc<dyn MetadataReader>,
    pub comparer: IdentityComparer,
    /// Whether the assembly being built declares the root type of the type hierarchy.
    pub declares_root_type: bool,
    /// The directory relative reference paths are resolved against.
    pub base_directory: PathBuf,
}

impl CompilationOptions {
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_file_provider(mut self, file_provider: Arc<dyn FileProvider>) -> Self {
        self.file_provider = file_provider;
        self
    }

    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.reader = reader;
        self
    }

    #[must_use]
    pub fn with_comparer(mut self, comparer: IdentityComparer) -> Self {
        self.comparer = comparer;
        self
    }

    #[must_use]
    pub fn with_declares_root_type(mut self, declares_root_type: bool) -> Self {
        self.declares_root_type = declares_root_type;
        self
    }

    #[must_use]
    pub fn with_base_directory(mut self, base_directory: impl Into<PathBuf>) -> Self {
        self.base_directory = base_directory.into();
        self
    }
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            resolver: Arc::new(FileSystemResolver::default()),
            file_provider: Arc::new(FileSystemProvider),
            reader: Arc::new(ManifestReader),
            comparer: default(),
            declares_root_type: false,
            base_directory: std::env::current_dir().unwrap_or_default(),
        }
    }
}

/// The outcome of binding the references of a compilation.
pub struct BoundReferences {
    pub(crate) assembly: Arc<AssemblySymbol>,
    /// The symbols of the referenced assemblies in order of the candidates they were bound to.
    pub(crate) referenced: Vec<Arc<AssemblySymbol>>,
    pub(crate) assemblies: HashMap<Reference, Arc<AssemblySymbol>>,
    /// Module references by the index of the module symbol they contribute.
    pub(crate) modules: HashMap<Reference, usize>,
    pub(crate) aliases: HashMap<Reference, SmallVec<Str, 1>>,
    pub(crate) extern_aliases: BTreeSet<Str>,
    pub(crate) directives: HashMap<Span, Reference>,
    pub(crate) duplicates: Vec<Duplicate>,
    pub(crate) unified: Vec<UnifiedReference>,
    pub(crate) diagnostics: BTreeSet<UntaggedDiagnostic>,
}

impl BoundReferences {
    pub fn assembly(&self) -> &Arc<AssemblySymbol> {
        &self.assembly
    }

    /// The symbols of all referenced assemblies excluding the assembly being built.
    pub fn referenced_assemblies(&self) -> &[Arc<AssemblySymbol>] {
        &self.referenced
    }

    /// The symbol the given assembly reference was bound to.
    ///
    /// Dropped duplicates map to the symbol of the reference they duplicate. References that
    /// were skipped because of an error are absent.
    pub fn assembly_symbol(&self, reference: &Reference) -> Option<&Arc<AssemblySymbol>> {
        self.assemblies.get(reference)
    }

    pub fn module_symbol(&self, reference: &Reference) -> Option<&ModuleSymbol> {
        self.modules.get(reference).map(|&index| &self.assembly.modules()[index])
    }

    /// The aliases of the reference merged with the aliases of its dropped duplicates.
    pub fn aliases(&self, reference: &Reference) -> &[Str] {
        self.aliases.get(reference).map_or(&[], |aliases| aliases.as_slice())
    }

    pub fn extern_aliases(&self) -> &BTreeSet<Str> {
        &self.extern_aliases
    }

    /// The reference the include directive at the given location resolved to.
    pub fn directive_reference(&self, span: Span) -> Option<&Reference> {
        self.directives.get(&span)
    }

    pub fn duplicates(&self) -> &[Duplicate] {
        &self.duplicates
    }

    pub fn unified_references(&self) -> &[UnifiedReference] {
        &self.unified
    }

    pub fn diagnostics(&self) -> &BTreeSet<UntaggedDiagnostic> {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|diagnostic| diagnostic.severity == diagnostics::Severity::Error)
    }
}

impl fmt::Debug for BoundReferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundReferences")
            .field("assembly", &self.assembly)
            .field("referenced", &self.referenced)
            .field("duplicates", &self.duplicates)
            .field("unified", &self.unified)
            .finish_non_exhaustive()
    }
}

/// A reference that was dropped in favor of an equivalent one.
#[derive(Clone, Debug)]
pub struct Duplicate {
    pub reference: Reference,
    pub original: Reference,
}

/// A strong-named reference bound to a different version of the assembly.
#[derive(Clone, Debug)]
pub struct UnifiedReference {
    pub referencing: AssemblyIdentity,
    pub reference: AssemblyIdentity,
    pub definition: AssemblyIdentity,
}
