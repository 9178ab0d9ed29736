//! Assembly and module symbols.

use crate::{reference::DocumentationProvider, state::AssemblyMetadata};
use derivation::Str;
use identity::AssemblyIdentity;
use std::{
    fmt,
    sync::{Arc, LazyLock, OnceLock, Weak},
};

/// A symbol standing for an assembly.
///
/// Symbols are created by construction passes and never change afterwards apart from their
/// set-once fields which are populated before the pass publishes them.
pub struct AssemblySymbol {
    this: Weak<Self>,
    origin: Origin,
    identity: AssemblyIdentity,
    embed_by_value: bool,
    documentation: Option<Arc<dyn DocumentationProvider>>,
    modules: Vec<ModuleSymbol>,
    core_library: OnceLock<CoreLibrary>,
    linked: OnceLock<Vec<Weak<AssemblySymbol>>>,
}

enum Origin {
    Source,
    Metadata(Arc<AssemblyMetadata>),
    Retargeting(Arc<AssemblySymbol>),
    Missing,
    MissingCoreLibrary,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Str)]
#[format(dash_case)]
pub enum SymbolKind {
    /// The assembly built by a compilation.
    Source,
    /// An assembly backed by metadata read from a file or from memory.
    Metadata,
    /// The source assembly of another compilation seen through a different reference wiring.
    Retargeting,
    /// A placeholder for a referenced assembly that could not be bound.
    Missing,
    /// The placeholder used when no assembly declares the root type.
    MissingCoreLibrary,
}

impl AssemblySymbol {
    fn new(
        origin: Origin,
        identity: AssemblyIdentity,
        embed_by_value: bool,
        documentation: Option<Arc<dyn DocumentationProvider>>,
        modules: Vec<ModuleSymbol>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            origin,
            identity,
            embed_by_value,
            documentation,
            modules,
            core_library: OnceLock::new(),
            linked: OnceLock::new(),
        })
    }

    pub(crate) fn source(identity: AssemblyIdentity, modules: Vec<ModuleSymbol>) -> Arc<Self> {
        Self::new(Origin::Source, identity, false, None, modules)
    }

    pub(crate) fn metadata(
        metadata: Arc<AssemblyMetadata>,
        embed_by_value: bool,
        documentation: Option<Arc<dyn DocumentationProvider>>,
    ) -> Arc<Self> {
        let identity = metadata.image.identity.clone();
        let modules = metadata
            .image
            .modules
            .iter()
            .map(|module| ModuleSymbol::new(module.name.clone(), module.referenced_assemblies.clone()))
            .collect();

        Self::new(Origin::Metadata(metadata), identity, embed_by_value, documentation, modules)
    }

    /// Wrap the source symbol of another compilation mirroring its modules.
    pub(crate) fn retargeting(underlying: Arc<Self>, embed_by_value: bool) -> Arc<Self> {
        let identity = underlying.identity.clone();
        let modules = underlying
            .modules
            .iter()
            .map(|module| ModuleSymbol::new(module.name.clone(), module.referenced_identities.clone()))
            .collect();

        Self::new(Origin::Retargeting(underlying), identity, embed_by_value, None, modules)
    }

    /// A placeholder with a single module that references nothing.
    pub(crate) fn missing(identity: AssemblyIdentity) -> Arc<Self> {
        let module = ModuleSymbol::new(format!("{}.dll", identity.name()), Vec::new());
        module.set_referenced_symbols(Vec::new());

        Self::new(Origin::Missing, identity, false, None, vec![module])
    }

    pub fn kind(&self) -> SymbolKind {
        match self.origin {
            Origin::Source => SymbolKind::Source,
            Origin::Metadata(_) => SymbolKind::Metadata,
            Origin::Retargeting(_) => SymbolKind::Retargeting,
            Origin::Missing => SymbolKind::Missing,
            Origin::MissingCoreLibrary => SymbolKind::MissingCoreLibrary,
        }
    }

    pub fn identity(&self) -> &AssemblyIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    /// The modules of the assembly, the manifest module first.
    pub fn modules(&self) -> &[ModuleSymbol] {
        &self.modules
    }

    pub fn embed_by_value(&self) -> bool {
        self.embed_by_value
    }

    pub fn documentation(&self) -> Option<&Arc<dyn DocumentationProvider>> {
        self.documentation.as_ref()
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.origin, Origin::Missing | Origin::MissingCoreLibrary)
    }

    /// The source symbol wrapped by a retargeting symbol.
    pub fn underlying(&self) -> Option<&Arc<Self>> {
        match &self.origin {
            Origin::Retargeting(underlying) => Some(underlying),
            _ => None,
        }
    }

    pub(crate) fn metadata_origin(&self) -> Option<&Arc<AssemblyMetadata>> {
        match &self.origin {
            Origin::Metadata(metadata) => Some(metadata),
            _ => None,
        }
    }

    /// The assembly declaring the root type as seen from this assembly.
    ///
    /// Only `None` while the symbol is still under construction.
    pub fn core_library(&self) -> Option<Arc<Self>> {
        match self.core_library.get()? {
            CoreLibrary::Itself => self.this.upgrade(),
            CoreLibrary::Assembly(assembly) => Some(assembly.clone()),
        }
    }

    #[track_caller]
    pub(crate) fn set_core_library(&self, core_library: CoreLibrary) {
        if self.core_library.set(core_library).is_err() {
            panic!("the core library of ‘{}’ was set twice", self.identity);
        }
    }

    /// The assemblies whose local types are embedded into this one.
    ///
    /// If the assembly itself is embedded by value, it comes first.
    pub fn linked_assemblies(&self) -> Vec<Arc<Self>> {
        self.linked.get().map_or_else(Vec::new, |linked| linked.iter().filter_map(Weak::upgrade).collect())
    }

    #[track_caller]
    pub(crate) fn set_linked_assemblies(&self, linked: Vec<Weak<Self>>) {
        if self.linked.set(linked).is_err() {
            panic!("the linked assemblies of ‘{}’ were set twice", self.identity);
        }
    }
}

impl fmt::Debug for AssemblySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} symbol ‘{}’", self.kind().name(), self.identity)
    }
}

pub enum CoreLibrary {
    /// The assembly declares the root type itself.
    Itself,
    Assembly(Arc<AssemblySymbol>),
}

/// The placeholder core library shared by every compilation lacking one.
pub fn missing_core_library() -> Arc<AssemblySymbol> {
    static MISSING_CORE_LIBRARY: LazyLock<Arc<AssemblySymbol>> = LazyLock::new(|| {
        let symbol = AssemblySymbol::new(
            Origin::MissingCoreLibrary,
            AssemblyIdentity::new("<missing core library>"),
            false,
            None,
            Vec::new(),
        );
        symbol.set_core_library(CoreLibrary::Itself);
        symbol
    });

    MISSING_CORE_LIBRARY.clone()
}

/// A module of an assembly.
pub struct ModuleSymbol {
    name: String,
    referenced_identities: Vec<AssemblyIdentity>,
    referenced_symbols: OnceLock<Vec<Arc<AssemblySymbol>>>,
}

impl ModuleSymbol {
    pub(crate) fn new(name: String, referenced_identities: Vec<AssemblyIdentity>) -> Self {
        Self { name, referenced_identities, referenced_symbols: OnceLock::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn referenced_identities(&self) -> &[AssemblyIdentity] {
        &self.referenced_identities
    }

    /// The symbols the referenced identities were bound to, index-aligned with them.
    ///
    /// Empty while the module is still under construction.
    pub fn referenced_symbols(&self) -> &[Arc<AssemblySymbol>] {
        self.referenced_symbols.get().map_or(&[], Vec::as_slice)
    }

    #[track_caller]
    pub(crate) fn set_referenced_symbols(&self, symbols: Vec<Arc<AssemblySymbol>>) {
        assert_eq!(
            symbols.len(),
            self.referenced_identities.len(),
            "the reference table of module ‘{}’ does not line up with its references",
            self.name,
        );

        if self.referenced_symbols.set(symbols).is_err() {
            panic!("the reference table of module ‘{}’ was set twice", self.name);
        }
    }
}

impl fmt::Debug for ModuleSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module ‘{}’", self.name)
    }
}
