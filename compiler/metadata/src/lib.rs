//! Reading assembly and module images.
//!
//! The linker never looks inside of a binary image itself. It asks a [`FileProvider`] for
//! the bytes of a file and a [`MetadataReader`] for the handful of facts it needs: the
//! identity of an assembly, its modules, what each module references, whether it declares
//! the root type of the type hierarchy and whether it embeds local types.

use derivation::Str;
use identity::AssemblyIdentity;
use std::{fmt, io, path::Path, sync::Arc};

pub use manifest::ManifestReader;

pub mod manifest;

/// Provides the contents of metadata files.
pub trait FileProvider: Send + Sync {
    fn provide_file(&self, path: &Path) -> io::Result<Arc<[u8]>>;
}

/// Reads whole files from the file system.
#[derive(Clone, Copy, Default, Debug)]
pub struct FileSystemProvider;

impl FileProvider for FileSystemProvider {
    fn provide_file(&self, path: &Path) -> io::Result<Arc<[u8]>> {
        std::fs::read(path).map(Arc::from)
    }
}

/// Turns bytes into images.
pub trait MetadataReader: Send + Sync {
    fn read_assembly(&self, bytes: &[u8]) -> Result<AssemblyImage, BadImageFormat>;

    fn read_module(&self, bytes: &[u8]) -> Result<ModuleImage, BadImageFormat>;

    fn read(&self, bytes: &[u8], kind: ImageKind) -> Result<Image, BadImageFormat> {
        match kind {
            ImageKind::Assembly => self.read_assembly(bytes).map(Image::Assembly),
            ImageKind::Module => self.read_module(bytes).map(Image::Module),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Str)]
#[format(dash_case)]
pub enum ImageKind {
    Assembly,
    Module,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Image {
    Assembly(AssemblyImage),
    Module(ModuleImage),
}

/// The parsed image of an assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyImage {
    pub identity: AssemblyIdentity,
    /// The modules of the assembly, the manifest module first.
    pub modules: Vec<ModuleImage>,
}

impl AssemblyImage {
    pub fn manifest_module(&self) -> Option<&ModuleImage> {
        self.modules.first()
    }

    /// Whether the assembly declares the root type of the type hierarchy.
    ///
    /// Only the manifest module counts.
    pub fn declares_root_type(&self) -> bool {
        self.manifest_module().is_some_and(|module| module.declares_root_type)
    }

    /// The referenced identities of all modules in order.
    pub fn referenced_assemblies(&self) -> impl Iterator<Item = &AssemblyIdentity> {
        self.modules.iter().flat_map(|module| &module.referenced_assemblies)
    }

    pub fn has_embedded_local_types(&self) -> bool {
        self.modules.iter().any(|module| module.has_embedded_local_types)
    }
}

/// The parsed image of a single module.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ModuleImage {
    pub name: String,
    pub referenced_assemblies: Vec<AssemblyIdentity>,
    pub declares_root_type: bool,
    pub has_embedded_local_types: bool,
}

impl ModuleImage {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}

/// The bytes do not form an image of the expected kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BadImageFormat {
    pub line: Option<usize>,
    pub message: String,
}

impl BadImageFormat {
    pub fn new(message: impl Into<String>) -> Self {
        Self { line: None, message: message.into() }
    }

    #[must_use]
    pub fn at(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for BadImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for BadImageFormat {}
