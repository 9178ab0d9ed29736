//! Collaborators for tests.

use crate::{
    compilation::{Compilation, CompilationInner},
    reference::{Reference, ReferenceResolver},
};
use metadata::{AssemblyImage, BadImageFormat, FileProvider, MetadataReader, ModuleImage};
use std::{
    io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError, Weak,
    },
};
use utility::HashMap;

/// Files held in memory.
#[derive(Default)]
pub struct MemoryFileProvider {
    files: Mutex<HashMap<PathBuf, Arc<[u8]>>>,
    reads: AtomicUsize,
}

impl MemoryFileProvider {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        let contents: Vec<u8> = contents.into();

        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), contents.into());
    }

    /// The number of files provided so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FileProvider for MemoryFileProvider {
    fn provide_file(&self, path: &Path) -> io::Result<Arc<[u8]>> {
        let file = self.files.lock().unwrap_or_else(PoisonError::into_inner).get(path).cloned();

        match file {
            Some(contents) => {
                self.reads.fetch_add(1, Ordering::SeqCst);
                Ok(contents)
            }
            None => Err(io::ErrorKind::NotFound.into()),
        }
    }
}

/// Resolves names from a table and paths against the base directory.
#[derive(Default)]
pub struct MockResolver {
    names: Mutex<HashMap<String, Resolution>>,
}

enum Resolution {
    Reference(Reference),
    // weak to be able to resolve a name to the compilation using the resolver
    Compilation(Weak<CompilationInner>),
}

impl MockResolver {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    pub fn insert(&self, name: impl Into<String>, reference: Reference) {
        self.resolutions().insert(name.into(), Resolution::Reference(reference));
    }

    pub fn insert_compilation(&self, name: impl Into<String>, compilation: &Compilation) {
        self.resolutions().insert(name.into(), Resolution::Compilation(compilation.downgrade()));
    }

    fn resolutions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Resolution>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReferenceResolver for MockResolver {
    fn resolve_assembly_name(&self, name: &str) -> Option<Reference> {
        match self.resolutions().get(name)? {
            Resolution::Reference(reference) => Some(reference.clone()),
            Resolution::Compilation(compilation) => {
                Some(Reference::compilation(&Compilation(compilation.upgrade()?)))
            }
        }
    }

    fn resolve_path(&self, path: &Path, base_directory: &Path) -> Option<PathBuf> {
        Some(base_directory.join(path))
    }
}

/// Reads images by looking up the whole contents of a file in a table.
#[derive(Default)]
pub struct TableReader {
    assemblies: HashMap<Vec<u8>, AssemblyImage>,
    modules: HashMap<Vec<u8>, ModuleImage>,
}

impl TableReader {
    #[must_use]
    pub fn with_assembly(mut self, contents: impl Into<Vec<u8>>, image: AssemblyImage) -> Self {
        self.assemblies.insert(contents.into(), image);
        self
    }

    #[must_use]
    pub fn with_module(mut self, contents: impl Into<Vec<u8>>, image: ModuleImage) -> Self {
        self.modules.insert(contents.into(), image);
        self
    }
}

impl MetadataReader for TableReader {
    fn read_assembly(&self, bytes: &[u8]) -> Result<AssemblyImage, BadImageFormat> {
        self.assemblies.get(bytes).cloned().ok_or_else(|| BadImageFormat::new("unknown assembly image"))
    }

    fn read_module(&self, bytes: &[u8]) -> Result<ModuleImage, BadImageFormat> {
        self.modules.get(bytes).cloned().ok_or_else(|| BadImageFormat::new("unknown module image"))
    }
}
