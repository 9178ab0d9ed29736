//! Assembly reference resolution and retargeting.
//!
//! Binding the references of a [`Compilation`] turns its flat list of heterogeneous references
//! (files, in-memory images, modules, sibling compilations and bare names) into a deduplicated
//! graph of [assembly symbols](AssemblySymbol). One construction pass goes through the following
//! stages:
//!
//! 1. classify the references, resolving bare names and loading metadata
//! 2. deduplicate them by path and by identity
//! 3. bind the referenced identities of every candidate to other candidates
//! 4. materialize symbols, reusing previously created ones wherever the wiring agrees
//! 5. wire module reference tables, synthesizing missing symbols for unbound references
//! 6. propagate the core library and the linked (embedded by value) assemblies
//!
//! All construction passes as well as every cache mutation happen under a single process-wide
//! lock. Symbols are reused across compilations through weak caches which are pruned by the
//! [compactor](compaction).

pub use compilation::{
    BindingState, BoundReferences, Compilation, CompilationOptions, Duplicate, UnifiedReference,
};
pub use reference::{
    DocumentationProvider, FileSystemResolver, Reference, ReferenceKind, ReferenceResolver,
};
pub use symbol::{missing_core_library, AssemblySymbol, CoreLibrary, ModuleSymbol, SymbolKind};

mod bind;
mod classify;
pub mod compaction;
mod compilation;
mod dedup;
mod materialize;
mod missing;
#[cfg(any(test, feature = "test"))]
pub mod mock;
mod reference;
mod resolve;
mod state;
mod symbol;
#[cfg(test)]
mod test;
