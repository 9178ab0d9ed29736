use crate::{
    bind::{bind, Candidate, CandidateIndex, CandidateSource, Candidates},
    compaction,
    mock::{MemoryFileProvider, MockResolver, TableReader},
    state::{self, AssemblyMetadata},
    missing_core_library, AssemblySymbol, BindingState, BoundReferences, Compilation,
    CompilationOptions, FileSystemResolver, Reference, ReferenceKind, ReferenceResolver, SymbolKind,
};
use diagnostics::{Code, ErrorCode, LintCode};
use identity::{AssemblyIdentity, IdentityComparer, UnificationPolicy};
use index_map::Index as _;
use metadata::{AssemblyImage, ModuleImage};
use span::{span, Spanned};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use utility::path::NormalizedPathBuf;

const TOKEN: &str = "b77a5c561934e089";

struct Setup {
    files: Arc<MemoryFileProvider>,
    resolver: Arc<MockResolver>,
    directory: &'static str,
}

impl Setup {
    /// Every test gets its own directory since metadata is cached process-wide by path.
    fn new(directory: &'static str) -> Self {
        Self { files: MemoryFileProvider::new(), resolver: MockResolver::new(), directory }
    }

    fn file(&self, name: &str, contents: &str) -> &Self {
        self.files.insert(Path::new(self.directory).join(name), contents);
        self
    }

    fn options(&self) -> CompilationOptions {
        CompilationOptions::default()
            .with_file_provider(self.files.clone())
            .with_resolver(self.resolver.clone())
            .with_base_directory(self.directory)
    }

    fn compilation(&self, name: &str, references: Vec<Reference>) -> Compilation {
        Compilation::new(AssemblyIdentity::new(name), references, self.options())
    }
}

/// The codes of the reported diagnostics in the order of the codes.
fn codes(bound: &BoundReferences) -> Vec<Code> {
    let mut codes: Vec<_> = bound.diagnostics().iter().filter_map(|diagnostic| diagnostic.code).collect();
    codes.sort();
    codes
}

fn strong(name: &str, version: &str) -> String {
    format!("{name}, Version={version}, Culture=neutral, PublicKeyToken={TOKEN}")
}

fn symbol<'a>(bound: &'a BoundReferences, reference: &Reference) -> &'a Arc<AssemblySymbol> {
    bound.assembly_symbol(reference).unwrap()
}

#[test]
fn path_duplicates_bind_to_a_single_candidate() {
    let setup = Setup::new("/path-duplicates");
    setup.file("Lib.dll", "assembly Lib");

    let first = Reference::file("Lib.dll");
    let second = Reference::file("./nested/../Lib.dll");
    let compilation = setup.compilation("App", vec![first.clone(), second.clone()]);
    let bound = compilation.bound_references();

    assert_eq!(bound.referenced_assemblies().len(), 1);
    assert_eq!(codes(&bound), [Code::Lint(LintCode::DuplicateReference)]);
    assert!(Arc::ptr_eq(symbol(&bound, &first), symbol(&bound, &second)));
    assert_eq!(bound.duplicates().len(), 1);
    assert_eq!(bound.duplicates()[0].reference, second);
    assert_eq!(bound.duplicates()[0].original, first);
    assert_eq!(setup.files.reads(), 1);
}

#[test]
fn weak_identity_duplicates_are_diagnosed() {
    let setup = Setup::new("/weak-duplicates");
    setup
        .file("one/Lib.dll", "assembly Lib, Version=1.0.0.0")
        .file("two/Lib.dll", "assembly Lib, Version=2.0.0.0");

    let first = Reference::file("one/Lib.dll");
    let second = Reference::file("two/Lib.dll");
    let bound = setup.compilation("App", vec![first.clone(), second.clone()]).bound_references();

    assert_eq!(bound.referenced_assemblies().len(), 1);
    assert_eq!(codes(&bound), [Code::Error(ErrorCode::E005)]);
    assert!(bound.assembly_symbol(&first).is_some());
    assert!(bound.assembly_symbol(&second).is_none());
}

#[test]
fn strong_equivalent_duplicates_merge_their_aliases() {
    let setup = Setup::new("/strong-duplicates");
    let identity = strong("Lib", "1.0.0.0");
    setup
        .file("one/Lib.dll", &format!("assembly {identity}"))
        .file("two/Lib.dll", &format!("assembly {identity}"));

    let first = Reference::file("one/Lib.dll").with_aliases(["first"]);
    let second = Reference::file("two/Lib.dll").with_aliases(["second", "first"]);
    let bound = setup.compilation("App", vec![first.clone(), second.clone()]).bound_references();

    assert!(bound.diagnostics().is_empty());
    assert_eq!(bound.referenced_assemblies().len(), 1);
    assert!(Arc::ptr_eq(symbol(&bound, &first), symbol(&bound, &second)));
    assert_eq!(bound.aliases(&first), ["first", "second"]);
    assert_eq!(bound.extern_aliases().iter().collect::<Vec<_>>(), ["first", "second"]);
    assert_eq!(bound.duplicates()[0].reference, second);
}

#[test]
fn equivalent_identities_differing_in_embedding_conflict() {
    let setup = Setup::new("/linked-and-referenced");
    let identity = strong("Interop", "1.0.0.0");
    setup
        .file("one/Interop.dll", &format!("assembly {identity}"))
        .file("two/Interop.dll", &format!("assembly {identity}"));

    let linked = Reference::file("one/Interop.dll").with_embed_by_value(true);
    let referenced = Reference::file("two/Interop.dll");
    let same_path = Reference::file("one/Interop.dll");
    let bound =
        setup.compilation("App", vec![linked.clone(), referenced.clone(), same_path]).bound_references();

    assert_eq!(codes(&bound), [Code::Error(ErrorCode::E006), Code::Error(ErrorCode::E006)]);
    assert_eq!(bound.referenced_assemblies().len(), 1);
    assert!(symbol(&bound, &linked).embed_by_value());
    assert!(bound.assembly_symbol(&referenced).is_none());
}

#[test]
fn binding_is_idempotent() {
    let library = AssemblyImage {
        identity: AssemblyIdentity::new("Lib"),
        modules: vec![ModuleImage {
            referenced_assemblies: vec![AssemblyIdentity::new("App"), AssemblyIdentity::new("Gone")],
            ..ModuleImage::new("Lib.dll")
        }],
    };

    let candidate = |identity: &str, references: Vec<AssemblyIdentity>, source| Candidate {
        identity: AssemblyIdentity::new(identity),
        references,
        source,
        embed_by_value: false,
        documentation: None,
        has_embedded_local_types: false,
        declares_root_type: false,
    };

    let mut candidates = Candidates::new();
    candidates.insert(candidate(
        "App",
        vec![AssemblyIdentity::new("Lib")],
        CandidateSource::BeingBuilt { direct: 1 },
    ));
    candidates.insert(candidate(
        "Lib",
        library.referenced_assemblies().cloned().collect(),
        CandidateSource::Metadata(AssemblyMetadata::new(library)),
    ));

    let comparer = IdentityComparer::default();
    let (first, _) = bind(&candidates, &comparer);
    let (second, _) = bind(&candidates, &comparer);

    assert_eq!(first, second);
    assert_eq!(first[CandidateIndex::BEING_BUILT].references, [Some(CandidateIndex::new(1))]);
    assert_eq!(
        first[CandidateIndex::new(1)].references,
        [Some(CandidateIndex::BEING_BUILT), None]
    );
    assert!(first.values().all(|binding| !binding.is_core_library));
}

#[test]
fn the_source_symbol_comes_first() {
    let setup = Setup::new("/source-symbol");
    setup.file("Lib.dll", "assembly Lib");

    let compilation = setup.compilation("App", vec![Reference::file("Lib.dll")]);
    assert_eq!(compilation.state(), BindingState::Uninitialized);

    let bound = compilation.bound_references();
    let assembly = bound.assembly();

    assert_eq!(compilation.state(), BindingState::Ready);
    assert_eq!(assembly.kind(), SymbolKind::Source);
    assert_eq!(assembly.identity().name(), "App");
    assert!(Arc::ptr_eq(assembly, &compilation.assembly()));
    assert_eq!(assembly.modules()[0].name(), "App.dll");
    assert!(Arc::ptr_eq(&assembly.modules()[0].referenced_symbols()[0], &bound.referenced_assemblies()[0]));
}

#[test]
fn every_symbol_has_a_core_library() {
    let setup = Setup::new("/core-library");
    setup
        .file("Core.dll", "assembly Core\ndeclares-root-type")
        .file("Lib.dll", "assembly Lib\nreferences Core\nreferences Gone");

    let core = Reference::file("Core.dll");
    let library = Reference::file("Lib.dll");
    let bound = setup.compilation("App", vec![core.clone(), library.clone()]).bound_references();
    let core = symbol(&bound, &core);

    assert!(Arc::ptr_eq(&core.core_library().unwrap(), core));

    let symbols = std::iter::once(bound.assembly())
        .chain(bound.referenced_assemblies())
        .chain(symbol(&bound, &library).modules()[0].referenced_symbols());

    for symbol in symbols {
        assert!(Arc::ptr_eq(&symbol.core_library().unwrap(), core), "{symbol:?}");
    }

    let missing = &symbol(&bound, &library).modules()[0].referenced_symbols()[1];
    assert_eq!(missing.kind(), SymbolKind::Missing);
    assert_eq!(missing.identity().name(), "Gone");
}

#[test]
fn the_core_library_falls_back_to_the_shared_placeholder() {
    let setup = Setup::new("/missing-core-library");
    setup.file("Lib.dll", "assembly Lib\nreferences Core");

    let library = Reference::file("Lib.dll");
    let bound = setup.compilation("App", vec![library.clone()]).bound_references();
    let core = &symbol(&bound, &library).modules()[0].referenced_symbols()[0];

    assert_eq!(core.kind(), SymbolKind::Missing);
    assert!(Arc::ptr_eq(&core.core_library().unwrap(), &missing_core_library()));
    assert!(Arc::ptr_eq(&bound.assembly().core_library().unwrap(), &missing_core_library()));
    assert_eq!(missing_core_library().kind(), SymbolKind::MissingCoreLibrary);
}

#[test]
fn the_assembly_being_built_may_be_the_core_library() {
    let setup = Setup::new("/core-being-built");
    let options = setup.options().with_declares_root_type(true);
    let compilation = Compilation::new(AssemblyIdentity::new("Core"), Vec::new(), options);
    let assembly = compilation.assembly();

    assert!(Arc::ptr_eq(&assembly.core_library().unwrap(), &assembly));
}

#[test]
fn diamond_dependencies_with_version_skew_are_retargeted() {
    let setup = Setup::new("/diamond");
    setup
        .file("v1/Lib.dll", &format!("assembly {}", strong("Lib", "1.0.0.0")))
        .file("v2/Lib.dll", &format!("assembly {}", strong("Lib", "2.0.0.0")));

    let left = setup.compilation("Left", vec![Reference::file("v1/Lib.dll")]);
    let sibling = Reference::compilation(&left);
    let library = Reference::file("v2/Lib.dll");
    let bound = setup.compilation("App", vec![sibling.clone(), library.clone()]).bound_references();

    let retargeting = symbol(&bound, &sibling);
    assert_eq!(retargeting.kind(), SymbolKind::Retargeting);
    assert!(Arc::ptr_eq(retargeting.underlying().unwrap(), &left.assembly()));

    let table = retargeting.modules()[0].referenced_symbols();
    assert!(Arc::ptr_eq(&table[0], symbol(&bound, &library)));
    assert_eq!(table[0].identity().version().major, 2);

    let unified = bound.unified_references();
    assert_eq!(unified.len(), 1);
    assert_eq!(unified[0].referencing.name(), "Left");
    assert_eq!(unified[0].reference.version().major, 1);
    assert_eq!(unified[0].definition.version().major, 2);

    // the sibling keeps its own wiring
    let assembly = left.assembly();
    let original = &assembly.modules()[0].referenced_symbols()[0];
    assert_eq!(original.identity().version().major, 1);
}

#[test]
fn compatible_siblings_are_used_as_they_are() {
    let setup = Setup::new("/compatible-sibling");
    setup.file("Lib.dll", "assembly Lib");

    let left = setup.compilation("Left", vec![Reference::file("Lib.dll")]);
    let sibling = Reference::compilation(&left);
    let bound = setup
        .compilation("App", vec![sibling.clone(), Reference::file("Lib.dll")])
        .bound_references();

    assert!(Arc::ptr_eq(symbol(&bound, &sibling), &left.assembly()));
    assert!(!compaction::is_registered(&left));
}

#[test]
fn retargeting_symbols_are_reused() {
    let setup = Setup::new("/retargeting-reuse");
    setup
        .file("v1/Lib.dll", &format!("assembly {}", strong("Lib", "1.0.0.0")))
        .file("v2/Lib.dll", &format!("assembly {}", strong("Lib", "2.0.0.0")));

    let left = setup.compilation("Left", vec![Reference::file("v1/Lib.dll")]);
    let references = || vec![Reference::compilation(&left), Reference::file("v2/Lib.dll")];

    let first = setup.compilation("First", references()).bound_references();
    let second = setup.compilation("Second", references()).bound_references();

    assert_eq!(first.referenced_assemblies()[0].kind(), SymbolKind::Retargeting);
    assert!(Arc::ptr_eq(&first.referenced_assemblies()[0], &second.referenced_assemblies()[0]));
    assert_eq!(left.0.retargeting_cache_len(), 1);
}

#[test]
fn missing_symbols_are_memoized_per_pass() {
    let setup = Setup::new("/missing-identical");
    setup.file("Lib.dll", "assembly Lib\nreferences Gone\nmodule Lib.Extra.netmodule\nreferences Gone");

    let library = Reference::file("Lib.dll");
    let bound = setup.compilation("App", vec![library.clone()]).bound_references();
    let modules = symbol(&bound, &library).modules();
    let first = &modules[0].referenced_symbols()[0];

    assert_eq!(first.kind(), SymbolKind::Missing);
    assert!(Arc::ptr_eq(first, &modules[1].referenced_symbols()[0]));
}

#[test]
fn missing_symbols_of_reused_assemblies_are_shared_with_new_ones() {
    let setup = Setup::new("/missing-reused");
    setup.file("Lib.dll", "assembly Lib\nreferences Gone").file("Lib2.dll", "assembly Lib2\nreferences Gone");

    let library = Reference::file("Lib.dll");
    let first = setup.compilation("First", vec![library.clone()]).bound_references();

    let (library, other) = (Reference::file("Lib.dll"), Reference::file("Lib2.dll"));
    let second = setup.compilation("Second", vec![library.clone(), other.clone()]).bound_references();

    assert!(Arc::ptr_eq(&first.referenced_assemblies()[0], symbol(&second, &library)));

    let reused = &symbol(&second, &library).modules()[0].referenced_symbols()[0];
    let created = &symbol(&second, &other).modules()[0].referenced_symbols()[0];

    assert_eq!(created.kind(), SymbolKind::Missing);
    assert!(Arc::ptr_eq(reused, created));
}

#[test]
fn missing_symbols_ignore_the_case_of_names() {
    let setup = Setup::new("/missing-case");
    setup.file("Lib.dll", "assembly Lib\nreferences Gone").file("Lib2.dll", "assembly Lib2\nreferences gone");

    let (library, other) = (Reference::file("Lib.dll"), Reference::file("Lib2.dll"));
    let bound = setup.compilation("App", vec![library.clone(), other.clone()]).bound_references();

    let upper = &symbol(&bound, &library).modules()[0].referenced_symbols()[0];
    let lower = &symbol(&bound, &other).modules()[0].referenced_symbols()[0];

    assert_eq!(upper.identity().name(), "Gone");
    assert!(Arc::ptr_eq(upper, lower));
}

#[test]
#[should_panic(expected = "bound reentrantly")]
fn reentrant_binding_fails_fast() {
    let setup = Setup::new("/reentrance");
    let compilation = setup.compilation("Loop", vec![Reference::name("Loop")]);
    setup.resolver.insert_compilation("Loop", &compilation);

    compilation.bound_references();
}

#[test]
fn compaction_deregisters_compilations_with_empty_caches() {
    let setup = Setup::new("/compaction");
    setup
        .file("v1/Lib.dll", &format!("assembly {}", strong("Lib", "1.0.0.0")))
        .file("v2/Lib.dll", &format!("assembly {}", strong("Lib", "2.0.0.0")));

    let left = setup.compilation("Left", vec![Reference::file("v1/Lib.dll")]);
    let app = setup
        .compilation("App", vec![Reference::compilation(&left), Reference::file("v2/Lib.dll")]);

    assert_eq!(app.bound_references().referenced_assemblies()[0].kind(), SymbolKind::Retargeting);
    assert!(compaction::is_registered(&left));
    assert!(compaction::registered_compilations().iter().any(|compilation| compilation.ptr_eq(&left)));

    drop(app);
    compaction::compact();

    assert!(!compaction::is_registered(&left));
    assert_eq!(left.0.retargeting_cache_len(), 0);
}

#[test]
fn unresolvable_names_are_reported() {
    let setup = Setup::new("/unresolvable-names");
    setup.resolver.insert("Alias", Reference::name("Lib"));

    let bound = setup
        .compilation("App", vec![Reference::name("Nowhere"), Reference::name("Alias")])
        .bound_references();

    assert_eq!(codes(&bound), [Code::Error(ErrorCode::E001), Code::Error(ErrorCode::E001)]);
    assert!(bound.referenced_assemblies().is_empty());
}

#[test]
fn unreadable_files_are_reported() {
    let setup = Setup::new("/unreadable");
    let bound = setup.compilation("App", vec![Reference::file("Absent.dll")]).bound_references();

    let diagnostic = bound.diagnostics().first().unwrap();
    assert_eq!(diagnostic.code, Some(Code::Error(ErrorCode::E002)));
    assert_eq!(diagnostic.path.as_deref(), Some(Path::new("/unreadable/Absent.dll")));
}

#[test]
fn invalid_images_are_reported() {
    let setup = Setup::new("/invalid-images");
    setup.file("Module.dll", "module Module.netmodule").file("Lib.dll", "assembly Lib");

    let bound = setup
        .compilation("App", vec![Reference::file("Module.dll"), Reference::module_file("Lib.dll")])
        .bound_references();

    assert_eq!(codes(&bound), [Code::Error(ErrorCode::E003), Code::Error(ErrorCode::E004)]);
    assert_eq!(bound.assembly().modules().len(), 1);
}

#[test]
fn module_names_must_be_unique() {
    let setup = Setup::new("/module-names");
    setup
        .file("one.netmodule", "module Extra.netmodule\nreferences Gone")
        .file("two.netmodule", "module extra.NETMODULE");

    let first = Reference::module_file("one.netmodule");
    let second = Reference::module_file("two.netmodule");
    let bound = setup.compilation("App", vec![first.clone(), second.clone()]).bound_references();

    assert_eq!(codes(&bound), [Code::Error(ErrorCode::E007)]);
    assert_eq!(bound.assembly().modules().len(), 3);
    assert_eq!(bound.module_symbol(&first).unwrap().name(), "Extra.netmodule");
    assert_eq!(bound.module_symbol(&second).unwrap().name(), "extra.NETMODULE");

    let gone = &bound.module_symbol(&first).unwrap().referenced_symbols()[0];
    assert_eq!(gone.kind(), SymbolKind::Missing);
}

#[test]
fn directive_references_are_located() {
    let setup = Setup::new("/directives");
    setup.file("Lib.dll", "assembly Lib");
    setup.resolver.insert("Lib", Reference::file("Lib.dll"));

    let directives = vec![
        Spanned::new(span(3, 10), Reference::name("Lib")),
        Spanned::new(span(20, 25), Reference::name("Gone")),
    ];
    let compilation =
        Compilation::with_directives(AssemblyIdentity::new("App"), Vec::new(), directives, setup.options());
    let bound = compilation.bound_references();

    let resolved = bound.directive_reference(span(3, 10)).unwrap();
    assert_eq!(symbol(&bound, resolved).identity().name(), "Lib");
    assert!(bound.directive_reference(span(20, 25)).is_none());

    let diagnostic = bound.diagnostics().first().unwrap();
    assert_eq!(diagnostic.code, Some(Code::Error(ErrorCode::E001)));
    assert_eq!(diagnostic.spans.first(), Some(&span(20, 25)));
}

#[test]
fn embedded_assemblies_are_linked() {
    let setup = Setup::new("/linked");
    setup.file("Interop.dll", "assembly Interop").file("Lib.dll", "assembly Lib\nreferences Interop");

    let interop = Reference::file("Interop.dll").with_embed_by_value(true);
    let library = Reference::file("Lib.dll");
    let bound = setup.compilation("App", vec![interop.clone(), library.clone()]).bound_references();
    let interop = symbol(&bound, &interop);

    let linked = bound.assembly().linked_assemblies();
    assert_eq!(linked.len(), 1);
    assert!(Arc::ptr_eq(&linked[0], interop));
    assert!(Arc::ptr_eq(&interop.linked_assemblies()[0], interop));
    assert!(Arc::ptr_eq(&symbol(&bound, &library).linked_assemblies()[0], interop));
}

#[test]
fn metadata_symbols_are_shared_between_compilations() {
    let setup = Setup::new("/sharing");
    setup.file("Lib.dll", "assembly Lib");

    let first = setup.compilation("First", vec![Reference::file("Lib.dll")]).bound_references();
    let second = setup.compilation("Second", vec![Reference::file("Lib.dll")]).bound_references();

    assert!(Arc::ptr_eq(&first.referenced_assemblies()[0], &second.referenced_assemblies()[0]));
    assert_eq!(setup.files.reads(), 1);
}

#[test]
fn immediate_references_keep_their_snapshot() {
    let setup = Setup::new("/immediate");
    setup.file("Lib.dll", "assembly Lib, Version=1.0.0.0");

    let library = Reference::immediate("Lib.dll");
    let first = setup.compilation("First", vec![library.clone()]).bound_references();

    setup.file("Lib.dll", "assembly Lib, Version=2.0.0.0");

    let second = setup.compilation("Second", vec![library.clone()]).bound_references();
    let fresh = setup.compilation("Third", vec![Reference::immediate("Lib.dll")]).bound_references();

    assert!(Arc::ptr_eq(symbol(&first, &library), symbol(&second, &library)));
    assert_eq!(fresh.referenced_assemblies()[0].identity().version().major, 2);
}

#[test]
fn derived_compilations_keep_observed_metadata() {
    let setup = Setup::new("/observed");
    setup.file("Lib.dll", "assembly Lib").file("Other.dll", "assembly Other");

    let library = Reference::file("Lib.dll");
    let compilation = setup.compilation("App", vec![library.clone()]);
    let bound = compilation.bound_references();

    let derived = compilation.with_references(vec![library.clone(), Reference::file("Other.dll")]);
    assert_eq!(derived.state(), BindingState::Uninitialized);

    let derived = derived.bound_references();
    assert!(Arc::ptr_eq(symbol(&bound, &library), symbol(&derived, &library)));
    assert_eq!(derived.referenced_assemblies().len(), 2);
}

#[test]
fn lower_versions_bind_only_if_unified() {
    let setup = Setup::new("/unification");
    setup
        .file("Lib.dll", &format!("assembly {}", strong("Lib", "1.0.0.0")))
        .file("App.Extra.dll", &format!("assembly App.Extra\nreferences {}", strong("Lib", "2.0.0.0")));

    let extra = Reference::file("App.Extra.dll");
    let references = vec![Reference::file("Lib.dll"), extra.clone()];

    let plain = setup.compilation("Plain", references.clone()).bound_references();
    assert_eq!(symbol(&plain, &extra).modules()[0].referenced_symbols()[0].kind(), SymbolKind::Missing);

    let token = TOKEN.parse().unwrap();
    let comparer = IdentityComparer::new(UnificationPolicy::default().unify("Lib", token));
    let options = setup.options().with_comparer(comparer);
    let unified = Compilation::new(AssemblyIdentity::new("Unified"), references, options).bound_references();

    let table = symbol(&unified, &extra).modules()[0].referenced_symbols();
    assert_eq!(table[0].kind(), SymbolKind::Metadata);
    assert_eq!(table[0].identity().version().major, 1);
    assert_eq!(unified.unified_references().len(), 1);
}

#[test]
fn in_memory_images_are_read_through_the_reader() {
    let setup = Setup::new("/in-memory");
    setup.file("Part.netmodule", "part");

    let part_image =
        ModuleImage { referenced_assemblies: vec![AssemblyIdentity::new("Lib")], ..ModuleImage::new("Part.netmodule") };
    let reader = TableReader::default()
        .with_assembly(
            "lib",
            AssemblyImage { identity: AssemblyIdentity::new("Lib"), modules: vec![ModuleImage::new("Lib.dll")] },
        )
        .with_module("part", part_image);
    let options = setup.options().with_reader(Arc::new(reader));

    let known = Reference::embedded_bytes("lib", b"lib".to_vec());
    let unknown = Reference::embedded_bytes("garbage", b"garbage".to_vec());
    let part = Reference::module_file("Part.netmodule");
    let compilation =
        Compilation::new(AssemblyIdentity::new("App"), vec![known.clone(), unknown, part.clone()], options);
    let bound = compilation.bound_references();

    assert_eq!(symbol(&bound, &known).identity().name(), "Lib");
    assert_eq!(codes(&bound), [Code::Error(ErrorCode::E003)]);

    let module = bound.module_symbol(&part).unwrap();
    assert_eq!(module.name(), "Part.netmodule");
    assert!(Arc::ptr_eq(&module.referenced_symbols()[0], symbol(&bound, &known)));
}

/// A fresh directory on disk for the tests that exercise the default collaborators.
fn scratch_directory(name: &str) -> PathBuf {
    let directory = std::env::temp_dir().join(format!("linker-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&directory);
    fs::create_dir_all(directory.join("search")).unwrap();
    directory
}

#[test]
fn file_system_resolver_prefers_the_base_directory() {
    let base = scratch_directory("resolver");
    fs::write(base.join("Core.dll"), "").unwrap();
    fs::write(base.join("search/Core.dll"), "").unwrap();
    fs::write(base.join("search/Core.Extra.dll"), "").unwrap();

    let resolver = FileSystemResolver::new(vec![PathBuf::from("search")]);
    let resolve = |name: &str| {
        let reference = resolver.resolve_assembly_name(name)?;
        let ReferenceKind::File { path, .. } = reference.kind() else { panic!("{reference:?}") };
        resolver.resolve_path(path, &base)
    };

    assert_eq!(resolve("Core"), Some(base.join("Core.dll")));
    assert_eq!(resolve("Core.Extra"), Some(base.join("search").join("Core.Extra.dll")));
    assert_eq!(resolve("Gone"), None);
    assert_eq!(resolve(""), None);

    fs::remove_dir_all(&base).unwrap();
}

#[test]
fn names_bind_through_the_default_collaborators() {
    let base = scratch_directory("default-collaborators");
    fs::write(base.join("search/Lib.dll"), "assembly Lib\nreferences Gone").unwrap();

    let options = CompilationOptions::default()
        .with_resolver(Arc::new(FileSystemResolver::new(vec![PathBuf::from("search")])))
        .with_base_directory(&base);
    let library = Reference::name("Lib");
    let unknown = Reference::name("Unknown");
    let bound = Compilation::new(AssemblyIdentity::new("App"), vec![library.clone(), unknown], options)
        .bound_references();

    assert_eq!(symbol(&bound, &library).identity().name(), "Lib");
    assert_eq!(codes(&bound), [Code::Error(ErrorCode::E001)]);

    fs::remove_dir_all(&base).unwrap();
}

#[test]
fn symbol_caches_drop_reclaimed_entries_when_growing() {
    let metadata = AssemblyMetadata::new(AssemblyImage {
        identity: AssemblyIdentity::new("Lib"),
        modules: vec![ModuleImage::new("Lib.dll")],
    });

    for _ in 0..3 {
        let symbol = AssemblySymbol::metadata(metadata.clone(), false, None);
        metadata.cache(&symbol);
    }

    assert_eq!(metadata.cached_symbols.lock().unwrap().len(), 1);
    assert!(metadata.cached_symbols().is_empty());
}

#[test]
fn metadata_caches_drop_reclaimed_paths_when_growing() {
    let setup = Setup::new("/metadata-pruning");
    setup.file("Old.dll", "assembly Old").file("New.dll", "assembly New");

    let old = setup.compilation("First", vec![Reference::file("Old.dll")]);
    old.bound_references();
    drop(old);

    setup.compilation("Second", vec![Reference::file("New.dll")]).bound_references();

    let state = state::lock();
    assert!(!state.assemblies.contains_key(&NormalizedPathBuf::new("/metadata-pruning/Old.dll", "/")));
}
