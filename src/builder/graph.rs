//! Build graph composition.
//!
//! [`compose`] turns a tree of component declarations plus the resolved
//! packages into a [`BuildGraph`]: every reference resolved, every source
//! glob expanded, every requirement closure computed.
//!
//! Declarations are processed in declaration order (the root file first,
//! then each subdirectory depth-first). That order is the topological order:
//! a component may only depend on components declared before it.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use petgraph::graph::DiGraph;

use crate::builder::alias::AliasRegistry;
use crate::builder::errors::ComposeError;
use crate::builder::propagate::{propagate, ComponentClosure, ResolvedEdge};
use crate::core::{
    BuildType, Component, ComponentDecl, ComponentKind, DeclarationTree, EdgeTarget, Language,
    ResolvedPackage, Scope, Triplet,
};
use crate::util::fs::{glob_files, relative_path};
use crate::util::graph::find_cycle;

/// Settings that shape a composed graph.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Export namespace of the project
    pub namespace: String,
    pub triplet: Triplet,
    pub build_type: BuildType,

    /// Root of all build outputs
    pub build_dir: PathBuf,
}

/// Scope of one declaration file.
///
/// Each subdirectory is processed under a child context that points at its
/// parent; nothing is mutated while descending.
#[derive(Debug, Clone, Copy)]
pub struct ComposeContext<'a> {
    parent: Option<&'a ComposeContext<'a>>,
    source_dir: &'a Path,
    declared_in: &'a Path,
}

impl<'a> ComposeContext<'a> {
    pub fn root(tree: &'a DeclarationTree) -> Self {
        ComposeContext {
            parent: None,
            source_dir: &tree.source_dir,
            declared_in: &tree.declared_in,
        }
    }

    pub fn child(&'a self, tree: &'a DeclarationTree) -> ComposeContext<'a> {
        ComposeContext {
            parent: Some(self),
            source_dir: &tree.source_dir,
            declared_in: &tree.declared_in,
        }
    }

    pub fn parent(&self) -> Option<&ComposeContext<'a>> {
        self.parent
    }

    /// Directory relative paths in this scope resolve against.
    pub fn source_dir(&self) -> &'a Path {
        self.source_dir
    }

    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |p| p.depth() + 1)
    }

    /// Source directory of the outermost scope.
    pub fn project_root(&self) -> &'a Path {
        match self.parent {
            Some(parent) => parent.project_root(),
            None => self.source_dir,
        }
    }

    /// The declaring file, relative to the project root.
    pub fn location(&self) -> PathBuf {
        relative_path(self.project_root(), self.declared_in)
    }
}

/// A declaration together with the scope it was declared in.
struct ScopedDecl<'t> {
    decl: &'t ComponentDecl,
    source_dir: PathBuf,
    declared_in: PathBuf,
}

fn flatten<'t>(tree: &'t DeclarationTree, ctx: &ComposeContext<'_>, out: &mut Vec<ScopedDecl<'t>>) {
    for decl in &tree.components {
        out.push(ScopedDecl {
            decl,
            source_dir: ctx.source_dir().to_path_buf(),
            declared_in: ctx.location(),
        });
    }
    for child in &tree.children {
        let child_ctx = ctx.child(child);
        tracing::debug!(
            "entering {} (depth {})",
            child_ctx.location().display(),
            child_ctx.depth()
        );
        flatten(child, &child_ctx, out);
    }
}

/// A composed component graph, read-only once built.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    namespace: String,
    triplet: Triplet,
    build_type: BuildType,
    build_dir: PathBuf,
    source_root: PathBuf,
    components: Vec<Component>,
    declared_in: Vec<PathBuf>,
    edges: Vec<Vec<(ResolvedEdge, Scope)>>,
    closures: Vec<ComponentClosure>,
    packages: Vec<ResolvedPackage>,
    aliases: AliasRegistry,
}

/// Compose the component graph.
pub fn compose(
    tree: &DeclarationTree,
    packages: &[ResolvedPackage],
    options: &ComposeOptions,
) -> Result<BuildGraph, ComposeError> {
    let root = ComposeContext::root(tree);
    let mut decls = Vec::with_capacity(tree.len());
    flatten(tree, &root, &mut decls);

    let mut by_name: HashMap<&str, usize> = HashMap::new();
    for (i, scoped) in decls.iter().enumerate() {
        if by_name.insert(&scoped.decl.name, i).is_some() {
            return Err(ComposeError::DuplicateComponent {
                name: scoped.decl.name.clone(),
                declared_in: scoped.declared_in.clone(),
            });
        }
    }

    // Explicit aliases are valid references too, under the project namespace.
    let mut by_alias = by_name.clone();
    for (i, scoped) in decls.iter().enumerate() {
        if let Some(alias) = &scoped.decl.alias {
            by_alias.entry(alias.as_str()).or_insert(i);
        }
    }

    let lookup = Lookup {
        namespace: &options.namespace,
        by_name: &by_name,
        by_alias: &by_alias,
        packages,
    };

    check_cycles(&decls, &lookup)?;

    let mut components = Vec::with_capacity(decls.len());
    let mut declared_in = Vec::with_capacity(decls.len());
    let mut edges = Vec::with_capacity(decls.len());
    let mut closures: Vec<ComponentClosure> = Vec::with_capacity(decls.len());
    let mut aliases = AliasRegistry::new();

    for (index, scoped) in decls.iter().enumerate() {
        let decl = scoped.decl;

        let mut resolved = Vec::new();
        for (reference, scope) in decl.dependency_refs() {
            let edge = lookup.resolve(reference, index).map_err(|declared_later| {
                ComposeError::UnknownTarget {
                    component: decl.name.clone(),
                    reference: reference.to_string(),
                    declared_in: scoped.declared_in.clone(),
                    declared_later,
                }
            })?;
            if !resolved.contains(&(edge.clone(), scope)) {
                resolved.push((edge, scope));
            }
        }

        let component = build_component(scoped, &resolved, &components, packages)?;
        let closure = propagate(index, &component, &resolved, &closures, packages)?;

        if component.kind() != ComponentKind::Test {
            let alias = component.alias().unwrap_or(component.name());
            aliases.register_alias_as(&options.namespace, component.name(), alias)?;
        }

        tracing::debug!(
            "composed {} `{}` with {} dependencies",
            component.kind(),
            component.name(),
            resolved.len()
        );
        components.push(component);
        declared_in.push(scoped.declared_in.clone());
        edges.push(resolved);
        closures.push(closure);
    }

    tracing::info!(
        "composed {} components ({} packages)",
        components.len(),
        packages.len()
    );

    Ok(BuildGraph {
        namespace: options.namespace.clone(),
        triplet: options.triplet.clone(),
        build_type: options.build_type,
        build_dir: options.build_dir.clone(),
        source_root: tree.source_dir.clone(),
        components,
        declared_in,
        edges,
        closures,
        packages: packages.to_vec(),
        aliases,
    })
}

struct Lookup<'a> {
    namespace: &'a str,
    by_name: &'a HashMap<&'a str, usize>,
    by_alias: &'a HashMap<&'a str, usize>,
    packages: &'a [ResolvedPackage],
}

impl Lookup<'_> {
    fn package(&self, name: &str) -> Option<usize> {
        self.packages.iter().position(|p| p.name == name)
    }

    /// Component a reference names, ignoring declaration order.
    fn component(&self, reference: &str) -> Option<usize> {
        match reference.split_once("::") {
            Some((ns, local)) if ns == self.namespace => self.by_alias.get(local).copied(),
            Some(_) => None,
            None => self.by_name.get(reference).copied(),
        }
    }

    /// Resolve `reference` as used by component `from`.
    ///
    /// On failure returns whether the name exists but is declared later.
    fn resolve(&self, reference: &str, from: usize) -> Result<ResolvedEdge, bool> {
        if let Some(index) = self.component(reference) {
            return if index < from {
                Ok(ResolvedEdge::Component(index))
            } else {
                Err(true)
            };
        }

        match reference.split_once("::") {
            Some((ns, _)) if ns == self.namespace => Err(false),
            Some((package, target)) => match self.package(package) {
                Some(index) if self.packages[index].has_export(target) => {
                    Ok(ResolvedEdge::Package {
                        index,
                        target: Some(target.to_string()),
                    })
                }
                _ => Err(false),
            },
            None => self
                .package(reference)
                .map(|index| ResolvedEdge::Package {
                    index,
                    target: None,
                })
                .ok_or(false),
        }
    }
}

fn check_cycles(decls: &[ScopedDecl<'_>], lookup: &Lookup<'_>) -> Result<(), ComposeError> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let nodes: Vec<_> = decls
        .iter()
        .map(|d| graph.add_node(d.decl.name.clone()))
        .collect();

    for (i, scoped) in decls.iter().enumerate() {
        for (reference, _) in scoped.decl.dependency_refs() {
            if let Some(target) = lookup.component(reference) {
                graph.add_edge(nodes[i], nodes[target], ());
            }
        }
    }

    match find_cycle(&graph) {
        Some(cycle) => Err(ComposeError::CyclicDependency { cycle }),
        None => Ok(()),
    }
}

fn build_component(
    scoped: &ScopedDecl<'_>,
    edges: &[(ResolvedEdge, Scope)],
    earlier: &[Component],
    packages: &[ResolvedPackage],
) -> Result<Component, ComposeError> {
    let decl = scoped.decl;
    let sources = glob_files(&scoped.source_dir, &decl.sources).map_err(|e| {
        ComposeError::InvalidSources {
            component: decl.name.clone(),
            message: format!("{:#}", e),
        }
    })?;
    if sources.is_empty() && decl.kind != ComponentKind::Interface {
        return Err(ComposeError::NoSources {
            component: decl.name.clone(),
            patterns: decl.sources.clone(),
        });
    }

    let mut component = Component::new(&decl.name, decl.kind, &scoped.source_dir)
        .with_sources(sources)
        .with_alias(decl.alias.clone())
        .with_test_protocol(decl.test_protocol.unwrap_or_default());
    component.append_requirements(
        Scope::Exposed,
        &decl.exposed.clone().rebased(&scoped.source_dir),
    );
    component.append_requirements(
        Scope::Internal,
        &decl.internal.clone().rebased(&scoped.source_dir),
    );

    for (edge, scope) in edges {
        let target = match edge {
            ResolvedEdge::Component(i) => EdgeTarget::Component {
                name: earlier[*i].name().to_string(),
            },
            ResolvedEdge::Package { index, target } => EdgeTarget::Package {
                name: packages[*index].name.clone(),
                target: target.clone(),
            },
        };
        component.add_dependency(target, *scope);
    }

    Ok(component)
}

impl BuildGraph {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn triplet(&self) -> &Triplet {
        &self.triplet
    }

    pub fn build_type(&self) -> BuildType {
        self.build_type
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Directory of the root manifest.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component(&self, index: usize) -> &Component {
        &self.components[index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name() == name)
    }

    pub fn declared_in(&self, index: usize) -> &Path {
        &self.declared_in[index]
    }

    pub fn closure(&self, index: usize) -> &ComponentClosure {
        &self.closures[index]
    }

    pub fn packages(&self) -> &[ResolvedPackage] {
        &self.packages
    }

    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    /// Direct component dependencies of `index`.
    pub fn component_deps(&self, index: usize) -> BTreeSet<usize> {
        self.edges[index]
            .iter()
            .filter_map(|(edge, _)| match edge {
                ResolvedEdge::Component(d) => Some(*d),
                ResolvedEdge::Package { .. } => None,
            })
            .collect()
    }

    /// Components grouped into waves; everything in a wave depends only on
    /// earlier waves.
    pub fn waves(&self) -> Vec<Vec<usize>> {
        let mut level = vec![0usize; self.components.len()];
        let mut waves: Vec<Vec<usize>> = Vec::new();
        for i in 0..self.components.len() {
            let wave = self
                .component_deps(i)
                .into_iter()
                .map(|d| level[d] + 1)
                .max()
                .unwrap_or(0);
            level[i] = wave;
            if waves.len() <= wave {
                waves.resize_with(wave + 1, Vec::new);
            }
            waves[wave].push(i);
        }
        waves
    }

    /// Every component that depends on `index`, directly or transitively.
    pub fn dependents_of(&self, index: usize) -> BTreeSet<usize> {
        let mut found = BTreeSet::new();
        for i in index + 1..self.components.len() {
            let deps = self.component_deps(i);
            if deps.contains(&index) || deps.iter().any(|d| found.contains(d)) {
                found.insert(i);
            }
        }
        found
    }

    /// Output directory of one component.
    pub fn component_dir(&self, index: usize) -> PathBuf {
        self.build_dir.join(self.components[index].name())
    }

    pub fn object_dir(&self, index: usize) -> PathBuf {
        self.component_dir(index).join("obj")
    }

    /// Object file for `source` of component `index`.
    pub fn object_path(&self, index: usize, source: &Path) -> PathBuf {
        let component = &self.components[index];
        let relative = relative_path(component.source_dir(), source);
        let name = relative.to_string_lossy().replace("..", "__");
        self.object_dir(index).join(format!("{}.o", name))
    }

    /// Path of the artifact component `index` produces, if any.
    pub fn artifact_path(&self, index: usize) -> Option<PathBuf> {
        let component = &self.components[index];
        component
            .kind()
            .output_filename(component.name(), self.triplet.os())
            .map(|file| self.component_dir(index).join(file))
    }

    /// Compiler flags for component `index`, profile flags first.
    pub fn compile_flags(&self, index: usize, language: Language) -> Vec<String> {
        let mut flags: Vec<String> = self
            .build_type
            .compile_flags()
            .iter()
            .map(|f| f.to_string())
            .collect();
        flags.extend(self.closures[index].usage().compile_flags(language));
        flags
    }

    /// Artifacts to link into component `index`, dependents before their
    /// dependencies.
    pub fn link_artifacts(&self, index: usize) -> Vec<PathBuf> {
        self.closures[index]
            .link_artifacts
            .iter()
            .rev()
            .filter_map(|&d| self.artifact_path(d))
            .collect()
    }

    /// Linker flags for component `index` after its artifacts.
    pub fn link_flags(&self, index: usize) -> Vec<String> {
        self.closures[index].usage().link_flags()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CStandard, Define, LibRef, Requirements};
    use semver::Version;
    use tempfile::TempDir;

    fn options(root: &Path) -> ComposeOptions {
        ComposeOptions {
            namespace: "calc".into(),
            triplet: "x64-linux".parse().unwrap(),
            build_type: BuildType::Debug,
            build_dir: root.join("build"),
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "int x;\n").unwrap();
    }

    fn decl(name: &str, kind: ComponentKind, source: &str) -> ComponentDecl {
        let mut d = ComponentDecl::new(name, kind);
        if !source.is_empty() {
            d.sources = vec![source.to_string()];
        }
        d
    }

    fn calc_project(root: &Path) -> Vec<ComponentDecl> {
        touch(root, "src/lib/calc.c");
        touch(root, "src/main.c");
        let mut library = decl("library", ComponentKind::Library, "src/lib/*.c");
        library.exposed = Requirements {
            include_dirs: vec!["include".into()],
            defines: vec![Define::key_value("CALC_API", "1")],
            c_std: Some(CStandard::C11),
            ..Default::default()
        };
        library.internal = Requirements {
            defines: vec![Define::flag("CALC_BUILDING")],
            ..Default::default()
        };

        let mut app = decl("calc", ComponentKind::Executable, "src/main.c");
        app.internal_deps = vec!["library".into()];
        vec![library, app]
    }

    #[test]
    fn test_visibility() {
        let tmp = TempDir::new().unwrap();
        let tree = DeclarationTree::flat(tmp.path(), calc_project(tmp.path()));
        let graph = compose(&tree, &[], &options(tmp.path())).unwrap();

        let library = graph.closure(0).usage();
        assert!(library.defines.contains(&Define::flag("CALC_BUILDING")));
        assert_eq!(library.include_dirs, vec![tmp.path().join("include")]);

        let app = graph.closure(1).usage();
        assert_eq!(app.include_dirs, vec![tmp.path().join("include")]);
        assert_eq!(app.defines, vec![Define::key_value("CALC_API", "1")]);
        assert_eq!(app.c_std, Some(CStandard::C11));

        assert_eq!(
            graph.link_artifacts(1),
            vec![tmp.path().join("build/library/liblibrary.a")]
        );
        assert_eq!(graph.waves(), vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_forward_reference() {
        let tmp = TempDir::new().unwrap();
        let mut decls = calc_project(tmp.path());
        decls.reverse();
        let tree = DeclarationTree::flat(tmp.path(), decls);

        let err = compose(&tree, &[], &options(tmp.path())).unwrap_err();
        match err {
            ComposeError::UnknownTarget {
                component,
                reference,
                declared_later,
                ..
            } => {
                assert_eq!(component, "calc");
                assert_eq!(reference, "library");
                assert!(declared_later);
            }
            other => panic!("expected unknown target, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_reference() {
        let tmp = TempDir::new().unwrap();
        let mut decls = calc_project(tmp.path());
        decls[1].internal_deps.push("readline".into());
        let tree = DeclarationTree::flat(tmp.path(), decls);

        let err = compose(&tree, &[], &options(tmp.path())).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::UnknownTarget { ref reference, declared_later: false, .. } if reference == "readline"
        ));
    }

    #[test]
    fn test_cycle_detected_before_forward_reference() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.c");
        touch(tmp.path(), "b.c");
        let mut a = decl("a", ComponentKind::Library, "a.c");
        a.internal_deps = vec!["b".into()];
        let mut b = decl("b", ComponentKind::Library, "b.c");
        b.exposed_deps = vec!["a".into()];
        let tree = DeclarationTree::flat(tmp.path(), vec![a, b]);

        let err = compose(&tree, &[], &options(tmp.path())).unwrap_err();
        match err {
            ComposeError::CyclicDependency { cycle } => {
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.c");
        let mut a = decl("a", ComponentKind::Library, "a.c");
        a.internal_deps = vec!["a".into()];
        let tree = DeclarationTree::flat(tmp.path(), vec![a]);

        let err = compose(&tree, &[], &options(tmp.path())).unwrap_err();
        assert!(matches!(err, ComposeError::CyclicDependency { .. }));
    }

    #[test]
    fn test_duplicate_component() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.c");
        let a = decl("a", ComponentKind::Library, "a.c");
        let tree = DeclarationTree::flat(tmp.path(), vec![a.clone(), a]);

        let err = compose(&tree, &[], &options(tmp.path())).unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateComponent { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_no_sources() {
        let tmp = TempDir::new().unwrap();
        let a = decl("a", ComponentKind::Library, "src/*.c");
        let tree = DeclarationTree::flat(tmp.path(), vec![a]);

        let err = compose(&tree, &[], &options(tmp.path())).unwrap_err();
        assert!(matches!(err, ComposeError::NoSources { .. }));

        let headers = decl("headers", ComponentKind::Interface, "");
        let tree = DeclarationTree::flat(tmp.path(), vec![headers]);
        let graph = compose(&tree, &[], &options(tmp.path())).unwrap();
        assert_eq!(graph.artifact_path(0), None);
    }

    #[test]
    fn test_package_references() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "main.c");
        let triplet: Triplet = "x64-linux".parse().unwrap();
        let install = tmp.path().join("installed/x64-linux/editline-1.17.1");
        std::fs::create_dir_all(install.join("include")).unwrap();
        let editline = ResolvedPackage {
            name: "editline".into(),
            version: Version::new(1, 17, 1),
            triplet,
            install_path: install.clone(),
            exports: vec!["edit".into()],
            features: Default::default(),
        };

        let mut app = decl("calc", ComponentKind::Executable, "main.c");
        app.internal_deps = vec!["editline::edit".into()];
        let tree = DeclarationTree::flat(tmp.path(), vec![app.clone()]);
        let graph = compose(&tree, &[editline.clone()], &options(tmp.path())).unwrap();

        let usage = graph.closure(0).usage();
        assert_eq!(usage.include_dirs, vec![install.join("include")]);
        assert_eq!(usage.link_libraries, vec![LibRef::system("edit")]);
        assert_eq!(graph.link_flags(0)[0], format!("-L{}", install.join("lib").display()));

        app.internal_deps = vec!["editline::readline".into()];
        let tree = DeclarationTree::flat(tmp.path(), vec![app]);
        let err = compose(&tree, &[editline], &options(tmp.path())).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownTarget { .. }));
    }

    #[test]
    fn test_aliases_registered() {
        let tmp = TempDir::new().unwrap();
        let mut decls = calc_project(tmp.path());
        decls[0].alias = Some("core".into());
        touch(tmp.path(), "tests/test_calc.c");
        let mut test = decl("test_calc", ComponentKind::Test, "tests/*.c");
        test.internal_deps = vec!["calc::core".into()];
        decls.push(test);

        let tree = DeclarationTree::flat(tmp.path(), decls);
        let graph = compose(&tree, &[], &options(tmp.path())).unwrap();
        assert_eq!(graph.aliases().resolve("calc::core"), Some("library"));
        assert_eq!(graph.aliases().resolve("calc::calc"), Some("calc"));
        assert_eq!(graph.aliases().len(), 2);
        assert_eq!(graph.component_deps(2), BTreeSet::from([0]));
    }

    #[test]
    fn test_subdirectory_scope() {
        let tmp = TempDir::new().unwrap();
        let mut decls = calc_project(tmp.path());
        decls.truncate(1);
        touch(tmp.path(), "tests/unit.c");

        let mut test = decl("unit", ComponentKind::Test, "unit.c");
        test.internal_deps = vec!["library".into()];
        test.internal = Requirements {
            include_dirs: vec!["fixtures".into()],
            ..Default::default()
        };

        let mut tree = DeclarationTree::flat(tmp.path(), decls);
        tree.children.push(DeclarationTree {
            source_dir: tmp.path().join("tests"),
            declared_in: tmp.path().join("tests/components.toml"),
            components: vec![test],
            children: Vec::new(),
        });

        let graph = compose(&tree, &[], &options(tmp.path())).unwrap();
        assert_eq!(graph.component(1).sources(), &[tmp.path().join("tests/unit.c")]);
        assert_eq!(graph.declared_in(1), Path::new("tests/components.toml"));
        assert_eq!(
            graph.closure(1).usage().include_dirs,
            vec![tmp.path().join("tests/fixtures"), tmp.path().join("include")]
        );
        assert_eq!(
            graph.object_path(1, &tmp.path().join("tests/unit.c")),
            tmp.path().join("build/unit/obj/unit.c.o")
        );
    }

    #[test]
    fn test_dependents_of() {
        let tmp = TempDir::new().unwrap();
        let mut decls = calc_project(tmp.path());
        touch(tmp.path(), "tool.c");
        decls.push(decl("tool", ComponentKind::Executable, "tool.c"));
        let tree = DeclarationTree::flat(tmp.path(), decls);
        let graph = compose(&tree, &[], &options(tmp.path())).unwrap();

        assert_eq!(graph.dependents_of(0), BTreeSet::from([1]));
        assert!(graph.dependents_of(2).is_empty());
        assert_eq!(graph.waves(), vec![vec![0, 2], vec![1]]);
    }
}
