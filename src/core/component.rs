//! Components and their requirement lists.
//!
//! A component is one buildable unit: a library, an executable, a test binary
//! or an interface-only library. Each component carries two requirement
//! lists:
//!
//! - **exposed** requirements apply to the component itself and propagate to
//!   every consumer that depends on it with exposed scope;
//! - **internal** requirements apply only to the component's own compilation.
//!
//! Requirement lists are append-only. Propagation across the graph lives in
//! `builder::propagate`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::language::{CStandard, CppStandard, Language};
use crate::core::triplet::Linkage;

/// The kind of component being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Static library
    #[serde(alias = "lib", alias = "staticlib")]
    Library,

    /// Executable binary
    #[serde(alias = "exe", alias = "bin")]
    Executable,

    /// Executable whose cases are discovered and run by `berth test`
    #[serde(alias = "test-binary")]
    Test,

    /// Requirements only, no compiled artifact
    #[serde(alias = "header-only")]
    Interface,
}

impl ComponentKind {
    /// Whether building this kind produces an artifact.
    pub fn produces_artifact(&self) -> bool {
        !matches!(self, ComponentKind::Interface)
    }

    /// Whether consumers link against the artifact.
    pub fn is_linkable(&self) -> bool {
        matches!(self, ComponentKind::Library)
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, ComponentKind::Executable | ComponentKind::Test)
    }

    /// Output file name on the given OS.
    pub fn output_filename(&self, name: &str, os: &str) -> Option<String> {
        match self {
            ComponentKind::Library if os == "windows" => Some(format!("{}.lib", name)),
            ComponentKind::Library => Some(format!("lib{}.a", name)),
            ComponentKind::Executable | ComponentKind::Test if os == "windows" => {
                Some(format!("{}.exe", name))
            }
            ComponentKind::Executable | ComponentKind::Test => Some(name.to_string()),
            ComponentKind::Interface => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Library => "library",
            ComponentKind::Executable => "executable",
            ComponentKind::Test => "test",
            ComponentKind::Interface => "interface",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Propagation scope of a requirement or dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Exposed,
    Internal,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Exposed => f.write_str("exposed"),
            Scope::Internal => f.write_str("internal"),
        }
    }
}

/// A preprocessor define, written `NAME` or `NAME=value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    pub fn flag(name: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: None,
        }
    }

    pub fn key_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn to_flag(&self) -> String {
        format!("-D{}", self)
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for Define {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.split_once('=') {
            Some((n, v)) => (n, Some(v.to_string())),
            None => (s, None),
        };
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(format!("invalid define `{}`", s));
        }
        Ok(Define {
            name: name.to_string(),
            value,
        })
    }
}

impl TryFrom<String> for Define {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Define> for String {
    fn from(d: Define) -> Self {
        d.to_string()
    }
}

/// A library to link against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibRef {
    /// Library found through the linker search path (`-lm`)
    System(String),

    /// Library at a specific path
    Path { path: PathBuf },
}

impl LibRef {
    pub fn system(name: impl Into<String>) -> Self {
        LibRef::System(name.into())
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        LibRef::Path { path: path.into() }
    }

    pub fn to_flag(&self) -> String {
        match self {
            LibRef::System(name) => format!("-l{}", name),
            LibRef::Path { path } => path.display().to_string(),
        }
    }
}

/// A set of compile and link requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Requirements {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_dirs: Vec<PathBuf>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<Define>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compile_options: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link_libraries: Vec<LibRef>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link_dirs: Vec<PathBuf>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link_options: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_std: Option<CStandard>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cxx_std: Option<CppStandard>,

    /// Runtime linkage; two different values in one closure conflict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Linkage>,
}

fn push_unique<T: PartialEq + Clone>(into: &mut Vec<T>, items: &[T]) {
    for item in items {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

impl Requirements {
    pub fn is_empty(&self) -> bool {
        *self == Requirements::default()
    }

    /// Append `other` without any conflict checks. Duplicates are dropped,
    /// first-seen order is kept, language standards take the maximum.
    pub fn append(&mut self, other: &Requirements) {
        push_unique(&mut self.include_dirs, &other.include_dirs);
        push_unique(&mut self.defines, &other.defines);
        push_unique(&mut self.compile_options, &other.compile_options);
        push_unique(&mut self.link_libraries, &other.link_libraries);
        push_unique(&mut self.link_dirs, &other.link_dirs);
        push_unique(&mut self.link_options, &other.link_options);
        self.c_std = self.c_std.max(other.c_std);
        self.cxx_std = self.cxx_std.max(other.cxx_std);
        if self.runtime.is_none() {
            self.runtime = other.runtime;
        }
    }

    /// Resolve relative paths against `base`.
    pub fn rebased(mut self, base: &Path) -> Self {
        let rebase = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.include_dirs = self.include_dirs.into_iter().map(rebase).collect();
        self.link_dirs = self.link_dirs.into_iter().map(rebase).collect();
        self.link_libraries = self
            .link_libraries
            .into_iter()
            .map(|lib| match lib {
                LibRef::Path { path } => LibRef::Path { path: rebase(path) },
                other => other,
            })
            .collect();
        self
    }

    /// Compiler flags for `language` (include dirs, defines, standard, options).
    pub fn compile_flags(&self, language: Language) -> Vec<String> {
        let mut flags = Vec::new();
        for dir in &self.include_dirs {
            flags.push(format!("-I{}", dir.display()));
        }
        for define in &self.defines {
            flags.push(define.to_flag());
        }
        match language {
            Language::C => {
                if let Some(std) = self.c_std {
                    flags.push(format!("-std={}", std.as_flag_value()));
                }
            }
            Language::Cxx => {
                if let Some(std) = self.cxx_std {
                    flags.push(format!("-std={}", std.as_flag_value()));
                }
            }
        }
        flags.extend(self.compile_options.iter().cloned());
        flags
    }

    /// Linker flags (search dirs, libraries, options).
    pub fn link_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        for dir in &self.link_dirs {
            flags.push(format!("-L{}", dir.display()));
        }
        for lib in &self.link_libraries {
            flags.push(lib.to_flag());
        }
        flags.extend(self.link_options.iter().cloned());
        flags
    }
}

/// Command-line protocol a test binary speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestProtocol {
    /// `--list-tests` / `--exact <name>`
    #[default]
    Berth,
    /// Catch2 `--list-test-names-only` / `<name>`
    Catch2,
    /// GoogleTest `--gtest_list_tests` / `--gtest_filter=<name>`
    #[serde(alias = "googletest")]
    Gtest,
}

/// What a dependency edge points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EdgeTarget {
    /// Another component in the same graph
    Component { name: String },

    /// A resolved external package, optionally one of its exported targets
    Package { name: String, target: Option<String> },
}

impl EdgeTarget {
    pub fn name(&self) -> &str {
        match self {
            EdgeTarget::Component { name } | EdgeTarget::Package { name, .. } => name,
        }
    }
}

impl fmt::Display for EdgeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeTarget::Component { name } => write!(f, "component `{}`", name),
            EdgeTarget::Package {
                name,
                target: Some(t),
            } => write!(f, "package `{}` target `{}`", name, t),
            EdgeTarget::Package { name, target: None } => write!(f, "package `{}`", name),
        }
    }
}

/// A scoped dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub target: EdgeTarget,
    pub scope: Scope,
}

/// A buildable unit.
#[derive(Debug, Clone)]
pub struct Component {
    name: String,
    kind: ComponentKind,
    source_dir: PathBuf,
    sources: Vec<PathBuf>,
    exposed: Requirements,
    internal: Requirements,
    deps: Vec<DependencyEdge>,
    alias: Option<String>,
    test_protocol: TestProtocol,
}

impl Component {
    pub fn new(name: impl Into<String>, kind: ComponentKind, source_dir: impl Into<PathBuf>) -> Self {
        Component {
            name: name.into(),
            kind,
            source_dir: source_dir.into(),
            sources: Vec::new(),
            exposed: Requirements::default(),
            internal: Requirements::default(),
            deps: Vec::new(),
            alias: None,
            test_protocol: TestProtocol::default(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn with_test_protocol(mut self, protocol: TestProtocol) -> Self {
        self.test_protocol = protocol;
        self
    }

    pub fn append_requirements(&mut self, scope: Scope, reqs: &Requirements) {
        match scope {
            Scope::Exposed => self.exposed.append(reqs),
            Scope::Internal => self.internal.append(reqs),
        }
    }

    pub fn add_dependency(&mut self, target: EdgeTarget, scope: Scope) {
        let edge = DependencyEdge { target, scope };
        if !self.deps.contains(&edge) {
            self.deps.push(edge);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn exposed(&self) -> &Requirements {
        &self.exposed
    }

    pub fn internal(&self) -> &Requirements {
        &self.internal
    }

    pub fn deps(&self) -> &[DependencyEdge] {
        &self.deps
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn test_protocol(&self) -> TestProtocol {
        self.test_protocol
    }

    /// C++ if any source is C++ or a C++ standard is requested.
    pub fn language(&self) -> Language {
        let cxx_source = self
            .sources
            .iter()
            .any(|s| Language::of_source(s) == Some(Language::Cxx));
        if cxx_source || self.exposed.cxx_std.is_some() || self.internal.cxx_std.is_some() {
            Language::Cxx
        } else {
            Language::C
        }
    }
}

/// A `[[component]]` table as written in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ComponentDecl {
    pub name: String,

    pub kind: ComponentKind,

    /// Source globs, relative to the declaring file's directory
    #[serde(default)]
    pub sources: Vec<String>,

    /// External alias under the project namespace
    #[serde(default)]
    pub alias: Option<String>,

    #[serde(default)]
    pub exposed: Requirements,

    #[serde(default)]
    pub internal: Requirements,

    /// Components or packages whose exposed requirements propagate onward
    #[serde(default)]
    pub exposed_deps: Vec<String>,

    /// Components or packages used only by this component's own compilation
    #[serde(default)]
    pub internal_deps: Vec<String>,

    #[serde(default)]
    pub test_protocol: Option<TestProtocol>,
}

impl ComponentDecl {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        ComponentDecl {
            name: name.into(),
            kind,
            sources: Vec::new(),
            alias: None,
            exposed: Requirements::default(),
            internal: Requirements::default(),
            exposed_deps: Vec::new(),
            internal_deps: Vec::new(),
            test_protocol: None,
        }
    }

    /// All dependency references with their scopes, exposed first.
    pub fn dependency_refs(&self) -> impl Iterator<Item = (&str, Scope)> {
        self.exposed_deps
            .iter()
            .map(|d| (d.as_str(), Scope::Exposed))
            .chain(self.internal_deps.iter().map(|d| (d.as_str(), Scope::Internal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_parse() {
        let d: Define = "CALC_API=1".parse().unwrap();
        assert_eq!(d, Define::key_value("CALC_API", "1"));
        assert_eq!(d.to_flag(), "-DCALC_API=1");

        let d: Define = "NDEBUG".parse().unwrap();
        assert_eq!(d.to_flag(), "-DNDEBUG");

        assert!("=1".parse::<Define>().is_err());
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            ComponentKind::Library.output_filename("calc", "linux").as_deref(),
            Some("libcalc.a")
        );
        assert_eq!(
            ComponentKind::Test.output_filename("unit", "windows").as_deref(),
            Some("unit.exe")
        );
        assert_eq!(ComponentKind::Interface.output_filename("hdr", "linux"), None);
    }

    #[test]
    fn test_append_dedups_and_maxes_standard() {
        let mut a = Requirements {
            include_dirs: vec![PathBuf::from("/i1")],
            cxx_std: Some(CppStandard::Cpp14),
            ..Default::default()
        };
        let b = Requirements {
            include_dirs: vec![PathBuf::from("/i1"), PathBuf::from("/i2")],
            cxx_std: Some(CppStandard::Cpp17),
            ..Default::default()
        };
        a.append(&b);
        assert_eq!(a.include_dirs, vec![PathBuf::from("/i1"), PathBuf::from("/i2")]);
        assert_eq!(a.cxx_std, Some(CppStandard::Cpp17));
    }

    #[test]
    fn test_decl_from_toml() {
        let decl: ComponentDecl = toml::from_str(
            r#"
name = "library"
kind = "library"
sources = ["src/*.c"]
exposed = { include-dirs = ["include"], defines = ["CALC_API=1"], c-std = "11" }
internal = { compile-options = ["-Wall"] }
internal-deps = ["editline"]
"#,
        )
        .unwrap();

        assert_eq!(decl.kind, ComponentKind::Library);
        assert_eq!(decl.exposed.c_std, Some(CStandard::C11));
        assert_eq!(decl.exposed.defines[0], Define::key_value("CALC_API", "1"));
        let refs: Vec<_> = decl.dependency_refs().collect();
        assert_eq!(refs, vec![("editline", Scope::Internal)]);
    }

    #[test]
    fn test_rebased_only_touches_relative() {
        let reqs = Requirements {
            include_dirs: vec![PathBuf::from("include"), PathBuf::from("/usr/include")],
            link_libraries: vec![LibRef::path("vendor/libz.a"), LibRef::system("m")],
            ..Default::default()
        }
        .rebased(Path::new("/src/calc"));

        assert_eq!(
            reqs.include_dirs,
            vec![PathBuf::from("/src/calc/include"), PathBuf::from("/usr/include")]
        );
        assert_eq!(reqs.link_libraries[0], LibRef::path("/src/calc/vendor/libz.a"));
        assert_eq!(reqs.link_libraries[1], LibRef::system("m"));
    }

    #[test]
    fn test_language_detection() {
        let c = Component::new("a", ComponentKind::Library, "/src")
            .with_sources(vec![PathBuf::from("/src/a.c")]);
        assert_eq!(c.language(), Language::C);

        let cxx = Component::new("b", ComponentKind::Library, "/src")
            .with_sources(vec![PathBuf::from("/src/a.c"), PathBuf::from("/src/b.cpp")]);
        assert_eq!(cxx.language(), Language::Cxx);
    }
}
