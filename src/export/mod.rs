//! Installing build outputs and writing the export descriptor.
//!
//! Artifacts land in role-specific directories under the install root:
//!
//! ```text
//! <install-root>/bin/       executables
//! <install-root>/lib/       static libraries
//! <install-root>/include/   exposed in-tree headers
//! <install-root>/share/<namespace>/berth-export.json
//! ```
//!
//! A copy of the descriptor is also written to `<build-dir>/berth-export.json`.
//! Test binaries are never exported.

mod descriptor;

pub use descriptor::{
    ExportDescriptor, ExportedComponent, ExportedPackage, UnsupportedSchema, DESCRIPTOR_FILE,
    SCHEMA_VERSION,
};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::{Artifacts, BuildGraph};
use crate::core::{ComponentKind, LibRef, Requirements};
use crate::install::InstallError;
use crate::util::fs::copy_dir_all;
use crate::util::hash::sha256_file;

/// Where the descriptor lives under an install root.
pub fn descriptor_path(install_root: &Path, namespace: &str) -> PathBuf {
    install_root
        .join("share")
        .join(namespace)
        .join(DESCRIPTOR_FILE)
}

fn role_dir(install_root: &Path, kind: ComponentKind) -> Option<PathBuf> {
    match kind {
        ComponentKind::Library => Some(install_root.join("lib")),
        ComponentKind::Executable => Some(install_root.join("bin")),
        ComponentKind::Test | ComponentKind::Interface => None,
    }
}

/// Copy artifacts and headers under `install_root` and write the descriptor.
pub fn export(
    graph: &BuildGraph,
    artifacts: &Artifacts,
    install_root: &Path,
) -> Result<ExportDescriptor> {
    let exported: Vec<usize> = (0..graph.len())
        .filter(|&i| graph.component(i).kind() != ComponentKind::Test)
        .collect();

    // Installed location of every exported artifact.
    let mut installed: BTreeMap<usize, PathBuf> = BTreeMap::new();
    for &i in &exported {
        let component = graph.component(i);
        let Some(dir) = role_dir(install_root, component.kind()) else {
            continue;
        };
        let Some(artifact) = artifacts.get(component.name()) else {
            bail!(
                "component `{}` has not been built; run `berth build` first",
                component.name()
            );
        };
        let Some(file_name) = artifact.path.file_name() else {
            bail!("artifact {} has no file name", artifact.path.display());
        };

        let dest = dir.join(file_name);
        copy_file(component.name(), &artifact.path, &dest)?;
        tracing::debug!("installed {} -> {}", artifact.path.display(), dest.display());
        installed.insert(i, dest);
    }

    let include_root = install_root.join("include");
    for &i in &exported {
        let component = graph.component(i);
        for dir in &component.exposed().include_dirs {
            if dir.starts_with(graph.source_root()) && dir.is_dir() {
                copy_dir_all(dir, &include_root)
                    .map_err(|e| InstallError::io(component.name(), dir, format!("{:#}", e)))?;
            }
        }
    }

    let mut components = Vec::with_capacity(exported.len());
    for &i in &exported {
        let component = graph.component(i);
        let id = graph
            .aliases()
            .id_of(graph.namespace(), component.name())
            .map(str::to_string)
            .unwrap_or_else(|| crate::builder::external_id(graph.namespace(), component.name()));

        let sha256 = match installed.get(&i) {
            Some(path) => Some(sha256_file(path)?),
            None => None,
        };

        components.push(ExportedComponent {
            name: component.name().to_string(),
            id,
            kind: component.kind(),
            artifact: installed.get(&i).cloned(),
            sha256,
            requirements: exported_requirements(graph, i, &installed, &include_root),
        });
    }

    let descriptor = ExportDescriptor {
        schema: SCHEMA_VERSION,
        namespace: graph.namespace().to_string(),
        triplet: graph.triplet().clone(),
        install_root: install_root.to_path_buf(),
        aliases: graph
            .aliases()
            .iter()
            .map(|(id, c)| (id.to_string(), c.to_string()))
            .collect(),
        components,
        packages: graph
            .packages()
            .iter()
            .map(|p| ExportedPackage {
                name: p.name.clone(),
                version: p.version.to_string(),
                install_path: p.install_path.clone(),
            })
            .collect(),
    };

    let path = descriptor_path(install_root, graph.namespace());
    descriptor
        .write(&path)
        .map_err(|e| InstallError::io(graph.namespace(), &path, format!("{:#}", e)))?;
    let copy = graph.build_dir().join(DESCRIPTOR_FILE);
    descriptor
        .write(&copy)
        .map_err(|e| InstallError::io(graph.namespace(), &copy, format!("{:#}", e)))?;

    tracing::info!(
        "exported {} component(s) to {}",
        descriptor.components.len(),
        install_root.display()
    );
    Ok(descriptor)
}

fn copy_file(component: &str, from: &Path, to: &Path) -> Result<(), InstallError> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|e| InstallError::io(component, parent, e))?;
    }
    std::fs::copy(from, to).map_err(|e| InstallError::io(component, to, e))?;
    Ok(())
}

/// Interface closure of component `index` rewritten to install paths.
///
/// In-tree include directories collapse onto `<install-root>/include`;
/// linkable artifacts become paths under `<install-root>/lib`, the component
/// itself first.
fn exported_requirements(
    graph: &BuildGraph,
    index: usize,
    installed: &BTreeMap<usize, PathBuf>,
    include_root: &Path,
) -> Requirements {
    let closure = graph.closure(index);
    let mut reqs = closure.interface().clone();

    let mut include_dirs = Vec::new();
    for dir in reqs.include_dirs.drain(..) {
        let dir = if dir.starts_with(graph.source_root()) {
            include_root.to_path_buf()
        } else {
            dir
        };
        if !include_dirs.contains(&dir) {
            include_dirs.push(dir);
        }
    }
    reqs.include_dirs = include_dirs;

    let mut libs: Vec<LibRef> = closure
        .interface_artifacts
        .iter()
        .rev()
        .filter_map(|d| installed.get(d))
        .map(|path| LibRef::path(path.clone()))
        .collect();
    libs.append(&mut reqs.link_libraries);
    reqs.link_libraries = libs;
    reqs.append(&closure.link_only);
    reqs
}
