//! Visibility-scoped requirement propagation.
//!
//! For a component C:
//!
//! ```text
//! interface(C) = C.exposed
//!              + interface(D)   for every exposed edge C -> D
//!              + artifact(C)    if C is linkable
//!
//! usage(C)     = C.exposed + C.internal
//!              + interface(D)   for every edge C -> D
//! ```
//!
//! `interface` is what consumers receive; `usage` is what C itself compiles
//! and links with. Internal requirements never enter an interface. A static
//! library still needs its internal dependencies' link inputs at the final
//! link, so those travel separately as link-only inputs and never affect
//! compilation.
//!
//! Closures are computed once per component, in declaration order, from the
//! closures of earlier components.

use std::collections::{BTreeMap, BTreeSet};

use crate::builder::errors::{ComposeError, Contributor};
use crate::core::{Component, ComponentKind, Define, Linkage, Requirements, ResolvedPackage, Scope};

/// Requirements plus the origin of every entry that can conflict.
#[derive(Debug, Clone, Default)]
pub struct TrackedRequirements {
    reqs: Requirements,
    define_origins: BTreeMap<String, String>,
    runtime_origin: Option<String>,
}

fn describe_runtime(linkage: Linkage) -> String {
    format!("runtime = \"{}\"", linkage.as_str())
}

impl TrackedRequirements {
    pub fn requirements(&self) -> &Requirements {
        &self.reqs
    }

    /// Merge requirements declared directly by `origin`.
    pub fn merge_declared(
        &mut self,
        reqs: &Requirements,
        origin: &str,
        component: &str,
    ) -> Result<(), ComposeError> {
        self.merge(reqs, |_| origin.to_string(), origin, component)
    }

    /// Merge another tracked set, keeping its origins.
    pub fn merge_tracked(
        &mut self,
        other: &TrackedRequirements,
        component: &str,
    ) -> Result<(), ComposeError> {
        let runtime_origin = other.runtime_origin.clone().unwrap_or_default();
        self.merge(
            &other.reqs,
            |name| other.define_origins.get(name).cloned().unwrap_or_default(),
            &runtime_origin,
            component,
        )
    }

    fn merge(
        &mut self,
        incoming: &Requirements,
        define_origin: impl Fn(&str) -> String,
        runtime_origin: &str,
        component: &str,
    ) -> Result<(), ComposeError> {
        for define in &incoming.defines {
            self.check_define(define, &define_origin(&define.name), component)?;
        }

        if let (Some(ours), Some(theirs)) = (self.reqs.runtime, incoming.runtime) {
            if ours != theirs {
                return Err(ComposeError::RequirementConflict {
                    component: component.to_string(),
                    requirement: "runtime linkage".to_string(),
                    first: Contributor {
                        origin: self.runtime_origin.clone().unwrap_or_default(),
                        value: describe_runtime(ours),
                    },
                    second: Contributor {
                        origin: runtime_origin.to_string(),
                        value: describe_runtime(theirs),
                    },
                });
            }
        }
        if self.reqs.runtime.is_none() && incoming.runtime.is_some() {
            self.runtime_origin = Some(runtime_origin.to_string());
        }

        for define in &incoming.defines {
            self.define_origins
                .entry(define.name.clone())
                .or_insert_with(|| define_origin(&define.name));
        }
        self.reqs.append(incoming);
        Ok(())
    }

    fn check_define(
        &self,
        define: &Define,
        origin: &str,
        component: &str,
    ) -> Result<(), ComposeError> {
        let Some(existing) = self.reqs.defines.iter().find(|d| d.name == define.name) else {
            return Ok(());
        };
        if existing.value == define.value {
            return Ok(());
        }

        Err(ComposeError::RequirementConflict {
            component: component.to_string(),
            requirement: format!("define `{}`", define.name),
            first: Contributor {
                origin: self
                    .define_origins
                    .get(&define.name)
                    .cloned()
                    .unwrap_or_default(),
                value: existing.to_string(),
            },
            second: Contributor {
                origin: origin.to_string(),
                value: define.to_string(),
            },
        })
    }
}

/// The link-only part of a requirement set.
fn link_part(reqs: &Requirements) -> Requirements {
    Requirements {
        link_libraries: reqs.link_libraries.clone(),
        link_dirs: reqs.link_dirs.clone(),
        link_options: reqs.link_options.clone(),
        ..Default::default()
    }
}

/// A dependency edge with its target already looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedEdge {
    /// Index of an earlier component
    Component(usize),

    /// Index into the resolved packages, optionally one export
    Package { index: usize, target: Option<String> },
}

/// Memoized propagation result for one component.
#[derive(Debug, Clone, Default)]
pub struct ComponentClosure {
    /// What consumers receive through an edge to this component
    pub interface: TrackedRequirements,

    /// Components whose artifacts consumers must link
    pub interface_artifacts: BTreeSet<usize>,

    /// Link inputs of a static library's internal dependencies
    pub link_only: Requirements,

    /// Requirements for the component's own compilation and link
    pub usage: TrackedRequirements,

    /// Components whose artifacts this component links against
    pub link_artifacts: BTreeSet<usize>,
}

impl ComponentClosure {
    pub fn interface(&self) -> &Requirements {
        self.interface.requirements()
    }

    pub fn usage(&self) -> &Requirements {
        self.usage.requirements()
    }
}

/// Compute the closure of component `index`.
///
/// `closures` holds the closures of every earlier component; edges may only
/// point at those.
pub fn propagate(
    index: usize,
    component: &Component,
    edges: &[(ResolvedEdge, Scope)],
    closures: &[ComponentClosure],
    packages: &[ResolvedPackage],
) -> Result<ComponentClosure, ComposeError> {
    let name = component.name();
    let origin = format!("`{}`", name);
    let mut closure = ComponentClosure::default();

    closure
        .interface
        .merge_declared(component.exposed(), &origin, name)?;
    if component.kind().is_linkable() {
        closure.interface_artifacts.insert(index);
    }

    closure
        .usage
        .merge_declared(component.exposed(), &origin, name)?;
    closure
        .usage
        .merge_declared(component.internal(), &origin, name)?;

    for (edge, scope) in edges {
        let package_interface;
        let (dep_interface, dep_artifacts, dep_link_only) = match edge {
            ResolvedEdge::Component(d) => {
                let dep = &closures[*d];
                (&dep.interface, Some(&dep.interface_artifacts), Some(&dep.link_only))
            }
            ResolvedEdge::Package { index, target } => {
                let pkg = &packages[*index];
                let mut tracked = TrackedRequirements::default();
                tracked.merge_declared(
                    &pkg.usage_requirements(target.as_deref()),
                    &format!("package `{}`", pkg.name),
                    name,
                )?;
                package_interface = tracked;
                (&package_interface, None, None)
            }
        };

        closure.usage.merge_tracked(dep_interface, name)?;
        if let Some(artifacts) = dep_artifacts {
            closure.link_artifacts.extend(artifacts.iter().copied());
        }
        if let Some(link_only) = dep_link_only {
            closure.usage.reqs.append(link_only);
        }

        match scope {
            Scope::Exposed => {
                closure.interface.merge_tracked(dep_interface, name)?;
                if let Some(artifacts) = dep_artifacts {
                    closure.interface_artifacts.extend(artifacts.iter().copied());
                }
                if let Some(link_only) = dep_link_only {
                    closure.link_only.append(link_only);
                }
            }
            Scope::Internal if component.kind() == ComponentKind::Library => {
                closure.link_only.append(&link_part(dep_interface.requirements()));
                if let Some(artifacts) = dep_artifacts {
                    closure.interface_artifacts.extend(artifacts.iter().copied());
                }
                if let Some(link_only) = dep_link_only {
                    closure.link_only.append(link_only);
                }
            }
            Scope::Internal => {}
        }
    }

    Ok(closure)
}
