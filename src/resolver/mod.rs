//! Dependency resolution.
//!
//! The resolver turns a manifest's dependency declarations into an
//! [`InstallPlan`] for one triplet:
//!
//! 1. Undecided package names are taken in sorted order. Each gets the
//!    highest published version satisfying every constraint placed on it by
//!    the root or by an already selected package.
//! 2. Selecting a version adds its dependencies' constraints. A selection
//!    whose constraints clash with the ones already in place is abandoned and
//!    the next lower candidate is tried; when none is left the search
//!    backtracks to the previous decision.
//! 3. Only constraints from packages on the current selection path take
//!    part, so a version that was abandoned never causes a conflict. Two
//!    constraints on one name that no version could satisfy together are a
//!    [`ResolveError::VersionConflict`]; nothing is ever unified.
//! 4. The final set is ordered dependency-first.
//!
//! When no selection works, the error reported is the first dead end met on
//! the highest-versions-first path. The same manifest and index state always
//! yield the same plan.

mod errors;
mod plan;
mod version;

pub use errors::{Requester, ResolveError};
pub use plan::{InstallPlan, PlannedInstall};
pub use version::{constraints_compatible, version_req_to_range};

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::{DependencyDeclaration, Manifest, PortIndex, PortSummary, Triplet};
use crate::util::graph::find_cycle;

/// Upper bound on version selections tried before giving up.
const MAX_STEPS: usize = 10_000;

type Requests = BTreeMap<String, Vec<Request>>;

/// One constraint placed on a package name.
#[derive(Debug, Clone)]
struct Request {
    requester: String,
    decl: DependencyDeclaration,
}

impl Request {
    fn requester(&self) -> Requester {
        Requester::new(self.requester.clone(), self.decl.version_req().to_string())
    }
}

/// Resolves dependency declarations against a port index.
pub struct Resolver<'a> {
    index: &'a dyn PortIndex,
    cache: HashMap<String, Vec<PortSummary>>,
    steps: usize,
    /// First dead end met, reported if the search fails
    dead_end: Option<ResolveError>,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a dyn PortIndex) -> Self {
        Resolver {
            index,
            cache: HashMap::new(),
            steps: 0,
            dead_end: None,
        }
    }

    /// Published versions of `name`, highest first.
    fn versions(&mut self, name: &str) -> Result<&[PortSummary], ResolveError> {
        if !self.cache.contains_key(name) {
            let summaries = self.index.query(name).map_err(|e| ResolveError::Index {
                source_name: self.index.describe(),
                package: name.to_string(),
                message: format!("{:#}", e),
            })?;
            self.cache.insert(name.to_string(), summaries);
        }
        Ok(self.cache.get(name).map(Vec::as_slice).unwrap_or_default())
    }

    /// Resolve `deps`, declared by `root`, for `triplet`.
    pub fn resolve(
        &mut self,
        root: &str,
        deps: &[DependencyDeclaration],
        triplet: &Triplet,
    ) -> Result<InstallPlan, ResolveError> {
        self.steps = 0;
        self.dead_end = None;

        let mut requests = Requests::new();
        for decl in deps {
            requests.entry(decl.name().to_string()).or_default().push(Request {
                requester: root.to_string(),
                decl: decl.clone(),
            });
        }

        let mut selected = BTreeMap::new();
        match self.search(requests, &mut selected)? {
            Some(requests) => {
                tracing::debug!("selection settled after {} step(s)", self.steps);
                build_plan(triplet, &requests, selected)
            }
            None => Err(self.dead_end.take().unwrap_or(ResolveError::SearchLimit {
                steps: self.steps,
                packages: Vec::new(),
            })),
        }
    }

    /// Decide the first undecided name, then recurse. Returns the final
    /// requests on success and `None` when this branch has no solution.
    fn search(
        &mut self,
        requests: Requests,
        selected: &mut BTreeMap<String, PortSummary>,
    ) -> Result<Option<Requests>, ResolveError> {
        let Some(name) = requests.keys().find(|n| !selected.contains_key(*n)).cloned() else {
            return Ok(Some(requests));
        };

        let reqs = requests.get(&name).cloned().unwrap_or_default();
        let versions = self.versions(&name)?.to_vec();
        let candidates: Vec<&PortSummary> = versions
            .iter()
            .filter(|s| reqs.iter().all(|r| r.decl.matches_version(&s.version)))
            .collect();

        if candidates.is_empty() {
            self.dead_end(ResolveError::UnresolvedDependency {
                package: name.clone(),
                requesters: reqs.iter().map(Request::requester).collect(),
                available: versions.iter().map(|s| s.version.to_string()).collect(),
            });
            return Ok(None);
        }

        for candidate in candidates {
            self.steps += 1;
            if self.steps > MAX_STEPS {
                return Err(ResolveError::SearchLimit {
                    steps: MAX_STEPS,
                    packages: requests
                        .keys()
                        .filter(|n| !selected.contains_key(*n))
                        .cloned()
                        .collect(),
                });
            }

            let next = match self.extend(&requests, selected, &reqs, candidate) {
                Ok(next) => next,
                Err(e) => {
                    self.dead_end(e);
                    continue;
                }
            };

            tracing::trace!("trying {} {}", name, candidate.version);
            selected.insert(name.clone(), candidate.clone());
            if let Some(done) = self.search(next, selected)? {
                tracing::debug!("selected {} {}", name, candidate.version);
                return Ok(Some(done));
            }
            selected.remove(&name);
        }

        Ok(None)
    }

    /// Requests after selecting `candidate`, or why it cannot be selected.
    fn extend(
        &mut self,
        requests: &Requests,
        selected: &BTreeMap<String, PortSummary>,
        reqs: &[Request],
        candidate: &PortSummary,
    ) -> Result<Requests, ResolveError> {
        for req in reqs {
            check_features(candidate, req)?;
        }

        let requester = format!("{} {}", candidate.name, candidate.version);
        let mut next = requests.clone();
        for decl in &candidate.dependencies {
            let added = Request {
                requester: requester.clone(),
                decl: decl.clone(),
            };
            let existing = next.entry(decl.name().to_string()).or_default();
            for earlier in existing.iter() {
                if !constraints_compatible(earlier.decl.version_req(), decl.version_req()) {
                    return Err(ResolveError::VersionConflict {
                        package: decl.name().to_string(),
                        first: earlier.requester(),
                        second: added.requester(),
                    });
                }
            }
            existing.push(added.clone());

            if let Some(chosen) = selected.get(decl.name()) {
                if !decl.matches_version(&chosen.version) {
                    let available = self
                        .versions(decl.name())?
                        .iter()
                        .map(|s| s.version.to_string())
                        .collect();
                    return Err(ResolveError::UnresolvedDependency {
                        package: decl.name().to_string(),
                        requesters: existing.iter().map(Request::requester).collect(),
                        available,
                    });
                }
                check_features(chosen, &added)?;
            }
        }
        Ok(next)
    }

    fn dead_end(&mut self, err: ResolveError) {
        tracing::trace!("dead end: {}", err);
        if self.dead_end.is_none() {
            self.dead_end = Some(err);
        }
    }
}

/// Every feature `req` asks for is offered by `summary`.
fn check_features(summary: &PortSummary, req: &Request) -> Result<(), ResolveError> {
    match req.decl.features().iter().find(|f| !summary.features.contains(*f)) {
        Some(feature) => Err(ResolveError::UnknownFeature {
            package: summary.name.clone(),
            version: summary.version.to_string(),
            feature: feature.clone(),
            requester: req.requester.clone(),
            available: summary.features.iter().cloned().collect(),
        }),
        None => Ok(()),
    }
}

/// Order the settled selection dependency-first.
fn build_plan(
    triplet: &Triplet,
    requests: &Requests,
    selected: BTreeMap<String, PortSummary>,
) -> Result<InstallPlan, ResolveError> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let nodes: BTreeMap<&str, NodeIndex> = selected
        .keys()
        .map(|name| (name.as_str(), graph.add_node(name.clone())))
        .collect();

    let mut pending: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (name, summary) in &selected {
        let deps: BTreeSet<&str> = summary.dependencies.iter().map(|d| d.name()).collect();
        for dep in &deps {
            if let (Some(&from), Some(&to)) = (nodes.get(name.as_str()), nodes.get(dep)) {
                graph.add_edge(from, to, ());
            }
        }
        pending.insert(name.as_str(), deps);
    }

    if let Some(cycle) = find_cycle(&graph) {
        return Err(ResolveError::CyclicDependency { cycle });
    }

    let mut order: Vec<&str> = Vec::with_capacity(selected.len());
    while !pending.is_empty() {
        let ready: Vec<&str> = pending
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name)
            .collect();
        if ready.is_empty() {
            let cycle = pending.keys().map(|n| n.to_string()).collect();
            return Err(ResolveError::CyclicDependency { cycle });
        }
        for name in ready {
            pending.remove(name);
            for deps in pending.values_mut() {
                deps.remove(name);
            }
            order.push(name);
        }
    }

    let steps = order
        .into_iter()
        .filter_map(|name| {
            let port = selected.get(name)?.clone();
            let features = requests
                .get(name)
                .into_iter()
                .flatten()
                .flat_map(|r| r.decl.features().iter().cloned())
                .collect();
            let dependencies = port
                .dependencies
                .iter()
                .map(|d| d.name().to_string())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            Some(PlannedInstall {
                port,
                features,
                dependencies,
            })
        })
        .collect();

    Ok(InstallPlan::new(triplet.clone(), steps))
}

/// Resolve a manifest's declared dependencies for `triplet`.
pub fn resolve(
    manifest: &Manifest,
    index: &dyn PortIndex,
    triplet: &Triplet,
) -> anyhow::Result<InstallPlan> {
    let deps = manifest.dependencies()?;
    let plan = Resolver::new(index).resolve(manifest.name(), &deps, triplet)?;
    tracing::info!(
        "resolved {} package(s) for {}",
        plan.len(),
        triplet
    );
    Ok(plan)
}
