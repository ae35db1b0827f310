//! Namespaced external names for components.
//!
//! Consumers refer to exported components as `namespace::name`. Within one
//! namespace the mapping is 1:1: an external id names exactly one component
//! and a component has exactly one external id.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, Error, miette::Diagnostic, PartialEq, Eq)]
pub enum AliasError {
    #[error("alias `{id}` already refers to `{existing}`, cannot also refer to `{requested}`")]
    #[diagnostic(code(berth::alias::collision))]
    AliasCollision {
        id: String,
        existing: String,
        requested: String,
    },

    #[error("`{component}` is already exported as `{existing}`, cannot also export it as `{requested}`")]
    #[diagnostic(code(berth::alias::already_registered))]
    AlreadyRegistered {
        component: String,
        existing: String,
        requested: String,
    },

    #[error("invalid alias `{0}`: names may not be empty or contain `::`")]
    #[diagnostic(code(berth::alias::invalid))]
    Invalid(String),
}

/// Join a namespace and a local name.
pub fn external_id(namespace: &str, local: &str) -> String {
    format!("{}::{}", namespace, local)
}

/// Registry of external ids for one build graph.
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    /// external id -> component
    targets: BTreeMap<String, String>,

    /// (namespace, component) -> external id
    ids: BTreeMap<(String, String), String>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `local` under `namespace` with its own name.
    pub fn register_alias(&mut self, namespace: &str, local: &str) -> Result<String, AliasError> {
        self.register_alias_as(namespace, local, local)
    }

    /// Register component `local` under `namespace` as `alias`.
    ///
    /// Registering the same pair twice returns the same id.
    pub fn register_alias_as(
        &mut self,
        namespace: &str,
        local: &str,
        alias: &str,
    ) -> Result<String, AliasError> {
        for part in [namespace, alias] {
            if part.is_empty() || part.contains("::") {
                return Err(AliasError::Invalid(part.to_string()));
            }
        }

        let id = external_id(namespace, alias);

        if let Some(existing) = self.targets.get(&id) {
            if existing != local {
                return Err(AliasError::AliasCollision {
                    id,
                    existing: existing.clone(),
                    requested: local.to_string(),
                });
            }
            return Ok(id);
        }

        let key = (namespace.to_string(), local.to_string());
        if let Some(existing) = self.ids.get(&key) {
            return Err(AliasError::AlreadyRegistered {
                component: local.to_string(),
                existing: existing.clone(),
                requested: id,
            });
        }

        tracing::debug!("registered {} -> {}", id, local);
        self.targets.insert(id.clone(), local.to_string());
        self.ids.insert(key, id.clone());
        Ok(id)
    }

    /// The component an external id refers to.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.targets.get(id).map(String::as_str)
    }

    /// The external id of `local` in `namespace`.
    pub fn id_of(&self, namespace: &str, local: &str) -> Option<&str> {
        self.ids
            .get(&(namespace.to_string(), local.to_string()))
            .map(String::as_str)
    }

    /// All (external id, component) pairs, sorted by id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.targets.iter().map(|(id, c)| (id.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
