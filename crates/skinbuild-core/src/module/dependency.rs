//! Dependency set construction for a single entry module.

use std::path::PathBuf;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::{Error, Result};

use super::name::ModuleName;
use super::resolver::{Category, ModuleReference, ModuleResolver};

/// Name of the base support module every build links.
pub const DEFAULT_RUNTIME_MODULE: &str = "builtin";

/// Ordered references needed to build one entry module:
/// the runtime module, then system modules, then application modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencySet {
    entries: Vec<ModuleReference>,
}

impl DependencySet {
    /// All references in set order, runtime first.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleReference> {
        self.entries.iter()
    }

    /// Number of modules, the runtime module included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the runtime module is always present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The implicit runtime module.
    pub fn runtime(&self) -> Option<&ModuleReference> {
        self.entries.first().filter(|r| r.category == Category::Runtime)
    }

    /// Runtime and system modules, in set order.
    pub fn library_modules(&self) -> impl Iterator<Item = &ModuleReference> {
        self.entries.iter().filter(|r| r.category.is_library())
    }

    /// Application modules, in set order.
    pub fn application_modules(&self) -> impl Iterator<Item = &ModuleReference> {
        self.entries
            .iter()
            .filter(|r| r.category == Category::Application)
    }
}

/// Builds [`DependencySet`]s against a resolver.
///
/// The runtime module is passed in explicitly so tests and alternative
/// runtimes can replace it.
#[derive(Debug, Clone)]
pub struct DependencySetBuilder<'a> {
    resolver: &'a ModuleResolver,
    runtime: ModuleName,
}

impl<'a> DependencySetBuilder<'a> {
    /// Create a builder.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Resolver for the entry module's library and output roots
    /// * `runtime` - The implicit runtime module, placed first in every set
    pub fn new(resolver: &'a ModuleResolver, runtime: ModuleName) -> Self {
        Self { resolver, runtime }
    }

    /// The runtime module prepended to every set.
    pub fn runtime(&self) -> &ModuleName {
        &self.runtime
    }

    /// Resolve the full dependency set for `entry`.
    ///
    /// Declared order is preserved. Any two modules (the entry included)
    /// resolving to the same source file are rejected, as is listing the
    /// runtime module explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedModule`] for the first module whose files
    /// are missing, or [`Error::DuplicateDependency`] for the first repeat.
    pub fn build(
        &self,
        entry: &ModuleName,
        system: &[ModuleName],
        application: &[ModuleName],
    ) -> Result<DependencySet> {
        let declared = std::iter::once((&self.runtime, Category::Runtime))
            .chain(system.iter().map(|n| (n, Category::System)))
            .chain(application.iter().map(|n| (n, Category::Application)));

        let mut seen: FxHashMap<PathBuf, ModuleName> = FxHashMap::default();
        seen.insert(
            self.resolver.locate(entry, Category::Entry).source,
            entry.clone(),
        );

        let mut entries = Vec::with_capacity(1 + system.len() + application.len());
        for (name, category) in declared {
            let reference = self.resolver.resolve(name, category)?;
            if let Some(existing) = seen.get(&reference.files.source) {
                return Err(Error::DuplicateDependency {
                    name: name.to_string(),
                    existing: existing.to_string(),
                    path: reference.files.source,
                });
            }
            seen.insert(reference.files.source.clone(), name.clone());
            entries.push(reference);
        }

        Ok(DependencySet { entries })
    }
}
