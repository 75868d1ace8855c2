//! User-declared infrastructure context.
//!
//! The context is owned by the session layer and mutated between
//! queries; the engine only ever sees a copy carried inside a
//! [`QueryRequest`](super::query::QueryRequest), so edits made while a
//! query is in flight cannot affect it.

use super::record::Ecosystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A package installed in the user's environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub ecosystem: Ecosystem,
    pub name: String,
    pub version: String,
}

/// Declared infrastructure profile a query is scored against.
///
/// Starts empty at session start; every field is additive evidence for
/// the infrastructure matcher. `BTreeSet` keeps iteration order
/// deterministic for reproducible ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfrastructureContext {
    #[serde(default)]
    pub os_versions: BTreeSet<String>,
    #[serde(default)]
    pub services: BTreeSet<String>,
    #[serde(default)]
    pub packages: BTreeSet<InstalledPackage>,
    /// Free-text exposure tags, e.g. `internet-exposed`.
    #[serde(default)]
    pub network_exposure: BTreeSet<String>,
}

impl InfrastructureContext {
    /// True when the context declares nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.os_versions.is_empty()
            && self.services.is_empty()
            && self.packages.is_empty()
            && self.network_exposure.is_empty()
    }

    /// Installed packages for one ecosystem, in deterministic order.
    pub fn packages_in(&self, ecosystem: &Ecosystem) -> impl Iterator<Item = &InstalledPackage> {
        self.packages
            .iter()
            .filter(move |pkg| &pkg.ecosystem == ecosystem)
    }
}
