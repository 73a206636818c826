// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Getter, Group};

/// The set of groups served by one node, looked up by name.
///
/// The registry is owned by the application and shared by [`Arc`] with whatever needs to
/// resolve groups by name, such as the HTTP server. Groups are added and never removed.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use peercache::{GetterFn, Registry};
///
/// let registry = Registry::new();
/// registry.make_group(
///     "scores",
///     2 << 10,
///     GetterFn::new(|key: String| async move { Ok(Bytes::from(key)) }),
/// );
///
/// assert!(registry.group("scores").is_some());
/// assert!(registry.group("missing").is_none());
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group and registers it under `name`.
    ///
    /// A group already registered under the same name is replaced. Handles to the old group
    /// stay valid but it is no longer reachable through the registry.
    pub fn make_group(&self, name: impl Into<String>, cache_bytes: usize, getter: impl Getter + 'static) -> Arc<Group> {
        let group = Arc::new(Group::new(name, cache_bytes, getter));
        let previous = self
            .groups
            .write()
            .insert(group.name().to_owned(), Arc::clone(&group));

        if previous.is_some() {
            tracing::warn!(group.name = group.name(), "group replaced");
        } else {
            tracing::debug!(group.name = group.name(), cache.max_bytes = cache_bytes, "group created");
        }
        group
    }

    /// Returns the group registered under `name`.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Number of registered groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Returns `true` if no groups are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Names of the registered groups, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::GetterFn;

    fn echo() -> GetterFn<impl Fn(String) -> std::future::Ready<crate::Result<Bytes>> + Send + Sync> {
        GetterFn::new(|key: String| std::future::ready(Ok(Bytes::from(key))))
    }

    #[test]
    fn made_groups_are_found_by_name() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        let made = registry.make_group("scores", 64, echo());
        let found = registry.group("scores").unwrap();

        assert!(Arc::ptr_eq(&made, &found));
        assert_eq!(found.name(), "scores");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_name_is_absent() {
        let registry = Registry::new();
        registry.make_group("scores", 64, echo());
        assert!(registry.group("users").is_none());
    }

    #[test]
    fn names_are_sorted() {
        let registry = Registry::new();
        registry.make_group("users", 0, echo());
        registry.make_group("scores", 0, echo());
        registry.make_group("orders", 0, echo());
        assert_eq!(registry.names(), vec!["orders", "scores", "users"]);
    }

    #[test]
    fn same_name_replaces_the_group() {
        let registry = Registry::new();
        let first = registry.make_group("scores", 64, echo());
        let second = registry.make_group("scores", 128, echo());

        assert_eq!(registry.len(), 1);
        let found = registry.group("scores").unwrap();
        assert!(Arc::ptr_eq(&found, &second));
        assert!(!Arc::ptr_eq(&found, &first));
    }
}
