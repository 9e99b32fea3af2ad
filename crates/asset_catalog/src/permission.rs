//! Allow/deny lists over paths or class names.
//!
//! Both lists are keyed by entry; each entry remembers which owners added it
//! so independent systems can register and retract rules without stepping
//! on each other.

use std::collections::{BTreeMap, BTreeSet};

use crate::path::is_path_or_descendant;

/// Owner tag used when rules are added without a specific owner.
pub const DEFAULT_OWNER: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPermissionList {
    allow: BTreeMap<String, BTreeSet<String>>,
    deny: BTreeMap<String, BTreeSet<String>>,
    deny_all_owners: BTreeSet<String>,
}

impl PathPermissionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from plain entries under the default owner.
    pub fn from_entries<A, D>(allow: A, deny: D) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let mut list = Self::new();
        for entry in allow {
            list.add_allow(entry.as_ref(), DEFAULT_OWNER);
        }
        for entry in deny {
            list.add_deny(entry.as_ref(), DEFAULT_OWNER);
        }
        list
    }

    /// A list that rejects everything.
    pub fn deny_all() -> Self {
        let mut list = Self::new();
        list.add_deny_all(DEFAULT_OWNER);
        list
    }

    pub fn add_allow(&mut self, entry: &str, owner: &str) {
        self.allow
            .entry(entry.to_string())
            .or_default()
            .insert(owner.to_string());
    }

    pub fn add_deny(&mut self, entry: &str, owner: &str) {
        self.deny
            .entry(entry.to_string())
            .or_default()
            .insert(owner.to_string());
    }

    pub fn add_deny_all(&mut self, owner: &str) {
        self.deny_all_owners.insert(owner.to_string());
    }

    /// Drops every rule added by `owner`.
    pub fn unregister_owner(&mut self, owner: &str) {
        for owners in self.allow.values_mut().chain(self.deny.values_mut()) {
            owners.remove(owner);
        }
        self.allow.retain(|_, owners| !owners.is_empty());
        self.deny.retain(|_, owners| !owners.is_empty());
        self.deny_all_owners.remove(owner);
    }

    #[inline]
    pub fn has_filtering(&self) -> bool {
        !self.allow.is_empty() || !self.deny.is_empty() || self.is_deny_list_all()
    }

    #[inline]
    pub fn is_deny_list_all(&self) -> bool {
        !self.deny_all_owners.is_empty()
    }

    pub fn allow_list(&self) -> impl Iterator<Item = &str> {
        self.allow.keys().map(String::as_str)
    }

    pub fn deny_list(&self) -> impl Iterator<Item = &str> {
        self.deny.keys().map(String::as_str)
    }

    pub fn has_allow_entries(&self) -> bool {
        !self.allow.is_empty()
    }

    pub fn has_deny_entries(&self) -> bool {
        !self.deny.is_empty()
    }

    /// Exact-match test.
    pub fn passes_filter(&self, item: &str) -> bool {
        if self.is_deny_list_all() {
            return false;
        }
        if !self.allow.is_empty() && !self.allow.contains_key(item) {
            return false;
        }
        !self.deny.contains_key(item)
    }

    /// Prefix test on segment boundaries.
    ///
    /// An item passes the allow list when it lies at or below an allowed
    /// entry, or, with `allow_parents`, when it is an ancestor of one. It
    /// fails when it lies at or below a denied entry.
    pub fn passes_starts_with_filter(&self, item: &str, allow_parents: bool) -> bool {
        !self.is_deny_list_all()
            && self.allows_starts_with(item, allow_parents)
            && !self.denies_starts_with(item)
    }

    /// Allow half of [`Self::passes_starts_with_filter`]; true when there
    /// are no allow entries.
    pub fn allows_starts_with(&self, item: &str, allow_parents: bool) -> bool {
        self.allow.is_empty()
            || self.allow.keys().any(|entry| {
                is_path_or_descendant(item, entry)
                    || (allow_parents && is_path_or_descendant(entry, item))
            })
    }

    /// Deny half of [`Self::passes_starts_with_filter`], ignoring deny-all.
    pub fn denies_starts_with(&self, item: &str) -> bool {
        self.deny
            .keys()
            .any(|entry| is_path_or_descendant(item, entry))
    }
}
