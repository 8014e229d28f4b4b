//! Expiry Index Module
//!
//! Secondary ordering of entries by expiration time, used by the sweep to find
//! stale entries without scanning the whole store.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::cache::EntryId;

// == Expiry Index ==
/// Orders entry identities by `expires_at` ascending.
///
/// Holds at most one position per identity as long as callers pair every
/// `insert` for a replaced entry with a `remove` of its old expiry.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    order: BTreeSet<(DateTime<Utc>, EntryId)>,
}

impl ExpiryIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Records `id` as expiring at `expires_at`.
    pub fn insert(&mut self, id: EntryId, expires_at: DateTime<Utc>) {
        self.order.insert((expires_at, id));
    }

    // == Remove ==
    /// Drops the position of `id` at `expires_at`. Returns false if absent.
    pub fn remove(&mut self, id: &EntryId, expires_at: DateTime<Utc>) -> bool {
        self.order.remove(&(expires_at, id.clone()))
    }

    // == Range Before ==
    /// Returns every identity with `expires_at <= cutoff`, soonest first,
    /// optionally restricted to one rule type.
    ///
    /// Each call reads current state; nothing is remembered between calls.
    pub fn range_before(&self, cutoff: DateTime<Utc>, rule_type: Option<&str>) -> Vec<EntryId> {
        self.order
            .iter()
            .take_while(|(expires_at, _)| *expires_at <= cutoff)
            .filter(|(_, id)| rule_type.map_or(true, |rt| id.rule_type == rt))
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
