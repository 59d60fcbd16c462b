//! Batched query plans keyed by upload.
//!
//! Stages that fetch rows by derived identifiers (peptides referenced by
//! matches, proteins referenced by peptides) collect those identifiers into
//! a [`ScopedIdSet`] and split it into [`KeyBatch`]es. Each batch renders to
//! one statement of the form
//!
//! ```text
//! (upload_id = ? AND id IN (?, ?, ...)) OR (upload_id = ? AND id IN (?, ...))
//! ```
//!
//! with every value bound as a parameter. The union of the rows returned by
//! all batches equals issuing one query per upload and concatenating.
//!
//! # Bind Budget
//!
//! A group costs one bound value for its upload id plus one per local id.
//! Batches are cut so that no statement binds more than `max_binds` values;
//! an upload whose ids do not fit is continued in the next batch under a new
//! group. Every key lands in exactly one batch, which keeps per-key
//! aggregation (e.g. `GROUP BY peptide`) correct across statements.

use std::collections::BTreeSet;

use crate::keys::{ScopedId, UploadId};

/// Smallest usable budget: one upload id and one local id.
pub const MIN_BIND_BUDGET: usize = 2;

/// A deduplicated set of upload-scoped identifiers to fetch from one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedIdSet<T: Ord> {
    keys: BTreeSet<ScopedId<T>>,
}

impl<T: Ord> Default for ScopedIdSet<T> {
    fn default() -> Self {
        Self {
            keys: BTreeSet::new(),
        }
    }
}

impl<T: Ord> ScopedIdSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key, returning `false` if it was already present.
    pub fn insert(&mut self, key: ScopedId<T>) -> bool {
        self.keys.insert(key)
    }

    pub fn contains(&self, key: &ScopedId<T>) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in `(upload, local id)` order.
    pub fn iter(&self) -> impl Iterator<Item = &ScopedId<T>> {
        self.keys.iter()
    }

    /// Distinct uploads that have at least one key, ascending.
    pub fn uploads(&self) -> Vec<UploadId> {
        let mut uploads: Vec<UploadId> = self.keys.iter().map(|k| k.upload_id).collect();
        uploads.dedup();
        uploads
    }

    /// Splits the set into statements binding at most `max_binds` values each.
    ///
    /// Budgets below [`MIN_BIND_BUDGET`] are raised to it. An empty set
    /// yields no batches, so callers issue no statement at all.
    pub fn batches(&self, max_binds: usize) -> Vec<KeyBatch<'_, T>> {
        let budget = max_binds.max(MIN_BIND_BUDGET);
        let mut batches = Vec::new();
        let mut current: Vec<UploadGroup<'_, T>> = Vec::new();
        let mut used = 0;

        for key in &self.keys {
            let extends = matches!(current.last(), Some(g) if g.upload_id == key.upload_id);
            let cost = if extends { 1 } else { 2 };
            if used + cost > budget && !current.is_empty() {
                batches.push(KeyBatch {
                    groups: std::mem::take(&mut current),
                });
                used = 0;
            }

            match current.last_mut() {
                Some(group) if group.upload_id == key.upload_id => {
                    group.local_ids.push(&key.local_id);
                    used += 1;
                }
                _ => {
                    current.push(UploadGroup {
                        upload_id: key.upload_id,
                        local_ids: vec![&key.local_id],
                    });
                    used += 2;
                }
            }
        }

        if !current.is_empty() {
            batches.push(KeyBatch { groups: current });
        }
        batches
    }
}

impl<T: Ord> FromIterator<ScopedId<T>> for ScopedIdSet<T> {
    fn from_iter<I: IntoIterator<Item = ScopedId<T>>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl<T: Ord> Extend<ScopedId<T>> for ScopedIdSet<T> {
    fn extend<I: IntoIterator<Item = ScopedId<T>>>(&mut self, iter: I) {
        self.keys.extend(iter);
    }
}

/// One statement's worth of upload groups.
#[derive(Debug, Clone)]
pub struct KeyBatch<'a, T> {
    groups: Vec<UploadGroup<'a, T>>,
}

impl<'a, T: PartialEq> KeyBatch<'a, T> {
    pub fn groups(&self) -> &[UploadGroup<'a, T>] {
        &self.groups
    }

    /// Number of values the rendered statement binds.
    pub fn bind_count(&self) -> usize {
        self.groups.iter().map(|g| 1 + g.local_ids.len()).sum()
    }

    /// Whether a row keyed by `upload_id` / `local_id` satisfies this batch's predicate.
    pub fn matches(&self, upload_id: UploadId, local_id: &T) -> bool {
        self.groups
            .iter()
            .any(|g| g.upload_id == upload_id && g.local_ids.iter().any(|id| *id == local_id))
    }
}

/// `upload_id = ? AND id IN (...)` for a single upload. Never empty.
#[derive(Debug, Clone)]
pub struct UploadGroup<'a, T> {
    pub upload_id: UploadId,
    pub local_ids: Vec<&'a T>,
}
