// bbox_sync/server/src/concurrent/bounding_box_cache.rs

use crate::core::types::{BoundingBox, MemberSet};
use ahash::AHashMap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// Owner-region -> members, copied out of the cache.
pub type CacheSnapshot = AHashMap<BoundingBox, Arc<MemberSet>>;

/// Authoritative owner-region store for one dimension.
///
/// Entries sit behind DashMap shard locks and member sets are swapped as whole
/// `Arc`s, so a concurrent reader sees either the old or the new member set of
/// an owner, never a mix. Iteration takes shard read locks one at a time and
/// does not fault while writers run on other shards.
#[derive(Debug)]
pub struct BoundingBoxCache {
    entries: DashMap<BoundingBox, Arc<MemberSet>, ahash::RandomState>,
}

impl BoundingBoxCache {
    pub fn new() -> Self {
        BoundingBoxCache {
            entries: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Upserts `owner`, replacing any previous member set wholesale.
    /// Returns false when the stored entry was already identical.
    pub fn add_bounding_boxes<I>(&self, owner: BoundingBox, members: I) -> bool
    where
        I: IntoIterator<Item = BoundingBox>,
    {
        let members: MemberSet = members.into_iter().collect();
        match self.entries.entry(owner) {
            Entry::Occupied(mut existing) => {
                if **existing.get() == members {
                    return false;
                }
                trace!("[Cache] Replacing {} members under {}", members.len(), owner);
                existing.insert(Arc::new(members));
                true
            }
            Entry::Vacant(slot) => {
                trace!("[Cache] Adding {} with {} members", owner, members.len());
                slot.insert(Arc::new(members));
                true
            }
        }
    }

    /// Owner-only entry.
    pub fn add_bounding_box(&self, owner: BoundingBox) -> bool {
        self.add_bounding_boxes(owner, std::iter::empty())
    }

    /// No-op when `owner` is absent.
    pub fn remove_bounding_box(&self, owner: &BoundingBox) -> bool {
        self.entries.remove(owner).is_some()
    }

    pub fn contains(&self, owner: &BoundingBox) -> bool {
        self.entries.contains_key(owner)
    }

    pub fn members(&self, owner: &BoundingBox) -> Option<Arc<MemberSet>> {
        self.entries.get(owner).map(|entry| entry.value().clone())
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn get_stats(&self) -> CacheStats {
        let mut total_members = 0;
        let mut owner_only_entries = 0;
        for entry in self.entries.iter() {
            total_members += entry.value().len();
            if entry.value().is_empty() {
                owner_only_entries += 1;
            }
        }
        CacheStats {
            owners: self.entries.len(),
            total_members,
            owner_only_entries,
        }
    }
}

impl Default for BoundingBoxCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub owners: usize,
    pub total_members: usize,
    pub owner_only_entries: usize,
}
