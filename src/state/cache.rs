//! Media ID to delivery reference cache.

use std::collections::HashMap;

/// A track that has been uploaded to the storage channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Reusable delivery reference (Telegram `file_id`)
    pub reference: String,
    /// Title the track was uploaded with
    pub title: String,
}

/// Process-lifetime audio cache. Entries are never replaced; the only way
/// to drop them is [`AudioCache::clear`], which removes all at once.
#[derive(Debug, Default)]
pub struct AudioCache {
    entries: HashMap<String, CacheEntry>,
}

impl AudioCache {
    /// Cached entry for a media ID.
    #[must_use]
    pub fn get(&self, media_id: &str) -> Option<&CacheEntry> {
        self.entries.get(media_id)
    }

    /// Insert an entry unless one already exists. Returns `true` if inserted.
    pub fn insert(&mut self, media_id: &str, entry: CacheEntry) -> bool {
        if self.entries.contains_key(media_id) {
            return false;
        }
        self.entries.insert(media_id.to_string(), entry);
        true
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        std::mem::take(&mut self.entries).len()
    }

    /// Number of cached tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
