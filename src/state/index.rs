//! Titles and durations of search results, keyed by media ID.

use crate::media::SearchResult;
use std::collections::HashMap;

/// What the bot remembers about a track it has offered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedTrack {
    /// Human-readable title
    pub title: String,
    /// Duration in seconds, `0` when the source did not report one
    pub duration_secs: u32,
}

/// Unbounded index of every search result seen during the process lifetime.
#[derive(Debug, Default)]
pub struct ResultIndex {
    tracks: HashMap<String, IndexedTrack>,
}

impl ResultIndex {
    /// Insert or overwrite entries for a batch of search results.
    ///
    /// A result without a duration keeps the one already known for its ID.
    pub fn record_search(&mut self, results: &[SearchResult]) {
        for result in results {
            let known = self.tracks.get(&result.id).map_or(0, |t| t.duration_secs);
            let duration_secs = if result.duration_secs == 0 {
                known
            } else {
                result.duration_secs
            };
            self.tracks.insert(
                result.id.clone(),
                IndexedTrack {
                    title: result.title.clone(),
                    duration_secs,
                },
            );
        }
    }

    /// Update the duration of an already indexed track.
    pub fn record_duration(&mut self, id: &str, duration_secs: u32) {
        if let Some(track) = self.tracks.get_mut(id) {
            track.duration_secs = duration_secs;
        }
    }

    /// Look up a track by media ID.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&IndexedTrack> {
        self.tracks.get(id)
    }
}
