use std::collections::HashSet;

use crate::model::Station;
use crate::storage::KeyValueStore;

pub const FAVORITES_KEY: &str = "favorites";
pub const HISTORY_KEY: &str = "history";
pub const LANG_KEY: &str = "lang";

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Set of favorited stream urls, persisted as a JSON array under
/// `favorites`.
#[derive(Debug, Default, Clone)]
pub struct Favorites {
    urls: HashSet<String>,
    /// Insertion order, so the persisted array is stable.
    order: Vec<String>,
}

impl Favorites {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let order: Vec<String> = store
            .get(FAVORITES_KEY)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("ignoring malformed favorites: {}", e);
                    None
                }
            })
            .unwrap_or_default();
        let mut favorites = Self::default();
        for url in order {
            if favorites.urls.insert(url.clone()) {
                favorites.order.push(url);
            }
        }
        favorites
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Flips membership and persists.  Returns whether `url` is now a
    /// favorite.  A failed write is logged; memory keeps the new value.
    pub fn toggle(&mut self, url: &str, store: &mut dyn KeyValueStore) -> bool {
        let now_favorite = if self.urls.remove(url) {
            self.order.retain(|u| u != url);
            false
        } else {
            self.urls.insert(url.to_string());
            self.order.push(url.to_string());
            true
        };
        self.persist(store);
        now_favorite
    }

    fn persist(&self, store: &mut dyn KeyValueStore) {
        let json = match serde_json::to_string(&self.order) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to encode favorites: {}", e);
                return;
            }
        };
        if let Err(e) = store.set(FAVORITES_KEY, &json) {
            tracing::warn!("failed to persist favorites: {}", e);
        }
    }
}

/// Recently played stations, newest first, deduplicated by stream url.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Station>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl History {
    pub fn load(store: &dyn KeyValueStore, limit: usize) -> Self {
        let mut entries: Vec<Station> = store
            .get(HISTORY_KEY)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("ignoring malformed history: {}", e);
                    None
                }
            })
            .unwrap_or_default();
        entries.truncate(limit);
        Self { entries, limit }
    }

    pub fn entries(&self) -> &[Station] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Station> {
        self.entries.get(idx)
    }

    /// Moves `station` to the front, dropping any older entry with the same
    /// url and trimming to the limit, then persists.
    pub fn push(&mut self, station: &Station, store: &mut dyn KeyValueStore) {
        self.entries.retain(|s| s.stream_url != station.stream_url);
        self.entries.insert(0, station.clone());
        self.entries.truncate(self.limit);
        self.persist(store);
    }

    fn persist(&self, store: &mut dyn KeyValueStore) {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to encode history: {}", e);
                return;
            }
        };
        if let Err(e) = store.set(HISTORY_KEY, &json) {
            tracing::warn!("failed to persist history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn station(url: &str) -> Station {
        Station {
            name: url.to_uppercase(),
            stream_url: url.to_string(),
            ..Station::default()
        }
    }

    #[test]
    fn test_favorite_double_toggle_persists_empty_array() {
        let mut store = MemoryStore::new();
        let mut favorites = Favorites::load(&store);
        assert!(favorites.toggle("x", &mut store));
        assert_eq!(store.get(FAVORITES_KEY).as_deref(), Some("[\"x\"]"));
        assert!(!favorites.toggle("x", &mut store));
        assert_eq!(store.get(FAVORITES_KEY).as_deref(), Some("[]"));
        assert!(favorites.is_empty());
    }

    #[test]
    fn test_favorites_reload() {
        let mut store = MemoryStore::new();
        let mut favorites = Favorites::load(&store);
        favorites.toggle("a", &mut store);
        favorites.toggle("b", &mut store);

        let reloaded = Favorites::load(&store);
        assert!(reloaded.contains("a"));
        assert!(reloaded.contains("b"));
        assert_eq!(reloaded.urls().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_history_moves_replayed_to_front() {
        let mut store = MemoryStore::new();
        let mut history = History::load(&store, 50);
        history.push(&station("a"), &mut store);
        history.push(&station("b"), &mut store);
        history.push(&station("a"), &mut store);

        let urls: Vec<_> = history.entries().iter().map(|s| s.stream_url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b"]);
    }

    #[test]
    fn test_history_capped_at_limit() {
        let mut store = MemoryStore::new();
        let mut history = History::load(&store, DEFAULT_HISTORY_LIMIT);
        for i in 0..51 {
            history.push(&station(&format!("s{i}")), &mut store);
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.get(0).map(|s| s.stream_url.as_str()), Some("s50"));

        let reloaded = History::load(&store, DEFAULT_HISTORY_LIMIT);
        assert_eq!(reloaded.len(), 50);
        assert!(reloaded.entries().iter().all(|s| s.stream_url != "s0"));
    }

    #[test]
    fn test_malformed_history_loads_empty() {
        let mut store = MemoryStore::new();
        store.set(HISTORY_KEY, "oops").unwrap();
        assert!(History::load(&store, 50).is_empty());
    }
}
