//! Local persistence for location preferences.
//!
//! Three independently-keyed JSON files back the store: the last-selected
//! location, the bounded recent-locations list, and the favorites set.
//! Every mutation writes through synchronously. The store never fails its
//! caller: a missing or corrupt file degrades to that key's empty default,
//! and encode/IO failures are logged and swallowed.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::location::Location;

const SAVED_LOCATION_FILE: &str = "saved_location.json";
const RECENT_LOCATIONS_FILE: &str = "recent_locations.json";
const FAVORITE_LOCATIONS_FILE: &str = "favorite_locations.json";

/// Maximum number of recent locations kept, most recent first.
const RECENTS_CAPACITY: usize = 5;

/// In-memory snapshot of everything the store persists.
#[derive(Debug, Clone, Default)]
pub struct Preferences {
    pub saved: Option<Location>,
    pub recents: Vec<Location>,
    pub favorites: HashSet<Location>,
}

#[derive(Clone, Debug)]
pub struct PreferenceStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    dir: PathBuf,
    state: Mutex<Preferences>,
}

impl PreferenceStore {
    /// Open the store rooted at `dir`, loading whatever is readable.
    ///
    /// Each key is loaded independently, so a corrupt favorites file
    /// leaves the saved location and recents intact.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), "failed to create preference dir: {e}");
        }

        let saved: Option<Location> = read_key(&dir.join(SAVED_LOCATION_FILE));
        let recents: Vec<Location> =
            read_key(&dir.join(RECENT_LOCATIONS_FILE)).unwrap_or_default();
        let favorites: Vec<Location> =
            read_key(&dir.join(FAVORITE_LOCATIONS_FILE)).unwrap_or_default();

        let state = Preferences {
            saved,
            recents,
            favorites: favorites.into_iter().collect(),
        };

        Self {
            inner: Arc::new(Inner {
                dir,
                state: Mutex::new(state),
            }),
        }
    }

    /// Snapshot of the full persisted state.
    pub fn preferences(&self) -> Preferences {
        self.inner.state.lock().unwrap().clone()
    }

    pub fn saved(&self) -> Option<Location> {
        self.inner.state.lock().unwrap().saved.clone()
    }

    /// Recent locations, most recent first.
    pub fn recents(&self) -> Vec<Location> {
        self.inner.state.lock().unwrap().recents.clone()
    }

    /// Favorites in presentation-agnostic order.
    pub fn favorites(&self) -> Vec<Location> {
        let state = self.inner.state.lock().unwrap();
        state.favorites.iter().cloned().collect()
    }

    pub fn is_favorite(&self, location: &Location) -> bool {
        self.inner.state.lock().unwrap().favorites.contains(location)
    }

    /// Overwrite the single saved-location slot.
    pub fn save_selected(&self, location: &Location) {
        let mut state = self.inner.state.lock().unwrap();
        state.saved = Some(location.clone());
        self.write_key(SAVED_LOCATION_FILE, &state.saved);
    }

    /// Prepend `location` to the recents list, de-duplicating by id and
    /// capping the list at five entries. Re-recording a present id moves
    /// it to the front without growing the list.
    pub fn record_recent(&self, location: &Location) {
        let mut state = self.inner.state.lock().unwrap();
        state.recents.retain(|recent| recent.id != location.id);
        state.recents.insert(0, location.clone());
        state.recents.truncate(RECENTS_CAPACITY);
        self.write_key(RECENT_LOCATIONS_FILE, &state.recents);
    }

    /// Flip favorite membership for `location`, persist the whole set,
    /// and return the resulting membership.
    pub fn toggle_favorite(&self, location: &Location) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        let now_member = if state.favorites.contains(location) {
            state.favorites.remove(location);
            false
        } else {
            state.favorites.insert(location.clone());
            true
        };
        let as_list: Vec<&Location> = state.favorites.iter().collect();
        self.write_key(FAVORITE_LOCATIONS_FILE, &as_list);
        now_member
    }

    fn write_key<T: Serialize>(&self, file: &str, value: &T) {
        let path = self.inner.dir.join(file);
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = file, "failed to encode preference: {e}");
                return;
            }
        };
        if let Err(e) = fs::write(&path, bytes) {
            tracing::warn!(path = %path.display(), "failed to persist preference: {e}");
        }
    }
}

fn read_key<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable preference: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn loc(id: &str, name: &str) -> Location {
        Location {
            id: id.to_string(),
            name: name.to_string(),
            latitude: 50.15,
            longitude: -5.07,
        }
    }

    #[test]
    fn test_open_on_empty_dir_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::open(dir.path());

        let prefs = store.preferences();
        assert!(prefs.saved.is_none());
        assert!(prefs.recents.is_empty());
        assert!(prefs.favorites.is_empty());
    }

    #[test]
    fn test_save_selected_roundtrip() {
        let dir = TempDir::new().unwrap();
        {
            let store = PreferenceStore::open(dir.path());
            store.save_selected(&loc("50.15,-5.07", "Falmouth"));
        }

        let reopened = PreferenceStore::open(dir.path());
        let saved = reopened.saved().expect("saved location should persist");
        assert_eq!(saved.id, "50.15,-5.07");
        assert_eq!(saved.name, "Falmouth");
    }

    #[test]
    fn test_record_recent_caps_at_five() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::open(dir.path());

        for i in 0..7 {
            store.record_recent(&loc(&format!("id-{i}"), &format!("Place {i}")));
        }

        let recents = store.recents();
        assert_eq!(recents.len(), 5);
        // Most recent first: 6, 5, 4, 3, 2.
        let ids: Vec<&str> = recents.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["id-6", "id-5", "id-4", "id-3", "id-2"]);
    }

    #[test]
    fn test_record_recent_moves_existing_to_front() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::open(dir.path());

        store.record_recent(&loc("a", "A"));
        store.record_recent(&loc("b", "B"));
        store.record_recent(&loc("c", "C"));
        store.record_recent(&loc("a", "A again"));

        let recents = store.recents();
        assert_eq!(recents.len(), 3, "re-recording must not grow the list");
        let ids: Vec<&str> = recents.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_toggle_favorite_returns_membership_and_is_idempotent_pairwise() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::open(dir.path());
        let falmouth = loc("50.15,-5.07", "Falmouth");

        assert!(store.toggle_favorite(&falmouth));
        assert!(store.is_favorite(&falmouth));

        assert!(!store.toggle_favorite(&falmouth));
        assert!(!store.is_favorite(&falmouth));
    }

    #[test]
    fn test_toggle_favorite_persists_each_call() {
        let dir = TempDir::new().unwrap();
        let falmouth = loc("50.15,-5.07", "Falmouth");

        {
            let store = PreferenceStore::open(dir.path());
            store.toggle_favorite(&falmouth);
        }
        {
            let reopened = PreferenceStore::open(dir.path());
            assert!(reopened.is_favorite(&falmouth));
            reopened.toggle_favorite(&falmouth);
        }

        let reopened = PreferenceStore::open(dir.path());
        assert!(!reopened.is_favorite(&falmouth));
    }

    #[test]
    fn test_favorite_matching_ignores_name_changes() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::open(dir.path());

        store.toggle_favorite(&loc("50.15,-5.07", "Falmouth"));
        // Same coordinate with a fresher display name is the same entity.
        assert!(store.is_favorite(&loc("50.15,-5.07", "Falmouth, Cornwall, UK")));
    }

    #[test]
    fn test_corrupt_favorites_degrade_to_empty_leaving_other_keys() {
        let dir = TempDir::new().unwrap();
        {
            let store = PreferenceStore::open(dir.path());
            store.save_selected(&loc("x", "X"));
            store.record_recent(&loc("x", "X"));
            store.toggle_favorite(&loc("x", "X"));
        }

        fs::write(dir.path().join(FAVORITE_LOCATIONS_FILE), b"{not json!").unwrap();

        let store = PreferenceStore::open(dir.path());
        assert!(store.favorites().is_empty(), "corrupt key becomes default");
        assert!(store.saved().is_some(), "saved key unaffected");
        assert_eq!(store.recents().len(), 1, "recents key unaffected");
    }

    #[test]
    fn test_corrupt_saved_location_degrades_to_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SAVED_LOCATION_FILE), b"\xff\xfe").unwrap();

        let store = PreferenceStore::open(dir.path());
        assert!(store.saved().is_none());
    }

    #[test]
    fn test_coordinates_roundtrip_exactly() {
        let dir = TempDir::new().unwrap();
        let mut precise = loc("p", "Precise");
        precise.latitude = 43.656912345678901;
        precise.longitude = -70.255876543210123;

        {
            let store = PreferenceStore::open(dir.path());
            store.save_selected(&precise);
        }

        let saved = PreferenceStore::open(dir.path()).saved().unwrap();
        assert_eq!(saved.latitude, precise.latitude);
        assert_eq!(saved.longitude, precise.longitude);
    }
}
