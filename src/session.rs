//! Session controller for the tide pipeline.
//!
//! One logical session owns the current location, drives fetches, and
//! publishes immutable state snapshots through a watch channel. Consumers
//! never observe partially-updated state: each change replaces the whole
//! snapshot.
//!
//! Selecting a location persists it first (saved slot + recents), then
//! spawns the fetch. There is no cancellation: an in-flight fetch that has
//! been superseded by a newer selection is discarded at completion time by
//! comparing its generation against the current one (last write wins).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::api::{TideApiClient, TideError};
use crate::location::Location;
use crate::series::{self, TideEvent};
use crate::store::PreferenceStore;
use crate::traits::Clock;

/// Lifecycle of the current tide fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TidePhase {
    /// No location chosen yet.
    #[default]
    Idle,
    Loading,
    /// Sorted series; may be empty, which the UI treats as "no data".
    Loaded(Vec<TideEvent>),
    Failed(TideError),
}

/// Immutable view of session state, replaced wholesale on every change.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub location: Option<Location>,
    pub phase: TidePhase,
    /// Most recent first, capped at five.
    pub recents: Vec<Location>,
    pub favorites: Vec<Location>,
}

#[derive(Clone)]
pub struct TideSession {
    inner: Arc<Inner>,
}

struct Inner {
    client: TideApiClient,
    store: PreferenceStore,
    clock: Arc<dyn Clock>,
    tx: watch::Sender<SessionSnapshot>,
    /// Bumped on every selection; a completing fetch publishes only if its
    /// generation is still the latest.
    generation: AtomicU64,
}

impl TideSession {
    pub fn new(client: TideApiClient, store: PreferenceStore, clock: Arc<dyn Clock>) -> Self {
        let initial = SessionSnapshot {
            location: None,
            phase: TidePhase::Idle,
            recents: store.recents(),
            favorites: store.favorites(),
        };
        let (tx, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                client,
                store,
                clock,
                tx,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribe to state snapshots. The receiver immediately holds the
    /// current snapshot and observes every subsequent replacement.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.tx.borrow().clone()
    }

    /// Select a location: persist it, enter `Loading` (clearing any prior
    /// series or error), and spawn the fetch. Selecting again while a
    /// fetch is in flight supersedes it.
    pub fn select(&self, location: Location) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Entry actions: persisted state reflects the selection even if
        // the fetch later fails.
        self.inner.store.save_selected(&location);
        self.inner.store.record_recent(&location);

        tracing::info!(location = %location.name, "location selected");

        self.inner.tx.send_replace(SessionSnapshot {
            location: Some(location.clone()),
            phase: TidePhase::Loading,
            recents: self.inner.store.recents(),
            favorites: self.inner.store.favorites(),
        });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let now = inner.clock.now_utc();
            let phase = match inner.client.fetch_window(&location, now).await {
                Ok(response) => {
                    let events = series::normalize(&response.extremes, &response.heights);
                    tracing::debug!(location = %location.name, events = events.len(), "tide fetch completed");
                    TidePhase::Loaded(events)
                }
                Err(err) => {
                    tracing::error!(location = %location.name, "tide fetch failed: {err}");
                    TidePhase::Failed(err)
                }
            };

            let published = inner.tx.send_if_modified(|snapshot| {
                if inner.generation.load(Ordering::SeqCst) != generation {
                    return false;
                }
                snapshot.phase = phase.clone();
                true
            });

            if !published {
                tracing::debug!(location = %location.name, "discarding superseded tide fetch");
            }
        });
    }

    /// Re-issue the fetch for the current location, if any.
    pub fn retry(&self) {
        let current = self.inner.tx.borrow().location.clone();
        if let Some(location) = current {
            self.select(location);
        }
    }

    /// Re-select the persisted saved location at startup. Returns whether
    /// one existed.
    pub fn restore(&self) -> bool {
        match self.inner.store.saved() {
            Some(saved) => {
                self.select(saved);
                true
            }
            None => false,
        }
    }

    /// Flip favorite membership and republish; returns the new membership.
    pub fn toggle_favorite(&self, location: &Location) -> bool {
        let member = self.inner.store.toggle_favorite(location);
        let favorites = self.inner.store.favorites();
        self.inner.tx.send_modify(|snapshot| {
            snapshot.favorites = favorites;
        });
        member
    }

    pub fn is_favorite(&self, location: &Location) -> bool {
        self.inner.store.is_favorite(location)
    }
}
