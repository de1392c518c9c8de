//! Per-user favorites, mirrored locally and kept live by the change feed.

use std::collections::HashSet;

use tokio::sync::broadcast::{self, error::TryRecvError};
use uuid::Uuid;

use crate::{
  entity::{EntityKind, EntityRef},
  feed::{ChangeEvent, Table},
  store::{CrmStore, StoreError as _},
};

// ─── State ───────────────────────────────────────────────────────────────────

/// Sync status of a [`FavoritesTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
  /// A user is set but no fetch has completed yet.
  Uninitialized,
  /// A fetch is in flight.
  Loading,
  /// The mirror matches the last completed fetch.
  Synced,
  /// No user; the mirror is empty and feed events are ignored.
  Empty,
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

/// Mirrors one user's pinned entity ids for a single kind.
///
/// The tracker owns its change-feed receiver for its whole lifetime, so
/// dropping the tracker ends the subscription — no event can be applied
/// after teardown. Events are never merged incrementally: any matching
/// event triggers a full re-fetch of the pin set.
pub struct FavoritesTracker {
  kind:  EntityKind,
  user:  Option<String>,
  ids:   HashSet<Uuid>,
  state: SyncState,
  feed:  broadcast::Receiver<ChangeEvent>,
}

impl FavoritesTracker {
  pub fn new(
    kind: EntityKind,
    user: Option<String>,
    feed: broadcast::Receiver<ChangeEvent>,
  ) -> Self {
    let state = if user.is_some() {
      SyncState::Uninitialized
    } else {
      SyncState::Empty
    };
    Self { kind, user, ids: HashSet::new(), state, feed }
  }

  pub fn kind(&self) -> EntityKind { self.kind }

  pub fn state(&self) -> SyncState { self.state }

  pub fn contains(&self, id: Uuid) -> bool { self.ids.contains(&id) }

  pub fn ids(&self) -> impl Iterator<Item = Uuid> + '_ {
    self.ids.iter().copied()
  }

  pub fn len(&self) -> usize { self.ids.len() }

  pub fn is_empty(&self) -> bool { self.ids.is_empty() }

  /// Swap the signed-in user. The mirror is cleared either way; a `None`
  /// user collapses the tracker to [`SyncState::Empty`].
  pub fn set_user(&mut self, user: Option<String>) {
    self.user = user;
    self.ids.clear();
    self.state = if self.user.is_some() {
      SyncState::Uninitialized
    } else {
      SyncState::Empty
    };
  }

  // ── Sync ──────────────────────────────────────────────────────────────

  /// Re-fetch the full pin set from the store.
  ///
  /// On failure the mirror and state are left as they were; the next feed
  /// event or explicit call retries.
  pub async fn resync<S: CrmStore>(&mut self, store: &S) -> Result<(), S::Error> {
    let Some(user) = self.user.clone() else {
      self.ids.clear();
      self.state = SyncState::Empty;
      return Ok(());
    };

    let prev = self.state;
    self.state = SyncState::Loading;
    match store.favorite_ids(&user, self.kind).await {
      Ok(ids) => {
        self.ids = ids.into_iter().collect();
        self.state = SyncState::Synced;
        Ok(())
      }
      Err(e) => {
        self.state = prev;
        Err(e)
      }
    }
  }

  /// Drain pending feed events and resync once if any matched this
  /// tracker's (kind, user) filter. Returns whether a resync ran.
  pub async fn pump<S: CrmStore>(&mut self, store: &S) -> Result<bool, S::Error> {
    let mut dirty = false;
    loop {
      match self.feed.try_recv() {
        Ok(event) => {
          if self.matches(&event) {
            dirty = true;
          }
        }
        // Missed events are covered by the full re-fetch.
        Err(TryRecvError::Lagged(_)) => dirty = true,
        Err(TryRecvError::Empty | TryRecvError::Closed) => break,
      }
    }
    if dirty {
      self.resync(store).await?;
    }
    Ok(dirty)
  }

  fn matches(&self, event: &ChangeEvent) -> bool {
    self.user.is_some()
      && event.table == Table::favorites(self.kind)
      && event.user_id.as_deref() == self.user.as_deref()
  }

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Pin `id` for the current user.
  ///
  /// A no-op when the id is already mirrored or no user is set. A
  /// duplicate-pin error from a racing insert is swallowed. The mirror is
  /// not updated optimistically — the feed event emitted by the store
  /// drives the resync.
  pub async fn add<S: CrmStore>(
    &mut self,
    store: &S,
    id: Uuid,
  ) -> Result<(), S::Error> {
    let Some(user) = self.user.clone() else { return Ok(()) };
    if self.ids.contains(&id) {
      return Ok(());
    }
    match store.add_favorite(&user, EntityRef::new(self.kind, id)).await {
      Ok(()) => Ok(()),
      Err(e) if e.is_duplicate_pin() => Ok(()),
      Err(e) => Err(e),
    }
  }

  /// Unpin `id`. On success the id is dropped from the mirror immediately;
  /// on failure the mirror is untouched.
  pub async fn remove<S: CrmStore>(
    &mut self,
    store: &S,
    id: Uuid,
  ) -> Result<(), S::Error> {
    let Some(user) = self.user.clone() else { return Ok(()) };
    store.remove_favorite(&user, EntityRef::new(self.kind, id)).await?;
    self.ids.remove(&id);
    Ok(())
  }
}
