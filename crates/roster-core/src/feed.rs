//! Change-feed event types.
//!
//! The store broadcasts one [`ChangeEvent`] per committed mutation over a
//! `tokio::sync::broadcast` channel. Subscribers never merge events
//! incrementally: a matching event triggers a full re-fetch, so a lagged
//! receiver only has to resync, not replay.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityKind;

/// A relation that can appear in a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
  Contacts,
  Companies,
  Groups,
  Tags,
  ContactCompanies,
  ContactGroups,
  ContactTags,
  FavoriteCompanies,
  FavoriteGroups,
  FavoriteTags,
  EntityNotes,
  EntityTasks,
  ActivityLog,
}

impl Table {
  /// The favorites relation for `kind`.
  pub fn favorites(kind: EntityKind) -> Self {
    match kind {
      EntityKind::Company => Self::FavoriteCompanies,
      EntityKind::Group => Self::FavoriteGroups,
      EntityKind::Tag => Self::FavoriteTags,
    }
  }

  /// The join relation for `kind`.
  pub fn assignments(kind: EntityKind) -> Self {
    match kind {
      EntityKind::Company => Self::ContactCompanies,
      EntityKind::Group => Self::ContactGroups,
      EntityKind::Tag => Self::ContactTags,
    }
  }

  /// True for the three contact↔entity join relations.
  pub fn is_assignment(&self) -> bool {
    matches!(
      self,
      Self::ContactCompanies | Self::ContactGroups | Self::ContactTags
    )
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Contacts => "contacts",
      Self::Companies => "companies",
      Self::Groups => "groups",
      Self::Tags => "tags",
      Self::ContactCompanies => "contact_companies",
      Self::ContactGroups => "contact_groups",
      Self::ContactTags => "contact_tags",
      Self::FavoriteCompanies => "favorite_companies",
      Self::FavoriteGroups => "favorite_groups",
      Self::FavoriteTags => "favorite_tags",
      Self::EntityNotes => "entity_notes",
      Self::EntityTasks => "entity_tasks",
      Self::ActivityLog => "activity_log",
    }
  }
}

/// The row-level operation a change event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
  Insert,
  Update,
  Delete,
}

/// A row-level change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub table: Table,
  pub op:    ChangeOp,
  /// The id most useful to subscribers: the row's primary key for record
  /// tables, the contact id for join relations, the entity id for favorites.
  pub row_id: Uuid,
  /// Set only for favorites rows; mirrors the per-user row filter a
  /// subscriber applies.
  pub user_id: Option<String>,
}
