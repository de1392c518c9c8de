//! Append-only activity log records.
//!
//! Every mutating action writes one entry. Entries are never updated or
//! deleted by the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityKind;

/// What an activity entry records having happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
  Created,
  Updated,
  Deleted,
  Assigned,
  Unassigned,
  Favorited,
  Unfavorited,
  NoteAdded,
  TaskAdded,
  TaskCompleted,
}

/// What kind of record an activity entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
  Contact,
  Company,
  Group,
  Tag,
}

impl From<EntityKind> for TargetKind {
  fn from(kind: EntityKind) -> Self {
    match kind {
      EntityKind::Company => Self::Company,
      EntityKind::Group => Self::Group,
      EntityKind::Tag => Self::Tag,
    }
  }
}

/// One immutable row of the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub entry_id:    Uuid,
  /// The user who performed the action.
  pub actor:       String,
  pub action:      ActivityAction,
  pub target_kind: TargetKind,
  pub target_id:   Uuid,
  /// Free-form structured payload, e.g. the patch that was applied.
  pub detail:      serde_json::Value,
  /// Human-readable one-liner for feed display.
  pub description: String,
  /// Server-assigned timestamp; never changes after creation.
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`crate::store::CrmStore::append_activity`].
/// `recorded_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewActivityEntry {
  pub actor:       String,
  pub action:      ActivityAction,
  pub target_kind: TargetKind,
  pub target_id:   Uuid,
  pub detail:      serde_json::Value,
  pub description: String,
}

impl NewActivityEntry {
  pub fn new(
    actor: impl Into<String>,
    action: ActivityAction,
    target_kind: TargetKind,
    target_id: Uuid,
    description: impl Into<String>,
  ) -> Self {
    Self {
      actor: actor.into(),
      action,
      target_kind,
      target_id,
      detail: serde_json::Value::Null,
      description: description.into(),
    }
  }

  pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
    self.detail = detail;
    self
  }
}
