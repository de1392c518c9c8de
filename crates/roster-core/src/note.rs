//! Notes pinned to an entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityRef;

/// A free-text note attached to a company, group, or tag. Immutable once
/// written; deletable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
  pub note_id:    Uuid,
  pub entity:     EntityRef,
  pub author:     String,
  pub body:       String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::CrmStore::add_note`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNote {
  pub entity: EntityRef,
  pub author: String,
  pub body:   String,
}
