//! Tasks attached to an entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityRef;

/// A to-do item attached to a company, group, or tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
  pub task_id:    Uuid,
  pub entity:     EntityRef,
  pub title:      String,
  pub done:       bool,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::CrmStore::add_task`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
  pub entity: EntityRef,
  pub title:  String,
}
