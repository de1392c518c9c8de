//! Error types for `roster-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::entity::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("contact not found: {0}")]
  ContactNotFound(Uuid),

  #[error("{0} not found: {1}")]
  EntityNotFound(EntityKind, Uuid),

  #[error("contact {contact_id} is already assigned to {kind} {entity_id}")]
  AlreadyAssigned {
    kind:       EntityKind,
    entity_id:  Uuid,
    contact_id: Uuid,
  },

  #[error("contact {contact_id} is not assigned to {kind} {entity_id}")]
  NotAssigned {
    kind:       EntityKind,
    entity_id:  Uuid,
    contact_id: Uuid,
  },

  /// Group and company membership are exclusive; assigning a second one is
  /// rejected rather than silently replacing the first.
  #[error("contact {contact_id} already has a {kind}")]
  ExclusiveConflict {
    kind:       EntityKind,
    contact_id: Uuid,
  },

  /// Duplicate pin insert. The favorites tracker treats this as benign; see
  /// [`crate::store::StoreError::is_duplicate_pin`].
  #[error("{kind} {entity_id} is already a favorite of user {user_id:?}")]
  AlreadyFavorited {
    kind:      EntityKind,
    entity_id: Uuid,
    user_id:   String,
  },

  #[error("note not found: {0}")]
  NoteNotFound(Uuid),

  #[error("task not found: {0}")]
  TaskNotFound(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
