//! Contact records and the flattened detail view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Company, Group, Tag};

/// A person in the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
  pub contact_id: Uuid,
  pub name:       String,
  pub email:      Option<String>,
  /// Path or URL of the avatar image, if any.
  pub avatar:     Option<String>,
  /// Favorites-first ordering key; toggled directly by the user.
  pub favorite:   bool,
  pub created_at: DateTime<Utc>,
}

/// A contact expanded with its single company, single group, and tag list.
///
/// This is the display shape every list and detail surface consumes. It is
/// assembled by [`crate::view::flatten_contact`]; the company and group
/// fields rely on the exclusivity constraints the store enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactWithDetails {
  pub contact: Contact,
  pub company: Option<Company>,
  pub group:   Option<Group>,
  pub tags:    Vec<Tag>,
}

impl ContactWithDetails {
  pub fn id(&self) -> Uuid { self.contact.contact_id }
}

/// Input to [`crate::store::CrmStore::add_contact`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContact {
  pub name:   String,
  pub email:  Option<String>,
  pub avatar: Option<String>,
}

/// Partial update for a contact. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactPatch {
  pub name:     Option<String>,
  pub email:    Option<String>,
  pub avatar:   Option<String>,
  pub favorite: Option<bool>,
}
