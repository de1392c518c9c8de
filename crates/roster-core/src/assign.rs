//! Entity-assignment query layer.
//!
//! Generic over the store: given an entity reference, compute the contacts
//! already assigned to it and the contacts still eligible for it. Mutations
//! go through [`CrmStore::assign`]/[`CrmStore::unassign`] directly.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  contact::ContactWithDetails,
  entity::{EntityKind, EntityRef},
  store::CrmStore,
};

/// A contact may hold at most this many tags before tag assignment stops
/// offering it. Eligibility rule only; the store does not enforce it.
pub const TAG_LIMIT: usize = 3;

/// A recorded membership fact linking a contact to an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
  pub contact_id:  Uuid,
  pub entity:      EntityRef,
  pub recorded_at: DateTime<Utc>,
}

/// Contacts currently assigned to `entity`, each expanded to full detail.
///
/// Errors from the store propagate unchanged; there is no retry.
pub async fn assigned_contacts<S: CrmStore>(
  store: &S,
  entity: EntityRef,
) -> Result<Vec<ContactWithDetails>, S::Error> {
  let ids = store.assigned_contact_ids(entity).await?;
  let mut contacts = Vec::with_capacity(ids.len());
  for id in ids {
    // A join row referencing a contact deleted mid-query is skipped.
    if let Some(contact) = store.get_contact(id).await? {
      contacts.push(contact);
    }
  }
  Ok(contacts)
}

/// Contacts that could be newly assigned to `entity`.
///
/// A contact is excluded when it is already assigned, or when the entity
/// kind's structural rule rejects it — see [`kind_allows`].
pub async fn eligible_contacts<S: CrmStore>(
  store: &S,
  entity: EntityRef,
) -> Result<Vec<ContactWithDetails>, S::Error> {
  let assigned: HashSet<Uuid> =
    store.assigned_contact_ids(entity).await?.into_iter().collect();
  let all = store.list_contacts().await?;

  Ok(
    all
      .into_iter()
      .filter(|c| !assigned.contains(&c.id()) && kind_allows(entity.kind(), c))
      .collect(),
  )
}

/// The per-kind structural eligibility rule: tags stop at [`TAG_LIMIT`] per
/// contact, group and company membership are exclusive.
pub fn kind_allows(kind: EntityKind, contact: &ContactWithDetails) -> bool {
  match kind {
    EntityKind::Tag => contact.tags.len() < TAG_LIMIT,
    EntityKind::Group => contact.group.is_none(),
    EntityKind::Company => contact.company.is_none(),
  }
}
