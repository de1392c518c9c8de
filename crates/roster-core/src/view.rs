//! Pure view-model reshaping: flattening, ordering, ranking. No I/O.

use std::collections::HashSet;

use uuid::Uuid;

use crate::{
  assign::Assignment,
  contact::{Contact, ContactWithDetails},
  entity::{Company, Group, Tag},
};

// ─── Flattening ──────────────────────────────────────────────────────────────

/// Flatten a contact's nested join arrays into the display shape.
///
/// The company and group arrays are expected singletons — the store enforces
/// that — so anything past the first element is dropped.
pub fn flatten_contact(
  contact: Contact,
  companies: Vec<Company>,
  groups: Vec<Group>,
  tags: Vec<Tag>,
) -> ContactWithDetails {
  ContactWithDetails {
    contact,
    company: companies.into_iter().next(),
    group: groups.into_iter().next(),
    tags,
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Sort contacts favorited-first, then by case-insensitive name ascending.
/// Stable for equal keys.
pub fn favorites_first(contacts: &mut [ContactWithDetails]) {
  contacts
    .sort_by_cached_key(|c| (!c.contact.favorite, c.contact.name.to_lowercase()));
}

/// Most-recently-created contacts first, truncated to `limit`.
pub fn recently_added(
  mut contacts: Vec<ContactWithDetails>,
  limit: usize,
) -> Vec<ContactWithDetails> {
  contacts.sort_by(|a, b| b.contact.created_at.cmp(&a.contact.created_at));
  contacts.truncate(limit);
  contacts
}

// ─── Ranking ─────────────────────────────────────────────────────────────────

/// Count distinct assigned contacts per entity and rank descending.
///
/// Ties keep the order in which entities were first seen in `assignments`
/// (the sort is stable); the result is truncated to `limit`.
pub fn rank_by_popularity(
  assignments: &[Assignment],
  limit: usize,
) -> Vec<(Uuid, usize)> {
  let mut counts: Vec<(Uuid, HashSet<Uuid>)> = Vec::new();
  for a in assignments {
    let entity_id = a.entity.id();
    match counts.iter_mut().find(|(id, _)| *id == entity_id) {
      Some((_, contacts)) => {
        contacts.insert(a.contact_id);
      }
      None => counts.push((entity_id, HashSet::from([a.contact_id]))),
    }
  }

  let mut ranked: Vec<(Uuid, usize)> =
    counts.into_iter().map(|(id, c)| (id, c.len())).collect();
  ranked.sort_by(|a, b| b.1.cmp(&a.1));
  ranked.truncate(limit);
  ranked
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::entity::EntityRef;

  fn contact(name: &str, favorite: bool) -> ContactWithDetails {
    ContactWithDetails {
      contact: Contact {
        contact_id: Uuid::new_v4(),
        name: name.to_string(),
        email: None,
        avatar: None,
        favorite,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
      },
      company: None,
      group: None,
      tags: Vec::new(),
    }
  }

  #[test]
  fn favorites_sort_before_non_favorites_then_by_name() {
    let mut contacts = vec![
      contact("Bob", false),
      contact("Ann", true),
      contact("Zoe", true),
    ];
    favorites_first(&mut contacts);

    let names: Vec<&str> =
      contacts.iter().map(|c| c.contact.name.as_str()).collect();
    assert_eq!(names, ["Ann", "Zoe", "Bob"]);
  }

  #[test]
  fn favorites_ordering_is_case_insensitive() {
    let mut contacts = vec![
      contact("bob", false),
      contact("Alice", false),
      contact("CARL", false),
    ];
    favorites_first(&mut contacts);

    let names: Vec<&str> =
      contacts.iter().map(|c| c.contact.name.as_str()).collect();
    assert_eq!(names, ["Alice", "bob", "CARL"]);
  }

  #[test]
  fn flatten_takes_first_of_singleton_arrays() {
    let company_a = Company {
      company_id: Uuid::new_v4(),
      name:       "Acme".into(),
      logo:       None,
      created_at: Utc::now(),
    };
    let company_b = Company {
      company_id: Uuid::new_v4(),
      name:       "Globex".into(),
      logo:       None,
      created_at: Utc::now(),
    };

    let flat = flatten_contact(
      contact("Ann", false).contact,
      vec![company_a.clone(), company_b],
      Vec::new(),
      Vec::new(),
    );

    assert_eq!(
      flat.company.map(|c| c.company_id),
      Some(company_a.company_id)
    );
    assert!(flat.group.is_none());
  }

  fn assignment(entity_id: Uuid, contact_id: Uuid) -> Assignment {
    Assignment {
      contact_id,
      entity: EntityRef::Tag(entity_id),
      recorded_at: Utc::now(),
    }
  }

  #[test]
  fn popularity_ranks_by_count_and_respects_limit() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut assignments = Vec::new();
    for _ in 0..5 {
      assignments.push(assignment(a, Uuid::new_v4()));
    }
    for _ in 0..5 {
      assignments.push(assignment(b, Uuid::new_v4()));
    }
    assignments.push(assignment(c, Uuid::new_v4()));

    let ranked = rank_by_popularity(&assignments, 2);
    assert_eq!(ranked.len(), 2);
    // A and B tie at 5; first-seen order breaks the tie.
    assert_eq!(ranked[0], (a, 5));
    assert_eq!(ranked[1], (b, 5));
  }

  #[test]
  fn popularity_counts_distinct_contacts() {
    let entity = Uuid::new_v4();
    let repeat = Uuid::new_v4();

    let assignments = vec![
      assignment(entity, repeat),
      assignment(entity, repeat),
      assignment(entity, Uuid::new_v4()),
    ];

    let ranked = rank_by_popularity(&assignments, 10);
    assert_eq!(ranked, vec![(entity, 2)]);
  }

  #[test]
  fn recently_added_orders_newest_first() {
    let mut old = contact("Old", false);
    old.contact.created_at = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let mut new = contact("New", false);
    new.contact.created_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    let ordered = recently_added(vec![old, new], 1);
    assert_eq!(ordered.len(), 1);
    assert_eq!(ordered[0].contact.name, "New");
  }
}
