//! Integration tests for `SqliteStore` against an in-memory database.

use roster_core::{
  activity::{ActivityAction, NewActivityEntry, TargetKind},
  assign::{self, TAG_LIMIT},
  contact::{ContactPatch, NewContact},
  entity::{EntityKind, EntityRef, NewCompany, NewGroup, NewTag},
  favorite::{FavoritesTracker, SyncState},
  feed::{ChangeOp, Table},
  note::NewNote,
  store::CrmStore,
  task::NewTask,
  view,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_contact(name: &str) -> NewContact {
  NewContact {
    name:   name.into(),
    email:  Some(format!("{}@example.com", name.to_lowercase())),
    avatar: None,
  }
}

fn new_tag(name: &str) -> NewTag {
  NewTag { name: name.into(), color: "#e5484d".into() }
}

// ─── Contacts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_contact() {
  let s = store().await;

  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  assert_eq!(contact.name, "Alice");
  assert!(!contact.favorite);

  let fetched = s.get_contact(contact.contact_id).await.unwrap().unwrap();
  assert_eq!(fetched.contact.contact_id, contact.contact_id);
  assert_eq!(fetched.contact.email.as_deref(), Some("alice@example.com"));
  assert!(fetched.company.is_none());
  assert!(fetched.group.is_none());
  assert!(fetched.tags.is_empty());
}

#[tokio::test]
async fn get_contact_missing_returns_none() {
  let s = store().await;
  assert!(s.get_contact(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_contact_patches_only_given_fields() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();

  let updated = s
    .update_contact(
      contact.contact_id,
      ContactPatch { favorite: Some(true), ..Default::default() },
    )
    .await
    .unwrap();

  assert!(updated.favorite);
  assert_eq!(updated.name, "Alice");
  assert_eq!(updated.email.as_deref(), Some("alice@example.com"));
}

#[tokio::test]
async fn update_missing_contact_errors() {
  let s = store().await;
  let err = s
    .update_contact(Uuid::new_v4(), ContactPatch::default())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(roster_core::Error::ContactNotFound(_))
  ));
}

#[tokio::test]
async fn delete_contact_cascades_assignments() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let tag = s.add_tag(new_tag("vip")).await.unwrap();
  s.assign(tag.entity_ref(), contact.contact_id).await.unwrap();

  s.delete_contact(contact.contact_id).await.unwrap();

  assert!(s.get_contact(contact.contact_id).await.unwrap().is_none());
  let ids = s.assigned_contact_ids(tag.entity_ref()).await.unwrap();
  assert!(ids.is_empty());
}

// ─── Entities ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn entity_crud_roundtrip() {
  let s = store().await;

  let company = s
    .add_company(NewCompany { name: "Acme".into(), logo: None })
    .await
    .unwrap();
  let group = s
    .add_group(NewGroup { name: "Founders".into(), description: None })
    .await
    .unwrap();
  let tag = s.add_tag(new_tag("vip")).await.unwrap();

  assert!(s.get_company(company.company_id).await.unwrap().is_some());
  assert!(s.get_group(group.group_id).await.unwrap().is_some());
  assert_eq!(s.get_tag(tag.tag_id).await.unwrap().unwrap().color, "#e5484d");

  assert_eq!(s.list_companies().await.unwrap().len(), 1);
  assert_eq!(s.list_groups().await.unwrap().len(), 1);
  assert_eq!(s.list_tags().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_tag_renames_and_recolors() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();

  let updated = s
    .update_tag(
      tag.tag_id,
      roster_core::entity::TagPatch {
        name:  Some("priority".into()),
        color: None,
      },
    )
    .await
    .unwrap();

  assert_eq!(updated.name, "priority");
  assert_eq!(updated.color, "#e5484d");
}

#[tokio::test]
async fn delete_entity_cascades_pins_and_assignments() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let tag = s.add_tag(new_tag("vip")).await.unwrap();
  s.assign(tag.entity_ref(), contact.contact_id).await.unwrap();
  s.add_favorite("mara", tag.entity_ref()).await.unwrap();

  s.delete_entity(tag.entity_ref()).await.unwrap();

  assert!(s.get_tag(tag.tag_id).await.unwrap().is_none());
  let pins = s.favorite_ids("mara", EntityKind::Tag).await.unwrap();
  assert!(pins.is_empty());
  let details = s.get_contact(contact.contact_id).await.unwrap().unwrap();
  assert!(details.tags.is_empty());
}

#[tokio::test]
async fn delete_missing_entity_errors() {
  let s = store().await;
  let err = s
    .delete_entity(EntityRef::Group(Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(roster_core::Error::EntityNotFound(EntityKind::Group, _))
  ));
}

// ─── Assignments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn assign_then_assigned_includes_contact_exactly_once() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let group = s
    .add_group(NewGroup { name: "Founders".into(), description: None })
    .await
    .unwrap();

  s.assign(group.entity_ref(), contact.contact_id).await.unwrap();

  let assigned = assign::assigned_contacts(&s, group.entity_ref())
    .await
    .unwrap();
  let matching: Vec<_> = assigned
    .iter()
    .filter(|c| c.id() == contact.contact_id)
    .collect();
  assert_eq!(matching.len(), 1);
  assert_eq!(
    matching[0].group.as_ref().map(|g| g.group_id),
    Some(group.group_id)
  );
}

#[tokio::test]
async fn unassign_then_assigned_excludes_contact() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let tag = s.add_tag(new_tag("vip")).await.unwrap();

  s.assign(tag.entity_ref(), contact.contact_id).await.unwrap();
  s.unassign(tag.entity_ref(), contact.contact_id).await.unwrap();

  let assigned = assign::assigned_contacts(&s, tag.entity_ref()).await.unwrap();
  assert!(assigned.is_empty());
}

#[tokio::test]
async fn duplicate_assign_errors() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let tag = s.add_tag(new_tag("vip")).await.unwrap();

  s.assign(tag.entity_ref(), contact.contact_id).await.unwrap();
  let err = s
    .assign(tag.entity_ref(), contact.contact_id)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(roster_core::Error::AlreadyAssigned { .. })
  ));
}

#[tokio::test]
async fn second_group_assignment_is_rejected() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let first = s
    .add_group(NewGroup { name: "Founders".into(), description: None })
    .await
    .unwrap();
  let second = s
    .add_group(NewGroup { name: "Investors".into(), description: None })
    .await
    .unwrap();

  s.assign(first.entity_ref(), contact.contact_id).await.unwrap();
  let err = s
    .assign(second.entity_ref(), contact.contact_id)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(roster_core::Error::ExclusiveConflict {
      kind: EntityKind::Group,
      ..
    })
  ));
}

#[tokio::test]
async fn second_company_assignment_is_rejected() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let first = s
    .add_company(NewCompany { name: "Acme".into(), logo: None })
    .await
    .unwrap();
  let second = s
    .add_company(NewCompany { name: "Globex".into(), logo: None })
    .await
    .unwrap();

  s.assign(first.entity_ref(), contact.contact_id).await.unwrap();
  let err = s
    .assign(second.entity_ref(), contact.contact_id)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(roster_core::Error::ExclusiveConflict {
      kind: EntityKind::Company,
      ..
    })
  ));
}

#[tokio::test]
async fn tags_are_not_exclusive_at_the_store() {
  // The per-contact cap is an eligibility rule, not a constraint; the store
  // accepts a fourth tag.
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();

  for i in 0..TAG_LIMIT + 1 {
    let tag = s.add_tag(new_tag(&format!("tag-{i}"))).await.unwrap();
    s.assign(tag.entity_ref(), contact.contact_id).await.unwrap();
  }

  let details = s.get_contact(contact.contact_id).await.unwrap().unwrap();
  assert_eq!(details.tags.len(), TAG_LIMIT + 1);
}

#[tokio::test]
async fn assign_unknown_contact_errors() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();
  let err = s.assign(tag.entity_ref(), Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(roster_core::Error::ContactNotFound(_))
  ));
}

#[tokio::test]
async fn unassign_absent_row_errors() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let tag = s.add_tag(new_tag("vip")).await.unwrap();

  let err = s
    .unassign(tag.entity_ref(), contact.contact_id)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(roster_core::Error::NotAssigned { .. })
  ));
}

// ─── Eligibility ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn contact_at_tag_limit_is_not_eligible_for_another_tag() {
  let s = store().await;
  let at_limit = s.add_contact(new_contact("Full")).await.unwrap();
  let below = s.add_contact(new_contact("Spare")).await.unwrap();

  for i in 0..TAG_LIMIT {
    let tag = s.add_tag(new_tag(&format!("tag-{i}"))).await.unwrap();
    s.assign(tag.entity_ref(), at_limit.contact_id).await.unwrap();
    if i < TAG_LIMIT - 1 {
      s.assign(tag.entity_ref(), below.contact_id).await.unwrap();
    }
  }

  let fresh = s.add_tag(new_tag("fresh")).await.unwrap();
  let eligible = assign::eligible_contacts(&s, fresh.entity_ref())
    .await
    .unwrap();
  let ids: Vec<Uuid> = eligible.iter().map(|c| c.id()).collect();

  assert!(!ids.contains(&at_limit.contact_id));
  assert!(ids.contains(&below.contact_id));
}

#[tokio::test]
async fn contact_with_group_is_not_eligible_for_another_group() {
  let s = store().await;
  let grouped = s.add_contact(new_contact("Grouped")).await.unwrap();
  let free = s.add_contact(new_contact("Free")).await.unwrap();

  let existing = s
    .add_group(NewGroup { name: "Founders".into(), description: None })
    .await
    .unwrap();
  s.assign(existing.entity_ref(), grouped.contact_id).await.unwrap();

  let other = s
    .add_group(NewGroup { name: "Investors".into(), description: None })
    .await
    .unwrap();
  let eligible = assign::eligible_contacts(&s, other.entity_ref())
    .await
    .unwrap();
  let ids: Vec<Uuid> = eligible.iter().map(|c| c.id()).collect();

  assert!(!ids.contains(&grouped.contact_id));
  assert!(ids.contains(&free.contact_id));
}

#[tokio::test]
async fn contact_with_company_is_not_eligible_for_another_company() {
  let s = store().await;
  let employed = s.add_contact(new_contact("Employed")).await.unwrap();
  let free = s.add_contact(new_contact("Free")).await.unwrap();

  let existing = s
    .add_company(NewCompany { name: "Acme".into(), logo: None })
    .await
    .unwrap();
  s.assign(existing.entity_ref(), employed.contact_id).await.unwrap();

  let other = s
    .add_company(NewCompany { name: "Globex".into(), logo: None })
    .await
    .unwrap();
  let eligible = assign::eligible_contacts(&s, other.entity_ref())
    .await
    .unwrap();
  let ids: Vec<Uuid> = eligible.iter().map(|c| c.id()).collect();

  assert!(!ids.contains(&employed.contact_id));
  assert!(ids.contains(&free.contact_id));
}

#[tokio::test]
async fn assigned_contact_is_not_eligible() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let tag = s.add_tag(new_tag("vip")).await.unwrap();
  s.assign(tag.entity_ref(), contact.contact_id).await.unwrap();

  let eligible = assign::eligible_contacts(&s, tag.entity_ref()).await.unwrap();
  assert!(eligible.iter().all(|c| c.id() != contact.contact_id));
}

// ─── Favorites ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_list_favorites() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();

  s.add_favorite("mara", tag.entity_ref()).await.unwrap();

  let ids = s.favorite_ids("mara", EntityKind::Tag).await.unwrap();
  assert_eq!(ids, vec![tag.tag_id]);

  // Pins are per user.
  let other = s.favorite_ids("liam", EntityKind::Tag).await.unwrap();
  assert!(other.is_empty());
}

#[tokio::test]
async fn duplicate_favorite_errors_at_the_store() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();

  s.add_favorite("mara", tag.entity_ref()).await.unwrap();
  let err = s.add_favorite("mara", tag.entity_ref()).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(roster_core::Error::AlreadyFavorited { .. })
  ));
}

#[tokio::test]
async fn remove_absent_favorite_is_a_noop() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();
  s.remove_favorite("mara", tag.entity_ref()).await.unwrap();
}

// ─── Favorites tracker ───────────────────────────────────────────────────────

#[tokio::test]
async fn tracker_initial_resync_mirrors_store() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();
  s.add_favorite("mara", tag.entity_ref()).await.unwrap();

  let mut tracker =
    FavoritesTracker::new(EntityKind::Tag, Some("mara".into()), s.watch());
  assert_eq!(tracker.state(), SyncState::Uninitialized);

  tracker.resync(&s).await.unwrap();
  assert_eq!(tracker.state(), SyncState::Synced);
  assert!(tracker.contains(tag.tag_id));
}

#[tokio::test]
async fn tracker_duplicate_add_is_benign_and_pin_stays_single() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();

  // A "racing" insert lands first, unseen by the tracker.
  s.add_favorite("mara", tag.entity_ref()).await.unwrap();

  let mut tracker =
    FavoritesTracker::new(EntityKind::Tag, Some("mara".into()), s.watch());
  tracker.add(&s, tag.tag_id).await.unwrap();

  let ids = s.favorite_ids("mara", EntityKind::Tag).await.unwrap();
  assert_eq!(ids, vec![tag.tag_id]);
}

#[tokio::test]
async fn tracker_resyncs_on_matching_feed_event() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();

  let mut tracker =
    FavoritesTracker::new(EntityKind::Tag, Some("mara".into()), s.watch());
  tracker.resync(&s).await.unwrap();
  assert!(!tracker.contains(tag.tag_id));

  // Pin lands via another path; the feed event drives the resync.
  s.add_favorite("mara", tag.entity_ref()).await.unwrap();
  let resynced = tracker.pump(&s).await.unwrap();

  assert!(resynced);
  assert!(tracker.contains(tag.tag_id));
}

#[tokio::test]
async fn tracker_ignores_other_users_events() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();

  let mut tracker =
    FavoritesTracker::new(EntityKind::Tag, Some("mara".into()), s.watch());
  tracker.resync(&s).await.unwrap();

  s.add_favorite("liam", tag.entity_ref()).await.unwrap();
  let resynced = tracker.pump(&s).await.unwrap();

  assert!(!resynced);
  assert!(!tracker.contains(tag.tag_id));
}

#[tokio::test]
async fn tracker_collapses_to_empty_without_user() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();
  s.add_favorite("mara", tag.entity_ref()).await.unwrap();

  let mut tracker =
    FavoritesTracker::new(EntityKind::Tag, Some("mara".into()), s.watch());
  tracker.resync(&s).await.unwrap();
  assert!(tracker.contains(tag.tag_id));

  tracker.set_user(None);
  assert_eq!(tracker.state(), SyncState::Empty);
  assert!(!tracker.contains(tag.tag_id));

  // Adds are no-ops while signed out.
  tracker.add(&s, tag.tag_id).await.unwrap();
  assert!(tracker.is_empty());
}

#[tokio::test]
async fn tracker_remove_updates_mirror_immediately() {
  let s = store().await;
  let tag = s.add_tag(new_tag("vip")).await.unwrap();
  s.add_favorite("mara", tag.entity_ref()).await.unwrap();

  let mut tracker =
    FavoritesTracker::new(EntityKind::Tag, Some("mara".into()), s.watch());
  tracker.resync(&s).await.unwrap();

  tracker.remove(&s, tag.tag_id).await.unwrap();
  assert!(!tracker.contains(tag.tag_id));
  assert!(s.favorite_ids("mara", EntityKind::Tag).await.unwrap().is_empty());
}

// ─── Notes and tasks ─────────────────────────────────────────────────────────

#[tokio::test]
async fn note_lifecycle() {
  let s = store().await;
  let group = s
    .add_group(NewGroup { name: "Founders".into(), description: None })
    .await
    .unwrap();

  let note = s
    .add_note(NewNote {
      entity: group.entity_ref(),
      author: "mara".into(),
      body:   "met at the summit".into(),
    })
    .await
    .unwrap();

  let notes = s.list_notes(group.entity_ref()).await.unwrap();
  assert_eq!(notes.len(), 1);
  assert_eq!(notes[0].body, "met at the summit");

  s.delete_note(note.note_id).await.unwrap();
  assert!(s.list_notes(group.entity_ref()).await.unwrap().is_empty());
}

#[tokio::test]
async fn task_lifecycle() {
  let s = store().await;
  let company = s
    .add_company(NewCompany { name: "Acme".into(), logo: None })
    .await
    .unwrap();

  let task = s
    .add_task(NewTask {
      entity: company.entity_ref(),
      title:  "send follow-up".into(),
    })
    .await
    .unwrap();
  assert!(!task.done);

  let done = s.set_task_done(task.task_id, true).await.unwrap();
  assert!(done.done);

  let tasks = s.list_tasks(company.entity_ref()).await.unwrap();
  assert_eq!(tasks.len(), 1);
  assert!(tasks[0].done);

  s.delete_task(task.task_id).await.unwrap();
  assert!(s.list_tasks(company.entity_ref()).await.unwrap().is_empty());
}

#[tokio::test]
async fn note_for_missing_entity_errors() {
  let s = store().await;
  let err = s
    .add_note(NewNote {
      entity: EntityRef::Tag(Uuid::new_v4()),
      author: "mara".into(),
      body:   "orphan".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(roster_core::Error::EntityNotFound(EntityKind::Tag, _))
  ));
}

// ─── Activity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn activity_is_append_only_and_newest_first() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();

  for i in 0..3 {
    s.append_activity(NewActivityEntry::new(
      "mara",
      ActivityAction::Updated,
      TargetKind::Contact,
      contact.contact_id,
      format!("edit {i}"),
    ))
    .await
    .unwrap();
  }

  let recent = s.recent_activity(2).await.unwrap();
  assert_eq!(recent.len(), 2);
  assert_eq!(recent[0].description, "edit 2");
  assert_eq!(recent[1].description, "edit 1");
}

#[tokio::test]
async fn activity_detail_roundtrips() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();

  let entry = s
    .append_activity(
      NewActivityEntry::new(
        "mara",
        ActivityAction::Favorited,
        TargetKind::Contact,
        contact.contact_id,
        "pinned Alice",
      )
      .with_detail(serde_json::json!({ "favorite": true })),
    )
    .await
    .unwrap();

  let recent = s.recent_activity(1).await.unwrap();
  assert_eq!(recent[0].entry_id, entry.entry_id);
  assert_eq!(recent[0].action, ActivityAction::Favorited);
  assert_eq!(recent[0].detail["favorite"], serde_json::json!(true));
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn popular_groups_ranks_by_member_count_and_respects_limit() {
  let s = store().await;

  let big = s
    .add_group(NewGroup { name: "Big".into(), description: None })
    .await
    .unwrap();
  let mid = s
    .add_group(NewGroup { name: "Mid".into(), description: None })
    .await
    .unwrap();
  let _empty = s
    .add_group(NewGroup { name: "Empty".into(), description: None })
    .await
    .unwrap();

  for i in 0..3 {
    let c = s.add_contact(new_contact(&format!("B{i}"))).await.unwrap();
    s.assign(big.entity_ref(), c.contact_id).await.unwrap();
  }
  let c = s.add_contact(new_contact("M0")).await.unwrap();
  s.assign(mid.entity_ref(), c.contact_id).await.unwrap();

  let popular = s.popular_groups(2).await.unwrap();
  assert_eq!(popular.len(), 2);
  assert_eq!(popular[0].group.group_id, big.group_id);
  assert_eq!(popular[0].member_count, 3);
  assert_eq!(popular[0].rank, 1);
  assert_eq!(popular[1].group.group_id, mid.group_id);
  assert_eq!(popular[1].rank, 2);
}

#[tokio::test]
async fn group_summary_reports_rank() {
  let s = store().await;

  let big = s
    .add_group(NewGroup { name: "Big".into(), description: None })
    .await
    .unwrap();
  let small = s
    .add_group(NewGroup { name: "Small".into(), description: None })
    .await
    .unwrap();

  for i in 0..2 {
    let c = s.add_contact(new_contact(&format!("B{i}"))).await.unwrap();
    s.assign(big.entity_ref(), c.contact_id).await.unwrap();
  }

  let summary = s.group_summary(small.group_id).await.unwrap().unwrap();
  assert_eq!(summary.member_count, 0);
  assert_eq!(summary.rank, 2);

  assert!(s.group_summary(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── View integration ────────────────────────────────────────────────────────

#[tokio::test]
async fn favorites_first_over_stored_contacts() {
  let s = store().await;

  s.add_contact(new_contact("Bob")).await.unwrap();
  let ann = s.add_contact(new_contact("Ann")).await.unwrap();
  let zoe = s.add_contact(new_contact("Zoe")).await.unwrap();

  for id in [ann.contact_id, zoe.contact_id] {
    s.update_contact(id, ContactPatch { favorite: Some(true), ..Default::default() })
      .await
      .unwrap();
  }

  let mut contacts = s.list_contacts().await.unwrap();
  view::favorites_first(&mut contacts);

  let names: Vec<&str> =
    contacts.iter().map(|c| c.contact.name.as_str()).collect();
  assert_eq!(names, ["Ann", "Zoe", "Bob"]);
}

#[tokio::test]
async fn popularity_over_stored_assignments() {
  let s = store().await;

  let vip = s.add_tag(new_tag("vip")).await.unwrap();
  let seen = s.add_tag(new_tag("seen")).await.unwrap();

  for i in 0..2 {
    let c = s.add_contact(new_contact(&format!("V{i}"))).await.unwrap();
    s.assign(vip.entity_ref(), c.contact_id).await.unwrap();
  }
  let c = s.add_contact(new_contact("S0")).await.unwrap();
  s.assign(seen.entity_ref(), c.contact_id).await.unwrap();

  let assignments = s.list_assignments(EntityKind::Tag).await.unwrap();
  let ranked = view::rank_by_popularity(&assignments, 1);

  assert_eq!(ranked, vec![(vip.tag_id, 2)]);
}

// ─── Change feed ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn mutations_broadcast_one_event_each() {
  let s = store().await;
  let mut feed = s.watch();

  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let event = feed.recv().await.unwrap();
  assert_eq!(event.table, Table::Contacts);
  assert_eq!(event.op, ChangeOp::Insert);
  assert_eq!(event.row_id, contact.contact_id);
  assert_eq!(event.user_id, None);

  let tag = s.add_tag(new_tag("vip")).await.unwrap();
  let event = feed.recv().await.unwrap();
  assert_eq!(event.table, Table::Tags);

  s.add_favorite("mara", tag.entity_ref()).await.unwrap();
  let event = feed.recv().await.unwrap();
  assert_eq!(event.table, Table::FavoriteTags);
  assert_eq!(event.row_id, tag.tag_id);
  assert_eq!(event.user_id.as_deref(), Some("mara"));
}

#[tokio::test]
async fn assignment_events_carry_the_contact_id() {
  let s = store().await;
  let contact = s.add_contact(new_contact("Alice")).await.unwrap();
  let group = s
    .add_group(NewGroup { name: "Founders".into(), description: None })
    .await
    .unwrap();

  let mut feed = s.watch();
  s.assign(group.entity_ref(), contact.contact_id).await.unwrap();

  let event = feed.recv().await.unwrap();
  assert_eq!(event.table, Table::ContactGroups);
  assert_eq!(event.op, ChangeOp::Insert);
  assert_eq!(event.row_id, contact.contact_id);
}
