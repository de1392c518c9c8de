//! The `CrmStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `roster-store-sqlite`).
//! Higher layers (`roster-api`, `roster-cli`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  activity::{ActivityEntry, NewActivityEntry},
  assign::Assignment,
  contact::{Contact, ContactPatch, ContactWithDetails, NewContact},
  entity::{
    Company, CompanyPatch, EntityKind, EntityRef, Group, GroupPatch, NewCompany,
    NewGroup, NewTag, Tag, TagPatch,
  },
  feed::ChangeEvent,
  note::{NewNote, Note},
  task::{NewTask, Task},
};

// ─── Error classification ────────────────────────────────────────────────────

/// Classification hooks a backend error type exposes so store-generic client
/// logic can recognise the cases it handles specially without knowing the
/// backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// True for a duplicate-pin unique-constraint violation — the one error the
  /// favorites tracker is allowed to swallow.
  fn is_duplicate_pin(&self) -> bool { false }

  /// True for constraint violations (duplicate assignment, exclusive group or
  /// company conflict, duplicate pin).
  fn is_conflict(&self) -> bool { false }

  /// True when the referenced row does not exist.
  fn is_not_found(&self) -> bool { false }
}

impl StoreError for crate::Error {
  fn is_duplicate_pin(&self) -> bool {
    matches!(self, crate::Error::AlreadyFavorited { .. })
  }

  fn is_conflict(&self) -> bool {
    matches!(
      self,
      crate::Error::AlreadyAssigned { .. }
        | crate::Error::ExclusiveConflict { .. }
        | crate::Error::AlreadyFavorited { .. }
    )
  }

  fn is_not_found(&self) -> bool {
    matches!(
      self,
      crate::Error::ContactNotFound(_)
        | crate::Error::EntityNotFound(..)
        | crate::Error::NotAssigned { .. }
        | crate::Error::NoteNotFound(_)
        | crate::Error::TaskNotFound(_)
    )
  }
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// A group bundled with its membership count and popularity rank, as returned
/// by the store-side aggregates.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GroupSummary {
  pub group:        Group,
  pub member_count: usize,
  /// 1-based position when all groups are ordered by descending member count.
  pub rank:         usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Roster storage backend.
///
/// Every mutating method emits one [`ChangeEvent`] on the feed returned by
/// [`watch`](Self::watch) after the write commits.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CrmStore: Send + Sync {
  type Error: StoreError;

  // ── Contacts ──────────────────────────────────────────────────────────

  fn add_contact(
    &self,
    input: NewContact,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  /// Retrieve a contact expanded to its detail shape. `None` if not found.
  fn get_contact(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ContactWithDetails>, Self::Error>> + Send + '_;

  fn list_contacts(
    &self,
  ) -> impl Future<Output = Result<Vec<ContactWithDetails>, Self::Error>> + Send + '_;

  /// Apply a partial update; `None` fields are untouched.
  fn update_contact(
    &self,
    id: Uuid,
    patch: ContactPatch,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  /// Delete a contact and cascade its assignments.
  fn delete_contact(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Entities ──────────────────────────────────────────────────────────

  fn add_company(
    &self,
    input: NewCompany,
  ) -> impl Future<Output = Result<Company, Self::Error>> + Send + '_;

  fn add_group(
    &self,
    input: NewGroup,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  fn add_tag(
    &self,
    input: NewTag,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + '_;

  fn get_company(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Company>, Self::Error>> + Send + '_;

  fn get_group(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + '_;

  fn get_tag(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + '_;

  fn list_companies(
    &self,
  ) -> impl Future<Output = Result<Vec<Company>, Self::Error>> + Send + '_;

  fn list_groups(
    &self,
  ) -> impl Future<Output = Result<Vec<Group>, Self::Error>> + Send + '_;

  fn list_tags(
    &self,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  fn update_company(
    &self,
    id: Uuid,
    patch: CompanyPatch,
  ) -> impl Future<Output = Result<Company, Self::Error>> + Send + '_;

  fn update_group(
    &self,
    id: Uuid,
    patch: GroupPatch,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  fn update_tag(
    &self,
    id: Uuid,
    patch: TagPatch,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + '_;

  /// Delete an entity of any kind and cascade its assignments, pins, notes,
  /// and tasks.
  fn delete_entity(
    &self,
    entity: EntityRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Assignments ───────────────────────────────────────────────────────

  /// Ids of the contacts currently assigned to `entity`.
  fn assigned_contact_ids(
    &self,
    entity: EntityRef,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// All join rows for one kind; used for client-side popularity counts.
  fn list_assignments(
    &self,
    kind: EntityKind,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + '_;

  /// Insert one join row.
  ///
  /// Errors with `AlreadyAssigned` on a duplicate, and `ExclusiveConflict`
  /// when the contact already holds a group (or company) and `entity` is a
  /// group (or company). The tag cap is an eligibility rule, not a
  /// constraint, and is not checked here.
  fn assign(
    &self,
    entity: EntityRef,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<Assignment, Self::Error>> + Send + '_;

  /// Delete one join row. Errors with `NotAssigned` if absent.
  fn unassign(
    &self,
    entity: EntityRef,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Favorites ─────────────────────────────────────────────────────────

  /// Ids of the entities of `kind` pinned by `user`.
  fn favorite_ids<'a>(
    &'a self,
    user: &'a str,
    kind: EntityKind,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + 'a;

  /// Insert a pin row. Errors with `AlreadyFavorited` on a duplicate.
  fn add_favorite<'a>(
    &'a self,
    user: &'a str,
    entity: EntityRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete a pin row. Deleting an absent pin is a no-op.
  fn remove_favorite<'a>(
    &'a self,
    user: &'a str,
    entity: EntityRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Notes and tasks ───────────────────────────────────────────────────

  fn add_note(
    &self,
    input: NewNote,
  ) -> impl Future<Output = Result<Note, Self::Error>> + Send + '_;

  fn list_notes(
    &self,
    entity: EntityRef,
  ) -> impl Future<Output = Result<Vec<Note>, Self::Error>> + Send + '_;

  fn delete_note(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn add_task(
    &self,
    input: NewTask,
  ) -> impl Future<Output = Result<Task, Self::Error>> + Send + '_;

  fn list_tasks(
    &self,
    entity: EntityRef,
  ) -> impl Future<Output = Result<Vec<Task>, Self::Error>> + Send + '_;

  fn set_task_done(
    &self,
    id: Uuid,
    done: bool,
  ) -> impl Future<Output = Result<Task, Self::Error>> + Send + '_;

  fn delete_task(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Activity ──────────────────────────────────────────────────────────

  /// Append one log entry. The `recorded_at` timestamp is set by the store.
  fn append_activity(
    &self,
    input: NewActivityEntry,
  ) -> impl Future<Output = Result<ActivityEntry, Self::Error>> + Send + '_;

  /// The newest `limit` entries, newest first.
  fn recent_activity(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ActivityEntry>, Self::Error>> + Send + '_;

  // ── Aggregates ────────────────────────────────────────────────────────

  /// Groups ranked by descending member count, truncated to `limit`.
  fn popular_groups(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<GroupSummary>, Self::Error>> + Send + '_;

  /// One group with its member count and popularity rank. `None` if the
  /// group does not exist.
  fn group_summary(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<GroupSummary>, Self::Error>> + Send + '_;

  // ── Change feed ───────────────────────────────────────────────────────

  /// Subscribe to the change feed. Each call returns an independent receiver;
  /// dropping the receiver ends the subscription.
  fn watch(&self) -> broadcast::Receiver<ChangeEvent>;
}
