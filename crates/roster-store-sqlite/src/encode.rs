//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Kind discriminants are
//! stored as their lowercase names. The activity `detail` payload is stored
//! as compact JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use roster_core::{
  activity::{ActivityAction, ActivityEntry, TargetKind},
  assign::Assignment,
  contact::Contact,
  entity::{Company, EntityKind, EntityRef, Group, Tag},
  note::Note,
  task::Task,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── EntityKind ──────────────────────────────────────────────────────────────

pub fn encode_entity_kind(k: EntityKind) -> &'static str {
  match k {
    EntityKind::Company => "company",
    EntityKind::Group => "group",
    EntityKind::Tag => "tag",
  }
}

pub fn decode_entity_kind(s: &str) -> Result<EntityKind> {
  match s {
    "company" => Ok(EntityKind::Company),
    "group" => Ok(EntityKind::Group),
    "tag" => Ok(EntityKind::Tag),
    other => Err(Error::Decode(format!("unknown entity kind: {other:?}"))),
  }
}

// ─── ActivityAction ──────────────────────────────────────────────────────────

pub fn encode_action(a: ActivityAction) -> &'static str {
  match a {
    ActivityAction::Created => "created",
    ActivityAction::Updated => "updated",
    ActivityAction::Deleted => "deleted",
    ActivityAction::Assigned => "assigned",
    ActivityAction::Unassigned => "unassigned",
    ActivityAction::Favorited => "favorited",
    ActivityAction::Unfavorited => "unfavorited",
    ActivityAction::NoteAdded => "note_added",
    ActivityAction::TaskAdded => "task_added",
    ActivityAction::TaskCompleted => "task_completed",
  }
}

pub fn decode_action(s: &str) -> Result<ActivityAction> {
  match s {
    "created" => Ok(ActivityAction::Created),
    "updated" => Ok(ActivityAction::Updated),
    "deleted" => Ok(ActivityAction::Deleted),
    "assigned" => Ok(ActivityAction::Assigned),
    "unassigned" => Ok(ActivityAction::Unassigned),
    "favorited" => Ok(ActivityAction::Favorited),
    "unfavorited" => Ok(ActivityAction::Unfavorited),
    "note_added" => Ok(ActivityAction::NoteAdded),
    "task_added" => Ok(ActivityAction::TaskAdded),
    "task_completed" => Ok(ActivityAction::TaskCompleted),
    other => Err(Error::Decode(format!("unknown activity action: {other:?}"))),
  }
}

// ─── TargetKind ──────────────────────────────────────────────────────────────

pub fn encode_target_kind(k: TargetKind) -> &'static str {
  match k {
    TargetKind::Contact => "contact",
    TargetKind::Company => "company",
    TargetKind::Group => "group",
    TargetKind::Tag => "tag",
  }
}

pub fn decode_target_kind(s: &str) -> Result<TargetKind> {
  match s {
    "contact" => Ok(TargetKind::Contact),
    "company" => Ok(TargetKind::Company),
    "group" => Ok(TargetKind::Group),
    "tag" => Ok(TargetKind::Tag),
    other => Err(Error::Decode(format!("unknown target kind: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `contacts` row.
pub struct RawContact {
  pub contact_id: String,
  pub name:       String,
  pub email:      Option<String>,
  pub avatar:     Option<String>,
  pub favorite:   bool,
  pub created_at: String,
}

impl RawContact {
  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      contact_id: decode_uuid(&self.contact_id)?,
      name:       self.name,
      email:      self.email,
      avatar:     self.avatar,
      favorite:   self.favorite,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `companies` row.
pub struct RawCompany {
  pub company_id: String,
  pub name:       String,
  pub logo:       Option<String>,
  pub created_at: String,
}

impl RawCompany {
  pub fn into_company(self) -> Result<Company> {
    Ok(Company {
      company_id: decode_uuid(&self.company_id)?,
      name:       self.name,
      logo:       self.logo,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `groups` row.
pub struct RawGroup {
  pub group_id:    String,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
}

impl RawGroup {
  pub fn into_group(self) -> Result<Group> {
    Ok(Group {
      group_id:    decode_uuid(&self.group_id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `tags` row.
pub struct RawTag {
  pub tag_id:     String,
  pub name:       String,
  pub color:      String,
  pub created_at: String,
}

impl RawTag {
  pub fn into_tag(self) -> Result<Tag> {
    Ok(Tag {
      tag_id:     decode_uuid(&self.tag_id)?,
      name:       self.name,
      color:      self.color,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from one of the three join relations.
pub struct RawAssignment {
  pub contact_id:  String,
  pub entity_id:   String,
  pub recorded_at: String,
}

impl RawAssignment {
  pub fn into_assignment(self, kind: EntityKind) -> Result<Assignment> {
    Ok(Assignment {
      contact_id:  decode_uuid(&self.contact_id)?,
      entity:      EntityRef::new(kind, decode_uuid(&self.entity_id)?),
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from an `entity_notes` row.
pub struct RawNote {
  pub note_id:     String,
  pub entity_kind: String,
  pub entity_id:   String,
  pub author:      String,
  pub body:        String,
  pub created_at:  String,
}

impl RawNote {
  pub fn into_note(self) -> Result<Note> {
    let kind = decode_entity_kind(&self.entity_kind)?;
    Ok(Note {
      note_id:    decode_uuid(&self.note_id)?,
      entity:     EntityRef::new(kind, decode_uuid(&self.entity_id)?),
      author:     self.author,
      body:       self.body,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `entity_tasks` row.
pub struct RawTask {
  pub task_id:     String,
  pub entity_kind: String,
  pub entity_id:   String,
  pub title:       String,
  pub done:        bool,
  pub created_at:  String,
}

impl RawTask {
  pub fn into_task(self) -> Result<Task> {
    let kind = decode_entity_kind(&self.entity_kind)?;
    Ok(Task {
      task_id:    decode_uuid(&self.task_id)?,
      entity:     EntityRef::new(kind, decode_uuid(&self.entity_id)?),
      title:      self.title,
      done:       self.done,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `activity_log` row.
pub struct RawActivity {
  pub entry_id:    String,
  pub actor:       String,
  pub action:      String,
  pub target_kind: String,
  pub target_id:   String,
  pub detail:      String,
  pub description: String,
  pub recorded_at: String,
}

impl RawActivity {
  pub fn into_entry(self) -> Result<ActivityEntry> {
    Ok(ActivityEntry {
      entry_id:    decode_uuid(&self.entry_id)?,
      actor:       self.actor,
      action:      decode_action(&self.action)?,
      target_kind: decode_target_kind(&self.target_kind)?,
      target_id:   decode_uuid(&self.target_id)?,
      detail:      serde_json::from_str(&self.detail)?,
      description: self.description,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
