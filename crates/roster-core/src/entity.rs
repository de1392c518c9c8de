//! Entity kinds and the assignable-entity union.
//!
//! "Entity" means an assignable target for contacts: a company, a group, or
//! a tag. Wherever logic is generic over the three kinds it operates on
//! [`EntityRef`], so a forgotten kind is a compile error, not a fallthrough.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The kind of an assignable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
  Company,
  Group,
  Tag,
}

impl EntityKind {
  pub const ALL: [EntityKind; 3] = [Self::Company, Self::Group, Self::Tag];
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Company => "company",
      Self::Group => "group",
      Self::Tag => "tag",
    })
  }
}

// ─── EntityRef ───────────────────────────────────────────────────────────────

/// A reference to a single assignable entity.
///
/// The variant is the kind; the payload is the entity's id. Matching on this
/// is exhaustive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EntityRef {
  Company(Uuid),
  Group(Uuid),
  Tag(Uuid),
}

impl EntityRef {
  pub fn new(kind: EntityKind, id: Uuid) -> Self {
    match kind {
      EntityKind::Company => Self::Company(id),
      EntityKind::Group => Self::Group(id),
      EntityKind::Tag => Self::Tag(id),
    }
  }

  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Company(_) => EntityKind::Company,
      Self::Group(_) => EntityKind::Group,
      Self::Tag(_) => EntityKind::Tag,
    }
  }

  pub fn id(&self) -> Uuid {
    match self {
      Self::Company(id) | Self::Group(id) | Self::Tag(id) => *id,
    }
  }
}

impl fmt::Display for EntityRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.kind(), self.id())
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A company a contact can belong to. Membership is exclusive: a contact has
/// at most one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
  pub company_id: Uuid,
  pub name:       String,
  /// Path or URL of the company logo, if any.
  pub logo:       Option<String>,
  pub created_at: DateTime<Utc>,
}

/// A user-defined group. Membership is exclusive, like company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
  pub group_id:    Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// A label a contact can carry. Multi-valued, unlike company and group; the
/// per-contact cap lives in [`crate::assign::TAG_LIMIT`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
  pub tag_id:     Uuid,
  pub name:       String,
  /// Display color, e.g. `"#e5484d"`.
  pub color:      String,
  pub created_at: DateTime<Utc>,
}

impl Company {
  pub fn entity_ref(&self) -> EntityRef { EntityRef::Company(self.company_id) }
}

impl Group {
  pub fn entity_ref(&self) -> EntityRef { EntityRef::Group(self.group_id) }
}

impl Tag {
  pub fn entity_ref(&self) -> EntityRef { EntityRef::Tag(self.tag_id) }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::CrmStore::add_company`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCompany {
  pub name: String,
  pub logo: Option<String>,
}

/// Input to [`crate::store::CrmStore::add_group`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
  pub name:        String,
  pub description: Option<String>,
}

/// Input to [`crate::store::CrmStore::add_tag`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTag {
  pub name:  String,
  pub color: String,
}

/// Partial update for a company. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyPatch {
  pub name: Option<String>,
  pub logo: Option<String>,
}

/// Partial update for a group. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupPatch {
  pub name:        Option<String>,
  pub description: Option<String>,
}

/// Partial update for a tag. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagPatch {
  pub name:  Option<String>,
  pub color: Option<String>,
}
