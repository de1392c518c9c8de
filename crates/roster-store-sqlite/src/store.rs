//! [`SqliteStore`] — the SQLite implementation of [`CrmStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;
use uuid::Uuid;

use roster_core::{
  activity::{ActivityEntry, NewActivityEntry},
  assign::Assignment,
  contact::{Contact, ContactPatch, ContactWithDetails, NewContact},
  entity::{
    Company, CompanyPatch, EntityKind, EntityRef, Group, GroupPatch, NewCompany,
    NewGroup, NewTag, Tag, TagPatch,
  },
  feed::{ChangeEvent, ChangeOp, Table},
  note::{NewNote, Note},
  store::{CrmStore, GroupSummary},
  task::{NewTask, Task},
  view,
};

use crate::{
  encode::{
    RawActivity, RawAssignment, RawCompany, RawContact, RawGroup, RawNote,
    RawTag, RawTask, encode_action, encode_dt, encode_entity_kind,
    encode_target_kind, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

/// How many change events may queue per receiver before it observes `Lagged`
/// and falls back to a full resync.
const FEED_CAPACITY: usize = 256;

// ─── Kind-specific SQL names ─────────────────────────────────────────────────

fn entity_table(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Company => "companies",
    EntityKind::Group => "groups",
    EntityKind::Tag => "tags",
  }
}

fn entity_pk(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Company => "company_id",
    EntityKind::Group => "group_id",
    EntityKind::Tag => "tag_id",
  }
}

fn join_table(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Company => "contact_companies",
    EntityKind::Group => "contact_groups",
    EntityKind::Tag => "contact_tags",
  }
}

fn favorites_table(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Company => "favorite_companies",
    EntityKind::Group => "favorite_groups",
    EntityKind::Tag => "favorite_tags",
  }
}

// ─── Row readers (run inside `conn.call` closures) ───────────────────────────

fn read_contact_row(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawContact>> {
  conn
    .query_row(
      "SELECT contact_id, name, email, avatar, favorite, created_at
       FROM contacts WHERE contact_id = ?1",
      rusqlite::params![id],
      |row| {
        Ok(RawContact {
          contact_id: row.get(0)?,
          name:       row.get(1)?,
          email:      row.get(2)?,
          avatar:     row.get(3)?,
          favorite:   row.get(4)?,
          created_at: row.get(5)?,
        })
      },
    )
    .optional()
}

/// The nested join arrays for one contact, in recording order.
fn read_contact_joins(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<(Vec<RawCompany>, Vec<RawGroup>, Vec<RawTag>)> {
  let mut stmt = conn.prepare(
    "SELECT c.company_id, c.name, c.logo, c.created_at
     FROM companies c
     JOIN contact_companies cc ON cc.company_id = c.company_id
     WHERE cc.contact_id = ?1
     ORDER BY cc.recorded_at",
  )?;
  let companies = stmt
    .query_map(rusqlite::params![id], |row| {
      Ok(RawCompany {
        company_id: row.get(0)?,
        name:       row.get(1)?,
        logo:       row.get(2)?,
        created_at: row.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut stmt = conn.prepare(
    "SELECT g.group_id, g.name, g.description, g.created_at
     FROM groups g
     JOIN contact_groups cg ON cg.group_id = g.group_id
     WHERE cg.contact_id = ?1
     ORDER BY cg.recorded_at",
  )?;
  let groups = stmt
    .query_map(rusqlite::params![id], |row| {
      Ok(RawGroup {
        group_id:    row.get(0)?,
        name:        row.get(1)?,
        description: row.get(2)?,
        created_at:  row.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut stmt = conn.prepare(
    "SELECT t.tag_id, t.name, t.color, t.created_at
     FROM tags t
     JOIN contact_tags ct ON ct.tag_id = t.tag_id
     WHERE ct.contact_id = ?1
     ORDER BY ct.recorded_at",
  )?;
  let tags = stmt
    .query_map(rusqlite::params![id], |row| {
      Ok(RawTag {
        tag_id:     row.get(0)?,
        name:       row.get(1)?,
        color:      row.get(2)?,
        created_at: row.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok((companies, groups, tags))
}

fn row_exists(
  conn: &rusqlite::Connection,
  sql: &str,
  id: &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, rusqlite::params![id], |_| Ok(true))
      .optional()?
      .unwrap_or(false),
  )
}

type RawDetails = (RawContact, Vec<RawCompany>, Vec<RawGroup>, Vec<RawTag>);

fn decode_details(raw: RawDetails) -> Result<ContactWithDetails> {
  let (contact, companies, groups, tags) = raw;
  Ok(view::flatten_contact(
    contact.into_contact()?,
    companies
      .into_iter()
      .map(RawCompany::into_company)
      .collect::<Result<_>>()?,
    groups
      .into_iter()
      .map(RawGroup::into_group)
      .collect::<Result<_>>()?,
    tags
      .into_iter()
      .map(RawTag::into_tag)
      .collect::<Result<_>>()?,
  ))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roster store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted and clones
/// share one change-feed channel.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  feed: broadcast::Sender<ChangeEvent>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    let (feed, _) = broadcast::channel(FEED_CAPACITY);
    Ok(Self { conn, feed })
  }

  /// Broadcast a change event. A send error only means nobody is listening.
  fn emit(&self, table: Table, op: ChangeOp, row_id: Uuid, user_id: Option<String>) {
    let _ = self.feed.send(ChangeEvent { table, op, row_id, user_id });
  }
}

// ─── CrmStore impl ───────────────────────────────────────────────────────────

impl CrmStore for SqliteStore {
  type Error = Error;

  // ── Contacts ──────────────────────────────────────────────────────────────

  async fn add_contact(&self, input: NewContact) -> Result<Contact> {
    let contact = Contact {
      contact_id: Uuid::new_v4(),
      name:       input.name,
      email:      input.email,
      avatar:     input.avatar,
      favorite:   false,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(contact.contact_id);
    let at_str = encode_dt(contact.created_at);
    let name = contact.name.clone();
    let email = contact.email.clone();
    let avatar = contact.avatar.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contacts (contact_id, name, email, avatar, favorite, created_at)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![id_str, name, email, avatar, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.emit(Table::Contacts, ChangeOp::Insert, contact.contact_id, None);
    Ok(contact)
  }

  async fn get_contact(&self, id: Uuid) -> Result<Option<ContactWithDetails>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDetails> = self
      .conn
      .call(move |conn| {
        let Some(contact) = read_contact_row(conn, &id_str)? else {
          return Ok(None);
        };
        let (companies, groups, tags) = read_contact_joins(conn, &id_str)?;
        Ok(Some((contact, companies, groups, tags)))
      })
      .await?;

    raw.map(decode_details).transpose()
  }

  async fn list_contacts(&self) -> Result<Vec<ContactWithDetails>> {
    let raws: Vec<RawDetails> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT contact_id, name, email, avatar, favorite, created_at
           FROM contacts ORDER BY created_at",
        )?;
        let contacts = stmt
          .query_map([], |row| {
            Ok(RawContact {
              contact_id: row.get(0)?,
              name:       row.get(1)?,
              email:      row.get(2)?,
              avatar:     row.get(3)?,
              favorite:   row.get(4)?,
              created_at: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut bundles = Vec::with_capacity(contacts.len());
        for contact in contacts {
          let (companies, groups, tags) =
            read_contact_joins(conn, &contact.contact_id)?;
          bundles.push((contact, companies, groups, tags));
        }
        Ok(bundles)
      })
      .await?;

    raws.into_iter().map(decode_details).collect()
  }

  async fn update_contact(&self, id: Uuid, patch: ContactPatch) -> Result<Contact> {
    let id_str = encode_uuid(id);

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        let Some(mut row) = read_contact_row(conn, &id_str)? else {
          return Ok(None);
        };

        if let Some(name) = patch.name {
          row.name = name;
        }
        if let Some(email) = patch.email {
          row.email = Some(email);
        }
        if let Some(avatar) = patch.avatar {
          row.avatar = Some(avatar);
        }
        if let Some(favorite) = patch.favorite {
          row.favorite = favorite;
        }

        conn.execute(
          "UPDATE contacts SET name = ?2, email = ?3, avatar = ?4, favorite = ?5
           WHERE contact_id = ?1",
          rusqlite::params![id_str, row.name, row.email, row.avatar, row.favorite],
        )?;
        Ok(Some(row))
      })
      .await?;

    let contact = raw
      .ok_or(roster_core::Error::ContactNotFound(id))?
      .into_contact()?;
    self.emit(Table::Contacts, ChangeOp::Update, id, None);
    Ok(contact)
  }

  async fn delete_contact(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let deleted: bool = self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM contact_companies WHERE contact_id = ?1",
          rusqlite::params![id_str],
        )?;
        conn.execute(
          "DELETE FROM contact_groups WHERE contact_id = ?1",
          rusqlite::params![id_str],
        )?;
        conn.execute(
          "DELETE FROM contact_tags WHERE contact_id = ?1",
          rusqlite::params![id_str],
        )?;
        let n = conn.execute(
          "DELETE FROM contacts WHERE contact_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    if !deleted {
      return Err(roster_core::Error::ContactNotFound(id).into());
    }
    self.emit(Table::Contacts, ChangeOp::Delete, id, None);
    Ok(())
  }

  // ── Entities ──────────────────────────────────────────────────────────────

  async fn add_company(&self, input: NewCompany) -> Result<Company> {
    let company = Company {
      company_id: Uuid::new_v4(),
      name:       input.name,
      logo:       input.logo,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(company.company_id);
    let at_str = encode_dt(company.created_at);
    let name = company.name.clone();
    let logo = company.logo.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO companies (company_id, name, logo, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, logo, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.emit(Table::Companies, ChangeOp::Insert, company.company_id, None);
    Ok(company)
  }

  async fn add_group(&self, input: NewGroup) -> Result<Group> {
    let group = Group {
      group_id:    Uuid::new_v4(),
      name:        input.name,
      description: input.description,
      created_at:  Utc::now(),
    };

    let id_str = encode_uuid(group.group_id);
    let at_str = encode_dt(group.created_at);
    let name = group.name.clone();
    let description = group.description.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO groups (group_id, name, description, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, description, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.emit(Table::Groups, ChangeOp::Insert, group.group_id, None);
    Ok(group)
  }

  async fn add_tag(&self, input: NewTag) -> Result<Tag> {
    let tag = Tag {
      tag_id:     Uuid::new_v4(),
      name:       input.name,
      color:      input.color,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(tag.tag_id);
    let at_str = encode_dt(tag.created_at);
    let name = tag.name.clone();
    let color = tag.color.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tags (tag_id, name, color, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, color, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.emit(Table::Tags, ChangeOp::Insert, tag.tag_id, None);
    Ok(tag)
  }

  async fn get_company(&self, id: Uuid) -> Result<Option<Company>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCompany> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT company_id, name, logo, created_at
               FROM companies WHERE company_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawCompany {
                  company_id: row.get(0)?,
                  name:       row.get(1)?,
                  logo:       row.get(2)?,
                  created_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCompany::into_company).transpose()
  }

  async fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawGroup> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT group_id, name, description, created_at
               FROM groups WHERE group_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawGroup {
                  group_id:    row.get(0)?,
                  name:        row.get(1)?,
                  description: row.get(2)?,
                  created_at:  row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawGroup::into_group).transpose()
  }

  async fn get_tag(&self, id: Uuid) -> Result<Option<Tag>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTag> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT tag_id, name, color, created_at
               FROM tags WHERE tag_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawTag {
                  tag_id:     row.get(0)?,
                  name:       row.get(1)?,
                  color:      row.get(2)?,
                  created_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTag::into_tag).transpose()
  }

  async fn list_companies(&self) -> Result<Vec<Company>> {
    let raws: Vec<RawCompany> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT company_id, name, logo, created_at FROM companies ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCompany {
              company_id: row.get(0)?,
              name:       row.get(1)?,
              logo:       row.get(2)?,
              created_at: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompany::into_company).collect()
  }

  async fn list_groups(&self) -> Result<Vec<Group>> {
    let raws: Vec<RawGroup> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT group_id, name, description, created_at FROM groups ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawGroup {
              group_id:    row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
              created_at:  row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGroup::into_group).collect()
  }

  async fn list_tags(&self) -> Result<Vec<Tag>> {
    let raws: Vec<RawTag> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT tag_id, name, color, created_at FROM tags ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawTag {
              tag_id:     row.get(0)?,
              name:       row.get(1)?,
              color:      row.get(2)?,
              created_at: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTag::into_tag).collect()
  }

  async fn update_company(&self, id: Uuid, patch: CompanyPatch) -> Result<Company> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCompany> = self
      .conn
      .call(move |conn| {
        let existing = conn
          .query_row(
            "SELECT company_id, name, logo, created_at
             FROM companies WHERE company_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawCompany {
                company_id: row.get(0)?,
                name:       row.get(1)?,
                logo:       row.get(2)?,
                created_at: row.get(3)?,
              })
            },
          )
          .optional()?;
        let Some(mut row) = existing else { return Ok(None) };

        if let Some(name) = patch.name {
          row.name = name;
        }
        if let Some(logo) = patch.logo {
          row.logo = Some(logo);
        }

        conn.execute(
          "UPDATE companies SET name = ?2, logo = ?3 WHERE company_id = ?1",
          rusqlite::params![id_str, row.name, row.logo],
        )?;
        Ok(Some(row))
      })
      .await?;

    let company = raw
      .ok_or(roster_core::Error::EntityNotFound(EntityKind::Company, id))?
      .into_company()?;
    self.emit(Table::Companies, ChangeOp::Update, id, None);
    Ok(company)
  }

  async fn update_group(&self, id: Uuid, patch: GroupPatch) -> Result<Group> {
    let id_str = encode_uuid(id);

    let raw: Option<RawGroup> = self
      .conn
      .call(move |conn| {
        let existing = conn
          .query_row(
            "SELECT group_id, name, description, created_at
             FROM groups WHERE group_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawGroup {
                group_id:    row.get(0)?,
                name:        row.get(1)?,
                description: row.get(2)?,
                created_at:  row.get(3)?,
              })
            },
          )
          .optional()?;
        let Some(mut row) = existing else { return Ok(None) };

        if let Some(name) = patch.name {
          row.name = name;
        }
        if let Some(description) = patch.description {
          row.description = Some(description);
        }

        conn.execute(
          "UPDATE groups SET name = ?2, description = ?3 WHERE group_id = ?1",
          rusqlite::params![id_str, row.name, row.description],
        )?;
        Ok(Some(row))
      })
      .await?;

    let group = raw
      .ok_or(roster_core::Error::EntityNotFound(EntityKind::Group, id))?
      .into_group()?;
    self.emit(Table::Groups, ChangeOp::Update, id, None);
    Ok(group)
  }

  async fn update_tag(&self, id: Uuid, patch: TagPatch) -> Result<Tag> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTag> = self
      .conn
      .call(move |conn| {
        let existing = conn
          .query_row(
            "SELECT tag_id, name, color, created_at FROM tags WHERE tag_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawTag {
                tag_id:     row.get(0)?,
                name:       row.get(1)?,
                color:      row.get(2)?,
                created_at: row.get(3)?,
              })
            },
          )
          .optional()?;
        let Some(mut row) = existing else { return Ok(None) };

        if let Some(name) = patch.name {
          row.name = name;
        }
        if let Some(color) = patch.color {
          row.color = color;
        }

        conn.execute(
          "UPDATE tags SET name = ?2, color = ?3 WHERE tag_id = ?1",
          rusqlite::params![id_str, row.name, row.color],
        )?;
        Ok(Some(row))
      })
      .await?;

    let tag = raw
      .ok_or(roster_core::Error::EntityNotFound(EntityKind::Tag, id))?
      .into_tag()?;
    self.emit(Table::Tags, ChangeOp::Update, id, None);
    Ok(tag)
  }

  async fn delete_entity(&self, entity: EntityRef) -> Result<()> {
    let kind = entity.kind();
    let id = entity.id();
    let id_str = encode_uuid(id);
    let kind_str = encode_entity_kind(kind);
    let join = join_table(kind);
    let favorites = favorites_table(kind);
    let table = entity_table(kind);
    let pk = entity_pk(kind);

    let deleted: bool = self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("DELETE FROM {join} WHERE {pk} = ?1"),
          rusqlite::params![id_str],
        )?;
        conn.execute(
          &format!("DELETE FROM {favorites} WHERE {pk} = ?1"),
          rusqlite::params![id_str],
        )?;
        conn.execute(
          "DELETE FROM entity_notes WHERE entity_kind = ?1 AND entity_id = ?2",
          rusqlite::params![kind_str, id_str],
        )?;
        conn.execute(
          "DELETE FROM entity_tasks WHERE entity_kind = ?1 AND entity_id = ?2",
          rusqlite::params![kind_str, id_str],
        )?;
        let n = conn.execute(
          &format!("DELETE FROM {table} WHERE {pk} = ?1"),
          rusqlite::params![id_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    if !deleted {
      return Err(roster_core::Error::EntityNotFound(kind, id).into());
    }
    let feed_table = match kind {
      EntityKind::Company => Table::Companies,
      EntityKind::Group => Table::Groups,
      EntityKind::Tag => Table::Tags,
    };
    self.emit(feed_table, ChangeOp::Delete, id, None);
    Ok(())
  }

  // ── Assignments ───────────────────────────────────────────────────────────

  async fn assigned_contact_ids(&self, entity: EntityRef) -> Result<Vec<Uuid>> {
    let id_str = encode_uuid(entity.id());
    let join = join_table(entity.kind());
    let col = entity_pk(entity.kind());

    let raw: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT contact_id FROM {join} WHERE {col} = ?1 ORDER BY recorded_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raw.iter().map(|s| crate::encode::decode_uuid(s)).collect()
  }

  async fn list_assignments(&self, kind: EntityKind) -> Result<Vec<Assignment>> {
    let join = join_table(kind);
    let col = entity_pk(kind);

    let raws: Vec<RawAssignment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT contact_id, {col}, recorded_at FROM {join} ORDER BY recorded_at"
        ))?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawAssignment {
              contact_id:  row.get(0)?,
              entity_id:   row.get(1)?,
              recorded_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| raw.into_assignment(kind))
      .collect()
  }

  async fn assign(&self, entity: EntityRef, contact_id: Uuid) -> Result<Assignment> {
    let kind = entity.kind();
    let entity_id = entity.id();
    let entity_id_str = encode_uuid(entity_id);
    let contact_id_str = encode_uuid(contact_id);
    let recorded_at = Utc::now();
    let at_str = encode_dt(recorded_at);
    let join = join_table(kind);
    let col = entity_pk(kind);
    let table = entity_table(kind);
    let pk = entity_pk(kind);

    enum Outcome {
      Inserted,
      NoContact,
      NoEntity,
      Duplicate,
      Exclusive,
    }

    let outcome = self
      .conn
      .call(move |conn| {
        if !row_exists(
          conn,
          "SELECT 1 FROM contacts WHERE contact_id = ?1",
          &contact_id_str,
        )? {
          return Ok(Outcome::NoContact);
        }
        if !row_exists(
          conn,
          &format!("SELECT 1 FROM {table} WHERE {pk} = ?1"),
          &entity_id_str,
        )? {
          return Ok(Outcome::NoEntity);
        }

        let duplicate: bool = conn
          .query_row(
            &format!(
              "SELECT 1 FROM {join} WHERE contact_id = ?1 AND {col} = ?2"
            ),
            rusqlite::params![contact_id_str, entity_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if duplicate {
          return Ok(Outcome::Duplicate);
        }

        // Group and company membership are exclusive per contact.
        if !matches!(kind, EntityKind::Tag)
          && row_exists(
            conn,
            &format!("SELECT 1 FROM {join} WHERE contact_id = ?1"),
            &contact_id_str,
          )?
        {
          return Ok(Outcome::Exclusive);
        }

        conn.execute(
          &format!(
            "INSERT INTO {join} (contact_id, {col}, recorded_at) VALUES (?1, ?2, ?3)"
          ),
          rusqlite::params![contact_id_str, entity_id_str, at_str],
        )?;
        Ok(Outcome::Inserted)
      })
      .await?;

    match outcome {
      Outcome::Inserted => {
        self.emit(Table::assignments(kind), ChangeOp::Insert, contact_id, None);
        Ok(Assignment { contact_id, entity, recorded_at })
      }
      Outcome::NoContact => {
        Err(roster_core::Error::ContactNotFound(contact_id).into())
      }
      Outcome::NoEntity => {
        Err(roster_core::Error::EntityNotFound(kind, entity_id).into())
      }
      Outcome::Duplicate => Err(
        roster_core::Error::AlreadyAssigned { kind, entity_id, contact_id }
          .into(),
      ),
      Outcome::Exclusive => {
        Err(roster_core::Error::ExclusiveConflict { kind, contact_id }.into())
      }
    }
  }

  async fn unassign(&self, entity: EntityRef, contact_id: Uuid) -> Result<()> {
    let kind = entity.kind();
    let entity_id = entity.id();
    let entity_id_str = encode_uuid(entity_id);
    let contact_id_str = encode_uuid(contact_id);
    let join = join_table(kind);
    let col = entity_pk(kind);

    let deleted: bool = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          &format!("DELETE FROM {join} WHERE contact_id = ?1 AND {col} = ?2"),
          rusqlite::params![contact_id_str, entity_id_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    if !deleted {
      return Err(
        roster_core::Error::NotAssigned { kind, entity_id, contact_id }.into(),
      );
    }
    self.emit(Table::assignments(kind), ChangeOp::Delete, contact_id, None);
    Ok(())
  }

  // ── Favorites ─────────────────────────────────────────────────────────────

  async fn favorite_ids(&self, user: &str, kind: EntityKind) -> Result<Vec<Uuid>> {
    let user = user.to_owned();
    let favorites = favorites_table(kind);
    let col = entity_pk(kind);

    let raw: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {col} FROM {favorites} WHERE user_id = ?1 ORDER BY recorded_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raw.iter().map(|s| crate::encode::decode_uuid(s)).collect()
  }

  async fn add_favorite(&self, user: &str, entity: EntityRef) -> Result<()> {
    let kind = entity.kind();
    let entity_id = entity.id();
    let entity_id_str = encode_uuid(entity_id);
    let user_owned = user.to_owned();
    let user_param = user_owned.clone();
    let at_str = encode_dt(Utc::now());
    let favorites = favorites_table(kind);
    let col = entity_pk(kind);
    let table = entity_table(kind);
    let pk = entity_pk(kind);

    enum Outcome {
      Inserted,
      NoEntity,
      Duplicate,
    }

    let outcome = self
      .conn
      .call(move |conn| {
        if !row_exists(
          conn,
          &format!("SELECT 1 FROM {table} WHERE {pk} = ?1"),
          &entity_id_str,
        )? {
          return Ok(Outcome::NoEntity);
        }

        let duplicate: bool = conn
          .query_row(
            &format!(
              "SELECT 1 FROM {favorites} WHERE user_id = ?1 AND {col} = ?2"
            ),
            rusqlite::params![user_param, entity_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if duplicate {
          return Ok(Outcome::Duplicate);
        }

        conn.execute(
          &format!(
            "INSERT INTO {favorites} (user_id, {col}, recorded_at) VALUES (?1, ?2, ?3)"
          ),
          rusqlite::params![user_param, entity_id_str, at_str],
        )?;
        Ok(Outcome::Inserted)
      })
      .await?;

    match outcome {
      Outcome::Inserted => {
        self.emit(
          Table::favorites(kind),
          ChangeOp::Insert,
          entity_id,
          Some(user_owned),
        );
        Ok(())
      }
      Outcome::NoEntity => {
        Err(roster_core::Error::EntityNotFound(kind, entity_id).into())
      }
      Outcome::Duplicate => Err(
        roster_core::Error::AlreadyFavorited {
          kind,
          entity_id,
          user_id: user_owned,
        }
        .into(),
      ),
    }
  }

  async fn remove_favorite(&self, user: &str, entity: EntityRef) -> Result<()> {
    let kind = entity.kind();
    let entity_id = entity.id();
    let entity_id_str = encode_uuid(entity_id);
    let user_owned = user.to_owned();
    let user_param = user_owned.clone();
    let favorites = favorites_table(kind);
    let col = entity_pk(kind);

    let deleted: bool = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          &format!("DELETE FROM {favorites} WHERE user_id = ?1 AND {col} = ?2"),
          rusqlite::params![user_param, entity_id_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    if deleted {
      self.emit(
        Table::favorites(kind),
        ChangeOp::Delete,
        entity_id,
        Some(user_owned),
      );
    }
    Ok(())
  }

  // ── Notes and tasks ───────────────────────────────────────────────────────

  async fn add_note(&self, input: NewNote) -> Result<Note> {
    let note = Note {
      note_id:    Uuid::new_v4(),
      entity:     input.entity,
      author:     input.author,
      body:       input.body,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(note.note_id);
    let kind = note.entity.kind();
    let kind_str = encode_entity_kind(kind);
    let entity_id_str = encode_uuid(note.entity.id());
    let author = note.author.clone();
    let body = note.body.clone();
    let at_str = encode_dt(note.created_at);
    let table = entity_table(kind);
    let pk = entity_pk(kind);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        if !row_exists(
          conn,
          &format!("SELECT 1 FROM {table} WHERE {pk} = ?1"),
          &entity_id_str,
        )? {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO entity_notes (note_id, entity_kind, entity_id, author, body, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, kind_str, entity_id_str, author, body, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(
        roster_core::Error::EntityNotFound(kind, note.entity.id()).into(),
      );
    }
    self.emit(Table::EntityNotes, ChangeOp::Insert, note.note_id, None);
    Ok(note)
  }

  async fn list_notes(&self, entity: EntityRef) -> Result<Vec<Note>> {
    let kind_str = encode_entity_kind(entity.kind());
    let entity_id_str = encode_uuid(entity.id());

    let raws: Vec<RawNote> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT note_id, entity_kind, entity_id, author, body, created_at
           FROM entity_notes
           WHERE entity_kind = ?1 AND entity_id = ?2
           ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str, entity_id_str], |row| {
            Ok(RawNote {
              note_id:     row.get(0)?,
              entity_kind: row.get(1)?,
              entity_id:   row.get(2)?,
              author:      row.get(3)?,
              body:        row.get(4)?,
              created_at:  row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNote::into_note).collect()
  }

  async fn delete_note(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let deleted: bool = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM entity_notes WHERE note_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    if !deleted {
      return Err(roster_core::Error::NoteNotFound(id).into());
    }
    self.emit(Table::EntityNotes, ChangeOp::Delete, id, None);
    Ok(())
  }

  async fn add_task(&self, input: NewTask) -> Result<Task> {
    let task = Task {
      task_id:    Uuid::new_v4(),
      entity:     input.entity,
      title:      input.title,
      done:       false,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(task.task_id);
    let kind = task.entity.kind();
    let kind_str = encode_entity_kind(kind);
    let entity_id_str = encode_uuid(task.entity.id());
    let title = task.title.clone();
    let at_str = encode_dt(task.created_at);
    let table = entity_table(kind);
    let pk = entity_pk(kind);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        if !row_exists(
          conn,
          &format!("SELECT 1 FROM {table} WHERE {pk} = ?1"),
          &entity_id_str,
        )? {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO entity_tasks (task_id, entity_kind, entity_id, title, done, created_at)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![id_str, kind_str, entity_id_str, title, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(
        roster_core::Error::EntityNotFound(kind, task.entity.id()).into(),
      );
    }
    self.emit(Table::EntityTasks, ChangeOp::Insert, task.task_id, None);
    Ok(task)
  }

  async fn list_tasks(&self, entity: EntityRef) -> Result<Vec<Task>> {
    let kind_str = encode_entity_kind(entity.kind());
    let entity_id_str = encode_uuid(entity.id());

    let raws: Vec<RawTask> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT task_id, entity_kind, entity_id, title, done, created_at
           FROM entity_tasks
           WHERE entity_kind = ?1 AND entity_id = ?2
           ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str, entity_id_str], |row| {
            Ok(RawTask {
              task_id:     row.get(0)?,
              entity_kind: row.get(1)?,
              entity_id:   row.get(2)?,
              title:       row.get(3)?,
              done:        row.get(4)?,
              created_at:  row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTask::into_task).collect()
  }

  async fn set_task_done(&self, id: Uuid, done: bool) -> Result<Task> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTask> = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE entity_tasks SET done = ?2 WHERE task_id = ?1",
          rusqlite::params![id_str, done],
        )?;
        if n == 0 {
          return Ok(None);
        }
        Ok(
          conn
            .query_row(
              "SELECT task_id, entity_kind, entity_id, title, done, created_at
               FROM entity_tasks WHERE task_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawTask {
                  task_id:     row.get(0)?,
                  entity_kind: row.get(1)?,
                  entity_id:   row.get(2)?,
                  title:       row.get(3)?,
                  done:        row.get(4)?,
                  created_at:  row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    let task = raw
      .ok_or(roster_core::Error::TaskNotFound(id))?
      .into_task()?;
    self.emit(Table::EntityTasks, ChangeOp::Update, id, None);
    Ok(task)
  }

  async fn delete_task(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let deleted: bool = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM entity_tasks WHERE task_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    if !deleted {
      return Err(roster_core::Error::TaskNotFound(id).into());
    }
    self.emit(Table::EntityTasks, ChangeOp::Delete, id, None);
    Ok(())
  }

  // ── Activity ──────────────────────────────────────────────────────────────

  async fn append_activity(&self, input: NewActivityEntry) -> Result<ActivityEntry> {
    let entry = ActivityEntry {
      entry_id:    Uuid::new_v4(),
      actor:       input.actor,
      action:      input.action,
      target_kind: input.target_kind,
      target_id:   input.target_id,
      detail:      input.detail,
      description: input.description,
      recorded_at: Utc::now(),
    };

    let id_str = encode_uuid(entry.entry_id);
    let actor = entry.actor.clone();
    let action_str = encode_action(entry.action).to_owned();
    let target_kind_str = encode_target_kind(entry.target_kind).to_owned();
    let target_id_str = encode_uuid(entry.target_id);
    let detail_str = serde_json::to_string(&entry.detail)?;
    let description = entry.description.clone();
    let at_str = encode_dt(entry.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activity_log
             (entry_id, actor, action, target_kind, target_id, detail, description, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            actor,
            action_str,
            target_kind_str,
            target_id_str,
            detail_str,
            description,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.emit(Table::ActivityLog, ChangeOp::Insert, entry.entry_id, None);
    Ok(entry)
  }

  async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
    let limit = limit as i64;

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        // rowid preserves append order exactly; recorded_at strings may tie.
        let mut stmt = conn.prepare(
          "SELECT entry_id, actor, action, target_kind, target_id, detail,
                  description, recorded_at
           FROM activity_log ORDER BY rowid DESC LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            Ok(RawActivity {
              entry_id:    row.get(0)?,
              actor:       row.get(1)?,
              action:      row.get(2)?,
              target_kind: row.get(3)?,
              target_id:   row.get(4)?,
              detail:      row.get(5)?,
              description: row.get(6)?,
              recorded_at: row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_entry).collect()
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn popular_groups(&self, limit: usize) -> Result<Vec<GroupSummary>> {
    let summaries = self.ranked_groups().await?;
    Ok(summaries.into_iter().take(limit).collect())
  }

  async fn group_summary(&self, id: Uuid) -> Result<Option<GroupSummary>> {
    let summaries = self.ranked_groups().await?;
    Ok(summaries.into_iter().find(|s| s.group.group_id == id))
  }

  // ── Change feed ───────────────────────────────────────────────────────────

  fn watch(&self) -> broadcast::Receiver<ChangeEvent> { self.feed.subscribe() }
}

impl SqliteStore {
  /// All groups ordered by descending member count, ranks assigned 1-based.
  /// Ties fall back to insertion order.
  async fn ranked_groups(&self) -> Result<Vec<GroupSummary>> {
    let raws: Vec<(RawGroup, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT g.group_id, g.name, g.description, g.created_at,
                  COUNT(cg.contact_id) AS member_count
           FROM groups g
           LEFT JOIN contact_groups cg ON cg.group_id = g.group_id
           GROUP BY g.group_id
           ORDER BY member_count DESC, g.rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((
              RawGroup {
                group_id:    row.get(0)?,
                name:        row.get(1)?,
                description: row.get(2)?,
                created_at:  row.get(3)?,
              },
              row.get(4)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .enumerate()
      .map(|(i, (raw, count))| {
        Ok(GroupSummary {
          group:        raw.into_group()?,
          member_count: count as usize,
          rank:         i + 1,
        })
      })
      .collect()
  }
}
