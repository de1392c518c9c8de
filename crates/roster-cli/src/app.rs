//! Application state machine and event dispatcher.
//!
//! Dialog state is an explicit [`Dialog`] sum type owned by the [`App`]:
//! every open modal is a variant carrying all the data it needs, key events
//! route to the dialog first, and closing is always `self.dialog = None`.

use std::collections::HashSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use roster_core::{
  activity::{ActivityAction, ActivityEntry, NewActivityEntry, TargetKind},
  assign,
  contact::{ContactPatch, ContactWithDetails},
  entity::{EntityKind, EntityRef, Tag},
  favorite::FavoritesTracker,
  feed::ChangeEvent,
  store::CrmStore,
  view,
};
use roster_store_sqlite::SqliteStore;
use tokio::sync::broadcast::{self, error::TryRecvError};
use uuid::Uuid;

// ─── Screen ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
  /// Focus on the contact list; right pane shows the activity feed.
  ContactList,
  /// Focus on the contact detail pane.
  ContactDetail,
}

// ─── Dialog ───────────────────────────────────────────────────────────────────

/// One selectable row in an entity-picking dialog.
pub struct EntityChoice {
  pub id:     Uuid,
  pub label:  String,
  pub pinned: bool,
}

/// Modal state. At most one dialog is open; each variant carries everything
/// the dialog needs, so closing one can never leak state into another view.
pub enum Dialog {
  /// Choose which kind of entity to assign the contact to.
  PickKind { contact_id: Uuid, cursor: usize },
  /// Choose the entity of `kind` to assign `contact_id` to. Pinned entities
  /// sort first.
  PickEntity {
    contact_id: Uuid,
    kind:       EntityKind,
    choices:    Vec<EntityChoice>,
    cursor:     usize,
  },
  /// Choose one of the contact's tags to remove.
  RemoveTag {
    contact_id: Uuid,
    choices:    Vec<Tag>,
    cursor:     usize,
  },
  /// Confirm deleting a contact.
  ConfirmDelete { contact_id: Uuid, name: String },
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  /// Current screen / keyboard focus.
  pub screen: Screen,

  /// The open dialog, if any. Key events route here first.
  pub dialog: Option<Dialog>,

  /// All contacts, kept in favorites-first order.
  pub contacts: Vec<ContactWithDetails>,

  /// Recent activity entries, newest first.
  pub activity: Vec<ActivityEntry>,

  /// Current fuzzy-filter string (only active when `filter_active`).
  pub filter: String,

  /// Whether the user is typing a filter query.
  pub filter_active: bool,

  /// Cursor position within the *filtered* contact list.
  pub list_cursor: usize,

  /// The contact shown in the detail pane.
  pub selected_contact_id: Option<Uuid>,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  /// The signed-in user; actor for activity entries and owner of pins.
  pub user: String,

  /// Per-kind pinned-entity mirrors, kept live by the change feed.
  pub company_pins: FavoritesTracker,
  pub group_pins:   FavoritesTracker,
  pub tag_pins:     FavoritesTracker,

  store: SqliteStore,
  feed:  broadcast::Receiver<ChangeEvent>,
}

impl App {
  pub fn new(store: SqliteStore, user: String) -> Self {
    let company_pins =
      FavoritesTracker::new(EntityKind::Company, Some(user.clone()), store.watch());
    let group_pins =
      FavoritesTracker::new(EntityKind::Group, Some(user.clone()), store.watch());
    let tag_pins =
      FavoritesTracker::new(EntityKind::Tag, Some(user.clone()), store.watch());
    let feed = store.watch();

    Self {
      screen: Screen::ContactList,
      dialog: None,
      contacts: Vec::new(),
      activity: Vec::new(),
      filter: String::new(),
      filter_active: false,
      list_cursor: 0,
      selected_contact_id: None,
      status_msg: String::new(),
      user,
      company_pins,
      group_pins,
      tag_pins,
      store,
      feed,
    }
  }

  fn pins(&self, kind: EntityKind) -> &FavoritesTracker {
    match kind {
      EntityKind::Company => &self.company_pins,
      EntityKind::Group => &self.group_pins,
      EntityKind::Tag => &self.tag_pins,
    }
  }

  fn pins_mut(&mut self, kind: EntityKind) -> &mut FavoritesTracker {
    match kind {
      EntityKind::Company => &mut self.company_pins,
      EntityKind::Group => &mut self.group_pins,
      EntityKind::Tag => &mut self.tag_pins,
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Fetch contacts, activity, and pins from the store.
  pub async fn load(&mut self) -> anyhow::Result<()> {
    self.status_msg = "Loading…".into();
    match self.store.list_contacts().await {
      Ok(mut contacts) => {
        view::favorites_first(&mut contacts);
        self.contacts = contacts;
        self.status_msg = String::new();
      }
      Err(e) => {
        self.status_msg = format!("Error: {e}");
        return Err(e.into());
      }
    }

    self.activity = self.store.recent_activity(20).await.unwrap_or_default();

    let store = self.store.clone();
    for kind in EntityKind::ALL {
      if let Err(e) = self.pins_mut(kind).resync(&store).await {
        self.status_msg = format!("Error: {e}");
      }
    }
    Ok(())
  }

  /// Reload after a local mutation; errors land in the status bar.
  async fn refresh(&mut self) {
    if let Ok(mut contacts) = self.store.list_contacts().await {
      view::favorites_first(&mut contacts);
      self.contacts = contacts;
    }
    if let Ok(activity) = self.store.recent_activity(20).await {
      self.activity = activity;
    }
    let len = self.filtered_contacts().len();
    if self.list_cursor >= len {
      self.list_cursor = len.saturating_sub(1);
    }
  }

  // ── Change feed ───────────────────────────────────────────────────────────

  /// Drain pending change events. Any non-favorites event triggers a full
  /// reload (notifications never merge incrementally); the pin trackers
  /// drain their own receivers.
  pub async fn pump(&mut self) {
    let mut stale = false;
    loop {
      match self.feed.try_recv() {
        Ok(event) => {
          if !matches!(
            event.table,
            roster_core::feed::Table::FavoriteCompanies
              | roster_core::feed::Table::FavoriteGroups
              | roster_core::feed::Table::FavoriteTags
          ) {
            stale = true;
          }
        }
        Err(TryRecvError::Lagged(_)) => stale = true,
        Err(TryRecvError::Empty | TryRecvError::Closed) => break,
      }
    }
    if stale {
      self.refresh().await;
    }

    let store = self.store.clone();
    for kind in EntityKind::ALL {
      if let Err(e) = self.pins_mut(kind).pump(&store).await {
        self.status_msg = format!("Error: {e}");
      }
    }
  }

  // ── Filtered list ─────────────────────────────────────────────────────────

  /// Contacts that match the current filter query, in favorites-first order.
  pub fn filtered_contacts(&self) -> Vec<&ContactWithDetails> {
    if self.filter.is_empty() {
      return self.contacts.iter().collect();
    }
    let matcher = SkimMatcherV2::default();
    self
      .contacts
      .iter()
      .filter(|c| {
        matcher.fuzzy_match(&c.contact.name, &self.filter).is_some()
          || c
            .contact
            .email
            .as_deref()
            .is_some_and(|e| matcher.fuzzy_match(e, &self.filter).is_some())
      })
      .collect()
  }

  /// The contact under the list cursor in the filtered view, if any.
  pub fn cursor_contact(&self) -> Option<&ContactWithDetails> {
    let list = self.filtered_contacts();
    list.get(self.list_cursor).copied()
  }

  /// The contact shown in the detail pane, if any.
  pub fn selected_contact(&self) -> Option<&ContactWithDetails> {
    let id = self.selected_contact_id?;
    self.contacts.iter().find(|c| c.id() == id)
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    // An open dialog captures all keys.
    if let Some(dialog) = self.dialog.take() {
      self.handle_dialog_key(dialog, key).await;
      return Ok(true);
    }

    // Filter input mode: all printable keys go into the filter string.
    if self.filter_active {
      return Ok(self.handle_filter_key(key));
    }

    match self.screen {
      Screen::ContactList => self.handle_list_key(key).await,
      Screen::ContactDetail => self.handle_detail_key(key).await,
    }
  }

  fn handle_filter_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Esc => {
        self.filter_active = false;
        self.filter.clear();
        self.list_cursor = 0;
      }
      KeyCode::Enter => {
        self.filter_active = false;
        self.list_cursor = 0;
      }
      KeyCode::Backspace => {
        self.filter.pop();
        self.list_cursor = 0;
      }
      KeyCode::Char(c) => {
        self.filter.push(c);
        self.list_cursor = 0;
      }
      _ => {}
    }
    true
  }

  async fn handle_list_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      // Quit
      KeyCode::Char('q') => return Ok(false),

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.filtered_contacts().len();
        if len > 0 && self.list_cursor + 1 < len {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        if self.list_cursor > 0 {
          self.list_cursor -= 1;
        }
      }

      // Open detail
      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
        if let Some(id) = self.cursor_contact().map(|c| c.id()) {
          self.selected_contact_id = Some(id);
          self.screen = Screen::ContactDetail;
        }
      }

      // Filter
      KeyCode::Char('/') => {
        self.filter_active = true;
        self.filter.clear();
        self.list_cursor = 0;
      }

      // Actions on the cursor contact
      KeyCode::Char('f') => {
        if let Some(id) = self.cursor_contact().map(|c| c.id()) {
          self.toggle_favorite(id).await;
        }
      }
      KeyCode::Char('a') => {
        if let Some(id) = self.cursor_contact().map(|c| c.id()) {
          self.dialog = Some(Dialog::PickKind { contact_id: id, cursor: 0 });
        }
      }
      KeyCode::Char('d') => {
        if let Some(c) = self.cursor_contact() {
          self.dialog = Some(Dialog::ConfirmDelete {
            contact_id: c.id(),
            name:       c.contact.name.clone(),
          });
        }
      }

      _ => {}
    }
    Ok(true)
  }

  async fn handle_detail_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    let Some(contact_id) = self.selected_contact_id else {
      self.screen = Screen::ContactList;
      return Ok(true);
    };

    match key.code {
      // Quit
      KeyCode::Char('q') => return Ok(false),

      // Back to list
      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        self.screen = Screen::ContactList;
        self.selected_contact_id = None;
      }

      KeyCode::Char('f') => self.toggle_favorite(contact_id).await,

      KeyCode::Char('a') => {
        self.dialog = Some(Dialog::PickKind { contact_id, cursor: 0 });
      }

      // Clear the exclusive memberships.
      KeyCode::Char('C') => {
        let company = self.selected_contact().and_then(|c| c.company.as_ref());
        if let Some(entity) = company.map(|c| c.entity_ref()) {
          self.unassign(entity, contact_id).await;
        }
      }
      KeyCode::Char('G') => {
        let group = self.selected_contact().and_then(|c| c.group.as_ref());
        if let Some(entity) = group.map(|g| g.entity_ref()) {
          self.unassign(entity, contact_id).await;
        }
      }

      // Remove one of the contact's tags.
      KeyCode::Char('t') => {
        let tags: Vec<Tag> = self
          .selected_contact()
          .map(|c| c.tags.clone())
          .unwrap_or_default();
        if tags.is_empty() {
          self.status_msg = "No tags to remove.".into();
        } else {
          self.dialog =
            Some(Dialog::RemoveTag { contact_id, choices: tags, cursor: 0 });
        }
      }

      _ => {}
    }
    Ok(true)
  }

  // ── Dialog state machine ──────────────────────────────────────────────────

  /// Advance the dialog machine one key. The dialog was taken out of
  /// `self.dialog`; staying open means putting it back.
  async fn handle_dialog_key(&mut self, dialog: Dialog, key: KeyEvent) {
    if key.code == KeyCode::Esc {
      return; // dialog stays closed
    }

    match dialog {
      Dialog::PickKind { contact_id, mut cursor } => match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
          if cursor + 1 < EntityKind::ALL.len() {
            cursor += 1;
          }
          self.dialog = Some(Dialog::PickKind { contact_id, cursor });
        }
        KeyCode::Up | KeyCode::Char('k') => {
          cursor = cursor.saturating_sub(1);
          self.dialog = Some(Dialog::PickKind { contact_id, cursor });
        }
        KeyCode::Enter => {
          let kind = EntityKind::ALL[cursor];
          self.open_entity_picker(kind, contact_id).await;
        }
        _ => self.dialog = Some(Dialog::PickKind { contact_id, cursor }),
      },

      Dialog::PickEntity { contact_id, kind, mut choices, mut cursor } => {
        match key.code {
          KeyCode::Down | KeyCode::Char('j') => {
            if cursor + 1 < choices.len() {
              cursor += 1;
            }
            self.dialog =
              Some(Dialog::PickEntity { contact_id, kind, choices, cursor });
          }
          KeyCode::Up | KeyCode::Char('k') => {
            cursor = cursor.saturating_sub(1);
            self.dialog =
              Some(Dialog::PickEntity { contact_id, kind, choices, cursor });
          }
          // Toggle the pin on the highlighted entity without leaving the
          // dialog.
          KeyCode::Char('p') => {
            if let Some(choice) = choices.get_mut(cursor) {
              let store = self.store.clone();
              let tracker = self.pins_mut(kind);
              let result = if choice.pinned {
                tracker.remove(&store, choice.id).await
              } else {
                tracker.add(&store, choice.id).await
              };
              match result {
                Ok(()) => choice.pinned = !choice.pinned,
                Err(e) => self.status_msg = format!("Error: {e}"),
              }
            }
            self.dialog =
              Some(Dialog::PickEntity { contact_id, kind, choices, cursor });
          }
          KeyCode::Enter => {
            if let Some(choice) = choices.get(cursor) {
              self
                .assign(EntityRef::new(kind, choice.id), contact_id, &choice.label)
                .await;
            }
          }
          _ => {
            self.dialog =
              Some(Dialog::PickEntity { contact_id, kind, choices, cursor })
          }
        }
      }

      Dialog::RemoveTag { contact_id, choices, mut cursor } => match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
          if cursor + 1 < choices.len() {
            cursor += 1;
          }
          self.dialog = Some(Dialog::RemoveTag { contact_id, choices, cursor });
        }
        KeyCode::Up | KeyCode::Char('k') => {
          cursor = cursor.saturating_sub(1);
          self.dialog = Some(Dialog::RemoveTag { contact_id, choices, cursor });
        }
        KeyCode::Enter => {
          if let Some(tag) = choices.get(cursor) {
            self.unassign(tag.entity_ref(), contact_id).await;
          }
        }
        _ => self.dialog = Some(Dialog::RemoveTag { contact_id, choices, cursor }),
      },

      Dialog::ConfirmDelete { contact_id, name } => match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
          self.delete_contact(contact_id, &name).await;
        }
        KeyCode::Char('n') => {}
        _ => self.dialog = Some(Dialog::ConfirmDelete { contact_id, name }),
      },
    }
  }

  /// Build the entity-picker dialog for `kind`, or explain why the contact
  /// cannot take another entity of that kind.
  async fn open_entity_picker(&mut self, kind: EntityKind, contact_id: Uuid) {
    let Some(contact) = self.contacts.iter().find(|c| c.id() == contact_id)
    else {
      return;
    };

    if !assign::kind_allows(kind, contact) {
      self.status_msg = match kind {
        EntityKind::Company => {
          format!("{} already has a company.", contact.contact.name)
        }
        EntityKind::Group => {
          format!("{} already has a group.", contact.contact.name)
        }
        EntityKind::Tag => format!(
          "{} already has {} tags.",
          contact.contact.name,
          assign::TAG_LIMIT
        ),
      };
      return;
    }

    let held: HashSet<Uuid> = contact.tags.iter().map(|t| t.tag_id).collect();
    let raw: Vec<(Uuid, String)> = match kind {
      EntityKind::Company => match self.store.list_companies().await {
        Ok(companies) => {
          companies.into_iter().map(|c| (c.company_id, c.name)).collect()
        }
        Err(e) => {
          self.status_msg = format!("Error: {e}");
          return;
        }
      },
      EntityKind::Group => match self.store.list_groups().await {
        Ok(groups) => groups.into_iter().map(|g| (g.group_id, g.name)).collect(),
        Err(e) => {
          self.status_msg = format!("Error: {e}");
          return;
        }
      },
      EntityKind::Tag => match self.store.list_tags().await {
        Ok(tags) => tags
          .into_iter()
          .filter(|t| !held.contains(&t.tag_id))
          .map(|t| (t.tag_id, t.name))
          .collect(),
        Err(e) => {
          self.status_msg = format!("Error: {e}");
          return;
        }
      },
    };

    if raw.is_empty() {
      self.status_msg = format!("No {kind} available.");
      return;
    }

    let tracker = self.pins(kind);
    let mut choices: Vec<EntityChoice> = raw
      .into_iter()
      .map(|(id, label)| EntityChoice { id, label, pinned: tracker.contains(id) })
      .collect();
    choices.sort_by_key(|c| (!c.pinned, c.label.to_lowercase()));

    self.dialog =
      Some(Dialog::PickEntity { contact_id, kind, choices, cursor: 0 });
  }

  // ── Actions ───────────────────────────────────────────────────────────────

  async fn toggle_favorite(&mut self, contact_id: Uuid) {
    let Some(contact) = self.contacts.iter().find(|c| c.id() == contact_id)
    else {
      return;
    };
    let favorite = !contact.contact.favorite;
    let name = contact.contact.name.clone();

    let patch = ContactPatch { favorite: Some(favorite), ..Default::default() };
    match self.store.update_contact(contact_id, patch).await {
      Ok(_) => {
        let (action, verb) = if favorite {
          (ActivityAction::Favorited, "favorited")
        } else {
          (ActivityAction::Unfavorited, "unfavorited")
        };
        self
          .log_activity(action, TargetKind::Contact, contact_id, format!("{verb} contact {name}"))
          .await;
        self.refresh().await;
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  async fn assign(&mut self, entity: EntityRef, contact_id: Uuid, label: &str) {
    match self.store.assign(entity, contact_id).await {
      Ok(_) => {
        self
          .log_activity(
            ActivityAction::Assigned,
            TargetKind::from(entity.kind()),
            entity.id(),
            format!("assigned contact {contact_id} to {} {label}", entity.kind()),
          )
          .await;
        self.status_msg = format!("Assigned to {label}.");
        self.refresh().await;
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  async fn unassign(&mut self, entity: EntityRef, contact_id: Uuid) {
    match self.store.unassign(entity, contact_id).await {
      Ok(()) => {
        self
          .log_activity(
            ActivityAction::Unassigned,
            TargetKind::from(entity.kind()),
            entity.id(),
            format!("removed contact {contact_id} from {entity}"),
          )
          .await;
        self.refresh().await;
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  async fn delete_contact(&mut self, contact_id: Uuid, name: &str) {
    match self.store.delete_contact(contact_id).await {
      Ok(()) => {
        self
          .log_activity(
            ActivityAction::Deleted,
            TargetKind::Contact,
            contact_id,
            format!("deleted contact {name}"),
          )
          .await;
        if self.selected_contact_id == Some(contact_id) {
          self.selected_contact_id = None;
          self.screen = Screen::ContactList;
        }
        self.status_msg = format!("Deleted {name}.");
        self.refresh().await;
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  /// Append an activity entry; a logging failure must not fail the action it
  /// describes, so it only lands in the status bar.
  async fn log_activity(
    &mut self,
    action: ActivityAction,
    target_kind: TargetKind,
    target_id: Uuid,
    description: String,
  ) {
    let entry = NewActivityEntry::new(
      self.user.clone(),
      action,
      target_kind,
      target_id,
      description,
    );
    if let Err(e) = self.store.append_activity(entry).await {
      self.status_msg = format!("Error: {e}");
    }
  }
}
