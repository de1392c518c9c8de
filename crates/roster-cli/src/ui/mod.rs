//! TUI rendering — orchestrates all panes.

pub mod contact_detail;
pub mod contact_list;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use roster_core::entity::EntityKind;

use crate::app::{App, Dialog, Screen};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  draw_body(f, rows[1], app);
  draw_status(f, rows[2], app);

  if let Some(dialog) = &app.dialog {
    draw_dialog(f, area, dialog);
  }
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let date = Local::now().format("%Y-%m-%d").to_string();

  let left = Span::styled(
    " roster  [/] search  [f] favorite  [a] assign  [q] quit",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{}  {date} ", app.user),
    Style::default().fg(Color::DarkGray),
  );

  // Simple left-right header: pad the middle.
  let left_width = left.content.len() as u16;
  let right_width = right.content.len() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_body(f: &mut Frame, area: Rect, app: &App) {
  // Split into left list pane (35%) and right pane (65%).
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
    .split(area);

  contact_list::draw(f, cols[0], app);

  // Right pane: contact detail when one is selected, the activity feed
  // otherwise.
  if app.selected_contact_id.is_some() {
    contact_detail::draw(f, cols[1], app);
  } else {
    draw_activity(f, cols[1], app);
  }
}

fn draw_activity(f: &mut Frame, area: Rect, app: &App) {
  let block = Block::default()
    .title(" Activity ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  if app.activity.is_empty() {
    f.render_widget(
      Paragraph::new("No activity yet.")
        .style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  let lines: Vec<Line> = app
    .activity
    .iter()
    .map(|entry| {
      let time = entry
        .recorded_at
        .with_timezone(&Local)
        .format("%m-%d %H:%M")
        .to_string();
      Line::from(vec![
        Span::styled(format!("{time}  "), Style::default().fg(Color::DarkGray)),
        Span::raw(entry.description.clone()),
        Span::styled(
          format!("  — {}", entry.actor),
          Style::default().fg(Color::DarkGray),
        ),
      ])
    })
    .collect();

  f.render_widget(Paragraph::new(lines), inner);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, hints) = if app.dialog.is_some() {
    ("DIALOG", "↑↓/jk navigate  Enter select  [p] pin  Esc cancel")
  } else {
    match &app.screen {
      Screen::ContactList if app.filter_active => {
        ("SEARCH", "Type to filter  Esc cancel  Enter done")
      }
      Screen::ContactList => (
        "NORMAL",
        "↑↓/jk navigate  Enter detail  f favorite  a assign  d delete  q quit",
      ),
      Screen::ContactDetail => (
        "DETAIL",
        "a assign  t remove tag  C clear company  G clear group  Esc back",
      ),
    }
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  );

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}

// ─── Dialog overlay ───────────────────────────────────────────────────────────

fn draw_dialog(f: &mut Frame, area: Rect, dialog: &Dialog) {
  let (title, items, cursor) = match dialog {
    Dialog::PickKind { cursor, .. } => {
      let items = EntityKind::ALL
        .iter()
        .map(|kind| kind.to_string())
        .collect::<Vec<_>>();
      (" Assign to… ".to_string(), items, *cursor)
    }
    Dialog::PickEntity { kind, choices, cursor, .. } => {
      let items = choices
        .iter()
        .map(|c| {
          if c.pinned {
            format!("★ {}", c.label)
          } else {
            format!("  {}", c.label)
          }
        })
        .collect();
      (format!(" Pick a {kind} "), items, *cursor)
    }
    Dialog::RemoveTag { choices, cursor, .. } => {
      let items = choices.iter().map(|t| t.name.clone()).collect();
      (" Remove which tag? ".to_string(), items, *cursor)
    }
    Dialog::ConfirmDelete { name, .. } => (
      " Delete contact? ".to_string(),
      vec![format!("Delete {name}?  [y] yes  [n] no")],
      0,
    ),
  };

  let height = (items.len() as u16 + 2).min(area.height.saturating_sub(4));
  let rect = centered_rect(area, 40, height.max(3));

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(rect);

  f.render_widget(Clear, rect);
  f.render_widget(block, rect);

  let list_items: Vec<ListItem> =
    items.into_iter().map(ListItem::new).collect();
  let mut state = ListState::default();
  state.select(Some(cursor));

  f.render_stateful_widget(
    List::new(list_items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner,
    &mut state,
  );
}

/// A `width`-column box of `height` rows, centered in `area`.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + (area.height - height) / 2,
    width,
    height,
  }
}
