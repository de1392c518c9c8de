//! Contact detail pane — right panel.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::App;

/// Render the detail pane into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let Some(contact) = app.selected_contact() else {
    let block = Block::default()
      .title(" Detail ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
      Paragraph::new("Contact no longer exists.")
        .style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  };

  let star = if contact.contact.favorite { "★ " } else { "" };
  let block = Block::default()
    .title(format!(" {star}{} ", contact.contact.name))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let label_style = Style::default()
    .fg(Color::Cyan)
    .add_modifier(Modifier::BOLD);
  let dim = Style::default().fg(Color::DarkGray);
  let pin = Style::default().fg(Color::Yellow);

  let mut lines: Vec<Line> = Vec::new();

  if let Some(email) = &contact.contact.email {
    lines.push(Line::from(vec![
      Span::styled(format!("{:<10}", "email"), label_style),
      Span::raw(email.clone()),
    ]));
  }

  // Company — pinned marker comes from the per-user tracker.
  let mut company_spans = vec![Span::styled(format!("{:<10}", "company"), label_style)];
  match &contact.company {
    Some(company) => {
      company_spans.push(Span::raw(company.name.clone()));
      if app.company_pins.contains(company.company_id) {
        company_spans.push(Span::styled(" ★", pin));
      }
    }
    None => company_spans.push(Span::styled("—", dim)),
  }
  lines.push(Line::from(company_spans));

  let mut group_spans = vec![Span::styled(format!("{:<10}", "group"), label_style)];
  match &contact.group {
    Some(group) => {
      group_spans.push(Span::raw(group.name.clone()));
      if app.group_pins.contains(group.group_id) {
        group_spans.push(Span::styled(" ★", pin));
      }
    }
    None => group_spans.push(Span::styled("—", dim)),
  }
  lines.push(Line::from(group_spans));

  // Tags, each with its color name and pin marker.
  let mut tag_spans = vec![Span::styled(format!("{:<10}", "tags"), label_style)];
  if contact.tags.is_empty() {
    tag_spans.push(Span::styled("—", dim));
  } else {
    for (i, tag) in contact.tags.iter().enumerate() {
      if i > 0 {
        tag_spans.push(Span::raw("  "));
      }
      tag_spans.push(Span::raw(tag.name.clone()));
      if app.tag_pins.contains(tag.tag_id) {
        tag_spans.push(Span::styled("★", pin));
      }
      tag_spans.push(Span::styled(format!(" {}", tag.color), dim));
    }
  }
  lines.push(Line::from(tag_spans));

  lines.push(Line::from(vec![
    Span::styled(format!("{:<10}", "added"), label_style),
    Span::styled(
      contact.contact.created_at.format("%Y-%m-%d").to_string(),
      dim,
    ),
  ]));

  // Pinned-entity summary for the signed-in user.
  lines.push(Line::from(""));
  lines.push(Line::from(vec![Span::styled(
    format!(
      "pins: {} companies, {} groups, {} tags",
      app.company_pins.len(),
      app.group_pins.len(),
      app.tag_pins.len(),
    ),
    dim,
  )]));

  f.render_widget(Paragraph::new(lines), inner);
}
