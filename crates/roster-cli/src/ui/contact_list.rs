//! Contact list pane — left panel, favorites first.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState},
};

use crate::app::App;

/// Render the contact list into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let filtered = app.filtered_contacts();
  let total = app.contacts.len();

  // Title with count.
  let title = if app.filter_active || !app.filter.is_empty() {
    format!(" Contacts ({}/{}) ", filtered.len(), total)
  } else {
    format!(" Contacts ({}) ", total)
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  // Build list items.
  let items: Vec<ListItem> = filtered
    .iter()
    .map(|c| {
      let star = if c.contact.favorite { "★ " } else { "  " };

      let mut spans = vec![
        Span::styled(star, Style::default().fg(Color::Yellow)),
        Span::raw(c.contact.name.clone()),
      ];

      if let Some(company) = &c.company {
        spans.push(Span::styled(
          format!("  {}", company.name),
          Style::default().fg(Color::DarkGray),
        ));
      }
      if !c.tags.is_empty() {
        spans.push(Span::styled(
          format!("  [{}]", c.tags.len()),
          Style::default().fg(Color::DarkGray),
        ));
      }

      ListItem::new(Line::from(spans))
    })
    .collect();

  let mut inner_area = block.inner(area);
  f.render_widget(block, area);

  // If the filter is active or set, show a filter bar at the bottom.
  if (app.filter_active || !app.filter.is_empty()) && inner_area.height > 2 {
    let filter_area = Rect {
      x:      inner_area.x,
      y:      inner_area.y + inner_area.height - 1,
      width:  inner_area.width,
      height: 1,
    };
    inner_area.height = inner_area.height.saturating_sub(1);

    let filter_text = if app.filter_active {
      format!("/{}_", app.filter)
    } else {
      format!("/{}", app.filter)
    };
    f.render_widget(
      ratatui::widgets::Paragraph::new(filter_text)
        .style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  // Scrollable list with cursor tracking.
  let mut state = ListState::default();
  state.select(if filtered.is_empty() {
    None
  } else {
    Some(app.list_cursor)
  });

  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner_area,
    &mut state,
  );
}
