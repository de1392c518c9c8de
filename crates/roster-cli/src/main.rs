//! `roster` — terminal UI for the Roster CRM.
//!
//! Opens the SQLite store directly (no server required) and keeps the view
//! live off the store's change feed.
//!
//! # Usage
//!
//! ```
//! roster --db ~/roster.db --user mara
//! roster --config ~/.config/roster/config.toml
//! ```

mod app;
mod ui;

use std::{io, time::Duration};

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use roster_store_sqlite::SqliteStore;
use serde::Deserialize;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "roster", about = "Terminal UI for the Roster CRM")]
struct Args {
  /// Path to a TOML config file (db_path, user).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Path to the SQLite database (default: roster.db).
  #[arg(long, env = "ROSTER_DB")]
  db: Option<String>,

  /// User id for favorites and activity attribution.
  #[arg(long, env = "ROSTER_USER")]
  user: Option<String>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  db_path: String,
  #[serde(default)]
  user:    String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let db_path = args
    .db
    .or_else(|| (!file_cfg.db_path.is_empty()).then(|| file_cfg.db_path.clone()))
    .unwrap_or_else(|| "roster.db".to_string());
  let user = args
    .user
    .or_else(|| (!file_cfg.user.is_empty()).then(|| file_cfg.user.clone()))
    .or_else(|| std::env::var("USER").ok())
    .unwrap_or_else(|| "anonymous".to_string());

  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("opening store at {db_path}"))?;
  let mut app = App::new(store, user);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Load initial data.
  let load_result = app.load().await;

  // Run the event loop; restore terminal even on error.
  let run_result = if load_result.is_ok() {
    run_event_loop(&mut terminal, &mut app).await
  } else {
    load_result
  };

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    // Apply any change-feed events that arrived since the last frame.
    app.pump().await;

    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(evt) = maybe_event {
      match evt {
        Event::Key(key) => {
          let cont = app.handle_key(key).await?;
          if !cont {
            break;
          }
        }
        Event::Resize(_, _) => {
          // Terminal will redraw on next iteration.
        }
        _ => {}
      }
    }
  }

  Ok(())
}
