//! Handler for `GET /events` — the change feed as server-sent events.
//!
//! Each broadcast [`ChangeEvent`] becomes one SSE message with a JSON body.
//! Query params narrow the stream: `?table=<name>` filters by relation and
//! `?user_id=<id>` keeps only events carrying that user (the favorites row
//! filter). Events dropped by a lagging receiver are skipped silently —
//! subscribers resync on the next event they do see.

use std::{convert::Infallible, sync::Arc};

use axum::{
  extract::{Query, State},
  response::sse::{Event, KeepAlive, Sse},
};
use roster_core::store::CrmStore;
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt as _, wrappers::BroadcastStream};

#[derive(Debug, Deserialize, Default)]
pub struct EventParams {
  /// Relation name, e.g. `favorite_tags`; unknown names match nothing.
  pub table:   Option<String>,
  pub user_id: Option<String>,
}

/// `GET /events[?table=<name>][&user_id=<id>]`
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<EventParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
  S: CrmStore,
{
  let feed = store.watch();

  let stream = BroadcastStream::new(feed).filter_map(move |received| {
    let event = received.ok()?;
    if let Some(table) = params.table.as_deref()
      && event.table.as_str() != table
    {
      return None;
    }
    if let Some(user) = params.user_id.as_deref()
      && event.user_id.as_deref() != Some(user)
    {
      return None;
    }
    Some(Ok(Event::default().json_data(&event).ok()?))
  });

  Sse::new(stream).keep_alive(KeepAlive::default())
}
