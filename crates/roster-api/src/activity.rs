//! Handler for `GET /activity`, plus the helper every mutating handler uses
//! to append its log entry.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use roster_core::{
  activity::{ActivityAction, ActivityEntry, NewActivityEntry, TargetKind},
  store::CrmStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

const DEFAULT_FEED_LIMIT: usize = 50;

// ─── Recording ────────────────────────────────────────────────────────────────

/// Append one activity entry for a mutation that just committed.
///
/// Logging must not fail the mutation it describes, so errors are logged and
/// dropped here.
pub(crate) async fn record<S: CrmStore>(
  store: &S,
  actor: &str,
  action: ActivityAction,
  target_kind: TargetKind,
  target_id: Uuid,
  description: String,
  detail: serde_json::Value,
) {
  let entry = NewActivityEntry::new(actor, action, target_kind, target_id, description)
    .with_detail(detail);
  if let Err(e) = store.append_activity(entry).await {
    tracing::warn!("failed to append activity entry: {e}");
  }
}

// ─── Feed ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FeedParams {
  pub limit: Option<usize>,
}

/// `GET /activity[?limit=<n>]` — newest entries first.
pub async fn recent<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<FeedParams>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError>
where
  S: CrmStore,
{
  let entries = store
    .recent_activity(params.limit.unwrap_or(DEFAULT_FEED_LIMIT))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(entries))
}
