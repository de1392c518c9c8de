//! Handlers for the per-user favorites endpoints.
//!
//! All of these require the caller's identity (`X-User-Id`); a missing
//! header is a 401. The duplicate-pin conflict is surfaced as a 409 here —
//! swallowing it is the client-side tracker's business, not the API's.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use roster_core::{
  activity::{ActivityAction, TargetKind},
  entity::{EntityKind, EntityRef},
  store::CrmStore,
};
use uuid::Uuid;

use crate::{activity, auth::UserId, error::ApiError};

/// `GET /favorites/:kind` — the caller's pinned entity ids.
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path(kind): Path<EntityKind>,
  UserId(user): UserId,
) -> Result<Json<Vec<Uuid>>, ApiError>
where
  S: CrmStore,
{
  let ids = store
    .favorite_ids(&user, kind)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(ids))
}

/// `PUT /favorites/:kind/:id`
pub async fn add<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(EntityKind, Uuid)>,
  UserId(user): UserId,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
{
  store
    .add_favorite(&user, EntityRef::new(kind, id))
    .await
    .map_err(ApiError::from_store)?;

  activity::record(
    &*store,
    &user,
    ActivityAction::Favorited,
    TargetKind::from(kind),
    id,
    format!("pinned {kind} {id}"),
    serde_json::Value::Null,
  )
  .await;

  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /favorites/:kind/:id`
pub async fn remove<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(EntityKind, Uuid)>,
  UserId(user): UserId,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
{
  store
    .remove_favorite(&user, EntityRef::new(kind, id))
    .await
    .map_err(ApiError::from_store)?;

  activity::record(
    &*store,
    &user,
    ActivityAction::Unfavorited,
    TargetKind::from(kind),
    id,
    format!("unpinned {kind} {id}"),
    serde_json::Value::Null,
  )
  .await;

  Ok(StatusCode::NO_CONTENT)
}
