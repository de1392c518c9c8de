//! Handlers for the assignment endpoints under `/entities/:kind/:id`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/entities/:kind/:id/contacts` | Contacts assigned to the entity |
//! | `GET`    | `/entities/:kind/:id/eligible` | Contacts that could be assigned |
//! | `PUT`    | `/entities/:kind/:id/contacts/:contact_id` | 409 on duplicate or exclusivity conflict |
//! | `DELETE` | `/entities/:kind/:id/contacts/:contact_id` | 404 if not assigned |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  activity::{ActivityAction, TargetKind},
  assign,
  contact::ContactWithDetails,
  entity::{EntityKind, EntityRef},
  store::CrmStore,
};
use serde_json::json;
use uuid::Uuid;

use crate::{activity, auth::MaybeUser, error::ApiError};

// ─── Queries ──────────────────────────────────────────────────────────────────

/// `GET /entities/:kind/:id/contacts`
pub async fn assigned<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(EntityKind, Uuid)>,
) -> Result<Json<Vec<ContactWithDetails>>, ApiError>
where
  S: CrmStore,
{
  let contacts = assign::assigned_contacts(&*store, EntityRef::new(kind, id))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(contacts))
}

/// `GET /entities/:kind/:id/eligible`
pub async fn eligible<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(EntityKind, Uuid)>,
) -> Result<Json<Vec<ContactWithDetails>>, ApiError>
where
  S: CrmStore,
{
  let contacts = assign::eligible_contacts(&*store, EntityRef::new(kind, id))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(contacts))
}

// ─── Mutations ────────────────────────────────────────────────────────────────

/// `PUT /entities/:kind/:id/contacts/:contact_id`
pub async fn add<S>(
  State(store): State<Arc<S>>,
  Path((kind, id, contact_id)): Path<(EntityKind, Uuid, Uuid)>,
  user: MaybeUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore,
{
  let assignment = store
    .assign(EntityRef::new(kind, id), contact_id)
    .await
    .map_err(ApiError::from_store)?;

  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Assigned,
    TargetKind::from(kind),
    id,
    format!("assigned contact {contact_id} to {kind} {id}"),
    json!({ "contact_id": contact_id }),
  )
  .await;

  Ok((StatusCode::CREATED, Json(assignment)))
}

/// `DELETE /entities/:kind/:id/contacts/:contact_id`
pub async fn remove<S>(
  State(store): State<Arc<S>>,
  Path((kind, id, contact_id)): Path<(EntityKind, Uuid, Uuid)>,
  user: MaybeUser,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
{
  store
    .unassign(EntityRef::new(kind, id), contact_id)
    .await
    .map_err(ApiError::from_store)?;

  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Unassigned,
    TargetKind::from(kind),
    id,
    format!("removed contact {contact_id} from {kind} {id}"),
    json!({ "contact_id": contact_id }),
  )
  .await;

  Ok(StatusCode::NO_CONTENT)
}
