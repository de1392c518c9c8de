//! Handlers for `/contacts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/contacts` | Full detail shape, favorites first |
//! | `GET`    | `/contacts/recent` | Optional `?limit=` (default 10) |
//! | `POST`   | `/contacts` | Body: [`NewContact`] |
//! | `GET`    | `/contacts/:id` | 404 if not found |
//! | `PUT`    | `/contacts/:id` | Body: [`ContactPatch`] |
//! | `DELETE` | `/contacts/:id` | Cascades assignments |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  activity::{ActivityAction, TargetKind},
  contact::{Contact, ContactPatch, ContactWithDetails, NewContact},
  store::CrmStore,
  view,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{activity, auth::MaybeUser, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /contacts` — all contacts in favorites-first order.
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<ContactWithDetails>>, ApiError>
where
  S: CrmStore,
{
  let mut contacts = store.list_contacts().await.map_err(ApiError::from_store)?;
  view::favorites_first(&mut contacts);
  Ok(Json(contacts))
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
  pub limit: Option<usize>,
}

/// `GET /contacts/recent[?limit=<n>]` — most-recently-added contacts.
pub async fn recent<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<RecentParams>,
) -> Result<Json<Vec<ContactWithDetails>>, ApiError>
where
  S: CrmStore,
{
  let contacts = store.list_contacts().await.map_err(ApiError::from_store)?;
  Ok(Json(view::recently_added(contacts, params.limit.unwrap_or(10))))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /contacts` — returns 201 + the stored [`Contact`].
pub async fn create<S>(
  State(store): State<Arc<S>>,
  user: MaybeUser,
  Json(body): Json<NewContact>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore,
{
  let contact = store.add_contact(body).await.map_err(ApiError::from_store)?;
  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Created,
    TargetKind::Contact,
    contact.contact_id,
    format!("created contact {}", contact.name),
    serde_json::Value::Null,
  )
  .await;
  Ok((StatusCode::CREATED, Json(contact)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /contacts/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ContactWithDetails>, ApiError>
where
  S: CrmStore,
{
  let contact = store
    .get_contact(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("contact {id} not found")))?;
  Ok(Json(contact))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /contacts/:id` — body is a [`ContactPatch`]; `null` fields are left
/// unchanged.
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  user: MaybeUser,
  Json(patch): Json<ContactPatch>,
) -> Result<Json<Contact>, ApiError>
where
  S: CrmStore,
{
  let favorite_change = patch.favorite;
  let contact = store
    .update_contact(id, patch)
    .await
    .map_err(ApiError::from_store)?;

  let (action, verb) = match favorite_change {
    Some(true) => (ActivityAction::Favorited, "favorited"),
    Some(false) => (ActivityAction::Unfavorited, "unfavorited"),
    None => (ActivityAction::Updated, "updated"),
  };
  activity::record(
    &*store,
    user.actor(),
    action,
    TargetKind::Contact,
    id,
    format!("{verb} contact {}", contact.name),
    serde_json::Value::Null,
  )
  .await;

  Ok(Json(contact))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /contacts/:id`
pub async fn remove<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  user: MaybeUser,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
{
  // Fetch the name first so the activity entry stays readable after the row
  // is gone.
  let name = store
    .get_contact(id)
    .await
    .map_err(ApiError::from_store)?
    .map(|c| c.contact.name);

  store.delete_contact(id).await.map_err(ApiError::from_store)?;
  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Deleted,
    TargetKind::Contact,
    id,
    format!(
      "deleted contact {}",
      name.unwrap_or_else(|| id.to_string())
    ),
    json!({ "contact_id": id }),
  )
  .await;
  Ok(StatusCode::NO_CONTENT)
}
