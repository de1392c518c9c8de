//! Handlers for notes and tasks attached to an entity.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/entities/:kind/:id/notes` | Newest first |
//! | `POST`   | `/entities/:kind/:id/notes` | Requires `X-User-Id` (author) |
//! | `DELETE` | `/notes/:id` | |
//! | `GET`    | `/entities/:kind/:id/tasks` | |
//! | `POST`   | `/entities/:kind/:id/tasks` | Body: `{"title":"..."}` |
//! | `PATCH`  | `/tasks/:id` | Body: `{"done":true}` |
//! | `DELETE` | `/tasks/:id` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  activity::{ActivityAction, TargetKind},
  entity::{EntityKind, EntityRef},
  note::{NewNote, Note},
  store::CrmStore,
  task::{NewTask, Task},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  activity,
  auth::{MaybeUser, UserId},
  error::ApiError,
};

// ─── Notes ────────────────────────────────────────────────────────────────────

/// `GET /entities/:kind/:id/notes`
pub async fn list_notes<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(EntityKind, Uuid)>,
) -> Result<Json<Vec<Note>>, ApiError>
where
  S: CrmStore,
{
  let notes = store
    .list_notes(EntityRef::new(kind, id))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(notes))
}

#[derive(Debug, Deserialize)]
pub struct NoteBody {
  pub body: String,
}

/// `POST /entities/:kind/:id/notes` — the signed-in user is the author.
pub async fn create_note<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(EntityKind, Uuid)>,
  UserId(user): UserId,
  Json(body): Json<NoteBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore,
{
  let note = store
    .add_note(NewNote {
      entity: EntityRef::new(kind, id),
      author: user.clone(),
      body:   body.body,
    })
    .await
    .map_err(ApiError::from_store)?;

  activity::record(
    &*store,
    &user,
    ActivityAction::NoteAdded,
    TargetKind::from(kind),
    id,
    format!("added a note to {kind} {id}"),
    serde_json::Value::Null,
  )
  .await;

  Ok((StatusCode::CREATED, Json(note)))
}

/// `DELETE /notes/:id`
pub async fn remove_note<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
{
  store.delete_note(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Tasks ────────────────────────────────────────────────────────────────────

/// `GET /entities/:kind/:id/tasks`
pub async fn list_tasks<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(EntityKind, Uuid)>,
) -> Result<Json<Vec<Task>>, ApiError>
where
  S: CrmStore,
{
  let tasks = store
    .list_tasks(EntityRef::new(kind, id))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(tasks))
}

#[derive(Debug, Deserialize)]
pub struct TaskBody {
  pub title: String,
}

/// `POST /entities/:kind/:id/tasks`
pub async fn create_task<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(EntityKind, Uuid)>,
  user: MaybeUser,
  Json(body): Json<TaskBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore,
{
  let task = store
    .add_task(NewTask { entity: EntityRef::new(kind, id), title: body.title })
    .await
    .map_err(ApiError::from_store)?;

  activity::record(
    &*store,
    user.actor(),
    ActivityAction::TaskAdded,
    TargetKind::from(kind),
    id,
    format!("added task \"{}\" to {kind} {id}", task.title),
    serde_json::Value::Null,
  )
  .await;

  Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Debug, Deserialize)]
pub struct TaskDoneBody {
  pub done: bool,
}

/// `PATCH /tasks/:id` — body: `{"done":true}`.
pub async fn set_task_done<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  user: MaybeUser,
  Json(body): Json<TaskDoneBody>,
) -> Result<Json<Task>, ApiError>
where
  S: CrmStore,
{
  let task = store
    .set_task_done(id, body.done)
    .await
    .map_err(ApiError::from_store)?;

  if task.done {
    activity::record(
      &*store,
      user.actor(),
      ActivityAction::TaskCompleted,
      TargetKind::from(task.entity.kind()),
      task.entity.id(),
      format!("completed task \"{}\"", task.title),
      serde_json::Value::Null,
    )
    .await;
  }

  Ok(Json(task))
}

/// `DELETE /tasks/:id`
pub async fn remove_task<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
{
  store.delete_task(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
