//! Handlers for the `/companies`, `/groups`, and `/tags` endpoints.
//!
//! Each kind gets the same CRUD surface. Popularity is served two ways,
//! mirroring where the counting happens: `/groups/popular` and
//! `/groups/:id/summary` call the store-side aggregate, while
//! `/companies/popular` and `/tags/popular` are counted from the raw join
//! rows with [`view::rank_by_popularity`].

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  activity::{ActivityAction, TargetKind},
  entity::{
    Company, CompanyPatch, EntityKind, EntityRef, Group, GroupPatch, NewCompany,
    NewGroup, NewTag, Tag, TagPatch,
  },
  store::{CrmStore, GroupSummary},
  view,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{activity, auth::MaybeUser, error::ApiError};

const DEFAULT_POPULAR_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
pub struct PopularParams {
  pub limit: Option<usize>,
}

// ─── Companies ────────────────────────────────────────────────────────────────

/// `GET /companies`
pub async fn list_companies<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Company>>, ApiError>
where
  S: CrmStore,
{
  let companies = store.list_companies().await.map_err(ApiError::from_store)?;
  Ok(Json(companies))
}

/// `POST /companies` — body: [`NewCompany`].
pub async fn create_company<S>(
  State(store): State<Arc<S>>,
  user: MaybeUser,
  Json(body): Json<NewCompany>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore,
{
  let company = store.add_company(body).await.map_err(ApiError::from_store)?;
  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Created,
    TargetKind::Company,
    company.company_id,
    format!("created company {}", company.name),
    serde_json::Value::Null,
  )
  .await;
  Ok((StatusCode::CREATED, Json(company)))
}

/// `GET /companies/:id`
pub async fn get_company<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Company>, ApiError>
where
  S: CrmStore,
{
  let company = store
    .get_company(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("company {id} not found")))?;
  Ok(Json(company))
}

/// `PUT /companies/:id` — body: [`CompanyPatch`].
pub async fn update_company<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  user: MaybeUser,
  Json(patch): Json<CompanyPatch>,
) -> Result<Json<Company>, ApiError>
where
  S: CrmStore,
{
  let company = store
    .update_company(id, patch)
    .await
    .map_err(ApiError::from_store)?;
  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Updated,
    TargetKind::Company,
    id,
    format!("updated company {}", company.name),
    serde_json::Value::Null,
  )
  .await;
  Ok(Json(company))
}

/// A company with its distinct-contact count, for popularity lists.
#[derive(Debug, Serialize)]
pub struct PopularCompany {
  pub company:       Company,
  pub contact_count: usize,
}

/// `GET /companies/popular[?limit=<n>]` — counted client-side from join rows.
pub async fn popular_companies<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<PopularParams>,
) -> Result<Json<Vec<PopularCompany>>, ApiError>
where
  S: CrmStore,
{
  let assignments = store
    .list_assignments(EntityKind::Company)
    .await
    .map_err(ApiError::from_store)?;
  let ranked = view::rank_by_popularity(
    &assignments,
    params.limit.unwrap_or(DEFAULT_POPULAR_LIMIT),
  );
  let companies = store.list_companies().await.map_err(ApiError::from_store)?;

  let popular = ranked
    .into_iter()
    .filter_map(|(id, contact_count)| {
      companies
        .iter()
        .find(|c| c.company_id == id)
        .map(|c| PopularCompany { company: c.clone(), contact_count })
    })
    .collect();
  Ok(Json(popular))
}

// ─── Groups ───────────────────────────────────────────────────────────────────

/// `GET /groups`
pub async fn list_groups<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Group>>, ApiError>
where
  S: CrmStore,
{
  let groups = store.list_groups().await.map_err(ApiError::from_store)?;
  Ok(Json(groups))
}

/// `POST /groups` — body: [`NewGroup`].
pub async fn create_group<S>(
  State(store): State<Arc<S>>,
  user: MaybeUser,
  Json(body): Json<NewGroup>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore,
{
  let group = store.add_group(body).await.map_err(ApiError::from_store)?;
  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Created,
    TargetKind::Group,
    group.group_id,
    format!("created group {}", group.name),
    serde_json::Value::Null,
  )
  .await;
  Ok((StatusCode::CREATED, Json(group)))
}

/// `GET /groups/:id`
pub async fn get_group<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Group>, ApiError>
where
  S: CrmStore,
{
  let group = store
    .get_group(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("group {id} not found")))?;
  Ok(Json(group))
}

/// `PUT /groups/:id` — body: [`GroupPatch`].
pub async fn update_group<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  user: MaybeUser,
  Json(patch): Json<GroupPatch>,
) -> Result<Json<Group>, ApiError>
where
  S: CrmStore,
{
  let group = store
    .update_group(id, patch)
    .await
    .map_err(ApiError::from_store)?;
  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Updated,
    TargetKind::Group,
    id,
    format!("updated group {}", group.name),
    serde_json::Value::Null,
  )
  .await;
  Ok(Json(group))
}

/// `GET /groups/popular[?limit=<n>]` — served by the store-side aggregate.
pub async fn popular_groups<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<PopularParams>,
) -> Result<Json<Vec<GroupSummary>>, ApiError>
where
  S: CrmStore,
{
  let summaries = store
    .popular_groups(params.limit.unwrap_or(DEFAULT_POPULAR_LIMIT))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(summaries))
}

/// `GET /groups/:id/summary` — member count plus popularity rank.
pub async fn group_summary<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<GroupSummary>, ApiError>
where
  S: CrmStore,
{
  let summary = store
    .group_summary(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("group {id} not found")))?;
  Ok(Json(summary))
}

// ─── Tags ─────────────────────────────────────────────────────────────────────

/// `GET /tags`
pub async fn list_tags<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Tag>>, ApiError>
where
  S: CrmStore,
{
  let tags = store.list_tags().await.map_err(ApiError::from_store)?;
  Ok(Json(tags))
}

/// `POST /tags` — body: [`NewTag`].
pub async fn create_tag<S>(
  State(store): State<Arc<S>>,
  user: MaybeUser,
  Json(body): Json<NewTag>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore,
{
  let tag = store.add_tag(body).await.map_err(ApiError::from_store)?;
  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Created,
    TargetKind::Tag,
    tag.tag_id,
    format!("created tag {}", tag.name),
    serde_json::Value::Null,
  )
  .await;
  Ok((StatusCode::CREATED, Json(tag)))
}

/// `GET /tags/:id`
pub async fn get_tag<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Tag>, ApiError>
where
  S: CrmStore,
{
  let tag = store
    .get_tag(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("tag {id} not found")))?;
  Ok(Json(tag))
}

/// `PUT /tags/:id` — body: [`TagPatch`].
pub async fn update_tag<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  user: MaybeUser,
  Json(patch): Json<TagPatch>,
) -> Result<Json<Tag>, ApiError>
where
  S: CrmStore,
{
  let tag = store.update_tag(id, patch).await.map_err(ApiError::from_store)?;
  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Updated,
    TargetKind::Tag,
    id,
    format!("updated tag {}", tag.name),
    serde_json::Value::Null,
  )
  .await;
  Ok(Json(tag))
}

/// A tag with its distinct-contact count, for popularity lists.
#[derive(Debug, Serialize)]
pub struct PopularTag {
  pub tag:           Tag,
  pub contact_count: usize,
}

/// `GET /tags/popular[?limit=<n>]` — counted client-side from join rows.
pub async fn popular_tags<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<PopularParams>,
) -> Result<Json<Vec<PopularTag>>, ApiError>
where
  S: CrmStore,
{
  let assignments = store
    .list_assignments(EntityKind::Tag)
    .await
    .map_err(ApiError::from_store)?;
  let ranked = view::rank_by_popularity(
    &assignments,
    params.limit.unwrap_or(DEFAULT_POPULAR_LIMIT),
  );
  let tags = store.list_tags().await.map_err(ApiError::from_store)?;

  let popular = ranked
    .into_iter()
    .filter_map(|(id, contact_count)| {
      tags
        .iter()
        .find(|t| t.tag_id == id)
        .map(|t| PopularTag { tag: t.clone(), contact_count })
    })
    .collect();
  Ok(Json(popular))
}

// ─── Delete (any kind) ────────────────────────────────────────────────────────

/// Shared delete handler for `DELETE /companies/:id`, `/groups/:id`, and
/// `/tags/:id`.
pub async fn delete_entity<S>(
  store: Arc<S>,
  kind: EntityKind,
  id: Uuid,
  user: MaybeUser,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
{
  store
    .delete_entity(EntityRef::new(kind, id))
    .await
    .map_err(ApiError::from_store)?;
  activity::record(
    &*store,
    user.actor(),
    ActivityAction::Deleted,
    TargetKind::from(kind),
    id,
    format!("deleted {kind} {id}"),
    serde_json::Value::Null,
  )
  .await;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /companies/:id`
pub async fn remove_company<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  user: MaybeUser,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
{
  delete_entity(store, EntityKind::Company, id, user).await
}

/// `DELETE /groups/:id`
pub async fn remove_group<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  user: MaybeUser,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
{
  delete_entity(store, EntityKind::Group, id, user).await
}

/// `DELETE /tags/:id`
pub async fn remove_tag<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  user: MaybeUser,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
{
  delete_entity(store, EntityKind::Tag, id, user).await
}
