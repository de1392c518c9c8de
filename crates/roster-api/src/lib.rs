//! JSON REST API for Roster.
//!
//! Exposes an axum [`Router`] backed by any [`roster_core::store::CrmStore`].
//! TLS and session management are the deployment's responsibility; the
//! caller's identity arrives in the `X-User-Id` header (see [`auth`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", roster_api::api_router(store.clone()))
//! ```

pub mod activity;
pub mod assignments;
pub mod auth;
pub mod contacts;
pub mod entities;
pub mod error;
pub mod events;
pub mod favorites;
pub mod journal;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, patch, put},
};
use roster_core::store::CrmStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CrmStore + 'static,
{
  Router::new()
    // Contacts
    .route(
      "/contacts",
      get(contacts::list::<S>).post(contacts::create::<S>),
    )
    .route("/contacts/recent", get(contacts::recent::<S>))
    .route(
      "/contacts/{id}",
      get(contacts::get_one::<S>)
        .put(contacts::update::<S>)
        .delete(contacts::remove::<S>),
    )
    // Companies
    .route(
      "/companies",
      get(entities::list_companies::<S>).post(entities::create_company::<S>),
    )
    .route("/companies/popular", get(entities::popular_companies::<S>))
    .route(
      "/companies/{id}",
      get(entities::get_company::<S>)
        .put(entities::update_company::<S>)
        .delete(entities::remove_company::<S>),
    )
    // Groups
    .route(
      "/groups",
      get(entities::list_groups::<S>).post(entities::create_group::<S>),
    )
    .route("/groups/popular", get(entities::popular_groups::<S>))
    .route(
      "/groups/{id}",
      get(entities::get_group::<S>)
        .put(entities::update_group::<S>)
        .delete(entities::remove_group::<S>),
    )
    .route("/groups/{id}/summary", get(entities::group_summary::<S>))
    // Tags
    .route(
      "/tags",
      get(entities::list_tags::<S>).post(entities::create_tag::<S>),
    )
    .route("/tags/popular", get(entities::popular_tags::<S>))
    .route(
      "/tags/{id}",
      get(entities::get_tag::<S>)
        .put(entities::update_tag::<S>)
        .delete(entities::remove_tag::<S>),
    )
    // Assignments
    .route(
      "/entities/{kind}/{id}/contacts",
      get(assignments::assigned::<S>),
    )
    .route(
      "/entities/{kind}/{id}/eligible",
      get(assignments::eligible::<S>),
    )
    .route(
      "/entities/{kind}/{id}/contacts/{contact_id}",
      put(assignments::add::<S>).delete(assignments::remove::<S>),
    )
    // Favorites
    .route("/favorites/{kind}", get(favorites::list::<S>))
    .route(
      "/favorites/{kind}/{id}",
      put(favorites::add::<S>).delete(favorites::remove::<S>),
    )
    // Notes and tasks
    .route(
      "/entities/{kind}/{id}/notes",
      get(journal::list_notes::<S>).post(journal::create_note::<S>),
    )
    .route("/notes/{id}", delete(journal::remove_note::<S>))
    .route(
      "/entities/{kind}/{id}/tasks",
      get(journal::list_tasks::<S>).post(journal::create_task::<S>),
    )
    .route(
      "/tasks/{id}",
      patch(journal::set_task_done::<S>).delete(journal::remove_task::<S>),
    )
    // Activity
    .route("/activity", get(activity::recent::<S>))
    // Change feed
    .route("/events", get(events::handler::<S>))
    .with_state(store)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use roster_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn test_router() -> Router {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    api_router(store)
  }

  async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
      builder = builder.header(crate::auth::USER_HEADER, user);
    }
    let request = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn id_of(value: &Value, field: &str) -> String {
    value[field].as_str().unwrap().to_string()
  }

  // ── Contacts ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_and_get_contact() {
    let router = test_router().await;

    let (status, created) = send(
      &router,
      "POST",
      "/contacts",
      Some("mara"),
      Some(json!({ "name": "Alice", "email": "alice@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = id_of(&created, "contact_id");
    let (status, fetched) =
      send(&router, "GET", &format!("/contacts/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["contact"]["name"], "Alice");
    assert!(fetched["company"].is_null());
    assert!(fetched["tags"].as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn get_missing_contact_returns_404() {
    let router = test_router().await;
    let (status, _) = send(
      &router,
      "GET",
      &format!("/contacts/{}", uuid::Uuid::new_v4()),
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn contact_list_is_favorites_first() {
    let router = test_router().await;

    send(
      &router,
      "POST",
      "/contacts",
      None,
      Some(json!({ "name": "Bob" })),
    )
    .await;
    let (_, ann) = send(
      &router,
      "POST",
      "/contacts",
      None,
      Some(json!({ "name": "Ann" })),
    )
    .await;

    let ann_id = id_of(&ann, "contact_id");
    let (status, _) = send(
      &router,
      "PUT",
      &format!("/contacts/{ann_id}"),
      Some("mara"),
      Some(json!({ "favorite": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = send(&router, "GET", "/contacts", None, None).await;
    let names: Vec<&str> = list
      .as_array()
      .unwrap()
      .iter()
      .map(|c| c["contact"]["name"].as_str().unwrap())
      .collect();
    assert_eq!(names, ["Ann", "Bob"]);
  }

  // ── Assignments ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn assign_query_and_eligibility_flow() {
    let router = test_router().await;

    let (_, contact) = send(
      &router,
      "POST",
      "/contacts",
      None,
      Some(json!({ "name": "Alice" })),
    )
    .await;
    let contact_id = id_of(&contact, "contact_id");

    let (_, founders) = send(
      &router,
      "POST",
      "/groups",
      None,
      Some(json!({ "name": "Founders" })),
    )
    .await;
    let founders_id = id_of(&founders, "group_id");
    let (_, investors) = send(
      &router,
      "POST",
      "/groups",
      None,
      Some(json!({ "name": "Investors" })),
    )
    .await;
    let investors_id = id_of(&investors, "group_id");

    // Initially eligible for Founders.
    let (_, eligible) = send(
      &router,
      "GET",
      &format!("/entities/group/{founders_id}/eligible"),
      None,
      None,
    )
    .await;
    assert_eq!(eligible.as_array().unwrap().len(), 1);

    // Assign.
    let (status, _) = send(
      &router,
      "PUT",
      &format!("/entities/group/{founders_id}/contacts/{contact_id}"),
      Some("mara"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Assigned list includes the contact exactly once.
    let (_, assigned) = send(
      &router,
      "GET",
      &format!("/entities/group/{founders_id}/contacts"),
      None,
      None,
    )
    .await;
    let assigned = assigned.as_array().unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0]["contact"]["contact_id"], contact_id.as_str());

    // A grouped contact is not eligible for another group.
    let (_, eligible) = send(
      &router,
      "GET",
      &format!("/entities/group/{investors_id}/eligible"),
      None,
      None,
    )
    .await;
    assert!(eligible.as_array().unwrap().is_empty());

    // Duplicate assignment conflicts.
    let (status, _) = send(
      &router,
      "PUT",
      &format!("/entities/group/{founders_id}/contacts/{contact_id}"),
      Some("mara"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Unassign, then the assigned list is empty again.
    let (status, _) = send(
      &router,
      "DELETE",
      &format!("/entities/group/{founders_id}/contacts/{contact_id}"),
      Some("mara"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, assigned) = send(
      &router,
      "GET",
      &format!("/entities/group/{founders_id}/contacts"),
      None,
      None,
    )
    .await;
    assert!(assigned.as_array().unwrap().is_empty());
  }

  // ── Favorites ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn favorites_require_identity() {
    let router = test_router().await;
    let (status, _) = send(&router, "GET", "/favorites/tag", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn favorite_roundtrip_and_duplicate_conflict() {
    let router = test_router().await;

    let (_, tag) = send(
      &router,
      "POST",
      "/tags",
      None,
      Some(json!({ "name": "vip", "color": "#e5484d" })),
    )
    .await;
    let tag_id = id_of(&tag, "tag_id");

    let (status, _) = send(
      &router,
      "PUT",
      &format!("/favorites/tag/{tag_id}"),
      Some("mara"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, pins) =
      send(&router, "GET", "/favorites/tag", Some("mara"), None).await;
    assert_eq!(pins.as_array().unwrap().len(), 1);

    // The duplicate surfaces here; swallowing it is the tracker's job.
    let (status, _) = send(
      &router,
      "PUT",
      &format!("/favorites/tag/{tag_id}"),
      Some("mara"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
      &router,
      "DELETE",
      &format!("/favorites/tag/{tag_id}"),
      Some("mara"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, pins) =
      send(&router, "GET", "/favorites/tag", Some("mara"), None).await;
    assert!(pins.as_array().unwrap().is_empty());
  }

  // ── Activity ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn mutations_append_activity_entries() {
    let router = test_router().await;

    send(
      &router,
      "POST",
      "/contacts",
      Some("mara"),
      Some(json!({ "name": "Alice" })),
    )
    .await;

    let (status, feed) = send(&router, "GET", "/activity", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["actor"], "mara");
    assert_eq!(feed[0]["action"], "created");
    assert_eq!(feed[0]["description"], "created contact Alice");
  }

  // ── Aggregates ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn popular_groups_endpoint_ranks_and_limits() {
    let router = test_router().await;

    let (_, big) = send(
      &router,
      "POST",
      "/groups",
      None,
      Some(json!({ "name": "Big" })),
    )
    .await;
    let big_id = id_of(&big, "group_id");
    send(
      &router,
      "POST",
      "/groups",
      None,
      Some(json!({ "name": "Small" })),
    )
    .await;

    for name in ["A", "B"] {
      let (_, c) = send(
        &router,
        "POST",
        "/contacts",
        None,
        Some(json!({ "name": name })),
      )
      .await;
      let cid = id_of(&c, "contact_id");
      send(
        &router,
        "PUT",
        &format!("/entities/group/{big_id}/contacts/{cid}"),
        None,
        None,
      )
      .await;
    }

    let (status, popular) =
      send(&router, "GET", "/groups/popular?limit=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let popular = popular.as_array().unwrap();
    assert_eq!(popular.len(), 1);
    assert_eq!(popular[0]["group"]["group_id"], big_id.as_str());
    assert_eq!(popular[0]["member_count"], 2);
    assert_eq!(popular[0]["rank"], 1);
  }

  // ── Notes and tasks ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn note_requires_identity_and_roundtrips() {
    let router = test_router().await;

    let (_, group) = send(
      &router,
      "POST",
      "/groups",
      None,
      Some(json!({ "name": "Founders" })),
    )
    .await;
    let group_id = id_of(&group, "group_id");

    let (status, _) = send(
      &router,
      "POST",
      &format!("/entities/group/{group_id}/notes"),
      None,
      Some(json!({ "body": "kickoff next week" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, note) = send(
      &router,
      "POST",
      &format!("/entities/group/{group_id}/notes"),
      Some("mara"),
      Some(json!({ "body": "kickoff next week" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["author"], "mara");

    let (_, notes) = send(
      &router,
      "GET",
      &format!("/entities/group/{group_id}/notes"),
      None,
      None,
    )
    .await;
    assert_eq!(notes.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn task_done_flow() {
    let router = test_router().await;

    let (_, company) = send(
      &router,
      "POST",
      "/companies",
      None,
      Some(json!({ "name": "Acme" })),
    )
    .await;
    let company_id = id_of(&company, "company_id");

    let (status, task) = send(
      &router,
      "POST",
      &format!("/entities/company/{company_id}/tasks"),
      Some("mara"),
      Some(json!({ "title": "send follow-up" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = id_of(&task, "task_id");

    let (status, done) = send(
      &router,
      "PATCH",
      &format!("/tasks/{task_id}"),
      Some("mara"),
      Some(json!({ "done": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["done"], true);
  }
}
