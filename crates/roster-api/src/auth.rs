//! Caller identity extraction.
//!
//! The API trusts the deployment (reverse proxy or local client) to put the
//! signed-in user id in the `X-User-Id` header. Favorites and note authoring
//! require it; other mutating endpoints fall back to an anonymous actor for
//! activity attribution.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";

/// Required caller identity; rejects with 401 when the header is missing or
/// empty.
pub struct UserId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for UserId {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .headers
      .get(USER_HEADER)
      .and_then(|v| v.to_str().ok())
      .filter(|v| !v.is_empty())
      .map(|v| Self(v.to_owned()))
      .ok_or(ApiError::NotAuthenticated)
  }
}

/// Optional caller identity, for activity attribution on endpoints that do
/// not require sign-in.
pub struct MaybeUser(pub Option<String>);

impl MaybeUser {
  pub fn actor(&self) -> &str { self.0.as_deref().unwrap_or("anonymous") }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
  type Rejection = std::convert::Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    Ok(Self(
      parts
        .headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned),
    ))
  }
}
