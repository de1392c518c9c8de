//! Error type for `roster-store-sqlite`.

use roster_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] roster_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decode error: {0}")]
  Decode(String),
}

impl StoreError for Error {
  fn is_duplicate_pin(&self) -> bool {
    matches!(self, Error::Core(e) if e.is_duplicate_pin())
  }

  fn is_conflict(&self) -> bool {
    matches!(self, Error::Core(e) if e.is_conflict())
  }

  fn is_not_found(&self) -> bool {
    matches!(self, Error::Core(e) if e.is_not_found())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
