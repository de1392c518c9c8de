//! Core types and trait definitions for the Roster CRM.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.
//! The one runtime type it exposes is `tokio::sync::broadcast`, which
//! carries the change feed (see [`feed`]).

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod assign;
pub mod contact;
pub mod entity;
pub mod error;
pub mod favorite;
pub mod feed;
pub mod note;
pub mod store;
pub mod task;
pub mod view;

pub use error::{Error, Result};
