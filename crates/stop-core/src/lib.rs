//! Core types and trait definitions for the STOP record store.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the fixed table schema, the `content://` addressing scheme, the change
//! notifier, and the [`store::ResourceStore`] abstraction that backends
//! implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod authority;
pub mod error;
pub mod notify;
pub mod schema;
pub mod store;
pub mod uri;
pub mod value;

pub use error::{Error, FailureKind, Result, StoreFailure};
