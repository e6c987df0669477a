//! # Rollcall Sync Server
//!
//! Transport-agnostic request handling for the Rollcall authority.
//!
//! This crate provides:
//! - [`SyncServer`], which wraps a [`SyncEngine`](rollcall_core::SyncEngine)
//!   and answers push and pull requests
//! - per-request limits ([`ServerConfig`]) applied before the engine sees a
//!   request
//! - [`ServerError`], which maps engine failures onto wire error replies with
//!   a retry hint
//!
//! # Protocol
//!
//! Clients synchronize pull-then-push, one collection at a time:
//! 1. Client pulls changes after its stored watermark, page by page
//! 2. Client applies them locally under the version rule
//! 3. Client pushes its pending changes; the server reports accepted, stale
//!    and dropped counts
//!
//! Binding a socket is left to the embedding application; it hands decoded
//! messages (or raw CBOR bytes) to [`SyncServer::handle_message`] or
//! [`SyncServer::handle_bytes`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::SyncServer;
