//! Context Keeper: backend for saving and restoring browser workspaces.
//!
//! A workspace is a named snapshot of open tabs owned by one user; groups are
//! user-defined labels. Every operation is scoped to the caller verified by
//! the bearer-token gate in [`rest`].
//!
//! - `storage`: gateway trait plus SQL, row-level REST, and in-memory backends
//! - `workspaces` / `groups`: validation and ownership rules over a gateway
//! - `rest`: Axum router, auth middleware, OpenAPI document

pub mod auth;
pub mod config;
pub mod error;
pub mod groups;
pub mod models;
// REST API module: Axum HTTP handlers mounted under /api
pub mod rest;
pub mod storage;
pub mod telemetry;
pub mod workspaces;
