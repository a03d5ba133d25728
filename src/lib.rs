//! # ArchiLog
//!
//! Data access and authorization for a portfolio/blog site: résumés, posts
//! with comments, and GitHub-linked projects, all kept in a path-addressed
//! JSON tree under each user's namespace. Usable both as a standalone server
//! binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! archilog = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use archilog::config::ServerConfig;
//! use archilog::server::{AppState, create_router};
//! use archilog::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), &config).unwrap());
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `archilog` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod google;
pub mod identity;
pub mod images;
pub mod markdown;
pub mod repository;
pub mod server;
pub mod store;
pub mod types;
pub mod validation;
