//! Blogging backend service.
//!
//! Accounts register and log in with email and password; authenticated
//! users create, update, and delete posts with optional image
//! attachments; anyone can browse public posts. Private posts are
//! readable only by their author.

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod security;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

use db::{PostStore, UserStore};
use services::AssetStore;

/// Shared handler state. Stores are trait objects so tests can swap in
/// in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostStore>,
    pub users: Arc<dyn UserStore>,
    pub assets: Arc<dyn AssetStore>,
}
