//! HTTP request handlers.

pub mod auth;
pub mod health;
pub mod posts;

use uuid::Uuid;

use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::models::User;

/// Load the account named by an authenticated request's token.
///
/// Tokens can outlive their account. A valid token for a deleted user is
/// an authentication failure, not a missing resource.
pub(crate) async fn require_user(users: &dyn UserStore, user_id: Uuid) -> Result<User> {
    users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("Account no longer exists".to_string()))
}
