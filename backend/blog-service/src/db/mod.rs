//! Database access layer.
//!
//! Stores are trait objects injected through [`crate::AppState`], which is
//! what lets the HTTP layer run against in-memory fakes in tests. The
//! PostgreSQL implementations live in the `*_repo` modules.

pub mod post_repo;
pub mod user_repo;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewPost, NewUser, Post, PostPatch, User};

pub use post_repo::PgPostStore;
pub use user_repo::PgUserStore;

/// Persistence operations for posts.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a post record and return it with the author name attached.
    async fn create(&self, new_post: NewPost) -> Result<Post>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>>;

    /// All public posts, newest first.
    async fn list_public(&self) -> Result<Vec<Post>>;

    /// All posts by one author regardless of visibility, newest first.
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>>;

    /// Apply a partial update; `None` fields keep their stored value.
    async fn update(&self, id: Uuid, patch: PostPatch) -> Result<Post>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Persistence operations for users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    async fn username_exists(&self, username: &str) -> Result<bool>;
}
