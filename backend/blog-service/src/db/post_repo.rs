//! PostgreSQL implementation of [`PostStore`].
//!
//! Every read joins `users` so the author's display name travels with the
//! post row; list queries lean on the `(author_id, created_at)` and
//! `(visibility, created_at)` indexes.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::PostStore;
use crate::error::{AppError, Result};
use crate::models::{NewPost, Post, PostPatch, Visibility};

const SELECT_POST: &str = r#"
    SELECT p.id, p.title, p.body, p.image, p.visibility, p.author_id,
           u.username AS author_username, p.created_at, p.updated_at
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_joined(&self, id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!("{SELECT_POST} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn create(&self, new_post: NewPost) -> Result<Post> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO posts (title, body, image, visibility, author_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&new_post.title)
        .bind(&new_post.body)
        .bind(&new_post.image)
        .bind(new_post.visibility)
        .bind(new_post.author_id)
        .fetch_one(&self.pool)
        .await?;

        self.fetch_joined(id)
            .await?
            .ok_or_else(|| AppError::Internal("created post row missing".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        self.fetch_joined(id).await
    }

    async fn list_public(&self) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "{SELECT_POST} WHERE p.visibility = $1 ORDER BY p.created_at DESC"
        ))
        .bind(Visibility::Public)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "{SELECT_POST} WHERE p.author_id = $1 ORDER BY p.created_at DESC"
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn update(&self, id: Uuid, patch: PostPatch) -> Result<Post> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                body = COALESCE($3, body),
                image = COALESCE($4, image),
                visibility = COALESCE($5, visibility),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.body)
        .bind(&patch.image)
        .bind(patch.visibility)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        self.fetch_joined(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        Ok(())
    }
}
