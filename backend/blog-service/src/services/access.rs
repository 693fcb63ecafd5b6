//! Access decisions for posts.
//!
//! Pure functions over (post, optional identity). Token verification and
//! user resolution happen before these are called; by the time a decision
//! runs, the viewer is either a confirmed user id or absent.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Post, Visibility};

/// Decide whether `viewer` may read `post`.
///
/// Public posts are readable by anyone. Private posts are readable only by
/// their owner; anonymous viewers, unresolved identities, and foreign
/// identities are all rejected the same way.
pub fn check_view(post: &Post, viewer: Option<Uuid>) -> Result<(), AppError> {
    match post.visibility {
        Visibility::Public => Ok(()),
        Visibility::Private if viewer == Some(post.author_id) => Ok(()),
        Visibility::Private => Err(AppError::Authorization(
            "Access denied. This post is private".to_string(),
        )),
    }
}

/// Decide whether `actor` may update `post`. Owner only.
pub fn check_update(post: &Post, actor: Uuid) -> Result<(), AppError> {
    if actor == post.author_id {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Not authorized to update this post".to_string(),
        ))
    }
}

/// Decide whether `actor` may delete `post`. Owner only.
pub fn check_delete(post: &Post, actor: Uuid) -> Result<(), AppError> {
    if actor == post.author_id {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Not authorized to delete this post".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{error::ResponseError, http::StatusCode};
    use chrono::Utc;

    fn post_with(visibility: Visibility, author_id: Uuid) -> Post {
        Post {
            id: Uuid::new_v4(),
            title: "title".to_string(),
            body: "body".to_string(),
            image: None,
            visibility,
            author_id,
            author_username: "author".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn public_post_is_readable_by_anyone() {
        let owner = Uuid::new_v4();
        let post = post_with(Visibility::Public, owner);

        assert!(check_view(&post, None).is_ok());
        assert!(check_view(&post, Some(owner)).is_ok());
        assert!(check_view(&post, Some(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn private_post_is_readable_by_owner_only() {
        let owner = Uuid::new_v4();
        let post = post_with(Visibility::Private, owner);

        assert!(check_view(&post, Some(owner)).is_ok());

        for viewer in [None, Some(Uuid::new_v4())] {
            let err = check_view(&post, viewer).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn only_the_owner_may_update() {
        let owner = Uuid::new_v4();
        let post = post_with(Visibility::Public, owner);

        assert!(check_update(&post, owner).is_ok());

        let err = check_update(&post, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn only_the_owner_may_delete() {
        let owner = Uuid::new_v4();
        // Visibility never grants mutation rights.
        let post = post_with(Visibility::Public, owner);

        assert!(check_delete(&post, owner).is_ok());

        let err = check_delete(&post, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }
}
