//! Post CRUD handlers.
//!
//! Mutations follow a fixed sequence: validate the form, authorize the
//! actor, then touch storage. Image bytes are uploaded before the post
//! record is written, and replaced or orphaned images are removed
//! best-effort so a storage hiccup never fails the request that
//! triggered the cleanup.

use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::db::UserStore;
use crate::error::{AppError, ErrorResponse, Result};
use crate::middleware::UserId;
use crate::models::{MessageResponse, NewPost, PostPatch, PostResponse, Visibility};
use crate::security::token;
use crate::services::{access, UploadedImage};
use crate::AppState;

/// Longest accepted title, counted in characters after trimming.
const MAX_TITLE_CHARS: usize = 200;
/// Upload cap for a single image.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Content types accepted for post images.
const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Raw multipart fields before validation.
#[derive(Debug, Default)]
struct PostForm {
    title: Option<String>,
    body: Option<String>,
    visibility: Option<String>,
    image: Option<UploadedImage>,
}

async fn read_post_form(mut payload: Multipart) -> Result<PostForm> {
    let mut form = PostForm::default();

    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "title" => form.title = Some(read_text_field(&mut field).await?),
            "body" => form.body = Some(read_text_field(&mut field).await?),
            "visibility" => form.visibility = Some(read_text_field(&mut field).await?),
            "image" => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or("upload")
                    .to_string();
                let content_type = field
                    .content_type()
                    .map(|mime| mime.essence_str().to_string())
                    .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
                let data = read_image_field(&mut field).await?;
                // Browsers send an empty part when no file was picked.
                if !data.is_empty() {
                    form.image = Some(UploadedImage {
                        filename,
                        content_type,
                        data,
                    });
                }
            }
            _ => {
                // Unknown parts are drained and ignored.
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
                }
            }
        }
    }

    Ok(form)
}

async fn read_text_field(field: &mut Field) -> Result<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
        buf.extend_from_slice(&data);
    }
    String::from_utf8(buf)
        .map_err(|_| AppError::BadRequest("Form field must be valid UTF-8".to_string()))
}

async fn read_image_field(field: &mut Field) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
        if buf.len() + data.len() > MAX_IMAGE_BYTES {
            return Err(single_field_error("image", "size", "Image must be 5 MiB or smaller").into());
        }
        buf.extend_from_slice(&data);
    }
    Ok(buf)
}

fn add_field_error(
    errors: &mut ValidationErrors,
    field: &'static str,
    code: &'static str,
    message: &'static str,
) {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    errors.add(field, error);
}

fn single_field_error(
    field: &'static str,
    code: &'static str,
    message: &'static str,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    add_field_error(&mut errors, field, code, message);
    errors
}

/// Validated fields for a new post.
#[derive(Debug)]
struct NewPostInput {
    title: String,
    body: String,
    visibility: Visibility,
}

fn validate_new_post(form: &PostForm) -> Result<NewPostInput> {
    let mut errors = ValidationErrors::new();

    let title = form.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        add_field_error(&mut errors, "title", "required", "Title is required");
    } else if title.chars().count() > MAX_TITLE_CHARS {
        add_field_error(
            &mut errors,
            "title",
            "length",
            "Title cannot exceed 200 characters",
        );
    }

    let body = form.body.clone().unwrap_or_default();
    if body.is_empty() {
        add_field_error(&mut errors, "body", "required", "Body is required");
    }

    let visibility = match form.visibility.as_deref() {
        None => Visibility::Public,
        Some(raw) => match Visibility::parse(raw) {
            Some(v) => v,
            None => {
                add_field_error(
                    &mut errors,
                    "visibility",
                    "one_of",
                    "Visibility must be either public or private",
                );
                Visibility::Public
            }
        },
    };

    check_image_type(form, &mut errors);

    if !errors.is_empty() {
        return Err(errors.into());
    }

    Ok(NewPostInput {
        title,
        body,
        visibility,
    })
}

/// Build a partial update from the form. Blank title and body values are
/// treated as absent rather than as attempts to clear the field.
fn validate_patch(form: &PostForm) -> Result<PostPatch> {
    let mut errors = ValidationErrors::new();
    let mut patch = PostPatch::default();

    if let Some(raw) = &form.title {
        let title = raw.trim();
        if title.chars().count() > MAX_TITLE_CHARS {
            add_field_error(
                &mut errors,
                "title",
                "length",
                "Title cannot exceed 200 characters",
            );
        } else if !title.is_empty() {
            patch.title = Some(title.to_string());
        }
    }

    if let Some(body) = &form.body {
        if !body.is_empty() {
            patch.body = Some(body.clone());
        }
    }

    if let Some(raw) = &form.visibility {
        match Visibility::parse(raw) {
            Some(v) => patch.visibility = Some(v),
            None => add_field_error(
                &mut errors,
                "visibility",
                "one_of",
                "Visibility must be either public or private",
            ),
        }
    }

    check_image_type(form, &mut errors);

    if !errors.is_empty() {
        return Err(errors.into());
    }

    Ok(patch)
}

fn check_image_type(form: &PostForm, errors: &mut ValidationErrors) {
    if let Some(image) = &form.image {
        if !ALLOWED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
            add_field_error(
                errors,
                "image",
                "content_type",
                "Image must be a JPEG, PNG, GIF, or WebP file",
            );
        }
    }
}

/// A path segment that is not a UUID names no post.
fn parse_post_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Post not found".to_string()))
}

/// Resolve the identity presented on an optional-auth route.
///
/// Missing header, bad scheme, invalid token, unknown user, and store
/// failures all resolve to `None`; the caller treats those the same as
/// an anonymous viewer.
async fn resolve_optional_viewer(req: &HttpRequest, users: &dyn UserStore) -> Option<Uuid> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let token_value = header.strip_prefix("Bearer ")?;
    let user_id = token::user_id_from_token(token_value).ok()?;

    match users.find_by_id(user_id).await {
        Ok(Some(user)) => Some(user.id),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(error = %e, "viewer lookup failed, treating request as anonymous");
            None
        }
    }
}

/// List all public posts.
#[utoipa::path(
    get,
    path = "/posts",
    tag = "Posts",
    responses(
        (status = 200, description = "Public posts, newest first", body = [PostResponse])
    )
)]
pub async fn list_posts(state: web::Data<AppState>) -> Result<HttpResponse> {
    let posts = state.posts.list_public().await?;
    let response: Vec<PostResponse> = posts.into_iter().map(PostResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// List every post owned by the authenticated user.
#[utoipa::path(
    get,
    path = "/posts/my",
    tag = "Posts",
    responses(
        (status = 200, description = "The caller's posts, newest first", body = [PostResponse]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn list_my_posts(state: web::Data<AppState>, user_id: UserId) -> Result<HttpResponse> {
    let user = super::require_user(state.users.as_ref(), user_id.0).await?;

    let posts = state.posts.list_by_author(user.id).await?;
    let response: Vec<PostResponse> = posts.into_iter().map(PostResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// Fetch a single post, enforcing visibility.
///
/// Public posts are returned to anyone. Private posts are returned only
/// when the request carries a valid token for the post's author; every
/// other case is Forbidden, so a 403 does not reveal more than the 404
/// for a missing id already would.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "The post", body = PostResponse),
        (status = 403, description = "Post is private and the caller is not its author", body = ErrorResponse),
        (status = 404, description = "No post with this ID", body = ErrorResponse)
    )
)]
pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let id = parse_post_id(&path.into_inner())?;

    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if post.visibility == Visibility::Private {
        let viewer = resolve_optional_viewer(&req, state.users.as_ref()).await;
        access::check_view(&post, viewer)?;
    }

    Ok(HttpResponse::Ok().json(PostResponse::from(post)))
}

/// Create a post from a `multipart/form-data` body with `title`, `body`,
/// optional `visibility` and optional `image` parts.
#[utoipa::path(
    post,
    path = "/posts",
    tag = "Posts",
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn create_post(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: Multipart,
) -> Result<HttpResponse> {
    let author = super::require_user(state.users.as_ref(), user_id.0).await?;

    let form = read_post_form(payload).await?;
    let input = validate_new_post(&form)?;

    // Upload before writing the record so a failed upload leaves no post
    // behind.
    let image = match form.image {
        Some(image) => Some(state.assets.store(image).await?),
        None => None,
    };

    let post = state
        .posts
        .create(NewPost {
            title: input.title,
            body: input.body,
            image,
            visibility: input.visibility,
            author_id: author.id,
        })
        .await?;

    tracing::info!(post_id = %post.id, author_id = %post.author_id, "post created");
    Ok(HttpResponse::Created().json(PostResponse::from(post)))
}

/// Update any subset of a post's fields.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Updated post", body = PostResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller is not the author", body = ErrorResponse),
        (status = 404, description = "No post with this ID", body = ErrorResponse)
    )
)]
pub async fn update_post(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let id = parse_post_id(&path.into_inner())?;
    let actor = super::require_user(state.users.as_ref(), user_id.0).await?;

    let form = read_post_form(payload).await?;
    let mut patch = validate_patch(&form)?;

    let existing = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    access::check_update(&existing, actor.id)?;

    if let Some(image) = form.image {
        // Replacement drops the old image first, best-effort, then the
        // new reference lands with the record update.
        if let Some(old) = &existing.image {
            if let Err(e) = state.assets.delete(old).await {
                tracing::warn!(error = %e, post_id = %existing.id, "failed to delete replaced image");
            }
        }
        patch.image = Some(state.assets.store(image).await?);
    }

    let post = if patch.is_empty() {
        existing
    } else {
        state.posts.update(id, patch).await?
    };

    Ok(HttpResponse::Ok().json(PostResponse::from(post)))
}

/// Delete a post and its stored image.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller is not the author", body = ErrorResponse),
        (status = 404, description = "No post with this ID", body = ErrorResponse)
    )
)]
pub async fn delete_post(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = parse_post_id(&path.into_inner())?;
    let actor = super::require_user(state.users.as_ref(), user_id.0).await?;

    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    access::check_delete(&post, actor.id)?;

    // Image cleanup is best-effort; the record goes away regardless.
    if let Some(image) = &post.image {
        if let Err(e) = state.assets.delete(image).await {
            tracing::warn!(error = %e, post_id = %post.id, "failed to delete post image");
        }
    }

    state.posts.delete(id).await?;

    tracing::info!(post_id = %post.id, "post deleted");
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Post deleted successfully".to_string(),
    }))
}
