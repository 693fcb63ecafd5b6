//! In-memory store implementations and fixtures for exercising the HTTP
//! surface without PostgreSQL or S3.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use blog_service::db::{PostStore, UserStore};
use blog_service::error::{AppError, Result};
use blog_service::models::{NewPost, NewUser, Post, PostPatch, User, Visibility};
use blog_service::security::token;
use blog_service::services::{AssetStore, UploadedImage};
use blog_service::AppState;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Install the signing secret, tolerating repeat calls from parallel
/// tests in the same binary.
pub fn init_token_keys() {
    let _ = token::initialize_keys(TEST_JWT_SECRET);
}

/// `Authorization` header value for the given user.
pub fn bearer(user_id: Uuid) -> String {
    format!(
        "Bearer {}",
        token::generate_token(user_id).expect("token generation")
    )
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    /// When set, every lookup fails as if the database were down.
    pub fail_lookups: AtomicBool,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn remove(&self, id: Uuid) {
        self.users.lock().unwrap().remove(&id);
    }

    fn username_of(&self, id: Uuid) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .get(&id)
            .map(|u| u.username.clone())
    }

    fn check_available(&self) -> Result<()> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(AppError::Internal("user store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        self.check_available()?;
        let user = User {
            id: new_user.id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };
        self.insert(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.check_available()?;
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.check_available()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .any(|u| u.username == username))
    }
}

pub struct InMemoryPostStore {
    posts: Mutex<HashMap<Uuid, Post>>,
    users: Arc<InMemoryUserStore>,
}

impl InMemoryPostStore {
    pub fn new(users: Arc<InMemoryUserStore>) -> Self {
        Self {
            posts: Mutex::new(HashMap::new()),
            users,
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.posts.lock().unwrap().contains_key(&id)
    }

    pub fn count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn create(&self, new_post: NewPost) -> Result<Post> {
        let author_username = self
            .users
            .username_of(new_post.author_id)
            .unwrap_or_else(|| "unknown".to_string());
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: new_post.title,
            body: new_post.body,
            image: new_post.image,
            visibility: new_post.visibility,
            author_id: new_post.author_id,
            author_username,
            created_at: now,
            updated_at: now,
        };
        self.posts.lock().unwrap().insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.lock().unwrap().get(&id).cloned())
    }

    async fn list_public(&self) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.visibility == Visibility::Public)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn update(&self, id: Uuid, patch: PostPatch) -> Result<Post> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(body) = patch.body {
            post.body = body;
        }
        if let Some(image) = patch.image {
            post.image = Some(image);
        }
        if let Some(visibility) = patch.visibility {
            post.visibility = visibility;
        }
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.posts
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }
}

/// Asset store that records every call instead of talking to S3.
#[derive(Default)]
pub struct RecordingAssetStore {
    stored: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    /// When set, uploads fail as if the backing store were down.
    pub fail_stores: AtomicBool,
    /// When set, deletes fail as if the backing store were down.
    pub fail_deletes: AtomicBool,
    counter: AtomicUsize,
}

impl RecordingAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored_references(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }

    pub fn deleted_references(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for RecordingAssetStore {
    async fn store(&self, image: UploadedImage) -> Result<String> {
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(AppError::Asset("simulated outage".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let reference = format!("https://assets.test/blog-images/{}-{}", n, image.filename);
        self.stored.lock().unwrap().push(reference.clone());
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Asset("simulated outage".to_string()));
        }
        self.deleted.lock().unwrap().push(reference.to_string());
        Ok(())
    }
}

/// Shared state plus handles onto the concrete fakes behind it.
pub struct TestContext {
    pub state: AppState,
    pub users: Arc<InMemoryUserStore>,
    pub posts: Arc<InMemoryPostStore>,
    pub assets: Arc<RecordingAssetStore>,
}

pub fn test_context() -> TestContext {
    init_token_keys();
    let users = Arc::new(InMemoryUserStore::new());
    let posts = Arc::new(InMemoryPostStore::new(users.clone()));
    let assets = Arc::new(RecordingAssetStore::new());
    let state = AppState {
        posts: posts.clone(),
        users: users.clone(),
        assets: assets.clone(),
    };
    TestContext {
        state,
        users,
        posts,
        assets,
    }
}

pub fn seed_user(ctx: &TestContext, username: &str, email: &str) -> User {
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: "unused-in-post-tests".to_string(),
        created_at: Utc::now(),
    };
    ctx.users.insert(user.clone());
    user
}

pub async fn seed_post(
    ctx: &TestContext,
    author: &User,
    title: &str,
    visibility: Visibility,
    image: Option<&str>,
) -> Post {
    ctx.posts
        .create(NewPost {
            title: title.to_string(),
            body: format!("{} body", title),
            image: image.map(str::to_string),
            visibility,
            author_id: author.id,
        })
        .await
        .expect("seed post")
}

/// Minimal `multipart/form-data` encoder for request bodies.
pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("----test-boundary-{}", Uuid::new_v4().simple()),
            buf: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, filename, content_type
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// Terminate the body; returns the `Content-Type` header value and
    /// the encoded payload.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        let content_type = format!("multipart/form-data; boundary={}", self.boundary);
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (content_type, self.buf)
    }
}
