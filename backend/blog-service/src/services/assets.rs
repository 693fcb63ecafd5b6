//! Image storage behind the [`AssetStore`] trait.
//!
//! The S3 implementation uploads under a fixed prefix and hands back a
//! public URL as the stored reference. Deletion takes that same reference
//! and recovers the object key from its path.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use uuid::Uuid;

use crate::config::S3Config;
use crate::error::{AppError, Result};

const UPLOAD_PREFIX: &str = "blog-images";

/// An uploaded file collected from a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Stores uploaded images and deletes them by the reference it returned.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store an image and return a retrievable URL reference.
    async fn store(&self, image: UploadedImage) -> Result<String>;

    /// Delete a previously stored image by its reference.
    async fn delete(&self, reference: &str) -> Result<()>;
}

/// S3-compatible implementation of [`AssetStore`].
pub struct S3AssetStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3AssetStore {
    /// Build the client from configuration. Static credentials and a custom
    /// endpoint are optional; without them the default AWS chain applies.
    pub async fn new(config: &S3Config) -> Self {
        use aws_sdk_s3::config::Region;

        let mut aws_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            use aws_sdk_s3::config::Credentials;

            let credentials =
                Credentials::new(access_key_id, secret_access_key, None, None, "blog_service_s3");

            aws_config_builder = aws_config_builder.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            aws_config_builder = aws_config_builder.endpoint_url(endpoint);
        }

        let aws_config = aws_config_builder.load().await;

        // Path-style URLs for custom endpoints (MinIO), virtual-hosted
        // otherwise.
        let public_base_url = match &config.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", config.bucket, config.region),
        };

        S3AssetStore {
            client: Client::new(&aws_config),
            bucket: config.bucket.clone(),
            public_base_url,
        }
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn store(&self, image: UploadedImage) -> Result<String> {
        let key = format!("{}/{}.{}", UPLOAD_PREFIX, Uuid::new_v4(), extension_for(&image));

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(image.data))
            .content_type(&image.content_type)
            .send()
            .await
            .map_err(|e| AppError::Asset(format!("S3 upload failed: {e}")))?;

        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        let key = object_key_from_reference(reference)
            .ok_or_else(|| AppError::Asset(format!("unrecognized image reference: {reference}")))?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| AppError::Asset(format!("S3 delete failed: {e}")))?;

        Ok(())
    }
}

/// Recover the object key from a stored reference URL.
///
/// Keys always have the shape `blog-images/<name>`, so the last two path
/// segments are the key, whether the URL is virtual-hosted
/// (`https://bucket.s3.region.amazonaws.com/blog-images/x.jpg`) or
/// path-style (`http://minio:9000/bucket/blog-images/x.jpg`).
fn object_key_from_reference(reference: &str) -> Option<String> {
    let without_scheme = reference
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(reference);

    let mut segments: Vec<&str> = without_scheme.split('/').filter(|s| !s.is_empty()).collect();
    // Host plus at least the two key segments.
    if segments.len() < 3 {
        return None;
    }

    let name = segments.pop()?;
    let prefix = segments.pop()?;
    Some(format!("{prefix}/{name}"))
}

fn extension_for(image: &UploadedImage) -> &'static str {
    match image.content_type.as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}
