pub mod access;
pub mod assets;

pub use assets::{AssetStore, S3AssetStore, UploadedImage};
