//! Storage module for uploaded images
//!
//! `ImageStore` is the seam used by services; `MinIOImageStore` backs it
//! with an S3-compatible bucket.

mod image_store;
mod minio_client;

#[cfg(test)]
pub use image_store::MemoryImageStore;
pub use image_store::{delete_all_best_effort, image_key, ImageFolder, ImageStore};
pub use minio_client::MinIOImageStore;
