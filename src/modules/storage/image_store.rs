use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::AppError;

/// Folder an uploaded image belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFolder {
    Reports,
    Alerts,
}

impl ImageFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFolder::Reports => "reports",
            ImageFolder::Alerts => "alerts",
        }
    }
}

/// Object key for a new image, relative to the store's public prefix
pub fn image_key(folder: ImageFolder, extension: &str) -> String {
    format!("{}/{}.{}", folder.as_str(), Uuid::now_v7(), extension)
}

/// External storage for uploaded images
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores the bytes under `key` and returns the public URL
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str)
        -> Result<String, AppError>;

    /// Removes the object behind a URL previously returned by `upload`.
    /// URLs that do not belong to this store are ignored.
    async fn delete_by_url(&self, url: &str) -> Result<(), AppError>;
}

/// Deletes every URL, logging failures. Used to clean up after rollbacks and deletes.
pub async fn delete_all_best_effort(store: &dyn ImageStore, urls: &[String]) {
    for url in urls {
        if let Err(e) = store.delete_by_url(url).await {
            tracing::warn!("Failed to delete stored image {}: {}", url, e);
        }
    }
}

/// In-process store backing router and service tests
#[cfg(test)]
pub use memory::MemoryImageStore;

#[cfg(test)]
mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryImageStore {
        objects: Mutex<HashMap<String, (String, usize)>>,
    }

    const MEMORY_BASE_URL: &str = "memory://images";

    impl MemoryImageStore {
        pub fn len(&self) -> usize {
            self.objects.lock().map(|o| o.len()).unwrap_or(0)
        }
    }

    #[async_trait]
    impl ImageStore for MemoryImageStore {
        async fn upload(
            &self,
            key: &str,
            data: Vec<u8>,
            content_type: &str,
        ) -> Result<String, AppError> {
            let url = format!("{}/{}", MEMORY_BASE_URL, key);
            self.objects
                .lock()
                .map_err(|_| AppError::Internal("Image store lock poisoned".to_string()))?
                .insert(url.clone(), (content_type.to_string(), data.len()));
            Ok(url)
        }

        async fn delete_by_url(&self, url: &str) -> Result<(), AppError> {
            self.objects
                .lock()
                .map_err(|_| AppError::Internal("Image store lock poisoned".to_string()))?
                .remove(url);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_key_layout() {
        let key = image_key(ImageFolder::Reports, "png");
        assert!(key.starts_with("reports/"));
        assert!(key.ends_with(".png"));
        assert_ne!(key, image_key(ImageFolder::Reports, "png"));
    }

    #[tokio::test]
    async fn test_memory_store_upload_and_cleanup() {
        let store = MemoryImageStore::default();
        let a = tokio_test::assert_ok!(
            store
                .upload("alerts/a.png", vec![1, 2, 3], "image/png")
                .await
        );
        let b = tokio_test::assert_ok!(store.upload("alerts/b.gif", vec![4], "image/gif").await);
        assert_eq!(store.len(), 2);

        delete_all_best_effort(&store, &[a, b]).await;
        assert_eq!(store.len(), 0);
    }
}
