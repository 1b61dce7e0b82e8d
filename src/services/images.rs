use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{metadata::is_absolute_http_url, CoverImage, StoredImage},
    services::gateway::MetadataGateway,
};

/// Validation message bound to a single form field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn cover_image(message: &str) -> Self {
        Self {
            field: "coverImage",
            message: message.to_string(),
        }
    }
}

/// Cover image download and retrieval through the remote image store
#[derive(Clone)]
pub struct ImageService {
    gateway: Arc<dyn MetadataGateway>,
    api_base_url: String,
}

impl ImageService {
    pub fn new(gateway: Arc<dyn MetadataGateway>, api_base_url: impl Into<String>) -> Self {
        Self {
            gateway,
            api_base_url: api_base_url.into(),
        }
    }

    /// Copies an external image into the store.
    ///
    /// A malformed URL is rejected before any request is made.
    pub async fn download_cover(&self, raw_url: &str) -> Result<StoredImage, FieldError> {
        let url = raw_url.trim();
        if !is_absolute_http_url(url) {
            return Err(FieldError::cover_image("Please enter a valid image URL."));
        }

        match self.gateway.download_image(url).await {
            Ok(image) => {
                tracing::info!(image_id = %image.id, "Cover image stored");
                Ok(image)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Image download failed");
                Err(FieldError::cover_image(
                    "Failed to download image. Please check the URL.",
                ))
            }
        }
    }

    /// Image bytes for a stored cover. External covers are loaded from their
    /// own URL and are not proxied.
    pub async fn fetch(&self, cover: &CoverImage) -> AppResult<Vec<u8>> {
        match cover {
            CoverImage::Stored(id) => self.gateway.get_image(id).await,
            CoverImage::External(url) => Err(AppError::InvalidInput(format!(
                "{} is an external image",
                url
            ))),
        }
    }

    pub fn resolve(&self, cover: &CoverImage) -> String {
        cover.resolve(&self.api_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateway::MockMetadataGateway;

    #[tokio::test]
    async fn test_malformed_url_never_reaches_gateway() {
        let mut gateway = MockMetadataGateway::new();
        gateway.expect_download_image().never();
        let images = ImageService::new(Arc::new(gateway), "http://localhost:8080");

        let err = images.download_cover("not a url").await.unwrap_err();
        assert_eq!(err.field, "coverImage");
        assert_eq!(err.message, "Please enter a valid image URL.");
    }

    #[tokio::test]
    async fn test_failed_download_becomes_field_message() {
        let mut gateway = MockMetadataGateway::new();
        gateway
            .expect_download_image()
            .withf(|value| value == "https://img.test/poster.jpg")
            .returning(|_| {
                Err(AppError::Remote {
                    status: 400,
                    message: "Failed to download image".to_string(),
                })
            });
        let images = ImageService::new(Arc::new(gateway), "http://localhost:8080");

        let err = images
            .download_cover(" https://img.test/poster.jpg ")
            .await
            .unwrap_err();
        assert_eq!(err.message, "Failed to download image. Please check the URL.");
    }

    #[tokio::test]
    async fn test_fetch_stored_image_bytes() {
        let mut gateway = MockMetadataGateway::new();
        gateway
            .expect_get_image()
            .withf(|value| value == "img-1")
            .returning(|_| Ok(vec![0xFF, 0xD8, 0xFF]));
        let images = ImageService::new(Arc::new(gateway), "http://localhost:8080");

        let bytes = images
            .fetch(&CoverImage::Stored("img-1".to_string()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);

        let external = CoverImage::External("https://img.test/p.jpg".to_string());
        assert!(images.fetch(&external).await.is_err());
        assert_eq!(images.resolve(&external), "https://img.test/p.jpg");
    }
}
