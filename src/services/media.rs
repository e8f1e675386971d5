//! Media service
//!
//! Uploads are written to the configured upload directory and served from
//! `/uploads/<file>`. When a Cloudinary cloud name is configured, images
//! that carry a public id also get transformed delivery URLs (used for the
//! archive thumbnails).

use anyhow::Context;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::db::repositories::MediaRepository;
use crate::models::{CreateMediaInput, ListParams, Media, PagedResult, UpdateMediaInput};

const CLOUDINARY_BASE: &str = "https://res.cloudinary.com";

/// Shown when an episode has neither a thumbnail nor a page image
pub const PLACEHOLDER_THUMBNAIL: &str = "/placeholder-thumbnail.jpg";

#[derive(Debug, thiserror::Error)]
pub enum MediaServiceError {
    #[error("Media not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Still referenced by an episode page
    #[error("Media {0} is used by an episode page")]
    InUse(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Raw upload as received from the multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Editor-supplied fields sent alongside an upload
#[derive(Debug, Clone, Default)]
pub struct UploadMeta {
    pub alt: String,
    pub caption: Option<String>,
    pub cloudinary_public_id: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// Cloudinary delivery transformation; unset parts are left out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageTransform {
    pub crop: Option<&'static str>,
    pub gravity: Option<&'static str>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<String>,
    pub format: Option<&'static str>,
}

impl ImageTransform {
    /// Archive card: 600x840 portrait filled around the subject
    pub fn archive_thumbnail() -> Self {
        Self {
            crop: Some("fill"),
            gravity: Some("auto"),
            width: Some(600),
            height: Some(840),
            quality: Some("auto".to_string()),
            format: Some("auto"),
        }
    }

    fn segment(&self) -> String {
        let mut parts = Vec::new();
        if let Some(crop) = self.crop {
            parts.push(format!("c_{}", crop));
        }
        if let Some(gravity) = self.gravity {
            parts.push(format!("g_{}", gravity));
        }
        if let Some(width) = self.width.filter(|w| *w > 0) {
            parts.push(format!("w_{}", width));
        }
        if let Some(height) = self.height.filter(|h| *h > 0) {
            parts.push(format!("h_{}", height));
        }
        if let Some(quality) = self.quality.as_deref().filter(|q| !q.is_empty()) {
            parts.push(format!("q_{}", quality));
        }
        if let Some(format) = self.format {
            parts.push(format!("f_{}", format));
        }
        parts.join(",")
    }
}

/// Cloudinary delivery URL, or `None` without a cloud name or public id
pub fn build_cloudinary_image_url(
    cloud_name: Option<&str>,
    public_id: &str,
    transform: &ImageTransform,
) -> Option<String> {
    let cloud_name = cloud_name.map(str::trim).filter(|c| !c.is_empty())?;
    if public_id.is_empty() {
        return None;
    }

    let encoded = public_id
        .split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    let transforms = transform.segment();
    if transforms.is_empty() {
        Some(format!("{}/{}/image/upload/{}", CLOUDINARY_BASE, cloud_name, encoded))
    } else {
        Some(format!(
            "{}/{}/image/upload/{}/{}",
            CLOUDINARY_BASE, cloud_name, transforms, encoded
        ))
    }
}

pub struct MediaService {
    repo: Arc<dyn MediaRepository>,
    upload: UploadConfig,
    cloud_name: Option<String>,
}

impl MediaService {
    pub fn new(repo: Arc<dyn MediaRepository>, upload: UploadConfig, cloud_name: Option<String>) -> Self {
        Self {
            repo,
            upload,
            cloud_name,
        }
    }

    /// Validate, store on disk and record a new upload
    pub async fn upload(&self, file: UploadedFile, meta: UploadMeta) -> Result<Media, MediaServiceError> {
        let alt = meta.alt.trim().to_string();
        if alt.is_empty() {
            return Err(MediaServiceError::ValidationError("Alt text is required".to_string()));
        }
        if !self.upload.is_type_allowed(&file.content_type) {
            return Err(MediaServiceError::ValidationError(format!(
                "Invalid file type: {}. Allowed types: {:?}",
                file.content_type, self.upload.allowed_types
            )));
        }
        if file.data.is_empty() {
            return Err(MediaServiceError::ValidationError("No file provided".to_string()));
        }
        if file.data.len() as u64 > self.upload.max_file_size {
            return Err(MediaServiceError::ValidationError(format!(
                "File too large. Maximum size: {} bytes ({} MB)",
                self.upload.max_file_size,
                self.upload.max_file_size / 1024 / 1024
            )));
        }

        fs::create_dir_all(&self.upload.path)
            .await
            .context("Failed to create upload dir")?;

        let filename = format!(
            "{}.{}",
            Uuid::new_v4().simple(),
            file_extension(&file.original_name, &self.upload, &file.content_type)
        );
        let path = self.upload.path.join(&filename);
        fs::write(&path, &file.data)
            .await
            .with_context(|| format!("Failed to save file {}", path.display()))?;

        let input = CreateMediaInput {
            alt,
            caption: meta.caption.filter(|c| !c.trim().is_empty()),
            url: format!("/uploads/{}", filename),
            filename,
            mime_type: file.content_type,
            filesize: file.data.len() as i64,
            width: meta.width,
            height: meta.height,
            cloudinary_public_id: meta
                .cloudinary_public_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        };

        match self.repo.create(&input).await {
            Ok(media) => {
                tracing::info!("Stored upload {} ({} bytes)", media.filename, media.filesize);
                Ok(media)
            }
            Err(e) => {
                remove_file_quietly(&path).await;
                Err(e.into())
            }
        }
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Media>, MediaServiceError> {
        Ok(self.repo.list(params).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Media, MediaServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(MediaServiceError::NotFound(id))
    }

    pub async fn find(&self, id: Option<i64>) -> Result<Option<Media>, MediaServiceError> {
        match id {
            Some(id) => Ok(self.repo.get_by_id(id).await?),
            None => Ok(None),
        }
    }

    pub async fn get_many(
        &self,
        ids: &[i64],
    ) -> Result<std::collections::HashMap<i64, Media>, MediaServiceError> {
        Ok(self.repo.get_many(ids).await?)
    }

    pub async fn update(&self, id: i64, input: UpdateMediaInput) -> Result<Media, MediaServiceError> {
        let mut media = self.get(id).await?;
        if let Some(alt) = input.alt {
            let alt = alt.trim().to_string();
            if alt.is_empty() {
                return Err(MediaServiceError::ValidationError("Alt text is required".to_string()));
            }
            media.alt = alt;
        }
        if let Some(caption) = input.caption {
            media.caption = caption.filter(|c| !c.trim().is_empty());
        }
        if let Some(public_id) = input.cloudinary_public_id {
            media.cloudinary_public_id = public_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty());
        }
        media.updated_at = Utc::now();
        Ok(self.repo.update(&media).await?)
    }

    /// Delete the record and its file. Images used by an episode page stay.
    pub async fn delete(&self, id: i64) -> Result<(), MediaServiceError> {
        let media = self.get(id).await?;
        if self.repo.is_used_by_episode_pages(id).await? {
            return Err(MediaServiceError::InUse(id));
        }
        self.repo.delete(id).await?;

        // Stored names are generated, never user paths
        if !media.filename.contains(['/', '\\']) {
            remove_file_quietly(&self.upload.path.join(&media.filename)).await;
        }
        Ok(())
    }

    pub fn cloudinary_url(&self, media: &Media, transform: &ImageTransform) -> Option<String> {
        let public_id = media.public_id()?;
        build_cloudinary_image_url(self.cloud_name.as_deref(), &public_id, transform)
    }

    /// Archive card image: Cloudinary thumbnail, else the stored file, else
    /// the placeholder
    pub fn archive_thumbnail_url(&self, media: Option<&Media>) -> String {
        match media {
            Some(media) => self
                .cloudinary_url(media, &ImageTransform::archive_thumbnail())
                .unwrap_or_else(|| media.url.clone()),
            None => PLACEHOLDER_THUMBNAIL.to_string(),
        }
    }
}

/// Extension from the original name, falling back to the MIME type
fn file_extension(original_name: &str, upload: &UploadConfig, content_type: &str) -> String {
    if let Some((_, ext)) = original_name.rsplit_once('.') {
        if !ext.is_empty() && ext.len() < 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ext.to_lowercase();
        }
    }
    upload.get_extension(content_type).to_string()
}

async fn remove_file_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxMediaRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::sample_media;
    use proptest::prelude::*;

    async fn setup(dir: &Path) -> MediaService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let upload = UploadConfig {
            path: dir.to_path_buf(),
            max_file_size: 64,
            ..Default::default()
        };
        MediaService::new(SqlxMediaRepository::boxed(pool), upload, Some("demo".to_string()))
    }

    fn png(bytes: usize) -> UploadedFile {
        UploadedFile {
            original_name: "Page 01.PNG".to_string(),
            content_type: "image/png".to_string(),
            data: vec![7u8; bytes],
        }
    }

    fn meta(alt: &str) -> UploadMeta {
        UploadMeta {
            alt: alt.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cloudinary_url_layout() {
        let url = build_cloudinary_image_url(
            Some("demo"),
            "comics/ep 1/page#1",
            &ImageTransform::archive_thumbnail(),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/c_fill,g_auto,w_600,h_840,q_auto,f_auto/comics/ep%201/page%231"
        );

        let plain = build_cloudinary_image_url(Some("demo"), "cover", &ImageTransform::default());
        assert_eq!(plain.as_deref(), Some("https://res.cloudinary.com/demo/image/upload/cover"));
    }

    #[test]
    fn test_cloudinary_url_requires_cloud_and_id() {
        let t = ImageTransform::default();
        assert!(build_cloudinary_image_url(None, "cover", &t).is_none());
        assert!(build_cloudinary_image_url(Some("  "), "cover", &t).is_none());
        assert!(build_cloudinary_image_url(Some("demo"), "", &t).is_none());
    }

    #[tokio::test]
    async fn test_archive_thumbnail_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup(dir.path()).await;
        let media = sample_media(1, "page-01.png");
        assert_eq!(
            service.archive_thumbnail_url(Some(&media)),
            "https://res.cloudinary.com/demo/image/upload/c_fill,g_auto,w_600,h_840,q_auto,f_auto/page-01"
        );
        assert_eq!(service.archive_thumbnail_url(None), PLACEHOLDER_THUMBNAIL);

        let without_cloud = MediaService::new(
            SqlxMediaRepository::boxed(create_test_pool().await.unwrap()),
            UploadConfig::default(),
            None,
        );
        assert_eq!(without_cloud.archive_thumbnail_url(Some(&media)), "/uploads/page-01.png");
    }

    #[tokio::test]
    async fn test_upload_writes_file_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup(dir.path()).await;

        let media = service.upload(png(16), meta(" Page one ")).await.unwrap();
        assert_eq!(media.alt, "Page one");
        assert!(media.filename.ends_with(".png"));
        assert_eq!(media.url, format!("/uploads/{}", media.filename));
        assert_eq!(media.filesize, 16);
        assert!(dir.path().join(&media.filename).exists());
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup(dir.path()).await;

        let err = service.upload(png(16), meta(" ")).await.unwrap_err();
        assert!(matches!(err, MediaServiceError::ValidationError(m) if m.contains("Alt")));

        let err = service.upload(png(65), meta("big")).await.unwrap_err();
        assert!(matches!(err, MediaServiceError::ValidationError(m) if m.contains("too large")));

        let mut pdf = png(16);
        pdf.content_type = "application/pdf".to_string();
        let err = service.upload(pdf, meta("doc")).await.unwrap_err();
        assert!(matches!(err, MediaServiceError::ValidationError(m) if m.contains("Invalid file type")));
    }

    #[tokio::test]
    async fn test_update_and_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup(dir.path()).await;
        let media = service.upload(png(16), meta("Page one")).await.unwrap();

        let updated = service
            .update(
                media.id,
                UpdateMediaInput {
                    caption: Some(Some("First *page*".to_string())),
                    cloudinary_public_id: Some(Some(" comics/p1 ".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.caption.as_deref(), Some("First *page*"));
        assert_eq!(updated.cloudinary_public_id.as_deref(), Some("comics/p1"));

        service.delete(media.id).await.unwrap();
        assert!(!dir.path().join(&media.filename).exists());
        assert!(matches!(service.get(media.id).await, Err(MediaServiceError::NotFound(_))));
    }

    proptest! {
        #[test]
        fn transform_segment_keeps_order(width in 1u32..4000, height in 1u32..4000) {
            let transform = ImageTransform {
                crop: Some("fit"),
                width: Some(width),
                height: Some(height),
                format: Some("webp"),
                ..Default::default()
            };
            let url = build_cloudinary_image_url(Some("demo"), "a/b", &transform).unwrap();
            let expected = format!("/c_fit,w_{},h_{},f_webp/a/b", width, height);
            prop_assert!(url.ends_with(&expected));
        }
    }
}
