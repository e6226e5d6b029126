//! Uploaded recipe images and their resized variants
//!
//! Layout under the media directory:
//! `recipes/<recipe_id>/<image_id>-original.<ext>`, `...-medium.jpg`,
//! `...-thumb.jpg`. Paths stored in the database are relative to the
//! media directory with `/` separators.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

const JPEG_QUALITY: u8 = 85;

/// Accepted upload types: (MIME type, stored extension)
pub const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Detect the image type from content, ignoring the client's claim
///
/// Returns the file extension to store the original under.
pub fn sniff_image_type(bytes: &[u8]) -> ApiResult<&'static str> {
    let kind = infer::get(bytes)
        .ok_or_else(|| ApiError::BadRequest("Unrecognised file type".to_string()))?;

    ACCEPTED_TYPES
        .iter()
        .find(|(mime, _)| *mime == kind.mime_type())
        .map(|(_, ext)| *ext)
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Unsupported image type {}; use JPEG, PNG, WebP or GIF",
                kind.mime_type()
            ))
        })
}

/// Encoded variants of one upload
#[derive(Debug)]
pub struct Variants {
    pub width: u32,
    pub height: u32,
    pub medium: Vec<u8>,
    pub thumbnail: Vec<u8>,
}

/// Scale down to `max_width` keeping the aspect ratio; never upscales
pub fn fit_width(image: &DynamicImage, max_width: u32) -> DynamicImage {
    if image.width() <= max_width {
        return image.clone();
    }
    image.resize(max_width, image.height(), FilterType::Lanczos3)
}

fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(buffer.into_inner())
}

/// Decode and produce the medium and thumbnail JPEGs
///
/// CPU-bound; call from `spawn_blocking`.
pub fn build_variants(bytes: &[u8], medium_width: u32, thumbnail_width: u32) -> Result<Variants, image::ImageError> {
    let image = image::load_from_memory(bytes)?;

    let medium = encode_jpeg(&fit_width(&image, medium_width))?;
    let thumbnail = encode_jpeg(&fit_width(&image, thumbnail_width))?;

    Ok(Variants {
        width: image.width(),
        height: image.height(),
        medium,
        thumbnail,
    })
}

/// Relative paths of a stored upload
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub original_path: String,
    pub medium_path: String,
    pub thumbnail_path: String,
    pub width: u32,
    pub height: u32,
}

fn absolute(media_dir: &Path, relative: &str) -> PathBuf {
    relative.split('/').fold(media_dir.to_path_buf(), |path, part| path.join(part))
}

/// Write the original and its variants to disk
///
/// Partially written files are removed when any step fails.
pub async fn store_upload(
    media_dir: &Path,
    recipe_id: &str,
    image_id: &str,
    extension: &str,
    bytes: Vec<u8>,
    medium_width: u32,
    thumbnail_width: u32,
) -> ApiResult<StoredImage> {
    let base = format!("recipes/{}/{}", recipe_id, image_id);
    let stored = StoredImage {
        original_path: format!("{}-original.{}", base, extension),
        medium_path: format!("{}-medium.jpg", base),
        thumbnail_path: format!("{}-thumb.jpg", base),
        width: 0,
        height: 0,
    };

    let (bytes, variants) = tokio::task::spawn_blocking(move || {
        let variants = build_variants(&bytes, medium_width, thumbnail_width);
        (bytes, variants)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Image worker failed: {}", e)))?;

    let variants = variants.map_err(|e| {
        debug!(error = %e, "Image decode failed");
        ApiError::BadRequest("Image could not be decoded".to_string())
    })?;

    tokio::fs::create_dir_all(media_dir.join("recipes").join(recipe_id)).await?;

    let writes = [
        (&stored.original_path, bytes.as_slice()),
        (&stored.medium_path, variants.medium.as_slice()),
        (&stored.thumbnail_path, variants.thumbnail.as_slice()),
    ];
    for (relative, data) in writes {
        if let Err(e) = tokio::fs::write(absolute(media_dir, relative), data).await {
            remove_files(media_dir, &[stored.original_path.as_str(), stored.medium_path.as_str(), stored.thumbnail_path.as_str()]).await;
            return Err(e.into());
        }
    }

    Ok(StoredImage {
        width: variants.width,
        height: variants.height,
        ..stored
    })
}

/// Best-effort removal; missing files are fine, other failures are logged
pub async fn remove_files(media_dir: &Path, relative_paths: &[&str]) {
    for relative in relative_paths {
        let path = absolute(media_dir, relative);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

/// Best-effort removal of a recipe's whole image directory
pub async fn remove_recipe_dir(media_dir: &Path, recipe_id: &str) {
    let dir = media_dir.join("recipes").join(recipe_id);
    match tokio::fs::remove_dir_all(&dir).await {
        Ok(()) => debug!("Removed {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 80, 40, 255]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_sniff_accepts_png_and_rejects_text() {
        assert_eq!(sniff_image_type(&png_bytes(4, 4)).unwrap(), "png");
        assert!(sniff_image_type(b"just some text").is_err());
        // PDF magic bytes: recognised but not accepted
        assert!(sniff_image_type(b"%PDF-1.7\n").is_err());
    }

    #[test]
    fn test_variants_keep_aspect_ratio_without_upscaling() {
        let variants = build_variants(&png_bytes(1200, 600), 960, 320).unwrap();
        assert_eq!((variants.width, variants.height), (1200, 600));

        let medium = image::load_from_memory(&variants.medium).unwrap();
        assert_eq!((medium.width(), medium.height()), (960, 480));
        let thumb = image::load_from_memory(&variants.thumbnail).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (320, 160));

        let small = build_variants(&png_bytes(200, 100), 960, 320).unwrap();
        let medium = image::load_from_memory(&small.medium).unwrap();
        assert_eq!((medium.width(), medium.height()), (200, 100));
    }

    #[tokio::test]
    async fn test_store_and_remove_upload() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store_upload(dir.path(), "r1", "i1", "png", png_bytes(640, 480), 960, 320)
            .await
            .unwrap();

        assert_eq!(stored.original_path, "recipes/r1/i1-original.png");
        assert_eq!(stored.thumbnail_path, "recipes/r1/i1-thumb.jpg");
        assert_eq!((stored.width, stored.height), (640, 480));
        assert!(dir.path().join("recipes/r1/i1-medium.jpg").exists());

        remove_recipe_dir(dir.path(), "r1").await;
        assert!(!dir.path().join("recipes/r1").exists());
    }

    #[tokio::test]
    async fn test_corrupt_image_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = png_bytes(10, 10);
        bytes.truncate(40);
        let result = store_upload(dir.path(), "r1", "i1", "png", bytes, 960, 320).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert!(!dir.path().join("recipes/r1").exists());
    }
}
