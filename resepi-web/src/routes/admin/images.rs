//! Recipe image upload and primary-image management

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::Redirect,
    routing::post,
    Router,
};
use resepi_common::db::recipes::get_recipe;
use resepi_common::db::settings::ImageSettings;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::images::{self, NewImage};
use crate::error::{ApiError, PageResult};
use crate::media;
use crate::session::RequireEditor;
use crate::AppState;

/// Hard cap on an upload request body; the configured file limit is
/// enforced separately while streaming
pub const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

const MAX_ALT_TEXT_CHARS: usize = 300;

/// Fields of one upload form
#[derive(Debug, Default)]
struct Upload {
    file: Vec<u8>,
    alt_text: String,
    primary: bool,
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Malformed upload: {}", err))
}

/// Read the form, stopping as soon as the file passes `max_bytes`
async fn read_upload(multipart: &mut Multipart, max_bytes: usize) -> PageResult<Upload> {
    let mut upload = Upload::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if upload.file.len() + chunk.len() > max_bytes {
                        return Err(ApiError::PayloadTooLarge(format!(
                            "Image exceeds the {} byte upload limit",
                            max_bytes
                        ))
                        .into());
                    }
                    upload.file.extend_from_slice(&chunk);
                }
            }
            "alt_text" => {
                let text = field.text().await.map_err(multipart_error)?;
                upload.alt_text = text.trim().chars().take(MAX_ALT_TEXT_CHARS).collect();
            }
            "primary" => {
                let value = field.text().await.map_err(multipart_error)?;
                upload.primary = matches!(value.trim(), "on" | "true" | "1" | "yes");
            }
            _ => {}
        }
    }

    Ok(upload)
}

/// POST /admin/recipes/:id/images
pub async fn upload_image(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(recipe_id): Path<String>,
    mut multipart: Multipart,
) -> PageResult<Redirect> {
    let recipe = get_recipe(&state.db, &recipe_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {}", recipe_id)))?;

    let settings = ImageSettings::load(&state.db).await?;
    let upload = read_upload(&mut multipart, settings.max_upload_bytes).await?;
    if upload.file.is_empty() {
        return Err(ApiError::BadRequest("No image file was uploaded".to_string()).into());
    }

    let extension = media::sniff_image_type(&upload.file)?;
    let image_id = Uuid::new_v4().to_string();

    let stored = media::store_upload(
        &state.media_dir,
        &recipe.guid,
        &image_id,
        extension,
        upload.file,
        settings.medium_width,
        settings.thumbnail_width,
    )
    .await?;

    let new_image = NewImage {
        guid: image_id,
        recipe_id: recipe.guid.clone(),
        original_path: stored.original_path.clone(),
        medium_path: stored.medium_path.clone(),
        thumbnail_path: stored.thumbnail_path.clone(),
        width: stored.width,
        height: stored.height,
        alt_text: upload.alt_text,
    };

    if let Err(e) = images::insert_image(&state.db, &new_image, upload.primary).await {
        warn!(recipe_id = %recipe.guid, error = %e, "Image row insert failed; removing files");
        media::remove_files(
            &state.media_dir,
            &[stored.original_path.as_str(), stored.medium_path.as_str(), stored.thumbnail_path.as_str()],
        )
        .await;
        return Err(e.into());
    }

    info!(
        recipe_id = %recipe.guid,
        image_id = %new_image.guid,
        width = stored.width,
        height = stored.height,
        user_id = %user.guid,
        "Image uploaded"
    );
    Ok(Redirect::to(&format!("/admin/recipes/{}/edit", recipe.guid)))
}

/// POST /admin/images/:id/primary
pub async fn make_primary(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Redirect> {
    let image = images::set_primary(&state.db, &id).await?;
    Ok(Redirect::to(&format!("/admin/recipes/{}/edit", image.recipe_id)))
}

/// POST /admin/images/:id/delete
pub async fn delete_image(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Redirect> {
    let image = images::delete_image(&state.db, &id).await?;
    media::remove_files(
        &state.media_dir,
        &[image.original_path.as_str(), image.medium_path.as_str(), image.thumbnail_path.as_str()],
    )
    .await;
    Ok(Redirect::to(&format!("/admin/recipes/{}/edit", image.recipe_id)))
}

/// Build image routes
pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/recipes/:id/images",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES)),
        )
        .route("/admin/images/:id/primary", post(make_primary))
        .route("/admin/images/:id/delete", post(delete_image))
}
