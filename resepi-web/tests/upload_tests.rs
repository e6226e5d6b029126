//! Multipart image uploads and the media directory

mod common;

use std::io::Cursor;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::*;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use resepi_common::db::settings::{set_setting, IMAGE_MAX_UPLOAD_BYTES};
use resepi_common::db::RecipeStatus;
use resepi_web::db::images::images_for_recipe;
use resepi_web::AppState;

const BOUNDARY: &str = "resepi-boundary-7f3a";

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([200, 120, 40]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn multipart_body(file: &[u8], alt_text: &str, primary: bool) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"alt_text\"\r\n\r\n{alt}\r\n",
            b = BOUNDARY,
            alt = alt_text
        )
        .as_bytes(),
    );
    if primary {
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"primary\"\r\n\r\ntrue\r\n",
                b = BOUNDARY
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"gambar.png\"\r\nContent-Type: image/png\r\n\r\n",
            b = BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn upload(state: &AppState, recipe_id: &str, body: Vec<u8>, cookie: &str) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/admin/recipes/{}/images", recipe_id))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap();
    send(state, request).await
}

#[tokio::test]
async fn test_upload_creates_variants_and_primary() {
    let (state, media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;
    let recipe = add_recipe(&state, "Nasi Lemak", RecipeStatus::Published).await;

    let response = upload(&state, &recipe.guid, multipart_body(&png_bytes(1600, 1200), "Sepinggan", false), &admin).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/admin/recipes/{}/edit", recipe.guid));

    let images = images_for_recipe(&state.db, &recipe.guid).await.unwrap();
    assert_eq!(images.len(), 1);
    let first = &images[0];
    assert!(first.is_primary, "first image becomes primary");
    assert_eq!((first.width, first.height), (1600, 1200));
    assert_eq!(first.alt_text, "Sepinggan");
    assert!(first.original_path.ends_with("-original.png"));

    for relative in [&first.original_path, &first.medium_path, &first.thumbnail_path] {
        assert!(media.path().join(relative).exists(), "{} missing", relative);
    }
    let medium = image::open(media.path().join(&first.medium_path)).unwrap();
    assert_eq!(medium.width(), 960);
    assert_eq!(medium.height(), 720);
    let thumb = image::open(media.path().join(&first.thumbnail_path)).unwrap();
    assert_eq!(thumb.width(), 320);

    let served = get(&state, &format!("/media/{}", first.thumbnail_path), None).await;
    assert_eq!(served.status(), StatusCode::OK);

    // A second upload marked primary takes the flag
    let response = upload(&state, &recipe.guid, multipart_body(&png_bytes(200, 100), "Dekat", true), &admin).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let images = images_for_recipe(&state.db, &recipe.guid).await.unwrap();
    assert_eq!(images.iter().filter(|i| i.is_primary).count(), 1);
    let second = images.iter().find(|i| i.alt_text == "Dekat").unwrap();
    assert!(second.is_primary);

    // Small images are not upscaled
    let medium = image::open(media.path().join(&second.medium_path)).unwrap();
    assert_eq!(medium.width(), 200);

    let response = post_form(&state, &format!("/admin/images/{}/primary", first.guid), "", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let images = images_for_recipe(&state.db, &recipe.guid).await.unwrap();
    assert!(images.iter().find(|i| i.guid == first.guid).unwrap().is_primary);

    let response = post_form(&state, &format!("/admin/images/{}/delete", first.guid), "", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(!media.path().join(&first.original_path).exists());
    let images = images_for_recipe(&state.db, &recipe.guid).await.unwrap();
    assert_eq!(images.len(), 1);
    assert!(images[0].is_primary, "remaining image is promoted");
}

#[tokio::test]
async fn test_upload_rejects_non_images() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;
    let recipe = add_recipe(&state, "Nasi Lemak", RecipeStatus::Published).await;

    let response = upload(&state, &recipe.guid, multipart_body(b"bukan gambar sama sekali", "", false), &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = upload(&state, &recipe.guid, multipart_body(b"", "", false), &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(images_for_recipe(&state.db, &recipe.guid).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_over_limit_is_refused() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;
    let recipe = add_recipe(&state, "Nasi Lemak", RecipeStatus::Published).await;
    set_setting(&state.db, IMAGE_MAX_UPLOAD_BYTES, 64).await.unwrap();

    let response = upload(&state, &recipe.guid, multipart_body(&png_bytes(300, 300), "", false), &admin).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(images_for_recipe(&state.db, &recipe.guid).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_to_missing_recipe() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;

    let response = upload(&state, "tiada", multipart_body(&png_bytes(10, 10), "", false), &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_primary_promotes_oldest_and_removes_files() {
    let (state, media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;
    let recipe = add_recipe(&state, "Ayam Golek", RecipeStatus::Published).await;

    for alt in ["Pertama", "Kedua"] {
        let response = upload(&state, &recipe.guid, multipart_body(&png_bytes(400, 300), alt, false), &admin).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
    let images = images_for_recipe(&state.db, &recipe.guid).await.unwrap();
    let primary = images.iter().find(|i| i.is_primary).unwrap().clone();
    let other = images.iter().find(|i| !i.is_primary).unwrap().clone();
    assert_eq!(primary.alt_text, "Pertama");

    let response = post_form(&state, &format!("/admin/images/{}/delete", primary.guid), "", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    for relative in [&primary.original_path, &primary.medium_path, &primary.thumbnail_path] {
        assert!(!media.path().join(relative).exists(), "{} still on disk", relative);
    }
    for relative in [&other.original_path, &other.medium_path, &other.thumbnail_path] {
        assert!(media.path().join(relative).exists(), "{} removed", relative);
    }

    let images = images_for_recipe(&state.db, &recipe.guid).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].guid, other.guid);
    assert!(images[0].is_primary);

    // Deleting the last image leaves the recipe without images
    post_form(&state, &format!("/admin/images/{}/delete", other.guid), "", Some(&admin)).await;
    assert!(images_for_recipe(&state.db, &recipe.guid).await.unwrap().is_empty());

    let response = post_form(&state, &format!("/admin/images/{}/delete", other.guid), "", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
