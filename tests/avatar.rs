mod common;

use std::io::Cursor;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const BOUNDARY: &str = "----taskmanager-avatar-boundary";

fn sample_image(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
    let pixels = ImageBuffer::from_pixel(width, height, Rgb([30u8, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(pixels)
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

/// A `multipart/form-data` body with a single file part.
fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(token: &str, body: Vec<u8>) -> actix_http::Request {
    test::TestRequest::post()
        .uri("/users/me/avatar")
        .insert_header(common::bearer(token))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
        .to_request()
}

#[test_log::test(actix_rt::test)]
async fn test_upload_and_serve_avatar() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    let jpeg = sample_image(400, 300, ImageOutputFormat::Jpeg(85));
    let req = upload_request(
        &fixture.user_one.token,
        multipart_body("avatar", "profile-pic.jpg", &jpeg),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let stored = common::stored_user(&fixture.store, fixture.user_one.id)
        .await
        .unwrap();
    let avatar = stored.avatar.expect("avatar should be stored");
    let decoded = image::load_from_memory_with_format(&avatar, image::ImageFormat::Png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (250, 250));

    // Serving the avatar needs no token.
    let req = test::TestRequest::get()
        .uri(&format!("/users/{}/avatar", fixture.user_one.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let served = test::read_body(resp).await;
    assert_eq!(served.to_vec(), avatar);
}

#[actix_rt::test]
async fn test_replace_avatar_with_png() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    for (filename, image) in [
        ("first.jpeg", sample_image(120, 500, ImageOutputFormat::Jpeg(85))),
        ("second.png", sample_image(60, 60, ImageOutputFormat::Png)),
    ] {
        let req = upload_request(
            &fixture.user_one.token,
            multipart_body("avatar", filename, &image),
        );
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "upload of {}", filename);
    }

    let stored = common::stored_user(&fixture.store, fixture.user_one.id)
        .await
        .unwrap();
    let decoded = image::load_from_memory(&stored.avatar.unwrap()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (250, 250));
}

#[actix_rt::test]
async fn test_upload_rejects_non_image_filename() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    let req = upload_request(
        &fixture.user_one.token,
        multipart_body("avatar", "resume.pdf", b"%PDF-1.4"),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({ "error": "Please upload a jpg, jpeg or png image file" })
    );

    let stored = common::stored_user(&fixture.store, fixture.user_one.id)
        .await
        .unwrap();
    assert!(stored.avatar.is_none());
}

#[actix_rt::test]
async fn test_upload_rejects_oversized_file() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    let oversized = vec![0u8; 1_000_001];
    let req = upload_request(
        &fixture.user_one.token,
        multipart_body("avatar", "big.png", &oversized),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "File too large" }));
}

#[actix_rt::test]
async fn test_upload_requires_avatar_field() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    let png = sample_image(10, 10, ImageOutputFormat::Png);
    let req = upload_request(
        &fixture.user_one.token,
        multipart_body("picture", "profile.png", &png),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_upload_rejects_undecodable_image() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    let req = upload_request(
        &fixture.user_one.token,
        multipart_body("avatar", "fake.png", b"these bytes are not a png"),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_upload_requires_authentication() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    let png = sample_image(10, 10, ImageOutputFormat::Png);
    let req = upload_request("not-a-token", multipart_body("avatar", "profile.png", &png));
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_delete_avatar() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    let png = sample_image(300, 300, ImageOutputFormat::Png);
    let req = upload_request(
        &fixture.user_one.token,
        multipart_body("avatar", "profile.png", &png),
    );
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let delete = || {
        test::TestRequest::delete()
            .uri("/users/me/avatar")
            .insert_header(fixture.user_one.bearer())
            .to_request()
    };
    let resp = test::call_service(&app, delete()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, delete()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}/avatar", fixture.user_one.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "User or image data not found" }));
}

#[actix_rt::test]
async fn test_read_avatar_for_missing_user() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    for uri in [
        format!("/users/{}/avatar", uuid::Uuid::new_v4()),
        format!("/users/{}/avatar", fixture.user_two.id),
    ] {
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {}", uri);
    }
}

#[actix_rt::test]
async fn test_read_avatar_with_malformed_id() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    let req = test::TestRequest::get()
        .uri("/users/not-a-uuid/avatar")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "User or image data not found" }));
}

#[test_log::test(actix_rt::test)]
async fn test_upload_does_not_restore_revoked_tokens() {
    let fixture = common::setup().await;
    let app = common::init_app(fixture.state.clone()).await;

    // The upload authenticates first, then waits on image processing while
    // logout-all runs to completion.
    let png = sample_image(800, 800, ImageOutputFormat::Png);
    let upload = upload_request(
        &fixture.user_one.token,
        multipart_body("avatar", "large.png", &png),
    );
    let logout_all = test::TestRequest::post()
        .uri("/users/logoutall")
        .insert_header(fixture.user_one.bearer())
        .to_request();

    let (upload, logout_all) = futures::join!(
        test::call_service(&app, upload),
        test::call_service(&app, logout_all)
    );
    assert_eq!(upload.status(), StatusCode::OK);
    assert_eq!(logout_all.status(), StatusCode::OK);

    let stored = common::stored_user(&fixture.store, fixture.user_one.id)
        .await
        .unwrap();
    assert!(stored.tokens.is_empty());
    assert!(stored.avatar.is_some());

    let req = test::TestRequest::get()
        .uri("/users/me")
        .insert_header(fixture.user_one.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
