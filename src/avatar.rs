//! Avatar upload handling: pulling the file out of a multipart body, checking it,
//! and normalizing it to a fixed-size PNG.

use std::io::Cursor;

use actix_multipart::Multipart;
use actix_web::web;
use futures::StreamExt;
use image::imageops::FilterType;
use image::ImageOutputFormat;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

/// Multipart field that carries the avatar file.
pub const AVATAR_FIELD: &str = "avatar";
pub const MAX_AVATAR_BYTES: usize = 1_000_000;
/// Width and height of every stored avatar.
pub const AVATAR_DIMENSION: u32 = 250;

lazy_static! {
    // Only the filename is checked, never the content.
    static ref AVATAR_FILENAME: Regex = Regex::new(r"\.(jpg|jpeg|png)$").unwrap();
}

pub fn is_allowed_filename(filename: &str) -> bool {
    AVATAR_FILENAME.is_match(filename)
}

/// Reads the `avatar` file out of a multipart body.
///
/// Fails with 400 when the field is missing, the filename does not end in
/// `.jpg`, `.jpeg` or `.png`, or the file exceeds `MAX_AVATAR_BYTES`. Other fields
/// are skipped.
pub async fn read_upload(mut payload: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(e.to_string()))?;

        let disposition = field.content_disposition();
        if disposition.get_name() != Some(AVATAR_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            continue;
        }

        let filename = disposition.get_filename().unwrap_or_default().to_string();
        if !is_allowed_filename(&filename) {
            return Err(AppError::BadRequest(
                "Please upload a jpg, jpeg or png image file".into(),
            ));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            if bytes.len() + chunk.len() > MAX_AVATAR_BYTES {
                return Err(AppError::BadRequest("File too large".into()));
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }

    Err(AppError::BadRequest(format!(
        "Please upload an image in the '{}' field",
        AVATAR_FIELD
    )))
}

/// Resizes an uploaded image to `AVATAR_DIMENSION` square and re-encodes it as PNG.
///
/// Decoding and resizing run on the blocking thread pool.
pub async fn normalize(bytes: Vec<u8>) -> Result<Vec<u8>, AppError> {
    web::block(move || render_png(&bytes))
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
}

fn render_png(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| AppError::BadRequest(format!("Unable to read image: {}", e)))?;
    let resized = decoded.resize_to_fill(AVATAR_DIMENSION, AVATAR_DIMENSION, FilterType::Lanczos3);

    let mut encoded = Cursor::new(Vec::new());
    resized
        .write_to(&mut encoded, ImageOutputFormat::Png)
        .map_err(|e| AppError::InternalServerError(format!("Unable to encode avatar: {}", e)))?;
    Ok(encoded.into_inner())
}
