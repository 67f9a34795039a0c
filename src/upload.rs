//! Upload handling for the submission route
//!
//! [`SubmissionForm`] is extracted before the handler runs: it reads the
//! request body, checks the attached image against the allowed formats,
//! uploads it to the object store and yields a typed [`Submission`] that
//! already carries the image URL.

use crate::app::App;
use crate::error::ApiError;
use crate::handlers::SUBMIT_FAILED;
use crate::models::Submission;
use crate::{Error, Result};
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use image::ImageFormat;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// Multipart field that carries the image file.
pub const IMAGE_FIELD: &str = "image";

pub const ALLOWED_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

/// A file part received under [`IMAGE_FIELD`].
#[derive(Debug)]
pub struct Attachment {
    pub file_name: String,
    pub data: Bytes,
}

/// Image bytes that passed the format check.
#[derive(Debug)]
pub struct CheckedImage {
    pub format: ImageFormat,
    pub data: Bytes,
}

impl CheckedImage {
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }

    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Submission extracted from the request, image already uploaded.
#[derive(Debug)]
pub struct SubmissionForm(pub Submission);

impl FromRequest<App> for SubmissionForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, app: &App) -> std::result::Result<Self, Self::Rejection> {
        accept_submission(req, app)
            .await
            .map(SubmissionForm)
            .map_err(|e| ApiError::new(SUBMIT_FAILED, e))
    }
}

async fn accept_submission(req: Request, app: &App) -> Result<Submission> {
    let (fields, attachment) = read_body(req, app).await?;

    let image = attachment.map(check_image_format).transpose()?;
    let submission = Submission::from_fields(&fields)?;

    let url = match image {
        Some(image) => upload_image(app, image).await?,
        None => String::new(),
    };

    Ok(submission.with_image(url))
}

async fn read_body(
    req: Request,
    app: &App,
) -> Result<(HashMap<String, String>, Option<Attachment>)> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, app)
            .await
            .map_err(|e| Error::Payload(e.body_text()))?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<Map<String, Value>>::from_request(req, app)
            .await
            .map_err(|e| Error::Payload(e.body_text()))?;
        Ok((json_fields(body)?, None))
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(req, app)
            .await
            .map_err(|e| Error::Payload(e.body_text()))?;
        Ok((fields, None))
    } else {
        Ok((HashMap::new(), None))
    }
}

/// Collect text fields and the single image part.
pub async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(HashMap<String, String>, Option<Attachment>)> {
    let mut fields = HashMap::new();
    let mut attachment = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await?;
            fields.insert(name, value);
            continue;
        };

        // Browsers send an unnamed file part when no file was chosen.
        if file_name.is_empty() {
            continue;
        }

        if name != IMAGE_FIELD || attachment.is_some() {
            return Err(Error::UnexpectedField(name));
        }

        let data = field.bytes().await?;
        attachment = Some(Attachment { file_name, data });
    }

    Ok((fields, attachment))
}

/// Accept the attachment only if its bytes are one of [`ALLOWED_FORMATS`].
pub fn check_image_format(attachment: Attachment) -> Result<CheckedImage> {
    let format = image::guess_format(&attachment.data).map_err(|_| {
        Error::UnsupportedImageFormat(declared_extension(&attachment.file_name))
    })?;

    if !ALLOWED_FORMATS.contains(&format) {
        let name = format
            .extensions_str()
            .first()
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| format!("{:?}", format).to_lowercase());
        return Err(Error::UnsupportedImageFormat(name));
    }

    Ok(CheckedImage {
        format,
        data: attachment.data,
    })
}

fn declared_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => "unknown".to_string(),
    }
}

pub fn object_key(folder: &str, image: &CheckedImage) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        format!("{}.{}", Uuid::new_v4(), image.extension())
    } else {
        format!("{}/{}.{}", folder, Uuid::new_v4(), image.extension())
    }
}

async fn upload_image(app: &App, image: CheckedImage) -> Result<String> {
    let key = object_key(app.image_folder(), &image);
    let url = app
        .objects
        .upload_file(&key, &image.data, image.content_type())
        .await?;
    info!("Uploaded image ({} bytes) to {}", image.data.len(), url);
    Ok(url)
}

fn cast_kind(path: &str) -> Option<&'static str> {
    match path {
        "age" | "experience" => Some("Number"),
        "name" | "team" | "gender" | "language" => Some("String"),
        _ => None,
    }
}

/// Flatten a JSON body into form values. Scalars become text, booleans on
/// numeric fields become `1`/`0`; nested values are only an error on known
/// fields.
pub fn json_fields(body: Map<String, Value>) -> Result<HashMap<String, String>> {
    let mut fields = HashMap::new();

    for (key, value) in body {
        match value {
            Value::Null => {}
            Value::String(s) => {
                fields.insert(key, s);
            }
            Value::Number(n) => {
                fields.insert(key, n.to_string());
            }
            Value::Bool(b) => {
                let value = match cast_kind(&key) {
                    Some("Number") => u8::from(b).to_string(),
                    _ => b.to_string(),
                };
                fields.insert(key, value);
            }
            other => {
                if let Some(kind) = cast_kind(&key) {
                    return Err(Error::Cast {
                        kind,
                        path: key,
                        value: other.to_string(),
                    });
                }
            }
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppOptions, AppServices};
    use crate::docstore::MockSubmissionStore;
    use crate::objectstore::MockObjectStore;
    use axum::body::Body;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    const BOUNDARY: &str = "XTESTBOUNDARY";

    fn create_test_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 128, 255, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn attachment(file_name: &str, data: &[u8]) -> Attachment {
        Attachment {
            file_name: file_name.to_string(),
            data: Bytes::copy_from_slice(data),
        }
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_request(parts: &[Part]) -> Request {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                            name, value
                        )
                        .as_bytes(),
                    );
                }
                Part::File(name, file_name, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                            name, file_name
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        axum::http::Request::builder()
            .method("POST")
            .uri("/submit-data")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn test_app(objects: &MockObjectStore) -> App {
        App::with_services(
            AppServices {
                store: Arc::new(MockSubmissionStore::new()),
                objects: Arc::new(objects.clone()),
            },
            AppOptions::default(),
        )
    }

    #[test]
    fn test_png_is_allowed() {
        let image = check_image_format(attachment("photo.png", &create_test_png())).unwrap();
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!(image.extension(), "png");
        assert_eq!(image.content_type(), "image/png");
    }

    #[test]
    fn test_jpeg_is_allowed() {
        let image =
            check_image_format(attachment("photo.jpeg", &[0xFF, 0xD8, 0xFF, 0xE0, 0x00])).unwrap();
        assert_eq!(image.format, ImageFormat::Jpeg);
        assert_eq!(image.extension(), "jpg");
        assert_eq!(image.content_type(), "image/jpeg");
    }

    #[test]
    fn test_gif_is_rejected() {
        let err = check_image_format(attachment("anim.png", b"GIF89a\x01\x00\x01\x00")).unwrap_err();
        assert_eq!(err.to_string(), "Image file format gif not allowed");
    }

    #[test]
    fn test_unrecognized_bytes_are_rejected() {
        let err = check_image_format(attachment("notes.txt", b"plain text")).unwrap_err();
        assert_eq!(err.to_string(), "Image file format txt not allowed");
    }

    #[test]
    fn test_object_key_uses_folder_and_extension() {
        let image = check_image_format(attachment("a.png", &create_test_png())).unwrap();

        let key = object_key("user_images/", &image);
        assert!(key.starts_with("user_images/"));
        assert!(key.ends_with(".png"));
        assert_ne!(key, object_key("user_images", &image));

        assert!(!object_key("", &image).contains('/'));
    }

    #[test]
    fn test_json_fields_flatten_scalars() {
        let body = json!({
            "name": "Ada",
            "age": 36,
            "experience": null,
            "extra": {"ignored": true}
        });
        let Value::Object(map) = body else {
            unreachable!()
        };

        let fields = json_fields(map).unwrap();
        assert_eq!(fields.get("name").map(String::as_str), Some("Ada"));
        assert_eq!(fields.get("age").map(String::as_str), Some("36"));
        assert!(!fields.contains_key("experience"));
        assert!(!fields.contains_key("extra"));
    }

    #[test]
    fn test_json_fields_booleans_on_numeric_fields() {
        let Value::Object(map) = json!({"age": true, "experience": false, "team": true}) else {
            unreachable!()
        };

        let fields = json_fields(map).unwrap();
        assert_eq!(fields.get("age").map(String::as_str), Some("1"));
        assert_eq!(fields.get("experience").map(String::as_str), Some("0"));
        assert_eq!(fields.get("team").map(String::as_str), Some("true"));

        let submission = Submission::from_fields(&fields).unwrap();
        assert_eq!(submission.age, Some(1.0));
        assert_eq!(submission.experience, Some(0.0));
    }

    #[test]
    fn test_json_fields_reject_nested_known_field() {
        let Value::Object(map) = json!({"age": [1, 2]}) else {
            unreachable!()
        };
        let err = json_fields(map).unwrap_err();
        assert!(err.to_string().contains("at path \"age\""));
    }

    #[tokio::test]
    async fn test_extractor_uploads_image_and_sets_url() {
        let objects = MockObjectStore::new().with_base_url("https://objects.test".to_string());
        let app = test_app(&objects);
        let png = create_test_png();

        let req = multipart_request(&[
            Part::Text("name", "Ada"),
            Part::Text("age", "36"),
            Part::File("image", "ada.png", &png),
        ]);

        let SubmissionForm(submission) = SubmissionForm::from_request(req, &app).await.unwrap();

        assert_eq!(submission.name.as_deref(), Some("Ada"));
        assert_eq!(submission.age, Some(36.0));
        assert!(submission.image.starts_with("https://objects.test/user_images/"));
        assert_eq!(objects.get_upload_count(), 1);
        assert_eq!(objects.get_files().values().next().unwrap(), &png);
    }

    #[tokio::test]
    async fn test_extractor_treats_empty_file_part_as_absent() {
        let objects = MockObjectStore::new();
        let app = test_app(&objects);

        let req = multipart_request(&[Part::Text("name", "Ada"), Part::File("image", "", b"")]);

        let SubmissionForm(submission) = SubmissionForm::from_request(req, &app).await.unwrap();
        assert_eq!(submission.image, "");
        assert_eq!(objects.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_extractor_ignores_unnamed_file_part_with_content() {
        let objects = MockObjectStore::new();
        let app = test_app(&objects);
        let png = create_test_png();

        let req = multipart_request(&[Part::Text("name", "Ada"), Part::File("image", "", &png)]);

        let SubmissionForm(submission) = SubmissionForm::from_request(req, &app).await.unwrap();
        assert_eq!(submission.name.as_deref(), Some("Ada"));
        assert_eq!(submission.image, "");
        assert_eq!(objects.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_extractor_rejects_file_under_other_field() {
        let objects = MockObjectStore::new();
        let app = test_app(&objects);
        let png = create_test_png();

        let req = multipart_request(&[Part::File("avatar", "a.png", &png)]);

        let err = SubmissionForm::from_request(req, &app).await.unwrap_err();
        assert!(matches!(err.error(), Error::UnexpectedField(name) if name == "avatar"));
        assert_eq!(objects.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_extractor_rejects_second_image() {
        let objects = MockObjectStore::new();
        let app = test_app(&objects);
        let png = create_test_png();

        let req = multipart_request(&[
            Part::File("image", "a.png", &png),
            Part::File("image", "b.png", &png),
        ]);

        let err = SubmissionForm::from_request(req, &app).await.unwrap_err();
        assert!(matches!(err.error(), Error::UnexpectedField(_)));
        assert_eq!(objects.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_extractor_casts_before_uploading() {
        let objects = MockObjectStore::new();
        let app = test_app(&objects);
        let png = create_test_png();

        let req = multipart_request(&[
            Part::Text("age", "old"),
            Part::File("image", "a.png", &png),
        ]);

        let err = SubmissionForm::from_request(req, &app).await.unwrap_err();
        assert!(matches!(err.error(), Error::Cast { .. }));
        assert_eq!(objects.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_extractor_reads_urlencoded_body() {
        let objects = MockObjectStore::new();
        let app = test_app(&objects);

        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/submit-data")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Grace&experience=12"))
            .unwrap();

        let SubmissionForm(submission) = SubmissionForm::from_request(req, &app).await.unwrap();
        assert_eq!(submission.name.as_deref(), Some("Grace"));
        assert_eq!(submission.experience, Some(12.0));
        assert_eq!(submission.image, "");
    }
}
