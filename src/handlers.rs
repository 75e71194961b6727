// src/handlers.rs
use crate::{AppState, config::UploadConfig, errors::IntakeError, models::*};
use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures_util::TryStreamExt;

const FILE_FIELD: &str = "file";

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/process-image", web::post().to(process_image))
            .route("/get-results", web::get().to(get_results)),
    );
}

/// Serves the public storage directory so returned image paths resolve.
pub fn public_files(config: &UploadConfig) -> Files {
    Files::new(&config.public_path, &config.dir)
}

pub async fn process_image(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let max_size = data.pipeline.upload_config().max_size;
    let upload = read_upload(&mut payload, max_size).await?;

    let result = data.pipeline.handle_upload(upload).await?;

    Ok(HttpResponse::Ok().json(ProcessImageResponse::from(result)))
}

pub async fn get_results(
    query: web::Query<ResultsQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let image_id = query
        .image_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| IntakeError::InvalidInput("Image ID is required".to_string()))?;

    let result = data.pipeline.fetch_result_metadata(image_id).await?;

    Ok(HttpResponse::Ok().json(&result))
}

/// Pulls the `file` field out of the form. Buffering stops one chunk past
/// `max_size`; the reported size is then already over the limit.
async fn read_upload(
    payload: &mut Multipart,
    max_size: usize,
) -> Result<Option<UploadRequest>, IntakeError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != FILE_FIELD {
            while field.try_next().await?.is_some() {}
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .map(|f| f.to_string());

        let content_type = field
            .content_type()
            .map(|ct| ct.essence_str().to_string())
            .unwrap_or_default();

        let mut image_data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            image_data.extend_from_slice(&chunk);
            if image_data.len() > max_size {
                break;
            }
        }

        return Ok(Some(UploadRequest {
            filename,
            content_type,
            declared_size: image_data.len(),
            data: image_data,
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::IntakePipeline;
    use crate::services::background_remover::BackgroundRemover;
    use crate::services::image_processor::tests::encode;
    use crate::services::pipeline::tests::{FakeRemover, test_config};
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test};
    use image::ImageFormat;
    use serde_json::Value;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    const BOUNDARY: &str = "----fashionintakeboundary";

    fn part(name: &str, filename: Option<&str>, content_type: &str, data: &[u8]) -> Vec<u8> {
        let disposition = match filename {
            Some(f) => format!("form-data; name=\"{}\"; filename=\"{}\"", name, f),
            None => format!("form-data; name=\"{}\"", name),
        };
        let mut out = format!(
            "--{}\r\nContent-Disposition: {}\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, disposition, content_type
        )
        .into_bytes();
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
        out
    }

    fn multipart(parts: Vec<Vec<u8>>) -> Vec<u8> {
        let mut body: Vec<u8> = parts.concat();
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/process-image")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    fn state(config: UploadConfig, remover: Arc<dyn BackgroundRemover>) -> web::Data<AppState> {
        web::Data::new(AppState {
            pipeline: Arc::new(IntakePipeline::new(config, remover)),
        })
    }

    fn stored_path(tmp: &TempDir, url: &str) -> std::path::PathBuf {
        tmp.path()
            .join("public")
            .join("uploads")
            .join(url.trim_start_matches("/uploads/"))
    }

    fn is_empty_dir(dir: &Path) -> bool {
        std::fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    #[actix_web::test]
    async fn upload_of_2mb_jpeg_returns_both_paths() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(test_config(&tmp), Arc::new(FakeRemover::succeeding())))
                .configure(routes),
        )
        .await;

        let mut jpeg = encode(16, 16, ImageFormat::Jpeg);
        jpeg.resize(2 * 1024 * 1024, 0);
        let body = multipart(vec![
            part("note", None, "text/plain", b"summer drop"),
            part("file", Some("shirt.jpg"), "image/jpeg", &jpeg),
        ]);

        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let original = body["originalImage"].as_str().unwrap();
        let processed = body["processedImage"].as_str().unwrap();

        assert_ne!(original, processed);
        assert!(original.starts_with("/uploads/original-") && original.ends_with(".jpeg"));
        assert!(processed.starts_with("/uploads/processed-") && processed.ends_with(".png"));
        assert_eq!(
            std::fs::metadata(stored_path(&tmp, original)).unwrap().len(),
            2 * 1024 * 1024
        );
        assert!(stored_path(&tmp, processed).is_file());
        assert_eq!(body["metadata"]["category"], "Top");
        assert_eq!(body["metadata"]["dominantColors"][0], "#2D3748");
    }

    #[actix_web::test]
    async fn missing_file_field_is_bad_request() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(test_config(&tmp), Arc::new(FakeRemover::succeeding())))
                .configure(routes),
        )
        .await;

        let body = multipart(vec![part("note", None, "text/plain", b"no image here")]);
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "error": "No file provided" }));
    }

    #[actix_web::test]
    async fn oversized_upload_is_rejected_regardless_of_content() {
        let tmp = TempDir::new().unwrap();
        let remover = Arc::new(FakeRemover::succeeding());
        let app = test::init_service(
            App::new()
                .app_data(state(test_config(&tmp), remover.clone()))
                .configure(routes),
        )
        .await;

        let body = multipart(vec![part(
            "file",
            Some("huge.png"),
            "image/png",
            &vec![0u8; 10_485_761],
        )]);
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "File size exceeds limit");
        assert!(remover.seen.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn configured_limit_applies() {
        let tmp = TempDir::new().unwrap();
        let config = UploadConfig {
            max_size: 1024,
            ..test_config(&tmp)
        };
        let app = test::init_service(
            App::new()
                .app_data(state(config, Arc::new(FakeRemover::succeeding())))
                .configure(routes),
        )
        .await;

        let body = multipart(vec![part("file", Some("a.png"), "image/png", &[7u8; 2048])]);
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn disallowed_type_is_bad_request() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(test_config(&tmp), Arc::new(FakeRemover::succeeding())))
                .configure(routes),
        )
        .await;

        for content_type in ["image/gif", "application/pdf"] {
            let body = multipart(vec![part(
                "file",
                Some("a.gif"),
                content_type,
                &encode(2, 2, ImageFormat::Png),
            )]);
            let resp = test::call_service(&app, upload_request(body).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "Invalid file type");
        }
    }

    #[actix_web::test]
    async fn provider_failure_is_500_and_original_survives() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let temp_dir = config.temp_dir.clone();
        let app = test::init_service(
            App::new()
                .app_data(state(config, Arc::new(FakeRemover::failing("boom"))))
                .configure(routes),
        )
        .await;

        let body = multipart(vec![part(
            "file",
            Some("dress.webp"),
            "image/webp",
            b"webp bytes are not inspected",
        )]);
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Error processing image");

        let stored: Vec<String> = std::fs::read_dir(tmp.path().join("public").join("uploads"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].starts_with("original-") && stored[0].ends_with(".webp"));
        assert!(is_empty_dir(&temp_dir));
    }

    #[actix_web::test]
    async fn lookup_after_upload_is_stable() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        std::fs::create_dir_all(&config.dir).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(config.clone(), Arc::new(FakeRemover::succeeding())))
                .service(public_files(&config))
                .configure(routes),
        )
        .await;

        let body = multipart(vec![part(
            "file",
            Some("shirt.png"),
            "image/png",
            &encode(10, 20, ImageFormat::Png),
        )]);
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let upload: Value = test::read_body_json(resp).await;
        let original = upload["originalImage"].as_str().unwrap().to_string();
        let image_id = original.trim_start_matches("/uploads/").to_string();

        let mut seen = Vec::new();
        for _ in 0..2 {
            let req = test::TestRequest::get()
                .uri(&format!("/api/get-results?imageId={}", image_id))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body: Value = test::read_body_json(resp).await;
            seen.push(body);
        }

        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[0]["imageUrl"], original.as_str());
        assert_eq!(seen[0]["metadata"]["format"], "png");
        assert_eq!(seen[0]["metadata"]["width"], 10);
        assert_eq!(seen[0]["metadata"]["height"], 20);
        assert!(seen[0]["metadata"]["createdAt"].is_string());

        let req = test::TestRequest::get().uri(&original).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn lookup_of_unknown_image_is_404() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(test_config(&tmp), Arc::new(FakeRemover::succeeding())))
                .configure(routes),
        )
        .await;

        let stored = test_config(&tmp).dir.join("original-123.png");
        std::fs::create_dir_all(stored.parent().unwrap()).unwrap();
        std::fs::write(&stored, encode(2, 2, ImageFormat::Png)).unwrap();
        let too_long = format!("/api/get-results?imageId={}.png", "a".repeat(300));

        for uri in [
            "/api/get-results?imageId=processed-1700000000000.png",
            "/api/get-results?imageId=..%2F..%2Fetc%2Fpasswd",
            "/api/get-results?imageId=%00",
            "/api/get-results?imageId=original-123.png%2F",
            too_long.as_str(),
        ] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request())
                .await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body, serde_json::json!({ "error": "Image not found" }));
        }
    }

    #[actix_web::test]
    async fn lookup_without_id_is_bad_request() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(test_config(&tmp), Arc::new(FakeRemover::succeeding())))
                .configure(routes),
        )
        .await;

        for uri in ["/api/get-results", "/api/get-results?imageId="] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request())
                .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "Image ID is required");
        }
    }
}
