use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::Serialize;
use shared::{MediaCategory, UploadResponse};
use std::io::Write;
use uuid::Uuid;

use crate::AppSettings;
use crate::detect::frames::VideoFrames;
use crate::detect::{Detect, PipelineError, aggregate, frames};
use crate::media::{self, MediaItem};
use crate::report::pdf;
use crate::report::store::ReportStore;

const AUDIO_NOTICE: &str =
    "Audio file uploaded successfully. AI animal detection not supported for audio.";
const DOCUMENT_NOTICE: &str =
    "Document file uploaded successfully. AI animal detection not supported for documents.";
const UNSUPPORTED_NOTICE: &str = "Unsupported file type. No detection available.";

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: String) {
    configure_api(cfg);
    cfg.service(Files::new("/", static_dir).index_file("index.html"));
}

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/upload").route(web::post().to(handle_upload)))
        .service(web::resource("/api/report/{result_id}").route(web::get().to(download_report)));
}

async fn handle_upload(
    detector: web::Data<dyn Detect>,
    store: web::Data<ReportStore>,
    settings: web::Data<AppSettings>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut file_name: Option<String> = None;
    let mut file_data: Vec<u8> = Vec::new();

    while let Ok(Some(mut field)) = payload.try_next().await {
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk?;
            data.write_all(&bytes)?;
        }

        if file_name.is_none() && name.as_deref().is_some_and(|n| !n.is_empty()) && !data.is_empty()
        {
            file_name = name;
            file_data = data;
        }
    }

    // No file or empty filename: the initial view, nothing recorded.
    let Some(file_name) = file_name else {
        return Ok(HttpResponse::Ok().json(UploadResponse {
            result_id: None,
            result_text: String::new(),
            media_path: None,
            media_type: None,
        }));
    };

    let saved_path = {
        let extension: String = media::extension_of(&file_name)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let stored_name = if extension.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), extension)
        };
        settings.upload_dir.join(stored_name)
    };
    std::fs::create_dir_all(&settings.upload_dir)?;
    std::fs::write(&saved_path, &file_data)?;

    let item = MediaItem::from_upload(&file_name, saved_path);
    info!(
        "upload {} (.{}, {} bytes) classified as {}",
        file_name,
        item.extension,
        file_data.len(),
        item.category
    );

    let result_text = match item.category {
        MediaCategory::Image => match detect_image(detector.get_ref(), &item) {
            Ok(text) => text,
            Err(e) => return Ok(internal_error("image detection failed", &e)),
        },
        MediaCategory::Video => {
            match detect_video(detector.get_ref(), &item, settings.max_video_frames) {
                Ok(text) => text,
                Err(e) => return Ok(internal_error("video detection failed", &e)),
            }
        }
        MediaCategory::Audio => AUDIO_NOTICE.to_string(),
        MediaCategory::Document => DOCUMENT_NOTICE.to_string(),
        MediaCategory::Unknown => UNSUPPORTED_NOTICE.to_string(),
    };

    // Unknown types produce no report entry, only the pass-through text.
    let result_id = match item.category {
        MediaCategory::Unknown => None,
        _ => Some(store.record(result_text.clone())),
    };

    Ok(HttpResponse::Ok().json(UploadResponse {
        result_id,
        result_text,
        media_path: Some(item.path.display().to_string()),
        media_type: Some(item.category),
    }))
}

fn detect_image(detector: &dyn Detect, item: &MediaItem) -> Result<String, PipelineError> {
    let frame = frames::single_frame(&item.path)?;
    let outcome = aggregate::scan_image(detector, &frame)?;
    Ok(aggregate::summarize(item.category, &outcome))
}

fn detect_video(
    detector: &dyn Detect,
    item: &MediaItem,
    max_frames: usize,
) -> Result<String, PipelineError> {
    let video = VideoFrames::open(&item.path, max_frames)?;
    let outcome = aggregate::scan_video(detector, video)?;
    Ok(aggregate::summarize(item.category, &outcome))
}

async fn download_report(
    store: web::Data<ReportStore>,
    settings: web::Data<AppSettings>,
    path: web::Path<String>,
) -> HttpResponse {
    let result_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid result id"),
    };

    let entry = store.get(result_id);
    let out_path = settings.report_dir.join(format!("report-{result_id}.pdf"));
    match pdf::generate(entry.as_ref(), &out_path) {
        Ok(bytes) => HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header((
                "Content-Disposition",
                "attachment; filename=\"animal_report.pdf\"",
            ))
            .body(bytes),
        Err(e) => internal_error("report generation failed", &e),
    }
}

fn internal_error(context: &str, err: &dyn std::fmt::Display) -> HttpResponse {
    error!("{context}: {err}");
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: format!("{context}: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection, InferenceError};
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::{App, test};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct StubDetector {
        labels: Vec<&'static str>,
    }

    impl Detect for StubDetector {
        fn detect(&self, _frame: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
            Ok(self
                .labels
                .iter()
                .map(|label| Detection {
                    class_id: 0,
                    label: label.to_string(),
                    confidence: 0.8,
                    bbox: BoundingBox {
                        x: 0.1,
                        y: 0.1,
                        width: 0.3,
                        height: 0.3,
                    },
                })
                .collect())
        }
    }

    async fn spawn_app(
        dir: &TempDir,
        store: ReportStore,
        labels: Vec<&'static str>,
    ) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = Error> {
        let detector: Arc<dyn Detect> = Arc::new(StubDetector { labels });
        let settings = AppSettings {
            upload_dir: dir.path().join("uploads"),
            report_dir: dir.path().join("reports"),
            max_video_frames: 300,
        };
        test::init_service(
            App::new()
                .app_data(web::Data::from(detector))
                .app_data(web::Data::new(store))
                .app_data(web::Data::new(settings))
                .configure(configure_api),
        )
        .await
    }

    fn multipart_body(filename: &str, bytes: &[u8]) -> (String, Vec<u8>) {
        let boundary = "------test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"media\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(8, 8))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    async fn upload(
        app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = Error>,
        filename: &str,
        bytes: &[u8],
    ) -> UploadResponse {
        let (content_type, body) = multipart_body(filename, bytes);
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        test::call_and_read_body_json(app, req).await
    }

    #[actix_web::test]
    async fn image_upload_reports_sorted_labels_and_health() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::new();
        let app = spawn_app(&dir, store.clone(), vec!["cat", "dog"]).await;

        let response = upload(&app, "cat.jpg", &png_bytes()).await;
        assert_eq!(
            response.result_text,
            "Detected: cat, dog | Health Status: Appears Normal"
        );
        assert_eq!(response.media_type, Some(MediaCategory::Image));

        let id = response.result_id.expect("image upload records a result");
        assert_eq!(store.get(id).unwrap().text, response.result_text);
    }

    #[actix_web::test]
    async fn image_with_no_detections_reports_no_animal() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::new();
        let app = spawn_app(&dir, store.clone(), vec![]).await;

        let response = upload(&app, "empty.png", &png_bytes()).await;
        assert_eq!(response.result_text, "No animal detected");

        let id = response.result_id.unwrap();
        assert_eq!(store.get(id).unwrap().text, "No animal detected");
    }

    #[actix_web::test]
    async fn audio_upload_passes_through() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::new();
        let app = spawn_app(&dir, store.clone(), vec!["dog"]).await;

        let response = upload(&app, "clip.mp3", b"not really audio").await;
        assert_eq!(response.result_text, AUDIO_NOTICE);
        assert_eq!(response.media_type, Some(MediaCategory::Audio));

        let id = response
            .result_id
            .expect("audio uploads overwrite the store");
        assert_eq!(store.get(id).unwrap().text, AUDIO_NOTICE);
    }

    #[actix_web::test]
    async fn document_upload_passes_through() {
        let dir = TempDir::new().unwrap();
        let app = spawn_app(&dir, ReportStore::new(), vec![]).await;

        let response = upload(&app, "notes.txt", b"meeting notes").await;
        assert_eq!(response.result_text, DOCUMENT_NOTICE);
        assert_eq!(response.media_type, Some(MediaCategory::Document));
        assert!(response.result_id.is_some());
    }

    #[actix_web::test]
    async fn unknown_extension_gets_no_result_id() {
        let dir = TempDir::new().unwrap();
        let app = spawn_app(&dir, ReportStore::new(), vec![]).await;

        let response = upload(&app, "archive.zip", b"PK").await;
        assert_eq!(response.result_text, UNSUPPORTED_NOTICE);
        assert_eq!(response.media_type, Some(MediaCategory::Unknown));
        assert!(response.result_id.is_none());
    }

    #[actix_web::test]
    async fn upload_without_file_returns_the_empty_view() {
        let dir = TempDir::new().unwrap();
        let app = spawn_app(&dir, ReportStore::new(), vec![]).await;

        let boundary = "------test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{boundary}--\r\n"
        );
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            ))
            .set_payload(body)
            .to_request();
        let response: UploadResponse = test::call_and_read_body_json(&app, req).await;

        assert!(response.result_text.is_empty());
        assert!(response.result_id.is_none());
        assert!(response.media_type.is_none());
    }

    #[actix_web::test]
    async fn report_download_renders_the_recorded_text() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::new();
        let app = spawn_app(&dir, store.clone(), vec![]).await;

        let id = store.record("Detected: cat | Health Status: Appears Normal".to_string());
        let req = test::TestRequest::get()
            .uri(&format!("/api/report/{id}"))
            .to_request();
        let response = test::call_service(&app, req).await;
        assert!(response.status().is_success());
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/pdf"
        );

        let bytes = test::read_body(response).await;
        assert!(bytes.starts_with(b"%PDF"));
        assert!(
            bytes
                .windows(b"Detected: cat".len())
                .any(|w| w == b"Detected: cat")
        );
        assert!(
            dir.path()
                .join("reports")
                .join(format!("report-{id}.pdf"))
                .exists()
        );
    }

    #[actix_web::test]
    async fn report_download_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::new();
        let app = spawn_app(&dir, store.clone(), vec![]).await;

        let id = store.record("No animal detected".to_string());
        let uri = format!("/api/report/{id}");

        let first = test::read_body(
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await,
        )
        .await;
        let second = test::read_body(
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await,
        )
        .await;
        assert_eq!(first, second);
    }

    #[actix_web::test]
    async fn report_for_unknown_id_says_no_data() {
        let dir = TempDir::new().unwrap();
        let app = spawn_app(&dir, ReportStore::new(), vec![]).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/report/{}", Uuid::new_v4()))
            .to_request();
        let bytes = test::read_body(test::call_service(&app, req).await).await;
        assert!(bytes.windows(7).any(|w| w == b"No Data"));
    }

    #[actix_web::test]
    async fn malformed_report_id_is_a_bad_request() {
        let dir = TempDir::new().unwrap();
        let app = spawn_app(&dir, ReportStore::new(), vec![]).await;

        let req = test::TestRequest::get()
            .uri("/api/report/not-a-uuid")
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }
}
