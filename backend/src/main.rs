mod detect;
mod media;
mod report;
mod routes;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use detect::Detect;
use detect::config::DetectorConfig;
use detect::model::YoloModel;
use report::store::ReportStore;
use routes::configure_routes;

#[derive(Clone)]
pub struct AppSettings {
    pub upload_dir: PathBuf,
    pub report_dir: PathBuf,
    pub max_video_frames: usize,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let detector_config = DetectorConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load detector config, using defaults: {e}");
        DetectorConfig::default()
    });

    let model_path =
        env::var("MODEL_PATH").unwrap_or_else(|_| "models/yolov8n.torchscript".to_string());
    let detector = match YoloModel::load(&model_path, detector_config.model.clone()) {
        Ok(model) => model,
        Err(e) => {
            log::error!("Failed to preload model at startup: {e:?}");
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Model loading failed: {e:?}"),
            ));
        }
    };
    let detector: Arc<dyn Detect> = Arc::new(detector);
    log::info!("Detection model loaded from {}", model_path);

    let settings = AppSettings {
        upload_dir: PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "/tmp/uploads".into())),
        report_dir: PathBuf::from(env::var("REPORT_DIR").unwrap_or_else(|_| "/tmp/reports".into())),
        max_video_frames: detector_config.video.max_frames,
    };
    std::fs::create_dir_all(&settings.upload_dir)?;
    std::fs::create_dir_all(&settings.report_dir)?;

    let store = ReportStore::new();

    let static_dir = if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        format!("{}/../static", manifest_dir)
    } else {
        "static".to_string()
    };

    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::from(detector.clone()))
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(settings.clone()))
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
