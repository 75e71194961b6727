// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::info;
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::AppConfig;
use crate::services::IntakePipeline;
use crate::services::background_remover::{self, BackgroundRemover};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<IntakePipeline>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting fashion intake service...");

    let config = AppConfig::from_env()?;
    let remover = background_remover::from_config(&config.provider)?;
    info!("Background removal provider: {}", remover.name());

    let pipeline = Arc::new(IntakePipeline::new(config.upload.clone(), remover));
    pipeline.store().ensure_dir().await?;
    info!(
        "Serving {} from {} (max upload {} bytes)",
        config.upload.public_path,
        pipeline.store().dir().display(),
        config.upload.max_size
    );

    let app_state = AppState { pipeline };
    let upload_config = config.upload.clone();

    info!("Starting HTTP server on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::routes)
            .service(handlers::public_files(&upload_config))
            .route("/health", web::get().to(health_check))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
