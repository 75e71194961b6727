// src/services/pipeline.rs
use crate::config::UploadConfig;
use crate::errors::IntakeError;
use crate::models::{
    ImageResult, ProcessingResult, StoredImage, StoredImageMetadata, UploadRequest,
};
use crate::services::background_remover::BackgroundRemover;
use crate::services::image_processor::ImageProcessor;
use crate::services::metadata::placeholder_metadata;
use crate::services::storage::ImageStore;
use crate::services::validator::UploadValidator;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stages a single upload moves through. Any stage may end in failure; there
/// is no retry and no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    OriginalStored,
    BackgroundRemoved,
    ProcessedStored,
    Completed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::OriginalStored => "original stored",
            Stage::BackgroundRemoved => "background removed",
            Stage::ProcessedStored => "processed stored",
            Stage::Completed => "completed",
        };
        f.write_str(name)
    }
}

pub struct IntakePipeline {
    upload: UploadConfig,
    store: ImageStore,
    remover: Arc<dyn BackgroundRemover>,
    image_processor: ImageProcessor,
}

impl IntakePipeline {
    pub fn new(upload: UploadConfig, remover: Arc<dyn BackgroundRemover>) -> Self {
        let store = ImageStore::new(upload.dir.clone(), upload.public_path.clone());
        Self {
            upload,
            store,
            remover,
            image_processor: ImageProcessor::new(),
        }
    }

    pub fn upload_config(&self) -> &UploadConfig {
        &self.upload
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub fn validate(&self, upload: Option<UploadRequest>) -> Result<UploadRequest, IntakeError> {
        UploadValidator::new(&self.upload).validate(upload)
    }

    pub async fn persist_original(
        &self,
        data: &[u8],
        extension: &str,
    ) -> Result<StoredImage, IntakeError> {
        self.store.persist("original", extension, data).await
    }

    /// Hands the bytes to the provider through a temp file outside the public
    /// directory. The temp file is removed once the provider returns, whether
    /// it succeeded or not.
    pub async fn remove_background(
        &self,
        data: &[u8],
        extension: &str,
    ) -> Result<Vec<u8>, IntakeError> {
        tokio::fs::create_dir_all(&self.upload.temp_dir)
            .await
            .map_err(|e| {
                IntakeError::Storage(format!(
                    "Failed to create temp directory {}: {}",
                    self.upload.temp_dir.display(),
                    e
                ))
            })?;

        let temp_file = tempfile::Builder::new()
            .prefix("temp-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(&self.upload.temp_dir)
            .map_err(|e| IntakeError::Storage(format!("Failed to create temp file: {}", e)))?;

        tokio::fs::write(temp_file.path(), data).await.map_err(|e| {
            IntakeError::Storage(format!(
                "Failed to write temp file {}: {}",
                temp_file.path().display(),
                e
            ))
        })?;

        let outcome = self.remover.remove_background(temp_file.path()).await;

        if let Err(e) = temp_file.close() {
            log::warn!("Failed to remove temp file: {}", e);
        }

        let b64 = outcome?;
        let processed = general_purpose::STANDARD.decode(b64.trim()).map_err(|e| {
            IntakeError::Provider(format!(
                "{} returned an undecodable payload: {}",
                self.remover.name(),
                e
            ))
        })?;

        if processed.is_empty() {
            return Err(IntakeError::EmptyPayload);
        }

        Ok(processed)
    }

    pub async fn persist_processed(&self, data: &[u8]) -> Result<StoredImage, IntakeError> {
        self.store.persist("processed", "png", data).await
    }

    /// Runs validate, store original, remove background and store processed in
    /// order. A failure stops the chain; files already written stay on disk.
    pub async fn handle_upload(
        &self,
        upload: Option<UploadRequest>,
    ) -> Result<ProcessingResult, IntakeError> {
        let request_id = Uuid::new_v4();
        let mut stage = Stage::Received;
        log::info!("[{}] {}", request_id, stage);

        let result = self.run_stages(request_id, upload, &mut stage).await;
        match &result {
            Ok(done) => log::info!(
                "[{}] {}: {} -> {}",
                request_id,
                Stage::Completed,
                done.original.id,
                done.processed.id
            ),
            Err(e) => log::log!(
                failure_level(e),
                "[{}] failed after stage '{}': {}",
                request_id,
                stage,
                e
            ),
        }
        result
    }

    async fn run_stages(
        &self,
        request_id: Uuid,
        upload: Option<UploadRequest>,
        stage: &mut Stage,
    ) -> Result<ProcessingResult, IntakeError> {
        let upload = self.validate(upload)?;
        *stage = Stage::Validated;
        log::info!(
            "[{}] {}: {} ({}, {} bytes)",
            request_id,
            stage,
            upload.filename.as_deref().unwrap_or("<unnamed>"),
            upload.content_type,
            upload.declared_size
        );

        let extension = upload.extension();
        let original = self.persist_original(&upload.data, &extension).await?;
        *stage = Stage::OriginalStored;
        log::info!("[{}] {}: {}", request_id, stage, original.id);

        let processed_data = self.remove_background(&upload.data, &extension).await?;
        *stage = Stage::BackgroundRemoved;
        log::info!(
            "[{}] {} via {} ({} bytes)",
            request_id,
            stage,
            self.remover.name(),
            processed_data.len()
        );

        let processed = self.persist_processed(&processed_data).await?;
        *stage = Stage::ProcessedStored;
        log::info!("[{}] {}: {}", request_id, stage, processed.id);

        Ok(ProcessingResult {
            original,
            processed,
            metadata: placeholder_metadata(),
        })
    }

    pub async fn fetch_result_metadata(&self, image_id: &str) -> Result<ImageResult, IntakeError> {
        let (path, meta) = self.store.locate(image_id).await.map_err(lookup_error)?;

        let data = tokio::fs::read(&path).await.map_err(|e| {
            IntakeError::ImageProcessing(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let info = self.image_processor.inspect(&data)?;

        let created = meta.created().or_else(|_| meta.modified()).map_err(|e| {
            IntakeError::ImageProcessing(format!("No timestamps for {}: {}", path.display(), e))
        })?;

        Ok(ImageResult {
            image_url: self.store.url_for(image_id),
            metadata: StoredImageMetadata {
                size: meta.len(),
                format: info.format,
                width: info.width,
                height: info.height,
                created_at: DateTime::<Utc>::from(created),
            },
        })
    }
}

/// Rejected uploads are the client's problem; everything else is ours.
fn failure_level(err: &IntakeError) -> log::Level {
    match err {
        IntakeError::InvalidInput(_) => log::Level::Warn,
        _ => log::Level::Error,
    }
}

/// Storage trouble while reading back a result is reported as a lookup
/// failure, not an upload failure.
fn lookup_error(err: IntakeError) -> IntakeError {
    match err {
        IntakeError::Storage(msg) => IntakeError::ImageProcessing(msg),
        other => other,
    }
}
