// src/services/validator.rs
use crate::config::UploadConfig;
use crate::errors::IntakeError;
use crate::models::UploadRequest;

/// Checks an upload against the configured limits. Only the declared size and
/// declared MIME type are consulted; the payload itself is not sniffed.
pub struct UploadValidator<'a> {
    config: &'a UploadConfig,
}

impl<'a> UploadValidator<'a> {
    pub fn new(config: &'a UploadConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, upload: Option<UploadRequest>) -> Result<UploadRequest, IntakeError> {
        let upload =
            upload.ok_or_else(|| IntakeError::InvalidInput("No file provided".to_string()))?;

        if upload.declared_size > self.config.max_size {
            return Err(IntakeError::InvalidInput(
                "File size exceeds limit".to_string(),
            ));
        }

        if !self.is_allowed_type(&upload.content_type) {
            return Err(IntakeError::InvalidInput("Invalid file type".to_string()));
        }

        Ok(upload)
    }

    pub fn is_allowed_type(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        self.config.allowed_types.iter().any(|t| *t == essence)
    }
}
