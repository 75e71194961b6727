// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: Option<String>,
    pub content_type: String,
    pub declared_size: usize,
    pub data: Vec<u8>,
}

impl UploadRequest {
    /// File extension taken from the MIME subtype, e.g. `image/jpeg` -> `jpeg`.
    pub fn extension(&self) -> String {
        let subtype = self
            .content_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .unwrap_or("bin");
        subtype
            .split(['+', ';'])
            .next()
            .unwrap_or(subtype)
            .trim()
            .to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub id: String,
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub original: StoredImage,
    pub processed: StoredImage,
    pub metadata: FashionMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FashionMetadata {
    pub category: String,
    pub subcategory: String,
    pub dominant_colors: Vec<String>,
    pub fit: String,
    pub texture: String,
    pub season: String,
    pub occasion: String,
    pub target_audience: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImageResponse {
    pub original_image: String,
    pub processed_image: String,
    pub metadata: FashionMetadata,
}

impl From<ProcessingResult> for ProcessImageResponse {
    fn from(result: ProcessingResult) -> Self {
        Self {
            original_image: result.original.url,
            processed_image: result.processed.url,
            metadata: result.metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub image_url: String,
    pub metadata: StoredImageMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImageMetadata {
    pub size: u64,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    #[serde(rename = "imageId")]
    pub image_id: Option<String>,
}
