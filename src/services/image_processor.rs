// src/services/image_processor.rs
use crate::errors::IntakeError;
use image::{ImageFormat as ImgFormat, io::Reader as ImageReader};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: String,
    pub width: u32,
    pub height: u32,
}

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Detects format and dimensions from the payload header, ignoring any
    /// file extension.
    pub fn inspect(&self, data: &[u8]) -> Result<ImageInfo, IntakeError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| IntakeError::ImageProcessing(format!("Failed to read image: {}", e)))?;

        let format = reader.format().ok_or_else(|| {
            IntakeError::ImageProcessing("Unrecognized image format".to_string())
        })?;

        let (width, height) = reader.into_dimensions().map_err(|e| {
            IntakeError::ImageProcessing(format!("Failed to decode image header: {}", e))
        })?;

        Ok(ImageInfo {
            format: format_name(format),
            width,
            height,
        })
    }

    pub fn to_png(&self, data: &[u8]) -> Result<Vec<u8>, IntakeError> {
        let img = image::load_from_memory(data)
            .map_err(|e| IntakeError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let mut output = Vec::new();
        img.write_to(&mut Cursor::new(&mut output), ImgFormat::Png)
            .map_err(|e| {
                IntakeError::ImageProcessing(format!("Failed to encode PNG image: {}", e))
            })?;

        Ok(output)
    }
}

fn format_name(format: ImgFormat) -> String {
    match format {
        ImgFormat::Jpeg => "jpeg".to_string(),
        ImgFormat::Png => "png".to_string(),
        ImgFormat::WebP => "webp".to_string(),
        ImgFormat::Gif => "gif".to_string(),
        ImgFormat::Tiff => "tiff".to_string(),
        ImgFormat::Avif => "avif".to_string(),
        other => format!("{:?}", other).to_ascii_lowercase(),
    }
}
