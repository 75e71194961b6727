// src/services/metadata.rs
use crate::models::FashionMetadata;

/// Fixed fashion metadata returned with every processed upload. No analysis
/// of the image takes place.
pub fn placeholder_metadata() -> FashionMetadata {
    FashionMetadata {
        category: "Top".to_string(),
        subcategory: "T-shirt".to_string(),
        dominant_colors: vec![
            "#2D3748".to_string(),
            "#E2E8F0".to_string(),
            "#CBD5E0".to_string(),
        ],
        fit: "Regular".to_string(),
        texture: "Cotton".to_string(),
        season: "Summer".to_string(),
        occasion: "Casual".to_string(),
        target_audience: "Unisex".to_string(),
    }
}
