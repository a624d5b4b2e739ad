//! Catalog configuration.
//!
//! Every field has a default, so hosts only pass what they want to change:
//!
//! ```rust
//! use shelf_core::config::CatalogConfig;
//!
//! let config = CatalogConfig::from_json(r#"{"storage_key":"myShelves"}"#)?;
//! assert_eq!(config.storage_key, "myShelves");
//! assert_eq!(config.crop.viewport.width, 250);
//! # Ok::<(), shelf_core::catalog_error::CatalogError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::catalog_error::CatalogResult;

/// Key the collection is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "libraryData";

/// 64 MiB; images are stored inline as base64, so leave headroom.
pub const DEFAULT_MAP_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub storage_key: String,
    pub map_size: usize,
    /// Shelf names offered in the picker before the user has created any.
    pub default_shelves: Vec<String>,
    pub camera: CameraConfig,
    pub crop: CropConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            map_size: DEFAULT_MAP_SIZE,
            default_shelves: vec![
                "read".to_string(),
                "wishlist".to_string(),
                "havent".to_string(),
            ],
            camera: CameraConfig::default(),
            crop: CropConfig::default(),
        }
    }
}

impl CatalogConfig {
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointed at the item.
    Environment,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub facing_mode: FacingMode,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { facing_mode: FacingMode::Environment }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Settings handed to the interactive cropper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Region the result is cut to; card-shaped by default.
    pub viewport: Size,
    pub boundary: Size,
    pub format: String,
    /// Encoder quality in `0.0..=1.0`.
    pub quality: f32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            viewport: Size { width: 250, height: 350 },
            boundary: Size { width: 280, height: 380 },
            format: "jpeg".to_string(),
            quality: 1.0,
        }
    }
}
