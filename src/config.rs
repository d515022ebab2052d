//! Typed views over the configuration tree.
//!
//! Only the parts of the particle configuration that this crate acts on are
//! typed here: the shape section and the loader settings. Everything else
//! stays in the merged [`serde_json::Value`] for the renderer to read.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "type": "images",
//!   "stroke": { "width": 0, "color": "#000000" },
//!   "polygon": { "nb_sides": 5 },
//!   "images": [
//!     { "src": "star.svg", "width": 100, "height": 100 },
//!     { "src": "https://example.com/dot.png", "width": 32, "height": 16 }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::color::ColorSpec;

// ============================================================================
// Shape Types
// ============================================================================

/// The kinds of particle shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    #[default]
    Circle,
    Edge,
    Triangle,
    Polygon,
    Star,
    /// A single image, declared in `image`.
    Image,
    /// A set of images, declared in `images`.
    Images,
}

/// A declared shape type: either one kind or a list of kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(untagged)]
pub enum ShapeKind {
    One(ShapeType),
    Many(Vec<ShapeType>),
}

impl ShapeKind {
    /// Returns true if `shape` is the declared kind or one of the listed kinds.
    pub fn includes(&self, shape: ShapeType) -> bool {
        match self {
            Self::One(kind) => *kind == shape,
            Self::Many(kinds) => kinds.contains(&shape),
        }
    }
}

impl Default for ShapeKind {
    fn default() -> Self {
        Self::One(ShapeType::default())
    }
}

impl From<ShapeType> for ShapeKind {
    fn from(shape: ShapeType) -> Self {
        Self::One(shape)
    }
}

// ============================================================================
// Shape Definition
// ============================================================================

/// One image as declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct ImageDefinition {
    /// Path, URL or data URI of the image.
    pub src: String,
    /// Designer-specified width; 0 means unspecified.
    pub width: f64,
    /// Designer-specified height; 0 means unspecified.
    pub height: f64,
}

impl ImageDefinition {
    pub fn new(src: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            src: src.into(),
            width,
            height,
        }
    }
}

/// Outline drawn around each particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct StrokeDefinition {
    pub width: f64,
    #[cfg_attr(feature = "jsonschema", schemars(with = "serde_json::Value"))]
    pub color: ColorSpec,
}

impl Default for StrokeDefinition {
    fn default() -> Self {
        Self {
            width: 0.0,
            color: ColorSpec::hex("#000000"),
        }
    }
}

/// Polygon parameters, used when the shape type is `polygon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct PolygonDefinition {
    pub nb_sides: u32,
}

impl Default for PolygonDefinition {
    fn default() -> Self {
        Self { nb_sides: 5 }
    }
}

/// The `particles.shape` section of the configuration.
///
/// Only the image field matching the declared type is consulted; declaring
/// both `image` and `images` is not supported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct ShapeDefinition {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub stroke: StrokeDefinition,
    pub polygon: PolygonDefinition,
    pub image: ImageDefinition,
    pub images: Vec<ImageDefinition>,
}

impl ShapeDefinition {
    /// Creates a definition declaring a single image.
    pub fn single_image(image: ImageDefinition) -> Self {
        Self {
            kind: ShapeType::Image.into(),
            image,
            ..Self::default()
        }
    }

    /// Creates a definition declaring an ordered image set.
    pub fn image_set(images: Vec<ImageDefinition>) -> Self {
        Self {
            kind: ShapeType::Images.into(),
            images,
            ..Self::default()
        }
    }

    /// Deserializes the shape section from a merged configuration tree.
    ///
    /// Looks under `particles.shape`; a missing section yields the defaults.
    pub fn from_config(config: &serde_json::Value) -> Result<Self, serde_json::Error> {
        match config.pointer("/particles/shape") {
            Some(shape) => serde_json::from_value(shape.clone()),
            None => Ok(Self::default()),
        }
    }
}

// ============================================================================
// Loader Settings
// ============================================================================

/// Settings for [`ImageManager`](crate::ImageManager) loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    /// Deadline for a single image load, in milliseconds.
    pub load_timeout_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: 30_000,
        }
    }
}

impl LoaderConfig {
    pub fn load_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.load_timeout_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================
