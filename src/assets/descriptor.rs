//! Image descriptors and source format detection.

use std::sync::Arc;

use base64::prelude::*;
use image::RgbaImage;

use crate::config::ImageDefinition;
use crate::error::{AssetError, Result};

/// Format name used for SVG sources.
pub const SVG_KIND: &str = "svg";

/// The loaded content of an image.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePayload {
    /// Decoded SVG markup.
    Svg(String),
    /// A decoded raster image, shared with the renderer.
    Raster(Arc<RgbaImage>),
}

/// One image asset: its source, declared size, detected format, and payload
/// once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescriptor {
    /// Path, URL or data URI.
    pub src: String,
    /// Declared width (0 means unspecified).
    pub width: f64,
    /// Declared height (0 means unspecified).
    pub height: f64,
    /// `width / height`, or 1 when that is not a positive finite number.
    pub ratio: f64,
    /// Detected format, e.g. `svg` or `png`. Empty when nothing was detected.
    pub kind: String,
    /// Present once the image is loaded.
    pub payload: Option<ImagePayload>,
}

impl ImageDescriptor {
    /// Builds an unloaded descriptor from a declaration.
    ///
    /// SVG data URIs (`data:image/svg+xml;base64,...`) are decoded here, so
    /// the returned descriptor is already loaded for them.
    pub fn from_definition(definition: &ImageDefinition) -> Result<Self> {
        let mut descriptor = Self {
            src: definition.src.clone(),
            width: definition.width,
            height: definition.height,
            ratio: aspect_ratio(definition.width, definition.height),
            kind: String::new(),
            payload: None,
        };

        if let Some((subtype, payload)) = parse_xml_data_uri(&definition.src) {
            let bytes = BASE64_STANDARD
                .decode(payload.trim())
                .map_err(|e| decode_error(&definition.src, e))?;
            let markup = String::from_utf8(bytes).map_err(|e| decode_error(&definition.src, e))?;
            descriptor.kind = subtype.to_ascii_lowercase();
            descriptor.payload = Some(ImagePayload::Svg(markup));
        } else if let Some(kind) = data_uri_subtype(&definition.src) {
            descriptor.kind = kind;
        } else if let Some(kind) = trailing_extension(&definition.src) {
            descriptor.kind = kind;
        }

        Ok(descriptor)
    }

    /// Returns true once a payload is present.
    pub fn is_loaded(&self) -> bool {
        self.payload.is_some()
    }

    /// Returns true if the source was detected as SVG.
    pub fn is_svg(&self) -> bool {
        self.kind == SVG_KIND
    }

    /// Returns the SVG markup, if this is a loaded SVG.
    pub fn svg_data(&self) -> Option<&str> {
        match &self.payload {
            Some(ImagePayload::Svg(markup)) => Some(markup),
            _ => None,
        }
    }

    /// Returns the decoded raster, if this is a loaded raster image.
    pub fn raster(&self) -> Option<&Arc<RgbaImage>> {
        match &self.payload {
            Some(ImagePayload::Raster(image)) => Some(image),
            _ => None,
        }
    }
}

/// Computes `width / height`, falling back to 1 for zero, infinite, NaN or
/// negative quotients.
pub fn aspect_ratio(width: f64, height: f64) -> f64 {
    let ratio = width / height;
    if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 }
}

fn decode_error(src: &str, err: impl std::fmt::Display) -> AssetError {
    AssetError::Decode {
        src: src.to_owned(),
        reason: err.to_string(),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Matches `data:image/<xxx>+xml;<params>base64,<payload>` where `<xxx>` is
/// three word characters. Returns the subtype and the base64 payload.
fn parse_xml_data_uri(src: &str) -> Option<(&str, &str)> {
    let rest = src.strip_prefix("data:image/")?;
    let (subtype, rest) = rest.split_at_checked(3)?;
    if !subtype.chars().all(is_word_char) {
        return None;
    }
    let rest = rest.strip_prefix("+xml;")?;
    let (_, payload) = rest.split_once("base64,")?;
    Some((subtype, payload))
}

/// Returns the subtype of any other `data:image/...` URI, e.g. `png` for
/// `data:image/png;base64,...` or `svg` for `data:image/svg+xml,<svg...>`.
fn data_uri_subtype(src: &str) -> Option<String> {
    let rest = src.strip_prefix("data:image/")?;
    let end = rest.find([';', ',', '+'])?;
    let subtype = &rest[..end];
    (!subtype.is_empty()).then(|| subtype.to_ascii_lowercase())
}

/// Returns the last three characters of `src` when they are all word
/// characters.
fn trailing_extension(src: &str) -> Option<String> {
    let start = src.len().checked_sub(3)?;
    let tail = src.get(start..)?;
    tail.chars()
        .all(is_word_char)
        .then(|| tail.to_ascii_lowercase())
}

// ============================================================================
// Tests
// ============================================================================
