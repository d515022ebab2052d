//! SVG recoloring and rasterization using resvg/usvg.
//!
//! Particles drawn from an SVG image take the particle's color and opacity.
//! [`recolor_svg_text`] rewrites every color token in the markup, and
//! [`recolor_svg`] rasterizes the rewritten markup off the async thread.

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};

use crate::color::ParsedColor;
use crate::error::{AssetError, Result};

// ============================================================================
// Recoloring
// ============================================================================

/// The color and opacity an SVG is recolored with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecolorParams {
    pub color: ParsedColor,
    pub opacity: f64,
}

impl RecolorParams {
    pub fn new(color: ParsedColor, opacity: f64) -> Self {
        Self { color, opacity }
    }
}

/// Replaces every hex color (`#` followed by 3 to 6 hex digits) and every
/// `rgb(...)` token (digits and commas only) with an `rgba(...)` value.
///
/// Matching is case-insensitive. An empty color leaves the markup unchanged.
pub fn recolor_svg_text(svg: &str, params: &RecolorParams) -> String {
    let Some(replacement) = params.color.to_rgba_css(params.opacity) else {
        return svg.to_owned();
    };

    let bytes = svg.as_bytes();
    let mut result = String::with_capacity(svg.len());
    let mut copied = 0;
    let mut at = 0;

    while at < bytes.len() {
        match color_token_len(&bytes[at..]) {
            Some(len) => {
                // Tokens are ASCII, so both ends sit on char boundaries
                result.push_str(&svg[copied..at]);
                result.push_str(&replacement);
                at += len;
                copied = at;
            }
            None => at += 1,
        }
    }

    result.push_str(&svg[copied..]);
    result
}

/// Returns the length of the color token starting at `bytes[0]`, if any.
fn color_token_len(bytes: &[u8]) -> Option<usize> {
    if bytes.first() == Some(&b'#') {
        let digits = bytes[1..]
            .iter()
            .take(6)
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        return (digits >= 3).then_some(1 + digits);
    }

    if bytes.len() >= 4 && bytes[..4].eq_ignore_ascii_case(b"rgb(") {
        let inner = bytes[4..]
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b',')
            .count();
        if inner > 0 && bytes.get(4 + inner) == Some(&b')') {
            return Some(4 + inner + 1);
        }
    }

    None
}

/// Counts the color tokens [`recolor_svg_text`] would replace.
pub fn count_color_tokens(svg: &str) -> usize {
    let bytes = svg.as_bytes();
    let mut count = 0;
    let mut at = 0;
    while at < bytes.len() {
        match color_token_len(&bytes[at..]) {
            Some(len) => {
                count += 1;
                at += len;
            }
            None => at += 1,
        }
    }
    count
}

/// Recolors an SVG and rasterizes it at its intrinsic size.
///
/// Rendering runs on the blocking pool; the intermediate pixmap is dropped
/// once converted. Recolored variants are not cached.
pub async fn recolor_svg(svg: &str, params: &RecolorParams) -> Result<RgbaImage> {
    let recolored = recolor_svg_text(svg, params);
    tokio::task::spawn_blocking(move || rasterize(&recolored))
        .await
        .map_err(|e| AssetError::Svg(e.to_string()))?
}

// ============================================================================
// Rasterization
// ============================================================================

fn rasterize(svg: &str) -> Result<RgbaImage> {
    let tree =
        Tree::from_str(svg, &Options::default()).map_err(|e| AssetError::Svg(e.to_string()))?;

    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| AssetError::Svg(format!("cannot allocate {width}x{height} pixmap")))?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

    Ok(pixmap_to_rgba_image(&pixmap))
}

/// Converts a tiny_skia Pixmap (premultiplied) to a straight-alpha image.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    img
}

// ============================================================================
// Tests
// ============================================================================
