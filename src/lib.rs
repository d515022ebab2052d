//! particle-assets: configuration and asset resolution for particle renderers
//!
//! This crate turns a layered, partially-specified particle configuration
//! into values a renderer can draw every frame without further parsing or
//! I/O:
//!
//! - [`merge`] layers user overrides over a default JSON tree.
//! - [`resolve_color`] reduces any supported color specification to a
//!   [`ParsedColor`].
//! - [`ImageManager`] loads the images of image-based shapes and recolors
//!   SVGs per particle.
//!
//! # Example
//!
//! ```no_run
//! use particle_assets::{merge, resolve_color, ColorSpec, ImageManager, ShapeDefinition};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let defaults = json!({
//!     "particles": {
//!         "color": { "value": "#ffffff" },
//!         "shape": { "type": "circle" }
//!     }
//! });
//! let config = merge(defaults, &[json!({
//!     "particles": {
//!         "shape": { "type": "image", "image": { "src": "star.svg", "width": 10, "height": 10 } }
//!     }
//! })]);
//!
//! let color: ColorSpec = serde_json::from_value(config["particles"]["color"]["value"].clone())?;
//! let color = resolve_color(&color, &mut rand::thread_rng());
//!
//! let mut images = ImageManager::default();
//! let shape = images.resolve_shape(ShapeDefinition::from_config(&config)?).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # SVG Recoloring
//!
//! SVG images are recolored once per particle color and opacity:
//!
//! ```
//! use particle_assets::{recolor_svg_text, ParsedColor, RecolorParams, Rgb};
//!
//! let params = RecolorParams::new(ParsedColor::Rgb(Rgb::new(255, 0, 0)), 0.5);
//! let svg = recolor_svg_text(r##"<circle fill="#000"/>"##, &params);
//! assert_eq!(svg, r#"<circle fill="rgba( 255, 0, 0, 0.5 )"/>"#);
//! ```

mod assets;
mod color;
mod config;
mod error;
mod merge;

pub use assets::{
    Canceller, DefaultFetcher, Fetch, FetchResponse, ImageDescriptor, ImageManager, ImageMode,
    ImagePayload, LocalFetcher, RecolorParams, ResolvedShape, SVG_KIND, recolor_svg,
    recolor_svg_text,
};
pub use color::{ColorSpec, Hsl, ParsedColor, Rgb, hex_to_rgb, resolve_color};
pub use config::{
    ImageDefinition, LoaderConfig, PolygonDefinition, ShapeDefinition, ShapeKind, ShapeType,
    StrokeDefinition,
};
pub use error::{AssetError, Result};
pub use merge::{merge, merge_layers};

#[cfg(feature = "http")]
pub use assets::HttpFetcher;

pub use assets::descriptor::aspect_ratio;
pub use assets::svg::count_color_tokens;
