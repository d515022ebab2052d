//! Image asset loading for image-based particle shapes.
//!
//! [`ImageManager`] resolves the image declarations of a
//! [`ShapeDefinition`] into loaded [`ImageDescriptor`]s and keeps them for
//! the renderer:
//!
//! ```text
//! ShapeDefinition ──resolve_shape──► ImageManager ──image()/image_at(i)──► renderer
//!                                    │
//!                                    ├─ Fetch (bytes for a src)
//!                                    └─ decode / rasterize (blocking pool)
//! ```
//!
//! A manager is either in [`ImageMode::Single`] or [`ImageMode::Multiple`];
//! resolving a shape of the other kind replaces whatever was loaded before.

pub mod descriptor;
pub mod fetch;
pub mod svg;

pub use descriptor::{ImageDescriptor, ImagePayload, SVG_KIND};
pub use fetch::{DefaultFetcher, Fetch, FetchResponse, LocalFetcher};
pub use svg::{RecolorParams, recolor_svg, recolor_svg_text};

#[cfg(feature = "http")]
pub use fetch::HttpFetcher;

use std::sync::Arc;

use futures::future::try_join_all;
use image::RgbaImage;
use tokio::sync::watch;

use crate::config::{ImageDefinition, LoaderConfig, ShapeDefinition, ShapeType};
use crate::error::{AssetError, Result};

// ============================================================================
// Mode & State
// ============================================================================

/// Which collection of a manager is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageMode {
    /// One image, read with [`ImageManager::image`].
    #[default]
    Single,
    /// An ordered image set, read with [`ImageManager::image_at`].
    Multiple,
}

#[derive(Debug, Clone)]
enum Loaded {
    Single(Option<ImageDescriptor>),
    Multiple(Vec<ImageDescriptor>),
}

impl Default for Loaded {
    fn default() -> Self {
        Self::Single(None)
    }
}

/// A shape definition together with the images resolved for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedShape {
    /// The definition as passed to [`ImageManager::resolve_shape`].
    pub shape: ShapeDefinition,
    /// The loaded image, for `image` shapes.
    pub image: Option<ImageDescriptor>,
    /// The loaded images in declaration order, for `images` shapes.
    pub images: Vec<ImageDescriptor>,
}

impl ResolvedShape {
    fn unchanged(shape: ShapeDefinition) -> Self {
        Self {
            shape,
            image: None,
            images: Vec::new(),
        }
    }
}

// ============================================================================
// Canceller
// ============================================================================

/// Aborts the loads of an in-flight [`ImageManager::resolve_shape`].
///
/// Loads that observe the signal fail with [`AssetError::Cancelled`]. A
/// cancel issued while no resolution is running has no effect on the next
/// one.
#[derive(Debug, Clone)]
pub struct Canceller {
    signal: Arc<watch::Sender<bool>>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.signal.send_replace(true);
    }
}

// ============================================================================
// ImageManager
// ============================================================================

/// Loads and holds the images of the current particle shape.
///
/// The default manager fetches through [`DefaultFetcher`], which reaches
/// `http(s)://` sources when the `http` feature is enabled.
pub struct ImageManager<F = DefaultFetcher> {
    fetcher: F,
    config: LoaderConfig,
    loaded: Loaded,
    cancel: Arc<watch::Sender<bool>>,
}

impl Default for ImageManager<DefaultFetcher> {
    fn default() -> Self {
        Self::new(DefaultFetcher::default())
    }
}

impl<F: Fetch> ImageManager<F> {
    /// Creates a manager that retrieves bytes through `fetcher`.
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, LoaderConfig::default())
    }

    pub fn with_config(fetcher: F, config: LoaderConfig) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            fetcher,
            config,
            loaded: Loaded::default(),
            cancel: Arc::new(cancel),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Returns a handle that cancels loads started by this manager.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            signal: Arc::clone(&self.cancel),
        }
    }

    /// Returns the current mode.
    pub fn mode(&self) -> ImageMode {
        match self.loaded {
            Loaded::Single(_) => ImageMode::Single,
            Loaded::Multiple(_) => ImageMode::Multiple,
        }
    }

    /// Returns the single image, if the manager is in single mode and an
    /// image has been loaded.
    pub fn image(&self) -> Option<&ImageDescriptor> {
        match &self.loaded {
            Loaded::Single(image) => image.as_ref(),
            Loaded::Multiple(_) => None,
        }
    }

    /// Returns image `index` of the loaded set, wrapping around its length.
    ///
    /// Fails with [`AssetError::NotMultiple`] when no image set is loaded,
    /// which usually means the shape type is not `images`.
    pub fn image_at(&self, index: usize) -> Result<&ImageDescriptor> {
        match &self.loaded {
            Loaded::Multiple(images) if !images.is_empty() => Ok(&images[index % images.len()]),
            _ => Err(AssetError::NotMultiple),
        }
    }

    /// Loads the images declared by `shape`.
    ///
    /// - `image` shapes switch to single mode and load `shape.image`.
    /// - `images` shapes switch to multiple mode and load `shape.images`
    ///   concurrently; the result keeps declaration order and the first
    ///   failure aborts the whole set.
    /// - Any other shape is returned unchanged and the manager is untouched.
    #[tracing::instrument(skip_all, fields(kind = ?shape.kind))]
    pub async fn resolve_shape(&mut self, shape: ShapeDefinition) -> Result<ResolvedShape> {
        self.cancel.send_replace(false);

        if shape.kind.includes(ShapeType::Image) {
            self.loaded = Loaded::Single(None);
            let image = self.load_image(&shape.image).await?;
            self.loaded = Loaded::Single(Some(image.clone()));
            Ok(ResolvedShape {
                image: Some(image),
                ..ResolvedShape::unchanged(shape)
            })
        } else if shape.kind.includes(ShapeType::Images) {
            self.loaded = Loaded::Multiple(Vec::new());
            let this = &*self;
            let images = try_join_all(shape.images.iter().map(|def| this.load_image(def))).await?;
            tracing::debug!(count = images.len(), "image set loaded");
            self.loaded = Loaded::Multiple(images.clone());
            Ok(ResolvedShape {
                images,
                ..ResolvedShape::unchanged(shape)
            })
        } else {
            Ok(ResolvedShape::unchanged(shape))
        }
    }

    /// Recolors an SVG for one particle and rasterizes it.
    ///
    /// See [`recolor_svg`]; callers reusing a color should cache the result.
    pub async fn recolor(&self, svg: &str, params: &RecolorParams) -> Result<RgbaImage> {
        recolor_svg(svg, params).await
    }

    /// Loads one declared image under the configured deadline and the
    /// cancellation signal.
    async fn load_image(&self, definition: &ImageDefinition) -> Result<ImageDescriptor> {
        let src = definition.src.clone();
        let deadline = self.config.load_timeout();
        let signal = self.cancel.subscribe();

        let result = tokio::select! {
            loaded = tokio::time::timeout(deadline, self.load_descriptor(definition)) => {
                loaded.unwrap_or_else(|_| {
                    Err(AssetError::Timeout {
                        src: src.clone(),
                        after_ms: self.config.load_timeout_ms,
                    })
                })
            }
            _ = cancelled(signal) => Err(AssetError::Cancelled { src: src.clone() }),
        };

        match &result {
            Ok(image) => tracing::debug!(%src, kind = %image.kind, "image loaded"),
            Err(err) => tracing::warn!(%src, %err, "image load failed"),
        }
        result
    }

    async fn load_descriptor(&self, definition: &ImageDefinition) -> Result<ImageDescriptor> {
        let mut image = ImageDescriptor::from_definition(definition)?;
        if image.src.is_empty() {
            return Err(AssetError::EmptySource);
        }

        if image.is_svg() {
            if image.is_loaded() {
                return Ok(image);
            }
            let body = self.fetch_body(&image.src).await?;
            let markup = String::from_utf8(body).map_err(|e| AssetError::Decode {
                src: image.src.clone(),
                reason: e.to_string(),
            })?;
            image.payload = Some(ImagePayload::Svg(markup));
        } else {
            let body = self.fetch_body(&image.src).await?;
            let raster = decode_raster(image.src.clone(), body).await?;
            image.payload = Some(ImagePayload::Raster(Arc::new(raster)));
        }

        Ok(image)
    }

    async fn fetch_body(&self, src: &str) -> Result<Vec<u8>> {
        tracing::debug!(%src, "fetching image");
        self.fetcher.fetch(src).await?.into_body(src)
    }
}

/// Resolves once the cancellation flag is raised.
async fn cancelled(mut signal: watch::Receiver<bool>) {
    if signal.wait_for(|flag| *flag).await.is_err() {
        // Sender gone: nothing can cancel any more
        std::future::pending::<()>().await;
    }
}

/// Decodes raster bytes on the blocking pool.
async fn decode_raster(src: String, body: Vec<u8>) -> Result<RgbaImage> {
    let name = src.clone();
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&body)
            .map(|decoded| decoded.to_rgba8())
            .map_err(|e| AssetError::Decode {
                src,
                reason: e.to_string(),
            })
    })
    .await
    .map_err(|e| AssetError::Decode {
        src: name,
        reason: e.to_string(),
    })?
}

// ============================================================================
// Tests
// ============================================================================
