//! Renderer trait abstraction.

use crate::images::ImageCache;
use crate::raster::RasterImage;
use carousel_core::{HandleAttachment, Primitive, Scene};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid surface: {0}")]
    InvalidSurface(String),
    #[error("Render failed: {0}")]
    Render(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
    #[error("Stale frame: painted generation {painted}, receipt for {requested}")]
    StaleFrame { painted: u64, requested: u64 },
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Everything needed to paint one slide.
pub struct Frame<'a> {
    pub scene: &'a Scene,
    /// Paint order, bottom first.
    pub primitives: &'a [Primitive],
    /// Decoded bitmaps keyed by URL.
    pub images: &'a ImageCache,
    /// Transform handle to decorate, if any.
    pub selection: Option<&'a HandleAttachment>,
    pub selection_color: Color,
}

impl<'a> Frame<'a> {
    pub fn new(scene: &'a Scene, primitives: &'a [Primitive], images: &'a ImageCache) -> Self {
        Self {
            scene,
            primitives,
            images,
            selection: None,
            selection_color: DEFAULT_SELECTION_COLOR,
        }
    }

    pub fn with_selection(mut self, selection: Option<&'a HandleAttachment>) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    /// Output size for a scene-to-pixel scale.
    pub fn pixel_size(&self, scale: f64) -> (u32, u32) {
        (
            (self.scene.width * scale).round().max(1.0) as u32,
            (self.scene.height * scale).round().max(1.0) as u32,
        )
    }
}

/// Blue selection outline.
pub const DEFAULT_SELECTION_COLOR: Color = Color::from_rgba8(59, 130, 246, 255);

/// Trait for rendering backends.
pub trait Renderer {
    /// Rasterize a frame with scene coordinates multiplied by `scale`.
    fn render(&mut self, frame: &Frame<'_>, scale: f64) -> RenderResult<RasterImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_size_scales_and_rounds() {
        let scene = Scene::new(1080.0, 1350.0, "#fff");
        let images = ImageCache::new();
        let frame = Frame::new(&scene, &[], &images);
        assert_eq!(frame.pixel_size(1.0), (1080, 1350));
        assert_eq!(frame.pixel_size(0.5), (540, 675));
        assert_eq!(frame.pixel_size(0.25), (270, 338));
    }
}
