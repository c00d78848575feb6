//! The single shared drawing surface.
//!
//! A [`Stage`] holds exactly one painted slide at a time. Painting bumps a
//! generation counter and hands back a [`PaintReceipt`]; capturing requires
//! the receipt of the latest paint, so a capture can never observe a frame
//! older than the paint it was sequenced after.

use crate::images::ImageCache;
use crate::raster::RasterImage;
use crate::renderer::{DEFAULT_SELECTION_COLOR, Frame, RenderResult, Renderer, RendererError};
use carousel_core::{Content, HandleAttachment, ObjectStore, Primitive, Scene};
use peniko::Color;

/// Proof that a slide finished painting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PaintReceipt {
    pub generation: u64,
    pub slide: usize,
}

/// What to paint.
#[derive(Debug, Clone, Copy)]
pub struct StageRequest<'a> {
    pub slide: usize,
    pub scene: &'a Scene,
    pub primitives: &'a [Primitive],
    pub selection: Option<&'a HandleAttachment>,
}

/// Retained copy of the last painted slide.
struct PaintedFrame {
    generation: u64,
    slide: usize,
    scene: Scene,
    primitives: Vec<Primitive>,
    selection: Option<HandleAttachment>,
    preview: RasterImage,
}

pub struct Stage<R: Renderer> {
    renderer: R,
    images: ImageCache,
    display_scale: f64,
    selection_color: Color,
    generation: u64,
    painted: Option<PaintedFrame>,
}

impl<R: Renderer> Stage<R> {
    /// Create a stage that previews slides at `display_scale`.
    pub fn new(renderer: R, display_scale: f64) -> RenderResult<Self> {
        if !display_scale.is_finite() || display_scale <= 0.0 {
            return Err(RendererError::InvalidSurface(format!(
                "invalid display scale {display_scale}"
            )));
        }
        Ok(Self {
            renderer,
            images: ImageCache::new(),
            display_scale,
            selection_color: DEFAULT_SELECTION_COLOR,
            generation: 0,
            painted: None,
        })
    }

    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    pub fn display_scale(&self) -> f64 {
        self.display_scale
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Drop cached bitmaps; their signed URLs belong to an old session.
    pub fn reset_images(&mut self) {
        self.images.clear();
    }

    /// Slide currently occupying the surface.
    pub fn painted_slide(&self) -> Option<usize> {
        self.painted.as_ref().map(|p| p.slide)
    }

    /// The on-screen raster of the last paint.
    pub fn preview(&self) -> Option<&RasterImage> {
        self.painted.as_ref().map(|p| &p.preview)
    }

    /// Resolve every bitmap the slide needs, then paint it.
    ///
    /// Completes only after the paint, so the returned receipt can be used
    /// to capture exactly this frame. Bitmap failures degrade to empty boxes.
    pub async fn render(
        &mut self,
        request: StageRequest<'_>,
        store: &dyn ObjectStore,
    ) -> RenderResult<PaintReceipt> {
        for primitive in request.primitives {
            if let Content::Bitmap { url: Some(url) } = &primitive.content {
                self.images.resolve(store, &primitive.id, url).await;
            }
        }

        let frame = Frame::new(request.scene, request.primitives, &self.images)
            .with_selection(request.selection)
            .with_selection_color(self.selection_color);
        let preview = self.renderer.render(&frame, self.display_scale)?;

        self.generation += 1;
        self.painted = Some(PaintedFrame {
            generation: self.generation,
            slide: request.slide,
            scene: request.scene.clone(),
            primitives: request.primitives.to_vec(),
            selection: request.selection.cloned(),
            preview,
        });
        log::debug!("Painted slide {} (generation {})", request.slide, self.generation);
        Ok(PaintReceipt {
            generation: self.generation,
            slide: request.slide,
        })
    }

    /// Rasterize the painted frame at `pixel_ratio` times the display scale.
    ///
    /// A `pixel_ratio` of `1 / display_scale` yields native scene resolution.
    pub fn capture(
        &mut self,
        receipt: &PaintReceipt,
        pixel_ratio: f64,
    ) -> RenderResult<RasterImage> {
        let painted = self.painted.as_ref().ok_or(RendererError::StaleFrame {
            painted: 0,
            requested: receipt.generation,
        })?;
        if painted.generation != receipt.generation {
            return Err(RendererError::StaleFrame {
                painted: painted.generation,
                requested: receipt.generation,
            });
        }
        let frame = Frame::new(&painted.scene, &painted.primitives, &self.images)
            .with_selection(painted.selection.as_ref())
            .with_selection_color(self.selection_color);
        self.renderer.render(&frame, self.display_scale * pixel_ratio)
    }

    /// Capture at native scene resolution.
    pub fn capture_native(&mut self, receipt: &PaintReceipt) -> RenderResult<RasterImage> {
        let ratio = 1.0 / self.display_scale;
        let raster = self.capture(receipt, ratio)?;
        let expected = self
            .painted
            .as_ref()
            .map(|p| p.scene.pixel_size())
            .unwrap_or((raster.width, raster.height));
        if (raster.width, raster.height) != expected {
            return Err(RendererError::InvalidSurface(format!(
                "captured {}x{}, scene is {}x{}",
                raster.width, raster.height, expected.0, expected.1
            )));
        }
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuRenderer;
    use crate::images::tests::solid_png;
    use carousel_core::objects::{ContentContext, build_primitives};
    use carousel_core::{
        AssetIndex, ImageAsset, Layout, LayoutObject, MemoryStore, ObjectKind, SlideResult,
    };
    use pollster::block_on;
    use std::time::Duration;

    fn tree(layout: &Layout, assets: &AssetIndex) -> Vec<Primitive> {
        let result = SlideResult::default();
        build_primitives(layout, &ContentContext { result: &result, assets })
    }

    fn request<'a>(
        slide: usize,
        layout: &'a Layout,
        primitives: &'a [Primitive],
    ) -> StageRequest<'a> {
        StageRequest { slide, scene: &layout.scene, primitives, selection: None }
    }

    #[test]
    fn test_native_capture_independent_of_display_scale() {
        let layout = Layout::new(Scene::new(1080.0, 1350.0, "#ffffff"));
        let store = MemoryStore::new();
        for scale in [0.25, 0.5, 1.0] {
            let mut stage = Stage::new(CpuRenderer::default(), scale).unwrap();
            let receipt = block_on(stage.render(request(0, &layout, &[]), &store)).unwrap();
            let preview = stage.preview().unwrap();
            assert_eq!(preview.width, (1080.0 * scale) as u32);

            let raster = stage.capture_native(&receipt).unwrap();
            assert_eq!((raster.width, raster.height), (1080, 1350));
        }
    }

    #[test]
    fn test_stale_receipt_rejected() {
        let first = Layout::new(Scene::new(10.0, 10.0, "#ff0000"));
        let second = Layout::new(Scene::new(10.0, 10.0, "#00ff00"));
        let store = MemoryStore::new();
        let mut stage = Stage::new(CpuRenderer::default(), 1.0).unwrap();

        let old = block_on(stage.render(request(0, &first, &[]), &store)).unwrap();
        let new = block_on(stage.render(request(1, &second, &[]), &store)).unwrap();
        assert!(matches!(stage.capture(&old, 1.0), Err(RendererError::StaleFrame { .. })));

        let raster = stage.capture(&new, 1.0).unwrap();
        assert_eq!(raster.pixel(5, 5), Some([0, 255, 0, 255]));
        assert_eq!(stage.painted_slide(), Some(1));
    }

    #[test]
    fn test_capture_before_paint_fails() {
        let mut stage = Stage::new(CpuRenderer::default(), 1.0).unwrap();
        let receipt = PaintReceipt { generation: 1, slide: 0 };
        assert!(stage.capture(&receipt, 1.0).is_err());
    }

    #[test]
    fn test_render_fetches_bitmaps_first() {
        let store = MemoryStore::new();
        let hero = "u/p/images/hero.png";
        block_on(store.put(hero, solid_png(2, 2, [0, 0, 255, 255]), "image/png")).unwrap();
        let url = block_on(store.signed_url(hero, Duration::from_secs(60))).unwrap();
        let assets = AssetIndex::new(vec![ImageAsset { name: "hero.png".into(), url }]);
        let layout = Layout::new(Scene::new(20.0, 20.0, "#ffffff"))
            .with_object(LayoutObject::new("hero", ObjectKind::Image).sized(20.0, 20.0))
            .with_object(
                LayoutObject::new("broken", ObjectKind::Image)
                    .at(0.0, 10.0)
                    .sized(20.0, 10.0)
                    .with_image_url("memory:///nope.png?expires=1"),
            );
        let primitives = tree(&layout, &assets);

        let mut stage = Stage::new(CpuRenderer::default(), 1.0).unwrap();
        let receipt = block_on(stage.render(request(0, &layout, &primitives), &store)).unwrap();
        let raster = stage.capture(&receipt, 1.0).unwrap();
        assert_eq!(raster.pixel(10, 5), Some([0, 0, 255, 255]));
        // The broken image leaves the hero underneath visible.
        assert_eq!(raster.pixel(10, 15), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_invalid_display_scale() {
        assert!(Stage::new(CpuRenderer::default(), 0.0).is_err());
        assert!(Stage::new(CpuRenderer::default(), f64::NAN).is_err());
    }
}
