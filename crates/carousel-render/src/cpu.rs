//! CPU rasterizer built on `vello_cpu`.

use crate::color::{color_or, parse_css_color, to_cpu_color};
use crate::raster::RasterImage;
use crate::renderer::{Frame, RenderResult, Renderer, RendererError};
use crate::text::{TextBrush, TextEngine};
use carousel_core::selection::HANDLE_SIZE;
use carousel_core::{Content, HandleAttachment, Primitive};
use kurbo::{Affine, BezPath, Point, Rect, Shape};
use peniko::Color;

/// Selection outline width in output pixels.
pub const SELECTION_STROKE_WIDTH: f64 = 2.0;

/// Headless renderer producing straight-alpha RGBA8 rasters.
pub struct CpuRenderer {
    text: TextEngine,
}

impl Default for CpuRenderer {
    fn default() -> Self {
        Self::new(TextEngine::new())
    }
}

impl CpuRenderer {
    pub fn new(text: TextEngine) -> Self {
        Self { text }
    }

    pub fn text_engine_mut(&mut self) -> &mut TextEngine {
        &mut self.text
    }

    fn draw_primitive(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        frame: &Frame<'_>,
        primitive: &Primitive,
        base: Affine,
    ) -> RenderResult<()> {
        let transform = base * primitive.transform();
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        match &primitive.content {
            Content::Fill(None) => {}
            Content::Fill(Some(fill)) => {
                let Some(color) = parse_css_color(fill) else {
                    log::warn!("Object {} has unrecognized fill {fill:?}", primitive.id);
                    return Ok(());
                };
                ctx.set_transform(affine_to_cpu(transform));
                ctx.set_paint(to_cpu_color(color));
                let local = primitive.local_rect();
                match primitive.kind {
                    carousel_core::ObjectKind::Circle => {
                        let disc = kurbo::Circle::new(Point::ORIGIN, local.width() / 2.0);
                        ctx.fill_path(&bezpath_to_cpu(&disc.to_path(0.1)));
                    }
                    _ => ctx.fill_rect(&rect_to_cpu(local)),
                }
            }
            Content::Bitmap { url: None } => {}
            Content::Bitmap { url: Some(url) } => {
                let Some(image) = frame.images.get(url) else {
                    return Ok(());
                };
                let local = primitive.local_rect();
                let fit = Affine::scale_non_uniform(
                    local.width() / image.width.max(1) as f64,
                    local.height() / image.height.max(1) as f64,
                );
                ctx.set_transform(affine_to_cpu(transform * fit));
                ctx.set_paint(image.paint.clone());
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    image.width as f64,
                    image.height as f64,
                ));
            }
            Content::Text(text) => {
                if text.text.is_empty() {
                    return Ok(());
                }
                let color = color_or(Some(text.fill.as_str()), Color::BLACK);
                let max_width = primitive
                    .explicit_size
                    .then_some(primitive.size.width as f32)
                    .filter(|w| *w > 0.0);
                let shaped = match self.text.layout(
                    &text.text,
                    &text.font_family,
                    text.font_size as f32,
                    TextBrush::from(color),
                    max_width,
                ) {
                    Ok(Some(shaped)) => shaped,
                    Ok(None) => return Ok(()),
                    Err(e) => {
                        log::warn!("Skipping text {}: {e}", primitive.id);
                        return Ok(());
                    }
                };
                ctx.set_transform(affine_to_cpu(transform));
                for line in shaped.layout.lines() {
                    for item in line.items() {
                        let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                            continue;
                        };
                        let brush = run.style().brush;
                        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                            brush.r, brush.g, brush.b, brush.a,
                        ));
                        let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                            id: g.id,
                            x: g.x,
                            y: g.y,
                        });
                        ctx.glyph_run(&shaped.font)
                            .font_size(run.run().font_size())
                            .fill_glyphs(glyphs);
                    }
                }
            }
        }
        Ok(())
    }

    fn draw_selection(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        attachment: &HandleAttachment,
        color: Color,
        scale: f64,
    ) {
        ctx.set_transform(affine_to_cpu(Affine::scale(scale)));
        ctx.set_paint(to_cpu_color(color));

        let mut outline = BezPath::new();
        outline.move_to(attachment.outline[0]);
        for corner in &attachment.outline[1..] {
            outline.line_to(*corner);
        }
        outline.close_path();
        let stroke = kurbo::Stroke::new(SELECTION_STROKE_WIDTH / scale.max(f64::EPSILON));
        let stroked = kurbo::stroke(outline, &stroke, &kurbo::StrokeOpts::default(), 0.1);
        ctx.fill_path(&bezpath_to_cpu(&stroked));

        let half = HANDLE_SIZE / 2.0 / scale.max(f64::EPSILON);
        for handle in &attachment.handles {
            let p = handle.position;
            ctx.fill_rect(&rect_to_cpu(Rect::new(p.x - half, p.y - half, p.x + half, p.y + half)));
        }
    }
}

impl Renderer for CpuRenderer {
    fn render(&mut self, frame: &Frame<'_>, scale: f64) -> RenderResult<RasterImage> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RendererError::InvalidSurface(format!("invalid scale {scale}")));
        }
        let (width, height) = frame.pixel_size(scale);
        let w: u16 = width
            .try_into()
            .map_err(|_| RendererError::InvalidSurface(format!("width {width} exceeds u16")))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| RendererError::InvalidSurface(format!("height {height} exceeds u16")))?;

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        let background = color_or(
            Some(frame.scene.background.as_str()),
            Color::from_rgba8(255, 255, 255, 255),
        );
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(to_cpu_color(background));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, width as f64, height as f64));

        let base = Affine::scale(scale);
        for primitive in frame.primitives {
            self.draw_primitive(&mut ctx, frame, primitive, base)?;
        }
        if let Some(attachment) = frame.selection {
            self.draw_selection(&mut ctx, attachment, frame.selection_color, scale);
        }

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        RasterImage::from_premultiplied(width, height, pixmap.data_as_u8_slice().to_vec())
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}
