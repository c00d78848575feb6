//! Font registry and Parley text layout.

use crate::renderer::{RenderResult, RendererError};
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

/// RGBA8 brush color carried through Parley layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<peniko::Color> for TextBrush {
    fn from(color: peniko::Color) -> Self {
        let c = color.to_rgba8();
        Self { r: c.r, g: c.g, b: c.b, a: c.a }
    }
}

struct RegisteredFont {
    family: String,
    data: vello_cpu::peniko::FontData,
}

/// A laid out block of text plus the font its glyphs index into.
pub struct ShapedText {
    pub layout: parley::Layout<TextBrush>,
    pub(crate) font: vello_cpu::peniko::FontData,
}

/// Shapes text with fonts registered from files. No system fonts are used,
/// so rendering is identical on every machine.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    fonts: Vec<RegisteredFont>,
    default_family: Option<String>,
    warned: HashSet<String>,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            fonts: Vec::new(),
            default_family: None,
            warned: HashSet::new(),
        }
    }

    /// Register a font file's bytes. Returns the family names it provides.
    pub fn register_font(&mut self, bytes: Vec<u8>) -> RenderResult<Vec<String>> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        if families.is_empty() {
            return Err(RendererError::Render("no font families found in font data".into()));
        }
        let data = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0);
        let mut names = Vec::new();
        for (family_id, _) in families {
            if let Some(name) = self.font_ctx.collection.family_name(family_id) {
                let name = name.to_string();
                log::debug!("Registered font family {name}");
                self.fonts.push(RegisteredFont {
                    family: name.clone(),
                    data: data.clone(),
                });
                names.push(name);
            }
        }
        if self.default_family.is_none() {
            self.default_family = names.first().cloned();
        }
        Ok(names)
    }

    /// Register every `.ttf`/`.otf` file in a directory. Unreadable files
    /// are skipped with a warning.
    pub fn register_dir(&mut self, dir: &Path) -> RenderResult<usize> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            RendererError::Render(format!("Failed to read font directory {}: {e}", dir.display()))
        })?;
        let mut paths: Vec<_> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut count = 0;
        for path in paths {
            let registered = std::fs::read(&path)
                .map_err(|e| RendererError::Render(e.to_string()))
                .and_then(|bytes| self.register_font(bytes));
            match registered {
                Ok(_) => count += 1,
                Err(e) => log::warn!("Skipping font {}: {e}", path.display()),
            }
        }
        log::info!("Loaded {count} font files from {}", dir.display());
        Ok(count)
    }

    /// Family used when a requested family is not registered.
    pub fn set_default_family(&mut self, family: impl Into<String>) {
        self.default_family = Some(family.into());
    }

    pub fn has_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }

    fn font_for(&mut self, family: &str) -> Option<(String, vello_cpu::peniko::FontData)> {
        let exact = self.fonts.iter().find(|f| f.family.eq_ignore_ascii_case(family));
        let chosen = match exact {
            Some(font) => font,
            None => {
                if self.warned.insert(family.to_string()) {
                    log::warn!("Font family {family:?} not registered, using fallback");
                }
                let default = self.default_family.as_deref();
                self.fonts
                    .iter()
                    .find(|f| Some(f.family.as_str()) == default)
                    .or_else(|| self.fonts.first())?
            }
        };
        Some((chosen.family.clone(), chosen.data.clone()))
    }

    /// Lay out plain text, wrapping at `max_width` when given.
    ///
    /// Returns `None` when no font at all is available.
    pub fn layout(
        &mut self,
        text: &str,
        family: &str,
        size_px: f32,
        brush: TextBrush,
        max_width: Option<f32>,
    ) -> RenderResult<Option<ShapedText>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(RendererError::Render(format!("invalid font size {size_px}")));
        }
        let Some((family_name, font)) = self.font_for(family) else {
            if self.warned.insert(String::new()) {
                log::warn!("No fonts registered; text will not be drawn");
            }
            return Ok(None);
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(max_width);
        if let Some(w) = max_width {
            layout.align(Some(w), parley::Alignment::Start, parley::AlignmentOptions::default());
        }
        Ok(Some(ShapedText { layout, font }))
    }
}
