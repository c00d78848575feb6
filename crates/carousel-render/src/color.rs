//! CSS color strings to paint colors.

use peniko::Color;
use peniko::color::{Srgb, parse_color};

/// Parse any CSS color (`#rgb`, `#rrggbb`, `rgb()`, named colors, ...).
pub fn parse_css_color(value: &str) -> Option<Color> {
    parse_color(value.trim())
        .ok()
        .map(|c| c.to_alpha_color::<Srgb>())
}

/// Parse a color, logging and falling back when it is malformed.
pub fn color_or(value: Option<&str>, fallback: Color) -> Color {
    match value {
        Some(v) => parse_css_color(v).unwrap_or_else(|| {
            log::warn!("Unrecognized color {v:?}, using fallback");
            fallback
        }),
        None => fallback,
    }
}

/// Convert to the rasterizer's color type.
pub(crate) fn to_cpu_color(color: Color) -> vello_cpu::peniko::Color {
    let rgba = color.to_rgba8();
    vello_cpu::peniko::Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a)
}
