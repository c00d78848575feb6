//! Text objects.

use super::{Content, ContentContext, DragPolicy, ObjectAdapter, Primitive, TextContent, fold_box};
use crate::model::{LayoutObject, ObjectPatch};
use crate::resolve::resolve_first;
use kurbo::Size;

/// Glyph color when the object has no fill.
pub const DEFAULT_TEXT_FILL: &str = "#000000";
/// Font family when the object names none.
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
/// Font size in scene pixels when the object names none.
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Average advance of a glyph relative to the font size.
const AVERAGE_ADVANCE: f64 = 0.6;
/// Line box height relative to the font size.
const LINE_HEIGHT: f64 = 1.2;

/// Estimated box of unwrapped text: the longest line by the line count.
///
/// Auto-sized text has no persisted box, so this is what hit testing and the
/// transform handle use. Unusable font sizes fall back to the default.
pub fn estimated_text_size(text: &TextContent) -> Size {
    let font_size = if text.font_size.is_finite() && text.font_size > 0.0 {
        text.font_size
    } else {
        DEFAULT_FONT_SIZE
    };
    let lines = text.text.lines().count().max(1);
    let longest = text.text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
    Size::new(
        (longest as f64 * font_size * AVERAGE_ADVANCE).max(font_size),
        lines as f64 * font_size * LINE_HEIGHT,
    )
}

/// Text is always draggable and resizes without a minimum.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextAdapter;

impl ObjectAdapter for TextAdapter {
    fn content(&self, object: &LayoutObject, ctx: &ContentContext<'_>) -> Content {
        Content::Text(TextContent {
            text: resolve_first(
                object.text.clone(),
                ctx.result.text_for(&object.id),
                String::new(),
            ),
            fill: resolve_first(object.fill.clone(), None, DEFAULT_TEXT_FILL.to_string()),
            font_family: resolve_first(
                object.font_family.clone(),
                None,
                DEFAULT_FONT_FAMILY.to_string(),
            ),
            font_size: object.font_size.unwrap_or(DEFAULT_FONT_SIZE),
        })
    }

    fn drag_policy(&self) -> DragPolicy {
        DragPolicy::Always
    }

    fn fold_transform(&self, primitive: &Primitive) -> ObjectPatch {
        fold_box(primitive, 0.0)
    }

    fn fallback_size(&self, content: &Content, size: Size) -> Size {
        let Content::Text(text) = content else {
            return size;
        };
        let estimate = estimated_text_size(text);
        Size::new(
            if size.width > 0.0 { size.width } else { estimate.width },
            if size.height > 0.0 { size.height } else { estimate.height },
        )
    }
}
