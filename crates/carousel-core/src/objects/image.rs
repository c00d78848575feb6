//! Image and logo objects.

use super::{Content, ContentContext, DragPolicy, ObjectAdapter, Primitive, fold_box};
use crate::model::{LayoutObject, ObjectPatch};

/// Smallest side a resize gesture may produce.
pub const MIN_BITMAP_SIDE: f64 = 5.0;

/// Bitmaps only move once selected, so a click on a photo never nudges it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapAdapter;

impl ObjectAdapter for BitmapAdapter {
    fn content(&self, object: &LayoutObject, ctx: &ContentContext<'_>) -> Content {
        let url = crate::resolve::resolve_image_url(object, ctx.result, ctx.assets);
        if url.is_none() {
            log::debug!("No image source for object {}", object.id);
        }
        Content::Bitmap { url }
    }

    fn drag_policy(&self) -> DragPolicy {
        DragPolicy::WhenSelected
    }

    fn fold_transform(&self, primitive: &Primitive) -> ObjectPatch {
        fold_box(primitive, MIN_BITMAP_SIDE)
    }
}
