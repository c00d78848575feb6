//! Rectangle objects.

use super::{Content, ContentContext, DragPolicy, ObjectAdapter, Primitive, fold_box};
use crate::model::{LayoutObject, ObjectPatch};

/// Smallest side a resize gesture may produce.
pub const MIN_RECT_SIDE: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct RectangleAdapter;

impl ObjectAdapter for RectangleAdapter {
    fn content(&self, object: &LayoutObject, _ctx: &ContentContext<'_>) -> Content {
        Content::Fill(object.fill.clone())
    }

    fn drag_policy(&self) -> DragPolicy {
        DragPolicy::Always
    }

    fn fold_transform(&self, primitive: &Primitive) -> ObjectPatch {
        fold_box(primitive, MIN_RECT_SIDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssetIndex, ObjectKind, SlideResult};
    use kurbo::Vec2;

    #[test]
    fn test_shrink_clamps_to_minimum() {
        let object = LayoutObject::new("bar", ObjectKind::Rectangle)
            .sized(100.0, 20.0)
            .with_fill("#333");
        let result = SlideResult::default();
        let assets = AssetIndex::default();
        let ctx = ContentContext { result: &result, assets: &assets };
        let mut primitive = RectangleAdapter.build(&object, &ctx);
        assert_eq!(primitive.content, Content::Fill(Some("#333".into())));

        primitive.scale = Vec2::new(0.5, 0.1);
        let patch = primitive.end_transform();
        assert_eq!(patch.width, Some(50.0));
        assert_eq!(patch.height, Some(MIN_RECT_SIDE));
    }
}
