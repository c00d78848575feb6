//! Circle objects, positioned by their center.

use super::{Content, ContentContext, DragPolicy, ObjectAdapter, Primitive};
use crate::model::{LayoutObject, ObjectPatch};
use kurbo::{Point, Size};

/// Radius used when the object has none.
pub const DEFAULT_CIRCLE_RADIUS: f64 = 10.0;
/// Smallest diameter a resize gesture may produce, per axis.
pub const MIN_CIRCLE_DIAMETER: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct CircleAdapter;

impl ObjectAdapter for CircleAdapter {
    fn content(&self, object: &LayoutObject, _ctx: &ContentContext<'_>) -> Content {
        Content::Fill(object.fill.clone())
    }

    fn drag_policy(&self) -> DragPolicy {
        DragPolicy::Always
    }

    fn geometry(&self, object: &LayoutObject) -> (Point, Size, bool) {
        let radius = object.radius.unwrap_or(DEFAULT_CIRCLE_RADIUS);
        (
            Point::new(object.x, object.y),
            Size::new(radius * 2.0, radius * 2.0),
            object.radius.is_some(),
        )
    }

    /// Non-uniform scaling averages both axes back into a single radius.
    fn fold_transform(&self, primitive: &Primitive) -> ObjectPatch {
        let diameter = primitive.size.width;
        let width = (diameter * primitive.scale.x).max(MIN_CIRCLE_DIAMETER);
        let height = (diameter * primitive.scale.y).max(MIN_CIRCLE_DIAMETER);
        ObjectPatch {
            radius: Some((width / 2.0 + height / 2.0) / 2.0),
            rotation: Some(primitive.rotation),
            ..ObjectPatch::position(primitive.origin.x, primitive.origin.y)
        }
    }
}
