//! Per-kind object adapters.
//!
//! An adapter maps a [`LayoutObject`] plus its resolved content onto a
//! [`Primitive`] (the drawable, hit-testable render-tree node) and turns
//! finished gestures on that primitive back into [`ObjectPatch`]es.

mod circle;
mod image;
mod rectangle;
mod text;

pub use circle::{CircleAdapter, DEFAULT_CIRCLE_RADIUS, MIN_CIRCLE_DIAMETER};
pub use image::{BitmapAdapter, MIN_BITMAP_SIDE};
pub use rectangle::{MIN_RECT_SIDE, RectangleAdapter};
pub use text::{
    DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_TEXT_FILL, TextAdapter, estimated_text_size,
};

use crate::model::{AssetIndex, Layout, LayoutObject, ObjectKind, ObjectPatch, SlideResult};
use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Everything outside the object itself that content resolution may read.
#[derive(Debug, Clone, Copy)]
pub struct ContentContext<'a> {
    pub result: &'a SlideResult,
    pub assets: &'a AssetIndex,
}

/// When a primitive may be dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPolicy {
    Always,
    WhenSelected,
}

impl DragPolicy {
    pub fn allows(self, selected: bool) -> bool {
        match self {
            DragPolicy::Always => true,
            DragPolicy::WhenSelected => selected,
        }
    }
}

/// Resolved text styling and string.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    pub text: String,
    pub fill: String,
    pub font_family: String,
    pub font_size: f64,
}

/// What a primitive draws.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(TextContent),
    /// A fetchable image; `None` when nothing resolved and the box stays empty.
    Bitmap { url: Option<String> },
    /// Solid rectangle or disc.
    Fill(Option<String>),
}

/// A drawable node of the render tree, keyed by object id.
///
/// `scale` is transient gesture state. It is only non-identity between a
/// transform gesture starting and [`Primitive::end_transform`].
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub id: String,
    pub kind: ObjectKind,
    /// Top-left corner, or center for circles.
    pub origin: Point,
    pub size: Size,
    /// Whether `size` came from the object rather than a fallback.
    pub explicit_size: bool,
    /// Degrees, clockwise, around `origin`.
    pub rotation: f64,
    pub scale: Vec2,
    pub content: Content,
    pub drag: DragPolicy,
}

impl Primitive {
    /// Box in the primitive's own frame, before rotation and scale.
    pub fn local_rect(&self) -> Rect {
        match self.kind {
            ObjectKind::Circle => Rect::from_center_size(Point::ORIGIN, self.size),
            _ => Rect::from_origin_size(Point::ORIGIN, self.size),
        }
    }

    /// Local-to-scene transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.origin.to_vec2())
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
    }

    pub fn scaled_size(&self) -> Size {
        Size::new(self.size.width * self.scale.x, self.size.height * self.scale.y)
    }

    /// Scene-space center of the (scaled, rotated) box.
    pub fn center(&self) -> Point {
        self.transform() * self.local_rect().center()
    }

    /// Whether a scene-space point falls inside the rotated box.
    pub fn hit_test(&self, point: Point) -> bool {
        let det = self.scale.x * self.scale.y;
        if det.abs() < f64::EPSILON {
            return false;
        }
        let local = self.transform().inverse() * point;
        self.local_rect().contains(local)
    }

    pub fn can_drag(&self, selected: bool) -> bool {
        self.drag.allows(selected)
    }

    /// Move to a new origin and report the finished drag.
    pub fn drag_to(&mut self, origin: Point) -> ObjectPatch {
        self.origin = origin;
        ObjectPatch::position(origin.x, origin.y)
    }

    /// Fold the gesture scale into an explicit size update and reset the
    /// scale to identity.
    pub fn end_transform(&mut self) -> ObjectPatch {
        let patch = adapter_for(self.kind).fold_transform(self);
        self.scale = Vec2::new(1.0, 1.0);
        patch
    }
}

/// Per-kind mapping between layout objects and primitives.
pub trait ObjectAdapter: Sync {
    /// Resolve the object's displayed content.
    fn content(&self, object: &LayoutObject, ctx: &ContentContext<'_>) -> Content;

    fn drag_policy(&self) -> DragPolicy;

    /// The update a finished transform gesture produces.
    fn fold_transform(&self, primitive: &Primitive) -> ObjectPatch;

    /// Default geometry: top-left origin with the object's box.
    fn geometry(&self, object: &LayoutObject) -> (Point, Size, bool) {
        let explicit = object.width.is_some() && object.height.is_some();
        let size = Size::new(object.width.unwrap_or(0.0), object.height.unwrap_or(0.0));
        (Point::new(object.x, object.y), size, explicit)
    }

    /// Box used for hit testing and the handle outline when the object has
    /// no explicit size.
    fn fallback_size(&self, _content: &Content, size: Size) -> Size {
        size
    }

    fn build(&self, object: &LayoutObject, ctx: &ContentContext<'_>) -> Primitive {
        let (origin, size, explicit_size) = self.geometry(object);
        let content = self.content(object, ctx);
        let size = if explicit_size { size } else { self.fallback_size(&content, size) };
        Primitive {
            id: object.id.clone(),
            kind: object.kind,
            origin,
            size,
            explicit_size,
            rotation: object.rotation_degrees(),
            scale: Vec2::new(1.0, 1.0),
            content,
            drag: self.drag_policy(),
        }
    }
}

static TEXT: TextAdapter = TextAdapter;
static BITMAP: BitmapAdapter = BitmapAdapter;
static RECTANGLE: RectangleAdapter = RectangleAdapter;
static CIRCLE: CircleAdapter = CircleAdapter;

/// The adapter responsible for a kind.
pub fn adapter_for(kind: ObjectKind) -> &'static dyn ObjectAdapter {
    match kind {
        ObjectKind::Text => &TEXT,
        ObjectKind::Image | ObjectKind::Logo => &BITMAP,
        ObjectKind::Rectangle => &RECTANGLE,
        ObjectKind::Circle => &CIRCLE,
    }
}

/// Build the render tree for one slide, in paint order.
pub fn build_primitives(layout: &Layout, ctx: &ContentContext<'_>) -> Vec<Primitive> {
    layout
        .objects
        .iter()
        .map(|object| adapter_for(object.kind).build(object, ctx))
        .collect()
}

/// Topmost primitive under a scene point.
pub fn hit_test_primitives(primitives: &[Primitive], point: Point) -> Option<&Primitive> {
    primitives.iter().rev().find(|p| p.hit_test(point))
}

/// Shared fold for box-shaped kinds.
fn fold_box(primitive: &Primitive, min_side: f64) -> ObjectPatch {
    let mut patch = ObjectPatch::position(primitive.origin.x, primitive.origin.y);
    if primitive.explicit_size {
        let size = primitive.scaled_size();
        patch.width = Some(size.width.max(min_side));
        patch.height = Some(size.height.max(min_side));
    }
    patch.rotation = Some(primitive.rotation);
    patch
}
