//! Single-object selection and the transform handle bound to it.

use crate::objects::Primitive;
use kurbo::{Affine, Point, Rect, Vec2};

/// Handle size in scene pixels.
pub const HANDLE_SIZE: f64 = 10.0;
/// Handle hit tolerance in scene pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 12.0;
/// Distance from the top edge to the rotation handle.
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;
/// Smallest box side a corner drag may produce before folding.
const MIN_GESTURE_SIDE: f64 = 1.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Type of transform handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Corner(Corner),
    Rotate,
}

/// A transform handle with its scene position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// Selection state. Object ids are only unique within a slide, so there is
/// never more than one selected object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Deselected,
    Selected(String),
}

impl SelectionState {
    pub fn id(&self) -> Option<&str> {
        match self {
            SelectionState::Deselected => None,
            SelectionState::Selected(id) => Some(id),
        }
    }
}

/// Descriptor binding the transform handle to one render-tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleAttachment {
    pub target: String,
    /// Rotated outline corners, clockwise from the top-left.
    pub outline: [Point; 4],
    pub handles: Vec<Handle>,
    pub rotate_enabled: bool,
}

impl HandleAttachment {
    /// Which handle (if any) is under `point`.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> Option<HandleKind> {
        self.handles
            .iter()
            .find(|h| h.hit_test(point, tolerance))
            .map(|h| h.kind)
    }
}

/// The one transform handle of the canvas. It is re-targeted, never
/// recreated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformHandle {
    attachment: Option<HandleAttachment>,
    retargets: u64,
}

impl TransformHandle {
    pub fn attachment(&self) -> Option<&HandleAttachment> {
        self.attachment.as_ref()
    }

    pub fn target(&self) -> Option<&str> {
        self.attachment.as_ref().map(|a| a.target.as_str())
    }

    /// How many times the handle changed target since creation.
    pub fn retargets(&self) -> u64 {
        self.retargets
    }

    fn retarget(&mut self, attachment: Option<HandleAttachment>) {
        let changed = self.target() != attachment.as_ref().map(|a| a.target.as_str());
        if changed {
            self.retargets += 1;
            log::debug!(
                "Transform handle -> {}",
                attachment.as_ref().map(|a| a.target.as_str()).unwrap_or("<detached>")
            );
        }
        self.attachment = attachment;
    }
}

/// Tracks the selected object and keeps the transform handle bound to it.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
    handle: TransformHandle,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected(&self) -> Option<&str> {
        self.state.id()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected() == Some(id)
    }

    /// Select an object, or deselect with `None`.
    pub fn select(&mut self, id: Option<&str>) {
        self.state = match id {
            Some(id) => SelectionState::Selected(id.to_string()),
            None => SelectionState::Deselected,
        };
    }

    pub fn clear(&mut self) {
        self.select(None);
    }

    pub fn handle(&self) -> &TransformHandle {
        &self.handle
    }

    /// Where the handle belongs for the current selection, as a pure
    /// function of state and the render tree.
    pub fn binding(&self, primitives: &[Primitive]) -> Option<HandleAttachment> {
        let id = self.selected()?;
        primitives.iter().find(|p| p.id == id).map(attachment_for)
    }

    /// Re-target the handle after a selection or render-tree change. An id
    /// with no primitive detaches it.
    pub fn reconcile(&mut self, primitives: &[Primitive]) -> Option<&HandleAttachment> {
        let binding = self.binding(primitives);
        self.handle.retarget(binding);
        self.handle.attachment()
    }
}

/// Corner handles plus a rotation handle above the top edge, following the
/// primitive's rotation and gesture scale.
pub fn attachment_for(primitive: &Primitive) -> HandleAttachment {
    let transform = primitive.transform();
    let local = primitive.local_rect();
    let outline = [
        transform * Point::new(local.x0, local.y0),
        transform * Point::new(local.x1, local.y0),
        transform * Point::new(local.x1, local.y1),
        transform * Point::new(local.x0, local.y1),
    ];
    let top_center = outline[0].midpoint(outline[1]);
    let up = up_vector(primitive.rotation);
    HandleAttachment {
        target: primitive.id.clone(),
        outline,
        handles: vec![
            Handle::new(outline[0], HandleKind::Corner(Corner::TopLeft)),
            Handle::new(outline[1], HandleKind::Corner(Corner::TopRight)),
            Handle::new(outline[3], HandleKind::Corner(Corner::BottomLeft)),
            Handle::new(outline[2], HandleKind::Corner(Corner::BottomRight)),
            Handle::new(top_center + up * ROTATE_HANDLE_OFFSET, HandleKind::Rotate),
        ],
        rotate_enabled: true,
    }
}

fn up_vector(rotation_degrees: f64) -> Vec2 {
    let r = rotation_degrees.to_radians();
    Vec2::new(r.sin(), -r.cos())
}

/// Drag a corner handle by a scene-space delta.
///
/// Only the primitive's gesture scale and origin change; its size stays the
/// persisted size until the gesture is folded.
pub fn apply_corner_drag(primitive: &mut Primitive, corner: Corner, delta: Vec2) {
    let rotation = Affine::rotate(primitive.rotation.to_radians());
    let local_delta = rotation.inverse() * delta.to_point();
    let (dx, dy) = (local_delta.x, local_delta.y);

    let current = primitive.scaled_size();
    let bounds = Rect::from_origin_size(Point::ORIGIN, current);
    let (x0, y0, x1, y1) = match corner {
        Corner::TopLeft => (bounds.x0 + dx, bounds.y0 + dy, bounds.x1, bounds.y1),
        Corner::TopRight => (bounds.x0, bounds.y0 + dy, bounds.x1 + dx, bounds.y1),
        Corner::BottomLeft => (bounds.x0 + dx, bounds.y0, bounds.x1, bounds.y1 + dy),
        Corner::BottomRight => (bounds.x0, bounds.y0, bounds.x1 + dx, bounds.y1 + dy),
    };
    let width = (x1 - x0).max(MIN_GESTURE_SIDE);
    let height = (y1 - y0).max(MIN_GESTURE_SIDE);
    // Anchor the opposite corner.
    let x0 = if matches!(corner, Corner::TopLeft | Corner::BottomLeft) { x1 - width } else { x0 };
    let y0 = if matches!(corner, Corner::TopLeft | Corner::TopRight) { y1 - height } else { y0 };

    if primitive.size.width > 0.0 {
        primitive.scale.x = width / primitive.size.width;
    }
    if primitive.size.height > 0.0 {
        primitive.scale.y = height / primitive.size.height;
    }

    // Circles sit on their center, everything else on the top-left corner.
    let shift = match primitive.kind {
        crate::model::ObjectKind::Circle => Vec2::new(
            x0 + width / 2.0 - current.width / 2.0,
            y0 + height / 2.0 - current.height / 2.0,
        ),
        _ => Vec2::new(x0, y0),
    };
    primitive.origin += (rotation * shift.to_point()).to_vec2();
}

/// Rotate a primitive around its center so the rotation handle follows the
/// cursor. Returns the new rotation in degrees.
pub fn apply_rotation_drag(primitive: &mut Primitive, cursor: Point, snap_to_15deg: bool) -> f64 {
    let center = primitive.center();
    let dx = cursor.x - center.x;
    let dy = cursor.y - center.y;
    let mut angle = (dy.atan2(dx) + std::f64::consts::FRAC_PI_2).to_degrees();
    if snap_to_15deg {
        angle = (angle / 15.0).round() * 15.0;
    }
    let angle = angle.rem_euclid(360.0);

    primitive.rotation = angle;
    // Keep the center fixed while the origin swings around it.
    let offset = primitive.center() - center;
    primitive.origin -= offset;
    angle
}
