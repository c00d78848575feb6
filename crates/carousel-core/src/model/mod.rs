//! Slide layout model: scenes, layout objects and the persisted documents.

mod patch;

pub use patch::{ObjectPatch, PatchError};

use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Background used when a scene omits one.
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// Kind of drawable element on a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Text,
    Image,
    Logo,
    Rectangle,
    Circle,
}

impl ObjectKind {
    /// Image and logo objects share the bitmap code path.
    pub fn is_bitmap(self) -> bool {
        matches!(self, ObjectKind::Image | ObjectKind::Logo)
    }

    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Text => "text",
            ObjectKind::Image => "image",
            ObjectKind::Logo => "logo",
            ObjectKind::Rectangle => "rectangle",
            ObjectKind::Circle => "circle",
        }
    }
}

/// One positioned, typed element of a slide.
///
/// `x`/`y` are the top-left corner for every kind except circles, where they
/// name the center. Fields the editor does not understand are kept in
/// `extra` so a save writes them back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Degrees, clockwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(rename = "fontFamily", default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(rename = "fontSize", default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "imageFileName", default, skip_serializing_if = "Option::is_none")]
    pub image_file_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LayoutObject {
    /// Create a bare object of the given kind at the origin.
    pub fn new(id: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            id: id.into(),
            kind,
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
            radius: None,
            rotation: None,
            fill: None,
            font_family: None,
            font_size: None,
            text: None,
            image_url: None,
            image_file_name: None,
            extra: Map::new(),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.rotation.unwrap_or(0.0)
    }

    /// Unrotated bounding box in scene pixels.
    ///
    /// Circles report the square around their center; other kinds fall back
    /// to a zero-sized box when their size is missing.
    pub fn bounds(&self) -> Rect {
        match self.kind {
            ObjectKind::Circle => {
                let r = self.radius.unwrap_or(crate::objects::DEFAULT_CIRCLE_RADIUS);
                Rect::new(self.x - r, self.y - r, self.x + r, self.y + r)
            }
            _ => Rect::from_origin_size(
                (self.x, self.y),
                (self.width.unwrap_or(0.0), self.height.unwrap_or(0.0)),
            ),
        }
    }
}

/// Canvas size and backdrop for one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

impl Scene {
    pub fn new(width: f64, height: f64, background: impl Into<String>) -> Self {
        Self {
            width,
            height,
            background: background.into(),
            extra: Map::new(),
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Native raster size, rounded to whole pixels and never zero.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }
}

/// One slide: a scene plus its objects in paint order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub scene: Scene,
    #[serde(default)]
    pub objects: Vec<LayoutObject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Layout {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            objects: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_object(mut self, object: LayoutObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn object(&self, id: &str) -> Option<&LayoutObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Topmost object containing `point`, ignoring rotation.
    pub fn object_at(&self, point: kurbo::Point) -> Option<&LayoutObject> {
        self.objects.iter().rev().find(|o| o.bounds().contains(point))
    }
}

/// The multi-slide style document persisted as `style.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleDocument {
    #[serde(default)]
    pub global_request: String,
    #[serde(default)]
    pub layouts: Vec<Layout>,
    #[serde(default)]
    pub requests: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Generated content for one slide, keyed by object id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlideResult(pub Map<String, Value>);

impl SlideResult {
    /// Scalar entry for `id` rendered as text. Nulls, arrays and objects
    /// count as absent.
    pub fn text_for(&self, id: &str) -> Option<String> {
        match self.0.get(id)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(id.into(), value.into());
    }
}

/// A stored image together with a time-limited URL for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub name: String,
    pub url: String,
}

/// Image assets listed for a project during one load session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetIndex {
    assets: Vec<ImageAsset>,
}

impl AssetIndex {
    pub fn new(assets: Vec<ImageAsset>) -> Self {
        Self { assets }
    }

    pub fn by_name(&self, name: &str) -> Option<&ImageAsset> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// Asset stored under the `<id>.png` / `<id>.jpg` convention.
    pub fn for_object(&self, id: &str) -> Option<&ImageAsset> {
        self.by_name(&format!("{id}.png"))
            .or_else(|| self.by_name(&format!("{id}.jpg")))
    }

    /// Register an asset, replacing any earlier one of the same name.
    pub fn insert(&mut self, asset: ImageAsset) {
        match self.assets.iter_mut().find(|a| a.name == asset.name) {
            Some(existing) => *existing = asset,
            None => self.assets.push(asset),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageAsset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_field_names() {
        let value = json!({
            "id": "headline",
            "type": "text",
            "x": 40,
            "y": 60,
            "width": 500,
            "height": 120,
            "fontFamily": "Inter",
            "fontSize": 48,
            "fill": "#222222",
            "letterSpacing": 2
        });
        let object: LayoutObject = serde_json::from_value(value).unwrap();
        assert_eq!(object.kind, ObjectKind::Text);
        assert_eq!(object.font_family.as_deref(), Some("Inter"));
        assert_eq!(object.font_size, Some(48.0));
        assert_eq!(object.extra.get("letterSpacing"), Some(&json!(2)));

        let back = serde_json::to_value(&object).unwrap();
        assert_eq!(back["type"], "text");
        assert_eq!(back["fontFamily"], "Inter");
        assert_eq!(back["letterSpacing"], 2);
        assert!(back.get("imageUrl").is_none());
    }

    #[test]
    fn test_style_document_round_trip() {
        let value = json!({
            "global_request": "minimal pastel",
            "layouts": [{
                "scene": { "width": 1080, "height": 1350, "background": "#f4efe6" },
                "objects": [
                    { "id": "logo", "type": "logo", "x": 20, "y": 20, "width": 80, "height": 80 },
                    {
                        "id": "dot", "type": "circle",
                        "x": 540, "y": 675, "radius": 30, "fill": "red"
                    }
                ]
            }],
            "requests": [{ "headline": "a short title" }]
        });
        let doc: StyleDocument = serde_json::from_value(value).unwrap();
        let text = serde_json::to_string_pretty(&doc).unwrap();
        let again: StyleDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(doc, again);
        assert_eq!(again.layouts[0].objects[1].kind, ObjectKind::Circle);
    }

    #[test]
    fn test_scene_pixel_size_rounds() {
        let scene = Scene::new(1079.6, 1350.2, "#fff");
        assert_eq!(scene.pixel_size(), (1080, 1350));
    }

    #[test]
    fn test_missing_background_defaults() {
        let scene: Scene = serde_json::from_value(json!({ "width": 10, "height": 10 })).unwrap();
        assert_eq!(scene.background, DEFAULT_BACKGROUND);
    }

    #[test]
    fn test_circle_bounds_center() {
        let circle = LayoutObject::new("c", ObjectKind::Circle)
            .at(100.0, 100.0)
            .with_radius(20.0);
        let bounds = circle.bounds();
        assert!((bounds.x0 - 80.0).abs() < f64::EPSILON);
        assert!((bounds.width() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_object_at_prefers_topmost() {
        let layout = Layout::new(Scene::new(100.0, 100.0, "#fff"))
            .with_object(LayoutObject::new("below", ObjectKind::Rectangle).sized(50.0, 50.0))
            .with_object(
                LayoutObject::new("above", ObjectKind::Rectangle)
                    .at(10.0, 10.0)
                    .sized(20.0, 20.0),
            );
        let top = |x, y| layout.object_at(kurbo::Point::new(x, y)).map(|o| o.id.as_str());
        assert_eq!(top(15.0, 15.0), Some("above"));
        assert_eq!(top(45.0, 45.0), Some("below"));
        assert!(top(90.0, 90.0).is_none());
    }

    #[test]
    fn test_asset_lookup_convention() {
        let assets = AssetIndex::new(vec![
            ImageAsset { name: "hero.jpg".into(), url: "memory://a/hero.jpg".into() },
            ImageAsset { name: "logo.png".into(), url: "memory://a/logo.png".into() },
        ]);
        assert_eq!(assets.for_object("hero").map(|a| a.name.as_str()), Some("hero.jpg"));
        assert_eq!(assets.for_object("logo").map(|a| a.name.as_str()), Some("logo.png"));
        assert!(assets.for_object("missing").is_none());
    }

    #[test]
    fn test_result_text_for_scalars() {
        let mut result = SlideResult::default();
        result.insert("title", "Hello");
        result.insert("count", 3);
        result.insert("nothing", Value::Null);
        assert_eq!(result.text_for("title").as_deref(), Some("Hello"));
        assert_eq!(result.text_for("count").as_deref(), Some("3"));
        assert!(result.text_for("nothing").is_none());
        assert!(result.text_for("absent").is_none());
    }

    #[test]
    fn test_asset_insert_replaces_same_name() {
        let mut assets = AssetIndex::default();
        assets.insert(ImageAsset { name: "a.png".into(), url: "signed://a/1".into() });
        assets.insert(ImageAsset { name: "b.jpg".into(), url: "signed://b".into() });
        assets.insert(ImageAsset { name: "a.png".into(), url: "signed://a/2".into() });

        assert_eq!(assets.len(), 2);
        assert_eq!(assets.by_name("a.png").map(|a| a.url.as_str()), Some("signed://a/2"));
        assert_eq!(assets.for_object("b").map(|a| a.url.as_str()), Some("signed://b"));
    }
}
