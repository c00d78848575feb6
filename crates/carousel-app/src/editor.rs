//! The editing session: project state, the shared stage and pointer
//! gestures.

use crate::config::{ConfigError, EditorConfig};
use carousel_core::objects::hit_test_primitives;
use carousel_core::project::{LoadError, unique_image_name, upload_image};
use carousel_core::selection::{HANDLE_HIT_TOLERANCE, apply_corner_drag, apply_rotation_drag};
use carousel_core::{
    Corner, HandleAttachment, HandleKind, ImageAsset, ObjectKind, ObjectPatch, ObjectStore,
    PersistError, Primitive, ProjectRef, ProjectState,
};
use carousel_render::{
    CpuRenderer, PaintReceipt, RasterImage, RenderResult, RendererError, Stage, StageRequest,
    TextEngine, parse_css_color,
};
use kurbo::{Point, Vec2};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("Object {0} is not an image on the active slide")]
    NotAnImage(String),
    #[error("Unsupported image type: {0}")]
    UnsupportedImageType(String),
}

/// A pointer gesture in progress.
#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    /// Moving an object; `grab` is the pointer offset from its origin.
    Drag { id: String, grab: Vec2, start: Point },
    Resize { id: String, corner: Corner, last: Point },
    Rotate { id: String },
}

impl Gesture {
    fn target(&self) -> &str {
        match self {
            Gesture::Drag { id, .. } | Gesture::Resize { id, .. } | Gesture::Rotate { id } => id,
        }
    }
}

/// One loaded project being edited.
///
/// Pointer positions passed in are display pixels of the preview; they are
/// converted to scene pixels using the preview scale before anything else
/// sees them.
pub struct Editor {
    store: Arc<dyn ObjectStore>,
    config: EditorConfig,
    pub(crate) state: ProjectState,
    pub(crate) stage: Stage<CpuRenderer>,
    /// Render tree of the active slide, including transient gesture state.
    primitives: Vec<Primitive>,
    gesture: Option<Gesture>,
}

impl Editor {
    /// Load a project and prepare a stage for it.
    pub async fn open(
        store: Arc<dyn ObjectStore>,
        project: ProjectRef,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        let state = ProjectState::load(store.as_ref(), project, config.signed_url_ttl()).await?;
        Self::with_state(store, state, config)
    }

    /// Wrap an already loaded project.
    pub fn with_state(
        store: Arc<dyn ObjectStore>,
        state: ProjectState,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        config.validate()?;
        let selection_color = parse_css_color(&config.selection_color)
            .ok_or_else(|| ConfigError::SelectionColor(config.selection_color.clone()))?;

        let mut text = TextEngine::new();
        if let Some(dir) = &config.font_dir {
            if let Err(e) = text.register_dir(dir) {
                log::warn!("{e}");
            }
        }
        text.set_default_family(config.default_font_family.clone());

        let stage = Stage::new(CpuRenderer::new(text), config.preview_scale)?
            .with_selection_color(selection_color);
        let primitives = state.active_primitives();
        Ok(Self {
            store,
            config,
            state,
            stage,
            primitives,
            gesture: None,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn active_slide(&self) -> usize {
        self.state.active_slide()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive(&self, id: &str) -> Option<&Primitive> {
        self.primitives.iter().find(|p| p.id == id)
    }

    pub fn selected(&self) -> Option<&str> {
        self.state.selection().selected()
    }

    /// Where the transform handle currently sits.
    pub fn handle(&self) -> Option<&HandleAttachment> {
        self.state.selection().handle().attachment()
    }

    pub fn is_manipulating(&self) -> bool {
        self.gesture.is_some()
    }

    fn to_scene(&self, display: Point) -> Point {
        let scale = self.config.preview_scale;
        Point::new(display.x / scale, display.y / scale)
    }

    fn refresh(&mut self) {
        self.primitives = self.state.active_primitives();
        self.state.selection_mut().reconcile(&self.primitives);
    }

    /// Select an object by id, or deselect with `None`.
    pub fn select(&mut self, id: Option<&str>) {
        self.state.selection_mut().select(id);
        self.state.selection_mut().reconcile(&self.primitives);
    }

    /// Switch slides, dropping the selection and any gesture.
    pub fn set_active_slide(&mut self, index: usize) -> bool {
        if !self.state.set_active_slide(index) {
            log::warn!("Slide {index} does not exist");
            return false;
        }
        self.gesture = None;
        self.refresh();
        true
    }

    /// Apply a properties-panel edit to the selected object.
    pub fn edit_selected(&mut self, patch: &ObjectPatch) -> bool {
        let Some(id) = self.selected().map(str::to_string) else {
            return false;
        };
        self.apply_edit(&id, patch);
        true
    }

    /// Apply an edit to any object of the active slide.
    pub fn apply_edit(&mut self, object_id: &str, patch: &ObjectPatch) {
        if patch.is_empty() {
            return;
        }
        let slide = self.state.active_slide();
        self.state.apply_object_edit(slide, object_id, patch);
        self.refresh();
    }

    pub fn set_background(&mut self, color: &str) {
        let slide = self.state.active_slide();
        self.state.set_background(slide, color);
        self.refresh();
    }

    /// Pointer down, in display pixels.
    ///
    /// A press on a handle of the selected object starts a transform; a
    /// press on an object selects it and starts a drag when its policy
    /// allows; a press on the background deselects.
    pub fn handle_press(&mut self, display: Point) {
        let point = self.to_scene(display);
        self.gesture = None;

        if let Some(attachment) = self.handle() {
            let target = attachment.target.clone();
            match attachment.hit_test(point, HANDLE_HIT_TOLERANCE) {
                Some(HandleKind::Corner(corner)) => {
                    self.gesture = Some(Gesture::Resize { id: target, corner, last: point });
                    return;
                }
                Some(HandleKind::Rotate) => {
                    self.gesture = Some(Gesture::Rotate { id: target });
                    return;
                }
                None => {}
            }
        }

        let hit = hit_test_primitives(&self.primitives, point)
            .map(|p| (p.id.clone(), p.origin, p.drag));
        match hit {
            Some((id, origin, drag)) => {
                let was_selected = self.state.selection().is_selected(&id);
                self.select(Some(&id));
                if drag.allows(was_selected) {
                    self.gesture = Some(Gesture::Drag { id, grab: point - origin, start: origin });
                }
            }
            None => self.select(None),
        }
    }

    /// Pointer move with the button held, in display pixels.
    pub fn handle_drag(&mut self, display: Point, snap: bool) {
        let point = self.to_scene(display);
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        let Some(primitive) = self.primitives.iter_mut().find(|p| p.id == gesture.target()) else {
            return;
        };
        match gesture {
            Gesture::Drag { grab, .. } => primitive.origin = point - *grab,
            Gesture::Resize { corner, last, .. } => {
                apply_corner_drag(primitive, *corner, point - *last);
                *last = point;
            }
            Gesture::Rotate { .. } => {
                apply_rotation_drag(primitive, point, snap);
            }
        }
        self.state.selection_mut().reconcile(&self.primitives);
    }

    /// Pointer up. Folds the gesture into an object edit.
    pub fn handle_release(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        let Some(primitive) = self.primitives.iter_mut().find(|p| p.id == gesture.target()) else {
            return;
        };
        let patch = match &gesture {
            Gesture::Drag { start, .. } if *start == primitive.origin => return,
            Gesture::Drag { .. } => {
                let origin = primitive.origin;
                primitive.drag_to(origin)
            }
            Gesture::Resize { .. } | Gesture::Rotate { .. } => primitive.end_transform(),
        };
        log::debug!("Gesture on {} ended: {patch:?}", gesture.target());
        self.apply_edit(gesture.target(), &patch);
    }

    /// Abandon the current gesture and restore the persisted boxes.
    pub fn cancel_gesture(&mut self) {
        if self.gesture.take().is_some() {
            self.refresh();
        }
    }

    /// Paint the active slide, including the selection decoration.
    pub async fn render(&mut self) -> RenderResult<PaintReceipt> {
        let slide = self.state.active_slide();
        let Some(layout) = self.state.document().layout(slide) else {
            return Err(RendererError::InvalidSurface(format!("slide {slide} does not exist")));
        };
        let request = StageRequest {
            slide,
            scene: &layout.scene,
            primitives: &self.primitives,
            selection: self.state.selection().handle().attachment(),
        };
        self.stage.render(request, self.store.as_ref()).await
    }

    /// Last painted preview.
    pub fn preview(&self) -> Option<&RasterImage> {
        self.stage.preview()
    }

    /// Upload `bytes` as a new project image and point a bitmap object of
    /// the active slide at it.
    ///
    /// The file is stored as `images/<uuid>.<ext>` and signed with the
    /// configured URL lifetime. Nothing changes in memory when the upload
    /// fails.
    pub async fn replace_image(
        &mut self,
        object_id: &str,
        bytes: Vec<u8>,
        ext: &str,
    ) -> Result<ImageAsset, EditorError> {
        let is_bitmap = self
            .primitive(object_id)
            .is_some_and(|p| matches!(p.kind, ObjectKind::Image | ObjectKind::Logo));
        if !is_bitmap {
            return Err(EditorError::NotAnImage(object_id.to_string()));
        }
        let name =
            unique_image_name(ext).ok_or_else(|| EditorError::UnsupportedImageType(ext.into()))?;

        let project = self.state.project().clone();
        let asset = upload_image(
            self.store.as_ref(),
            &project,
            &name,
            bytes,
            self.config.signed_url_ttl(),
        )
        .await?;

        self.state.register_asset(asset.clone());
        let patch = ObjectPatch {
            image_url: Some(asset.url.clone()),
            image_file_name: Some(asset.name.clone()),
            ..ObjectPatch::default()
        };
        self.apply_edit(object_id, &patch);
        log::info!("Replaced image of {object_id} with {}", asset.name);
        Ok(asset)
    }

    /// Persist the edited documents. Edits stay in memory on failure.
    pub async fn save(&self) -> Result<(), PersistError> {
        self.state.save(self.store.as_ref()).await
    }
}
