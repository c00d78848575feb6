//! Project documents: loading, immutable edits and saving.

use crate::model::{AssetIndex, ImageAsset, Layout, ObjectPatch, SlideResult, StyleDocument};
use crate::objects::{ContentContext, Primitive, build_primitives};
use crate::selection::SelectionController;
use crate::storage::{ObjectStore, StorageError, content_type_for};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// How long asset URLs handed out by a load stay valid.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// File extensions listed as project images.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Whether a file name carries one of [`IMAGE_EXTENSIONS`].
pub fn is_image_name(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// A collision-free `<uuid>.<ext>` name for an uploaded image, or `None`
/// for an unsupported extension.
pub fn unique_image_name(ext: &str) -> Option<String> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .contains(&ext.as_str())
        .then(|| format!("{}.{ext}", uuid::Uuid::new_v4()))
}

/// Raised when a project cannot be loaded. No partial state is produced.
#[derive(Debug, Error)]
#[error("Failed to load project {project}: {source}")]
pub struct LoadError {
    pub project: String,
    #[source]
    pub source: StorageError,
}

/// Raised when a save or upload fails. In-memory state is left as it was.
#[derive(Debug, Error)]
#[error("Failed to persist {path}: {source}")]
pub struct PersistError {
    pub path: String,
    #[source]
    pub source: StorageError,
}

/// Identifies a project in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRef {
    pub user_id: String,
    pub project_id: String,
}

impl ProjectRef {
    pub fn new(user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            project_id: project_id.into(),
        }
    }

    /// A fresh project id for a user.
    pub fn generate(user_id: impl Into<String>) -> Self {
        Self::new(user_id, uuid::Uuid::new_v4().to_string())
    }

    /// Storage prefix shared by every object of the project.
    pub fn prefix(&self) -> String {
        format!("{}/{}/", self.user_id, self.project_id)
    }

    pub fn style_path(&self) -> String {
        format!("{}style.json", self.prefix())
    }

    pub fn result_path(&self) -> String {
        format!("{}result.json", self.prefix())
    }

    pub fn images_prefix(&self) -> String {
        format!("{}images/", self.prefix())
    }

    pub fn image_path(&self, name: &str) -> String {
        format!("{}{}", self.images_prefix(), name)
    }

    pub fn slides_prefix(&self) -> String {
        format!("{}slides/", self.prefix())
    }

    pub fn slide_path(&self, index: usize) -> String {
        format!("{}slide_{}.png", self.slides_prefix(), index)
    }

    pub fn preview_path(&self) -> String {
        format!("{}preview.png", self.prefix())
    }

    /// First eight characters of the project id.
    pub fn short_id(&self) -> &str {
        match self.project_id.char_indices().nth(8) {
            Some((end, _)) => &self.project_id[..end],
            None => &self.project_id,
        }
    }
}

impl std::fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.project_id)
    }
}

/// The full multi-slide document of one load session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectDocument {
    pub style: StyleDocument,
    /// Parallel to `style.layouts`.
    pub results: Vec<SlideResult>,
    pub assets: AssetIndex,
}

impl ProjectDocument {
    pub fn new(style: StyleDocument, results: Vec<SlideResult>) -> Self {
        Self {
            style,
            results,
            assets: AssetIndex::default(),
        }
    }

    pub fn slide_count(&self) -> usize {
        self.style.layouts.len()
    }

    pub fn layout(&self, index: usize) -> Option<&Layout> {
        self.style.layouts.get(index)
    }

    pub fn result(&self, index: usize) -> Option<&SlideResult> {
        self.results.get(index)
    }

    /// Render tree for a slide, or `None` when the index is out of range.
    pub fn primitives(&self, index: usize) -> Option<Vec<Primitive>> {
        let layout = self.layout(index)?;
        let empty = SlideResult::default();
        let result = self.result(index).unwrap_or(&empty);
        let ctx = ContentContext {
            result,
            assets: &self.assets,
        };
        Some(build_primitives(layout, &ctx))
    }

    /// A new document with one object merged with `patch`.
    ///
    /// An unknown slide or object id yields an unchanged copy.
    #[must_use]
    pub fn apply_object_edit(&self, slide: usize, object_id: &str, patch: &ObjectPatch) -> Self {
        let mut next = self.clone();
        let target = next
            .style
            .layouts
            .get_mut(slide)
            .and_then(|layout| layout.objects.iter_mut().find(|o| o.id == object_id));
        match target {
            Some(object) => patch.apply(object),
            None => log::debug!("Ignoring edit for unknown object {object_id} on slide {slide}"),
        }
        next
    }

    /// A new document that also knows about `asset`.
    #[must_use]
    pub fn with_asset(&self, asset: ImageAsset) -> Self {
        let mut next = self.clone();
        next.assets.insert(asset);
        next
    }

    /// A new document with one slide's background replaced.
    #[must_use]
    pub fn with_background(&self, slide: usize, background: &str) -> Self {
        let mut next = self.clone();
        if let Some(layout) = next.style.layouts.get_mut(slide) {
            layout.scene.background = background.to_string();
        }
        next
    }
}

/// Load a project: style, result and the signed asset listing, fetched
/// concurrently. Any failure aborts the whole load.
pub async fn load_project(
    store: &dyn ObjectStore,
    project: &ProjectRef,
    url_ttl: Duration,
) -> Result<ProjectDocument, LoadError> {
    log::info!("Loading project {project}");
    let fail = |source| LoadError {
        project: project.to_string(),
        source,
    };

    let (style, results, assets) = futures::try_join!(
        fetch_json::<StyleDocument>(store, project.style_path()),
        fetch_json::<Vec<SlideResult>>(store, project.result_path()),
        list_assets(store, project, url_ttl),
    )
    .map_err(fail)?;

    log::info!(
        "Loaded project {project}: {} slides, {} assets",
        style.layouts.len(),
        assets.len()
    );
    Ok(ProjectDocument {
        style,
        results,
        assets,
    })
}

async fn fetch_json<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    path: String,
) -> Result<T, StorageError> {
    let bytes = store.get(&path).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| StorageError::Serialization(format!("Failed to parse {path}: {e}")))
}

async fn list_assets(
    store: &dyn ObjectStore,
    project: &ProjectRef,
    ttl: Duration,
) -> Result<AssetIndex, StorageError> {
    let entries = store.list(&project.images_prefix()).await?;
    let images = entries.into_iter().filter(|e| is_image_name(&e.name));
    let signed = futures::future::try_join_all(images.map(|entry| async move {
        let url = store.signed_url(&entry.path, ttl).await?;
        Ok::<_, StorageError>(ImageAsset {
            name: entry.name,
            url,
        })
    }))
    .await?;
    Ok(AssetIndex::new(signed))
}

/// Upload an image under `images/<name>` and sign a URL for it.
pub async fn upload_image(
    store: &dyn ObjectStore,
    project: &ProjectRef,
    name: &str,
    bytes: Vec<u8>,
    url_ttl: Duration,
) -> Result<ImageAsset, PersistError> {
    let path = project.image_path(name);
    let fail = |source| PersistError {
        path: path.clone(),
        source,
    };
    store
        .put(&path, bytes, content_type_for(name))
        .await
        .map_err(fail)?;
    let url = store.signed_url(&path, url_ttl).await.map_err(fail)?;
    log::info!("Uploaded image {path}");
    Ok(ImageAsset {
        name: name.to_string(),
        url,
    })
}

/// Write both documents as pretty-printed JSON, concurrently.
pub async fn save_project(
    store: &dyn ObjectStore,
    project: &ProjectRef,
    document: &ProjectDocument,
) -> Result<(), PersistError> {
    let style = pretty_json(&document.style, project.style_path())?;
    let results = pretty_json(&document.results, project.result_path())?;

    futures::try_join!(
        put_json(store, project.style_path(), style),
        put_json(store, project.result_path(), results),
    )
    .map_err(|e| {
        log::error!("Saving project {project} failed: {e}");
        e
    })?;
    log::info!("Saved project {project}");
    Ok(())
}

fn pretty_json<T: serde::Serialize>(value: &T, path: String) -> Result<Vec<u8>, PersistError> {
    serde_json::to_vec_pretty(value).map_err(|e| PersistError {
        path,
        source: StorageError::Serialization(e.to_string()),
    })
}

async fn put_json(
    store: &dyn ObjectStore,
    path: String,
    bytes: Vec<u8>,
) -> Result<(), PersistError> {
    store
        .put(&path, bytes, "application/json")
        .await
        .map_err(|source| PersistError { path, source })
}

/// Editor-side state: the document, the active slide and the selection.
#[derive(Debug, Clone)]
pub struct ProjectState {
    project: ProjectRef,
    document: ProjectDocument,
    active_slide: usize,
    selection: SelectionController,
}

impl ProjectState {
    pub fn new(project: ProjectRef, document: ProjectDocument) -> Self {
        Self {
            project,
            document,
            active_slide: 0,
            selection: SelectionController::new(),
        }
    }

    pub async fn load(
        store: &dyn ObjectStore,
        project: ProjectRef,
        url_ttl: Duration,
    ) -> Result<Self, LoadError> {
        let document = load_project(store, &project, url_ttl).await?;
        Ok(Self::new(project, document))
    }

    pub async fn save(&self, store: &dyn ObjectStore) -> Result<(), PersistError> {
        save_project(store, &self.project, &self.document).await
    }

    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    pub fn document(&self) -> &ProjectDocument {
        &self.document
    }

    pub fn active_slide(&self) -> usize {
        self.active_slide
    }

    /// Switch slides. The selection is cleared even when the index does not
    /// change; out-of-range indices are ignored.
    pub fn set_active_slide(&mut self, index: usize) -> bool {
        if index >= self.document.slide_count() {
            return false;
        }
        self.active_slide = index;
        self.selection.clear();
        true
    }

    pub fn active_layout(&self) -> Option<&Layout> {
        self.document.layout(self.active_slide)
    }

    pub fn active_result(&self) -> Option<&SlideResult> {
        self.document.result(self.active_slide)
    }

    pub fn active_primitives(&self) -> Vec<Primitive> {
        self.document.primitives(self.active_slide).unwrap_or_default()
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionController {
        &mut self.selection
    }

    /// Replace the document with an edited copy.
    pub fn apply_object_edit(&mut self, slide: usize, object_id: &str, patch: &ObjectPatch) {
        self.document = self.document.apply_object_edit(slide, object_id, patch);
    }

    pub fn set_background(&mut self, slide: usize, background: &str) {
        self.document = self.document.with_background(slide, background);
    }

    /// Make an asset uploaded during this session resolvable.
    pub fn register_asset(&mut self, asset: ImageAsset) {
        self.document = self.document.with_asset(asset);
    }
}
