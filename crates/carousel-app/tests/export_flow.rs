//! Load, edit, export and archive against an in-memory store.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use carousel_app::{Editor, EditorConfig, ExportError};
use carousel_core::archive::{ArchiveError, build_project_archive};
use carousel_core::storage::{BoxFuture, ObjectEntry, StorageResult};
use carousel_core::{Content, MemoryStore, ObjectStore, ProjectRef, StorageError};
use kurbo::Point;
use pollster::block_on;
use serde_json::json;

fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let data: Vec<u8> = (0..width * height).flat_map(|_| rgba).collect();
        writer.write_image_data(&data).unwrap();
    }
    bytes
}

fn project() -> ProjectRef {
    ProjectRef::new("user-1", "0123456789abcdef")
}

/// Three 1080x1350 slides; slide 1 carries an overridden headline and an
/// image resolved from `images/img1.png`.
fn seed(store: &dyn ObjectStore) {
    let style = json!({
        "global_request": "bold minimal",
        "requests": [],
        "layouts": [
            {
                "scene": { "width": 1080, "height": 1350, "background": "#ffffff" },
                "objects": [
                    {
                        "id": "box", "type": "rectangle",
                        "x": 100, "y": 100, "width": 200, "height": 100,
                        "fill": "#ff0000"
                    }
                ]
            },
            {
                "scene": { "width": 1080, "height": 1350, "background": "#f0f0f0" },
                "objects": [
                    {
                        "id": "headline", "type": "text",
                        "x": 40, "y": 40, "width": 1000, "height": 120,
                        "text": "Override", "fontSize": 64
                    },
                    {
                        "id": "img1", "type": "image",
                        "x": 10, "y": 300, "width": 400, "height": 400
                    },
                    {
                        "id": "badge", "type": "circle",
                        "x": 900, "y": 1200, "radius": 60, "fill": "#00ff00"
                    }
                ]
            },
            {
                "scene": { "width": 1080, "height": 1350, "background": "#000000" },
                "objects": []
            }
        ]
    });
    let results = json!([
        {},
        { "headline": "Generated", "img1": "img1.png" },
        {}
    ]);
    let project = project();
    let put = |path: String, bytes: Vec<u8>, content_type: &str| {
        block_on(store.put(&path, bytes, content_type)).unwrap();
    };
    put(project.style_path(), serde_json::to_vec(&style).unwrap(), "application/json");
    put(project.result_path(), serde_json::to_vec(&results).unwrap(), "application/json");
    put(project.image_path("img1.png"), png(4, 4, [0, 0, 255, 255]), "image/png");
}

fn open(store: Arc<dyn ObjectStore>, preview_scale: f64) -> Editor {
    let config = EditorConfig { preview_scale, ..Default::default() };
    block_on(Editor::open(store, project(), config)).unwrap()
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    seed(store.as_ref());
    store
}

#[test]
fn export_resolution_is_native_at_any_preview_scale() {
    for scale in [0.25, 0.5, 1.0] {
        let mut editor = open(seeded_store(), scale);
        block_on(editor.render()).unwrap();
        let preview = editor.preview().unwrap();
        assert_eq!(preview.width, (1080.0 * scale).round() as u32);

        let raster = block_on(editor.export_current_slide()).unwrap();
        assert_eq!((raster.width, raster.height), (1080, 1350), "scale {scale}");
        assert_eq!(raster.pixel(150, 150), Some([255, 0, 0, 255]));
    }
}

#[test]
fn export_never_bakes_in_the_selection() {
    let mut editor = open(seeded_store(), 0.5);
    editor.select(Some("box"));
    assert!(editor.handle().is_some());

    let raster = block_on(editor.export_current_slide()).unwrap();
    assert_eq!(editor.selected(), None);
    // The top-left corner handle would cover this pixel.
    assert_eq!(raster.pixel(97, 97), Some([255, 255, 255, 255]));
}

#[test]
fn literal_text_wins_over_generated_result() {
    let mut editor = open(seeded_store(), 0.5);
    assert!(editor.set_active_slide(1));
    match &editor.primitive("headline").unwrap().content {
        Content::Text(text) => assert_eq!(text.text, "Override"),
        other => panic!("unexpected content {other:?}"),
    }
}

#[test]
fn image_resolves_from_result_filename() {
    let mut editor = open(seeded_store(), 1.0);
    editor.set_active_slide(1);
    let raster = block_on(editor.export_current_slide()).unwrap();
    assert_eq!(raster.pixel(200, 500), Some([0, 0, 255, 255]));
}

#[test]
fn drag_edit_changes_only_that_field() {
    let store = seeded_store();
    let mut editor = open(store, 1.0);
    editor.set_active_slide(1);
    let before = editor.state().document().clone();

    // Images only drag once selected.
    editor.select(Some("img1"));
    editor.handle_press(Point::new(100.0, 400.0));
    editor.handle_drag(Point::new(140.0, 400.0), false);
    editor.handle_release();

    let after = editor.state().document();
    let moved = after.layout(1).unwrap().object("img1").unwrap();
    let original = before.layout(1).unwrap().object("img1").unwrap();
    assert_eq!(moved.x, 50.0);
    assert_eq!(moved.y, original.y);
    assert_eq!(moved.width, original.width);
    assert_eq!(
        after.layout(1).unwrap().object("headline"),
        before.layout(1).unwrap().object("headline")
    );
    assert_eq!(after.layout(0), before.layout(0));
    assert_eq!(after.results, before.results);
}

#[test]
fn export_all_slides_persists_in_order_and_restores_slide() {
    let store = seeded_store();
    let mut editor = open(store.clone(), 0.5);
    editor.set_active_slide(2);
    let seeded = store.write_log().len();

    let rasters = block_on(editor.export_all_slides(true)).unwrap();
    assert_eq!(rasters.len(), 3);
    assert_eq!(editor.active_slide(), 2);

    let writes = store.write_log();
    assert_eq!(
        &writes[seeded..],
        [
            "user-1/0123456789abcdef/slides/slide_0.png",
            "user-1/0123456789abcdef/slides/slide_1.png",
            "user-1/0123456789abcdef/slides/slide_2.png",
            "user-1/0123456789abcdef/preview.png",
        ]
    );
    let preview = block_on(store.get(&project().preview_path())).unwrap();
    let slide0 = block_on(store.get(&project().slide_path(0))).unwrap();
    assert_eq!(preview, slide0);
    assert_eq!(store.content_type(&project().preview_path()).as_deref(), Some("image/png"));
}

#[test]
fn export_without_persist_writes_nothing() {
    let store = seeded_store();
    let mut editor = open(store.clone(), 0.5);
    let seeded = store.write_log().len();
    block_on(editor.export_all_slides(false)).unwrap();
    assert_eq!(store.write_log().len(), seeded);
}

/// Store whose uploads of one path always fail.
struct FailingStore {
    inner: MemoryStore,
    fail_path: String,
}

impl ObjectStore for FailingStore {
    fn get(&self, path: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>> {
        self.inner.get(path)
    }

    fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> BoxFuture<'_, StorageResult<()>> {
        if path == self.fail_path {
            let path = path.to_string();
            return Box::pin(async move { Err(StorageError::Other(format!("rejected {path}"))) });
        }
        self.inner.put(path, bytes, content_type)
    }

    fn list(&self, prefix: &str) -> BoxFuture<'_, StorageResult<Vec<ObjectEntry>>> {
        self.inner.list(prefix)
    }

    fn signed_url(&self, path: &str, ttl: Duration) -> BoxFuture<'_, StorageResult<String>> {
        self.inner.signed_url(path, ttl)
    }

    fn fetch(&self, url: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>> {
        self.inner.fetch(url)
    }
}

#[test]
fn failed_upload_stops_export_and_restores_slide() {
    let store = Arc::new(FailingStore {
        inner: MemoryStore::new(),
        fail_path: project().slide_path(1),
    });
    seed(store.as_ref());
    let seeded = store.inner.write_log().len();
    let mut editor = open(store.clone(), 0.5);
    editor.set_active_slide(2);

    let err = block_on(editor.export_all_slides(true)).unwrap_err();
    assert!(matches!(err, ExportError::Persist(_)));
    assert_eq!(editor.active_slide(), 2);

    // Fail fast: slide 0 stays uploaded, nothing after the failure runs.
    let writes = store.inner.write_log();
    assert_eq!(&writes[seeded..], ["user-1/0123456789abcdef/slides/slide_0.png"]);
}

#[test]
fn archive_of_fresh_export_is_ordered_and_sized() {
    let mut editor = open(seeded_store(), 0.5);
    let bytes = block_on(editor.export_archive()).unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
    let names: Vec<_> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(names, ["slide_0.png", "slide_1.png", "slide_2.png"]);
    assert_eq!(editor.active_slide(), 0);
}

#[test]
fn archive_without_stored_slides_is_nothing_to_export() {
    let store = seeded_store();
    let result = block_on(build_project_archive(store.as_ref(), &project()));
    assert!(matches!(result, Err(ArchiveError::NothingToExport)));
}

#[test]
fn save_then_load_round_trips_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = carousel_core::FileStore::new(dir.path().to_path_buf()).unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(store);
    seed(store.as_ref());

    let mut editor = open(store.clone(), 0.5);
    editor.set_active_slide(1);
    editor.select(Some("badge"));
    let mut patch = carousel_core::ObjectPatch::new();
    patch.set_field("fill", "#123456").unwrap();
    assert!(editor.edit_selected(&patch));
    block_on(editor.save()).unwrap();

    let reloaded = open(store, 0.5);
    assert_eq!(reloaded.state().document().style, editor.state().document().style);
    assert_eq!(reloaded.state().document().results, editor.state().document().results);
    let badge = reloaded.state().document().layout(1).unwrap().object("badge").unwrap();
    assert_eq!(badge.fill.as_deref(), Some("#123456"));
}

#[test]
fn bad_font_size_does_not_block_export() {
    let mut editor = open(seeded_store(), 1.0);
    editor.set_active_slide(1);
    let mut patch = carousel_core::ObjectPatch::new();
    patch.set_field("fontSize", "0").unwrap();
    editor.apply_edit("headline", &patch);

    let raster = block_on(editor.export_current_slide()).unwrap();
    assert_eq!(raster.pixel(200, 500), Some([0, 0, 255, 255]));
}

#[test]
fn replaced_image_renders_and_survives_reload() {
    let store = seeded_store();
    let mut editor = open(store.clone(), 1.0);
    editor.set_active_slide(1);

    let red = png(4, 4, [255, 0, 0, 255]);
    let asset = block_on(editor.replace_image("img1", red, "png")).unwrap();
    let path = project().image_path(&asset.name);
    assert_eq!(store.write_log().last(), Some(&path));
    assert_eq!(store.content_type(&path).as_deref(), Some("image/png"));

    let img1 = editor.state().active_layout().unwrap().object("img1").unwrap();
    assert_eq!(img1.image_file_name.as_deref(), Some(asset.name.as_str()));
    assert_eq!(img1.image_url.as_deref(), Some(asset.url.as_str()));

    let raster = block_on(editor.export_current_slide()).unwrap();
    assert_eq!(raster.pixel(200, 500), Some([255, 0, 0, 255]));

    // The old image stays in storage; the object now names the new one.
    block_on(editor.save()).unwrap();
    let mut reloaded = open(store, 1.0);
    assert!(reloaded.state().document().assets.by_name("img1.png").is_some());
    assert!(reloaded.state().document().assets.by_name(&asset.name).is_some());
    reloaded.set_active_slide(1);
    let raster = block_on(reloaded.export_current_slide()).unwrap();
    assert_eq!(raster.pixel(200, 500), Some([255, 0, 0, 255]));
}
