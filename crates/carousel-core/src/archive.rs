//! Bundling slide PNGs into a downloadable ZIP archive.

use crate::project::ProjectRef;
use crate::storage::{ObjectStore, StorageError};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Deflate level used for every entry.
pub const ARCHIVE_COMPRESSION_LEVEL: i64 = 9;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Distinct from a failure: there was simply nothing to bundle.
    #[error("No slides found to zip.")]
    NothingToExport,
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One encoded slide image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideImage {
    pub index: usize,
    pub png: Vec<u8>,
}

impl SlideImage {
    pub fn new(index: usize, png: Vec<u8>) -> Self {
        Self { index, png }
    }

    pub fn entry_name(&self) -> String {
        slide_file_name(self.index)
    }
}

pub fn slide_file_name(index: usize) -> String {
    format!("slide_{index}.png")
}

/// Slide index encoded in a `slide_<n>.png` file name.
pub fn parse_slide_file_name(name: &str) -> Option<usize> {
    name.strip_prefix("slide_")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// Download file name for a project's archive.
pub fn archive_file_name(project: &ProjectRef) -> String {
    format!("carousel-{}.zip", project.short_id())
}

/// Bundle slide images, ordered by index, into a complete in-memory ZIP.
///
/// When an index appears more than once the last image given wins.
pub fn bundle_as_archive(images: &[SlideImage]) -> Result<Vec<u8>, ArchiveError> {
    if images.is_empty() {
        return Err(ArchiveError::NothingToExport);
    }
    let mut ordered: BTreeMap<usize, &SlideImage> = BTreeMap::new();
    for image in images {
        if ordered.insert(image.index, image).is_some() {
            log::warn!("Duplicate slide {}; keeping the later image", image.index);
        }
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL));
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for image in ordered.values() {
        writer.start_file(image.entry_name(), options)?;
        writer.write_all(&image.png)?;
    }
    let bytes = writer.finish()?.into_inner();
    log::info!("Built archive with {} slides ({} bytes)", ordered.len(), bytes.len());
    Ok(bytes)
}

/// Gather a project's exported slides from storage.
///
/// Slides that fail to download are skipped with a warning.
pub async fn collect_stored_slides(
    store: &dyn ObjectStore,
    project: &ProjectRef,
) -> Result<Vec<SlideImage>, ArchiveError> {
    let entries = store.list(&project.slides_prefix()).await?;
    let mut images = Vec::new();
    for entry in entries {
        let Some(index) = parse_slide_file_name(&entry.name) else {
            continue;
        };
        match store.get(&entry.path).await {
            Ok(png) => images.push(SlideImage::new(index, png)),
            Err(e) => log::warn!("Skipping {}: {}", entry.path, e),
        }
    }
    Ok(images)
}

/// Build the archive of everything exported for a project.
pub async fn build_project_archive(
    store: &dyn ObjectStore,
    project: &ProjectRef,
) -> Result<Vec<u8>, ArchiveError> {
    let images = collect_stored_slides(store, project).await?;
    bundle_as_archive(&images)
}
