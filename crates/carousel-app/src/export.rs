//! Raster export of slides, optional upload, and archive bundling.

use crate::editor::Editor;
use carousel_core::archive::{ArchiveError, SlideImage, bundle_as_archive};
use carousel_core::{ObjectStore, PersistError};
use carousel_render::{RasterImage, RendererError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to capture slide {slide}: {source}")]
    Capture {
        slide: usize,
        #[source]
        source: RendererError,
    },
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("Project has no slides")]
    NoSlides,
    #[error("Slide {0} does not exist")]
    SlideOutOfRange(usize),
}

impl Editor {
    /// Rasterize the active slide at native scene resolution.
    ///
    /// Any selection is cleared and the slide repainted first so the
    /// transform handle never ends up in the output.
    pub async fn export_current_slide(&mut self) -> Result<RasterImage, ExportError> {
        let slide = self.active_slide();
        if self.state.active_layout().is_none() {
            return Err(ExportError::SlideOutOfRange(slide));
        }
        self.cancel_gesture();
        self.select(None);

        let capture = |source| ExportError::Capture { slide, source };
        let receipt = self.render().await.map_err(capture)?;
        let raster = self.stage.capture_native(&receipt).map_err(capture)?;
        log::info!("Captured slide {slide} at {}x{}", raster.width, raster.height);
        Ok(raster)
    }

    /// Export every slide in order, one at a time on the shared stage.
    ///
    /// Fails fast: the first capture or upload error stops the run and
    /// uploads already made are kept. With `persist`, each slide goes to
    /// `slides/slide_<i>.png` as it is captured and slide 0 is written to
    /// `preview.png` once all slides succeeded. The previously active slide
    /// is restored on every path.
    pub async fn export_all_slides(
        &mut self,
        persist: bool,
    ) -> Result<Vec<RasterImage>, ExportError> {
        let count = self.state.document().slide_count();
        if count == 0 {
            return Err(ExportError::NoSlides);
        }
        let original = self.active_slide();
        log::info!("Exporting {count} slides of {}", self.state.project());

        let outcome = self.export_slides(count, persist).await;

        self.set_active_slide(original);
        if let Err(e) = self.render().await {
            log::warn!("Failed to repaint slide {original} after export: {e}");
        }
        if let Err(e) = &outcome {
            log::error!("Export of {} stopped: {e}", self.state.project());
        }
        outcome
    }

    async fn export_slides(
        &mut self,
        count: usize,
        persist: bool,
    ) -> Result<Vec<RasterImage>, ExportError> {
        let project = self.state.project().clone();
        let mut rasters = Vec::with_capacity(count);
        let mut preview = None;

        for slide in 0..count {
            if !self.set_active_slide(slide) {
                return Err(ExportError::SlideOutOfRange(slide));
            }
            let raster = self.export_current_slide().await?;
            if persist {
                let png = encode(slide, &raster)?;
                upload(self.store(), project.slide_path(slide), png.clone()).await?;
                log::info!("Uploaded slide {slide} of {project}");
                if slide == 0 {
                    preview = Some(png);
                }
            }
            rasters.push(raster);
        }

        if let Some(png) = preview {
            upload(self.store(), project.preview_path(), png).await?;
        }
        Ok(rasters)
    }

    /// Export every slide and bundle the PNGs into a ZIP.
    pub async fn export_archive(&mut self) -> Result<Vec<u8>, ArchiveBuildError> {
        let rasters = self.export_all_slides(false).await?;
        let images = rasters
            .iter()
            .enumerate()
            .map(|(index, raster)| Ok(SlideImage::new(index, encode(index, raster)?)))
            .collect::<Result<Vec<_>, ExportError>>()?;
        Ok(bundle_as_archive(&images)?)
    }
}

/// Failure of [`Editor::export_archive`].
#[derive(Debug, Error)]
pub enum ArchiveBuildError {
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

fn encode(slide: usize, raster: &RasterImage) -> Result<Vec<u8>, ExportError> {
    raster
        .to_png()
        .map_err(|source| ExportError::Capture { slide, source })
}

async fn upload(store: &dyn ObjectStore, path: String, png: Vec<u8>) -> Result<(), PersistError> {
    store
        .put(&path, png, "image/png")
        .await
        .map_err(|source| PersistError { path, source })
}
