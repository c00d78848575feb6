//! Decoded bitmap cache for one load session.

use crate::renderer::{RenderResult, RendererError};
use carousel_core::ObjectStore;
use std::collections::HashMap;
use std::sync::Arc;

/// A decoded bitmap ready to be used as a paint.
#[derive(Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub(crate) paint: vello_cpu::Image,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Decode PNG/JPEG/WebP bytes.
pub fn decode_image(bytes: &[u8]) -> RenderResult<DecodedImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| RendererError::Render(format!("Failed to decode image: {e}")))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let w: u16 = width
        .try_into()
        .map_err(|_| RendererError::InvalidSurface(format!("image width {width} exceeds u16")))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| RendererError::InvalidSurface(format!("image height {height} exceeds u16")))?;

    let pixels = rgba
        .into_raw()
        .chunks_exact(4)
        .map(|px| {
            let a = px[3] as u16;
            let premul = |c: u8| (((c as u16) * a + 127) / 255) as u8;
            vello_cpu::peniko::color::PremulRgba8::from_u8_array([
                premul(px[0]),
                premul(px[1]),
                premul(px[2]),
                px[3],
            ])
        })
        .collect();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Ok(DecodedImage {
        width,
        height,
        paint: vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        },
    })
}

/// Bitmaps keyed by the URL they were fetched from.
///
/// Failed fetches are remembered as `None` so a broken URL is only tried
/// once per session.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, Option<DecodedImage>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&DecodedImage> {
        self.entries.get(url).and_then(Option::as_ref)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn insert(&mut self, url: impl Into<String>, image: Option<DecodedImage>) {
        self.entries.insert(url.into(), image);
    }

    /// Forget everything, e.g. when a new load session issues new URLs.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch and decode a URL unless it was already tried.
    ///
    /// Failures are logged and cached; they never fail the caller.
    pub async fn resolve(&mut self, store: &dyn ObjectStore, object_id: &str, url: &str) {
        if self.contains(url) {
            return;
        }
        let image = match store.fetch(url).await {
            Ok(bytes) => match decode_image(&bytes) {
                Ok(image) => Some(image),
                Err(e) => {
                    log::warn!("Image for {object_id} at {url} could not be decoded: {e}");
                    None
                }
            },
            Err(e) => {
                log::warn!("Image for {object_id} at {url} could not be fetched: {e}");
                None
            }
        };
        self.insert(url, image);
    }
}
