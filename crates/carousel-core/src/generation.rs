//! Turning a generation backend response into stored project documents.

use crate::model::{SlideResult, StyleDocument};
use crate::project::{PersistError, ProjectRef};
use crate::storage::{ObjectStore, StorageError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Base64 of the PNG signature's first bytes.
pub const PNG_BASE64_PREFIX: &str = "iVBOR";
const NAME_FALLBACK_LEN: usize = 50;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid base64 image for {id}: {message}")]
    Decode { id: String, message: String },
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Payload sent to the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub global_request: String,
    pub requests: Vec<Value>,
}

impl GenerationRequest {
    pub fn from_template(prompt: impl Into<String>, template: &StyleDocument) -> Self {
        Self {
            prompt: prompt.into(),
            global_request: template.global_request.clone(),
            requests: template.requests.clone(),
        }
    }
}

/// A successful backend response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub carousel_name: Option<String>,
    pub slides: Vec<SlideResult>,
}

/// Outcome of storing a generated project.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedProject {
    pub project: ProjectRef,
    pub name: String,
    pub results: Vec<SlideResult>,
    /// Image files written under `images/`.
    pub images: Vec<String>,
}

/// Display name for a generated project.
pub fn project_name(response: &GenerationResponse, prompt: &str) -> String {
    match response.carousel_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ if prompt.chars().count() > NAME_FALLBACK_LEN => {
            let cut: String = prompt.chars().take(NAME_FALLBACK_LEN).collect();
            format!("{cut}...")
        }
        _ => prompt.to_string(),
    }
}

/// Store a generation response as a project.
///
/// Inline base64 PNGs are decoded and written to `images/<id>.png`; their
/// result entries are rewritten to the file name so result documents never
/// carry binary data.
pub async fn ingest_generation(
    store: &dyn ObjectStore,
    project: ProjectRef,
    template: &StyleDocument,
    prompt: &str,
    response: GenerationResponse,
) -> Result<IngestedProject, IngestError> {
    let name = project_name(&response, prompt);
    let mut results = response.slides;
    let mut images = Vec::new();

    for slide in &mut results {
        for (id, value) in slide.0.iter_mut() {
            let Value::String(data) = value else { continue };
            if !data.starts_with(PNG_BASE64_PREFIX) {
                continue;
            }
            let bytes = STANDARD.decode(data.as_bytes()).map_err(|e| IngestError::Decode {
                id: id.clone(),
                message: e.to_string(),
            })?;
            let file_name = format!("{id}.png");
            put(store, project.image_path(&file_name), bytes, "image/png").await?;
            *value = Value::String(file_name.clone());
            images.push(file_name);
        }
    }

    let style = to_pretty(template, project.style_path())?;
    put(store, project.style_path(), style, "application/json").await?;
    let result = to_pretty(&results, project.result_path())?;
    put(store, project.result_path(), result, "application/json").await?;

    log::info!(
        "Stored generated project {project} ({} slides, {} images)",
        results.len(),
        images.len()
    );
    Ok(IngestedProject {
        project,
        name,
        results,
        images,
    })
}

fn to_pretty<T: Serialize>(value: &T, path: String) -> Result<Vec<u8>, PersistError> {
    serde_json::to_vec_pretty(value).map_err(|e| PersistError {
        path,
        source: StorageError::Serialization(e.to_string()),
    })
}

async fn put(
    store: &dyn ObjectStore,
    path: String,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<(), PersistError> {
    store
        .put(&path, bytes, content_type)
        .await
        .map_err(|source| PersistError { path, source })
}
