//! Carousel archive server
//!
//! Serves the exported slides of a project as a single ZIP download.
//!
//! ## Routes
//!
//! ```text
//! GET /health                                   -> "ok"
//! GET /projects/{user_id}/{project_id}/archive  -> carousel-<shortId>.zip
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use carousel_core::archive::{ArchiveError, archive_file_name, build_project_archive};
use carousel_core::{FileStore, ObjectStore, ProjectRef, StorageError};
use clap::Parser;
use serde::Serialize;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// Server configuration
#[derive(Parser, Debug)]
#[command(name = "carousel-server", version)]
struct Config {
    /// Root directory of the object store.
    #[arg(long, env = "CAROUSEL_STORAGE_ROOT")]
    storage_root: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, env = "CAROUSEL_BIND", default_value = "0.0.0.0:3030")]
    bind: SocketAddr,
}

/// Shared server state
struct AppState {
    store: Arc<dyn ObjectStore>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carousel_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::parse();
    let store = match &config.storage_root {
        Some(root) => FileStore::new(root.clone()),
        None => FileStore::default_location(),
    };
    let store = match store {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open object store: {}", e);
            std::process::exit(1);
        }
    };
    info!("Serving projects from {}", store.root().display());

    let app = router(Arc::new(AppState { store: Arc::new(store) }));

    let listener = match tokio::net::TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind, e);
            std::process::exit(1);
        }
    };
    info!("Carousel server listening on {}", config.bind);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/projects/{user_id}/{project_id}/archive", get(archive))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Bundle a project's stored slide exports into a ZIP.
///
/// Store backends may do blocking file I/O, so the build runs on the
/// blocking pool.
async fn archive(
    State(state): State<Arc<AppState>>,
    Path((user_id, project_id)): Path<(String, String)>,
) -> Response {
    let project = ProjectRef::new(user_id, project_id);
    let store = state.store.clone();
    let target = project.clone();
    let runtime = tokio::runtime::Handle::current();
    let built = tokio::task::spawn_blocking(move || {
        runtime.block_on(build_project_archive(store.as_ref(), &target))
    })
    .await;
    let result = match built {
        Ok(result) => result,
        Err(e) => {
            error!("Archive task for {} failed: {}", project, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "archive task failed");
        }
    };

    match result {
        Ok(bytes) => {
            info!("Serving archive for {} ({} bytes)", project, bytes.len());
            let headers = [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", archive_file_name(&project)),
                ),
                (header::CONTENT_LENGTH, bytes.len().to_string()),
            ];
            (StatusCode::OK, headers, Bytes::from(bytes)).into_response()
        }
        Err(ArchiveError::NothingToExport) => {
            warn!("No slides to archive for {}", project);
            error_response(StatusCode::NOT_FOUND, ArchiveError::NothingToExport.to_string())
        }
        Err(ArchiveError::Storage(StorageError::InvalidUrl(message))) => {
            error_response(StatusCode::BAD_REQUEST, message)
        }
        Err(e) => {
            error!("Archive for {} failed: {}", project, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carousel_core::MemoryStore;
    use std::io::Cursor;

    fn state(store: MemoryStore) -> State<Arc<AppState>> {
        State(Arc::new(AppState { store: Arc::new(store) }))
    }

    fn path(user: &str, project: &str) -> Path<(String, String)> {
        Path((user.to_string(), project.to_string()))
    }

    async fn body(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health().await, "ok");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_archive_headers_match_body() {
        let store = MemoryStore::new();
        let project = ProjectRef::new("u", "abcdef0123");
        store
            .put(&project.slide_path(1), vec![1; 100], "image/png")
            .await
            .unwrap();
        store
            .put(&project.slide_path(0), vec![0; 100], "image/png")
            .await
            .unwrap();

        let response = archive(state(store), path("u", "abcdef0123")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"carousel-abcdef01.zip\""
        );

        let bytes = body(response).await;
        assert_eq!(headers[header::CONTENT_LENGTH], bytes.len().to_string().as_str());
        let zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let names: Vec<_> = zip.file_names().map(str::to_string).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"slide_0.png".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_archive_without_slides_is_not_found() {
        let response = archive(state(MemoryStore::new()), path("u", "empty")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_slice(&body(response).await).unwrap();
        assert_eq!(json["error"], "No slides found to zip.");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_archive_rejects_escaping_paths() {
        let response = archive(state(MemoryStore::new()), path("..", "p")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_archive_reads_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let project = ProjectRef::new("u", "files");
        store
            .put(&project.slide_path(0), vec![7; 10], "image/png")
            .await
            .unwrap();

        let state = State(Arc::new(AppState { store: Arc::new(store) }));
        let response = archive(state, path("u", "files")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let zip = zip::ZipArchive::new(Cursor::new(body(response).await.to_vec())).unwrap();
        assert_eq!(zip.len(), 1);
    }
}
