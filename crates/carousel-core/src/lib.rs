//! Carousel Core Library
//!
//! Platform-agnostic data structures and logic for the carousel layout
//! editor: slide model, object adapters, selection, project state, storage
//! and archive bundling.

pub mod archive;
pub mod generation;
pub mod model;
pub mod objects;
pub mod project;
pub mod resolve;
pub mod selection;
pub mod storage;

pub use archive::{ArchiveError, SlideImage, bundle_as_archive};
pub use model::{
    AssetIndex, ImageAsset, Layout, LayoutObject, ObjectKind, ObjectPatch, Scene, SlideResult,
    StyleDocument,
};
pub use objects::{Content, DragPolicy, Primitive, TextContent};
pub use project::{LoadError, PersistError, ProjectDocument, ProjectRef, ProjectState};
pub use selection::{Corner, HandleAttachment, HandleKind, SelectionController, SelectionState};
pub use storage::{FileStore, MemoryStore, ObjectStore, StorageError, StorageResult};
