//! Carousel editor application: the editing session, slide export and the
//! command-line shell built on them.

pub mod config;
pub mod editor;
pub mod export;

pub use config::{ConfigError, EditorConfig};
pub use editor::{Editor, EditorError};
pub use export::{ArchiveBuildError, ExportError};
