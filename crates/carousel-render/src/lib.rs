//! Rasterization for carousel slides.
//!
//! Slides are painted on the CPU with `vello_cpu`; text is shaped with Parley
//! against fonts loaded from disk. The [`Stage`] is the one shared surface a
//! session paints previews on and captures exports from.

pub mod color;
pub mod cpu;
pub mod images;
pub mod raster;
pub mod renderer;
pub mod stage;
pub mod text;

pub use color::{color_or, parse_css_color};
pub use cpu::CpuRenderer;
pub use images::{DecodedImage, ImageCache, decode_image};
pub use raster::RasterImage;
pub use renderer::{DEFAULT_SELECTION_COLOR, Frame, RenderResult, Renderer, RendererError};
pub use stage::{PaintReceipt, Stage, StageRequest};
pub use text::{TextBrush, TextEngine};
