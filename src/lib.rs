//! Core of a single-image raster editor: document model, filter chain, text layers,
//! bounded undo history, destructive transforms and export.
//!
//! The GUI in `main.rs` is one host; everything here is driven through
//! [`EditorSession`] and can run headless.

pub mod bake;
pub mod bitmap;
pub mod config;
pub mod crop;
pub mod document;
pub mod error;
pub mod export;
pub mod filters;
pub mod geometry;
pub mod history;
pub mod persist;
pub mod render;
pub mod session;
pub mod text;
pub mod tools;

pub use bake::{BakeOp, FlipAxis, Rotation};
pub use bitmap::{Bitmap, BitmapCodec, ImageCodec, OutputFormat};
pub use config::EditorConfig;
pub use crop::AspectRatio;
pub use document::{Color4, Document, TextLayer};
pub use error::{CodecError, EditorError};
pub use export::{ExportOptions, ExportedImage};
pub use filters::{FilterParam, Filters, Preset};
pub use persist::{DocumentStore, SaveRecord, SessionState, SidecarStore};
pub use session::{EditorSession, LayerEdit};
pub use text::FontBook;
pub use tools::{PointerButton, Tool};
