//! Cursor-addressable screen model and its render-ready projection.

pub mod cell;
pub mod document;
pub mod view;

pub use cell::{CharCell, Line, StyledRun};
pub use document::ScreenDocument;
pub use view::{Projection, ScrollMetrics, ScrollRequest, ViewProjector};
