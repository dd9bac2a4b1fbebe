//! Byte-stream tokenization and SGR style interpretation.

pub mod decoder;
pub mod style;
pub mod token;
pub mod utf8;

pub use decoder::ByteStreamDecoder;
pub use style::{Rgb, StyleEngine, StyleRecord};
pub use token::{ControlOp, Token};
