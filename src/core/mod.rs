//! The terminal emulator core: byte decoding, style interpretation, and the screen model.

pub mod ansi;
pub mod screen;
