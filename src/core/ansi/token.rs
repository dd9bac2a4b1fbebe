//! Token kinds produced by [`super::decoder::ByteStreamDecoder`] and consumed by
//! [`crate::core::screen::document::ScreenDocument`].
//!
//! An exhaustive tagged union of every recognized control operation, so the compiler enforces
//! coverage of each one in `ScreenDocument::apply_token`.

/// A single parsed unit of the byte stream: either a run of plain text or a recognized control
/// operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Decoded UTF-8 text. Never contains `\r`, `\n`, or any ASCII control byte below `0x20`
    /// (those are always replaced by U+FFFD if they arrive as malformed UTF-8, never passed
    /// through verbatim).
    Plain(String),
    /// A recognized control operation, with its raw parameter string (if any) still attached.
    Ctrl(ControlOp),
}

/// The fixed set of control operations `ScreenDocument` understands. Every CSI final byte and
/// simple-escape letter the spec names maps to exactly one of these variants; anything else is
/// recognized by the decoder and discarded without producing a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOp {
    /// Bare carriage return not immediately followed by `\n`.
    Cr,
    /// `\n`, `\r*\n`, VT, FF, or `ESC E` -- move to the start of the next line.
    NextLine,
    /// Backspace (`BS`, `0x08`) -- equivalent to `CursorLeft(1)`.
    Backspace,
    SaveCursor,
    RestoreCursor,
    AppKeypadOn,
    AppKeypadOff,
    /// `ESC M` -- reverse index (scroll down, or move cursor up at top margin).
    ReverseIndex,
    /// `ESC D` -- index (scroll up, or move cursor down at bottom margin).
    Index,
    CursorUp(u32),
    CursorDown(u32),
    CursorLeft(u32),
    CursorRight(u32),
    /// `CSI r;c H` / `CSI r;c f`. The raw parameter string is kept because `""`, `"0"`, `"1"`,
    /// `"0;1"`, and `"1;0"` all mean `(1, 1)` per spec -- a detail best resolved once, in
    /// `ScreenDocument`, from the original string.
    CursorTo(String),
    ClearLine(String),
    ClearScreen(String),
    SetStyle(String),
    SetScrollRegion(String),
    DeleteChars(u32),
    InsertLines(u32),
    InsertBlanks(u32),
    /// `CSI ? ... h` -- DEC private mode set. Parameter includes the leading `?`.
    DecSet(String),
    /// `CSI ? ... l` -- DEC private mode reset. Parameter includes the leading `?`.
    DecReset(String),
}
