//! Grapheme-addressed cell storage: a single terminal line as a mutable vector of [`CharCell`].
//!
//! Column indexing is 1-based throughout, matching the cursor-coordinate convention the rest of
//! the screen model uses.

use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::super::ansi::style::StyleRecord;

/// One user-perceived character and the style it was written with.
#[derive(Debug, Clone)]
pub struct CharCell {
    pub style: Arc<StyleRecord>,
    pub ch: String,
}

impl CharCell {
    pub fn new(ch: impl Into<String>, style: Arc<StyleRecord>) -> Self {
        Self { ch: ch.into(), style }
    }

    fn blank(style: Arc<StyleRecord>) -> Self { Self::new(" ", style) }
}

/// One rendered run: contiguous cells sharing the same interned style handle, coalesced for
/// the projector.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledRun {
    pub style: Arc<StyleRecord>,
    pub text: String,
}

/// A single screen row. Columns are 1-based; `col` may sit one past the last cell (append
/// position).
#[derive(Debug, Clone)]
pub struct Line {
    cells: Vec<CharCell>,
    col: usize,
}

impl Line {
    pub fn new() -> Self { Self { cells: Vec::new(), col: 1 } }

    pub fn len(&self) -> usize { self.cells.len() }
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }
    pub fn col(&self) -> usize { self.col }

    /// Split `text` into graphemes and write them starting at the current column, overwriting
    /// existing cells where present and appending past the end. Advances the column by the
    /// number of graphemes written.
    ///
    /// Assumes the `1 ≤ col ≤ len+1` invariant already holds -- callers reach an out-of-range
    /// column only through [`Line::set_pos`]/[`Line::move_pos`], which grow the line first.
    pub fn write(&mut self, text: &str, style: Arc<StyleRecord>, advance: bool) {
        let graphemes: Vec<&str> = text.graphemes(true).collect();
        let write_len = graphemes.len();
        if write_len == 0 {
            return;
        }
        debug_assert!(self.col >= 1 && self.col <= self.cells.len() + 1, "column invariant violated");
        let start = self.col - 1;
        let replace_end = (start + write_len).min(self.cells.len());
        let replace_len = replace_end.saturating_sub(start);
        let new_cells: Vec<CharCell> =
            graphemes.iter().map(|g| CharCell::new(*g, style.clone())).collect();

        self.cells.splice(start..start + replace_len, new_cells);
        if advance {
            self.col += write_len;
        }
    }

    /// Move the write column directly, extending the line with blanks if it lands past the end.
    pub fn set_pos(&mut self, pos: usize, blank_style: Arc<StyleRecord>) {
        if pos > 0 {
            let over_move = pos as isize - self.cells.len() as isize;
            if over_move > 0 {
                self.insert_blanks_append(over_move as usize, blank_style);
            }
        }
        self.col = pos;
    }

    /// Move the write column by `offset`, clamped to `[1, len]`. If `force` and the offset would
    /// land past the end, the line is extended with blanks first.
    pub fn move_pos(&mut self, offset: isize, force: bool, blank_style: Arc<StyleRecord>) {
        let new_pos = self.col as isize + offset;
        if force && new_pos > self.cells.len() as isize {
            let grow = new_pos as usize - self.cells.len();
            self.insert_blanks_append(grow, blank_style);
        }
        let line_len = self.cells.len() as isize;
        self.col = new_pos.clamp(1, line_len.max(1)) as usize;
    }

    /// Erase `n` cells from the current column rightward (inclusive). `None` erases to the end.
    pub fn erase_to_right(&mut self, n: Option<usize>) {
        let start = self.col - 1;
        if start >= self.cells.len() {
            return;
        }
        match n {
            None => self.cells.truncate(start),
            Some(n) => {
                let end = (start + n).min(self.cells.len());
                self.cells.drain(start..end);
            }
        }
    }

    /// Erase from the start of the line through the current column inclusive, then reset to
    /// column 1.
    pub fn erase_to_left(&mut self) {
        let end = self.col.min(self.cells.len());
        self.cells.drain(..end);
        self.col = 1;
    }

    /// Erase the entire line and reset to column 1.
    pub fn erase_all(&mut self) {
        self.cells.clear();
        self.col = 1;
    }

    /// Insert `n` default-styled blanks at the current column, shifting existing cells right.
    pub fn insert_blanks(&mut self, n: usize, style: Arc<StyleRecord>) {
        if n == 0 {
            return;
        }
        let start = (self.col - 1).min(self.cells.len());
        let blanks = std::iter::repeat_with(|| CharCell::blank(style.clone())).take(n);
        self.cells.splice(start..start, blanks);
    }

    fn insert_blanks_append(&mut self, n: usize, style: Arc<StyleRecord>) {
        if n == 0 {
            return;
        }
        self.cells.extend(std::iter::repeat_with(|| CharCell::blank(style.clone())).take(n));
    }

    /// Display width in terminal columns (grapheme-aware), ignoring zero-width cells.
    pub fn display_width(&self) -> usize {
        self.cells.iter().map(|c| c.ch.width()).sum()
    }

    /// Coalesce adjacent cells sharing the same interned style handle into rendered runs.
    pub fn runs(&self) -> Vec<StyledRun> {
        let mut out: Vec<StyledRun> = Vec::new();
        for cell in &self.cells {
            match out.last_mut() {
                Some(run) if Arc::ptr_eq(&run.style, &cell.style) => run.text.push_str(&cell.ch),
                _ => out.push(StyledRun { style: cell.style.clone(), text: cell.ch.clone() }),
            }
        }
        out
    }
}

impl Default for Line {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> Arc<StyleRecord> { Arc::new(StyleRecord::default_style()) }

    #[test]
    fn write_appends_and_advances() {
        let mut line = Line::new();
        line.write("hi", style(), true);
        assert_eq!(line.len(), 2);
        assert_eq!(line.col(), 3);
    }

    #[test]
    fn write_overwrites_in_place() {
        let mut line = Line::new();
        line.write("hello", style(), true);
        line.set_pos(1, style());
        line.write("HE", style(), true);
        let text: String = line.runs().iter().map(|r| r.text.clone()).collect();
        assert_eq!(text, "HEllo");
    }

    #[test]
    fn write_past_end_extends_with_blanks() {
        let mut line = Line::new();
        line.set_pos(3, style());
        line.write("x", style(), true);
        assert_eq!(line.len(), 3);
    }

    #[test]
    fn erase_to_right_from_middle() {
        let mut line = Line::new();
        line.write("hello", style(), true);
        line.set_pos(3, style());
        line.erase_to_right(None);
        let text: String = line.runs().iter().map(|r| r.text.clone()).collect();
        assert_eq!(text, "he");
    }

    #[test]
    fn erase_to_left_resets_column() {
        let mut line = Line::new();
        line.write("hello", style(), true);
        line.set_pos(3, style());
        line.erase_to_left();
        assert_eq!(line.col(), 1);
        let text: String = line.runs().iter().map(|r| r.text.clone()).collect();
        assert_eq!(text, "lo");
    }

    #[test]
    fn insert_blanks_shifts_right() {
        let mut line = Line::new();
        line.write("ac", style(), true);
        line.set_pos(2, style());
        line.insert_blanks(1, style());
        let text: String = line.runs().iter().map(|r| r.text.clone()).collect();
        assert_eq!(text, "a c");
    }

    #[test]
    fn adjacent_same_style_cells_coalesce_into_one_run() {
        let mut line = Line::new();
        let s = style();
        line.write("abc", s.clone(), true);
        assert_eq!(line.runs().len(), 1);
        assert_eq!(line.runs()[0].text, "abc");
    }

    #[test]
    fn grapheme_cluster_counts_as_one_cell() {
        let mut line = Line::new();
        line.write("a\u{0301}b", style(), true); // "á" (combining) + "b"
        assert_eq!(line.len(), 2);
    }
}
