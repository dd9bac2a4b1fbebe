//! Cursor-addressable screen buffer: primary/alternate buffers, scrollback, scroll regions, and
//! the full complement of CSI cursor/edit operations driven by [`Token`].
//!
//! Line lookups are bounds-checked and silently no-op when the cursor row has drifted outside the
//! current row count (e.g. immediately after a full-screen clear, before the application resends
//! a cursor-position command) -- mirroring the guarded-lookup style used throughout this module
//! rather than treating a transient out-of-range row as an error.

use std::sync::{Arc, Mutex};

use super::super::ansi::style::{default_handle, StyleEngine, StyleRecord};
use super::super::ansi::token::{ControlOp, Token};
use super::cell::Line;
use super::view::ScrollRequest;

fn expand_tabs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut col = 0usize;
    for ch in text.chars() {
        if ch == '\t' {
            let spaces = 8 - (col % 8);
            out.extend(std::iter::repeat(' ').take(spaces));
            col += spaces;
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}

fn parse_two(param: &str) -> Option<(usize, usize)> {
    let mut parts = param.splitn(2, ';');
    let a = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    Some((a, b))
}

/// A cursor-addressable terminal screen with scrollback and alternate-buffer support.
#[derive(Debug)]
pub struct ScreenDocument {
    max_row: usize,
    rows: Vec<Line>,
    history: Vec<Line>,
    /// Lines moved into `history` on entering the alternate buffer; popped back out exactly on
    /// exit so a further `history` push during alt mode (e.g. a session-failure banner) can't
    /// shift which lines come back.
    alt_history: Vec<Line>,
    row: usize,
    saved_cursor: Option<(usize, usize)>,
    scroll_region: Option<(usize, usize)>,
    alt_buffer_on: bool,
    bracketed_paste_marker: bool,
    style_engine: StyleEngine,
    dirty: bool,
    window_bottom: usize,
    stick_to_bottom: Mutex<bool>,
    scroll_reqs: Mutex<Vec<ScrollRequest>>,
}

impl ScreenDocument {
    pub fn new(max_row: usize) -> Self {
        Self {
            max_row,
            rows: vec![Line::new()],
            history: Vec::new(),
            alt_history: Vec::new(),
            row: 1,
            saved_cursor: None,
            scroll_region: None,
            alt_buffer_on: false,
            bracketed_paste_marker: false,
            style_engine: StyleEngine::new(),
            dirty: false,
            window_bottom: 1,
            stick_to_bottom: Mutex::new(true),
            scroll_reqs: Mutex::new(Vec::new()),
        }
    }

    // -- read-only accessors used by the view projector and tests --

    pub fn max_row(&self) -> usize { self.max_row }
    pub fn alt_buffer_on(&self) -> bool { self.alt_buffer_on }
    pub fn total_lines(&self) -> usize { self.history.len() + self.rows.len() }
    pub fn history(&self) -> &[Line] { &self.history }
    pub fn rows(&self) -> &[Line] { &self.rows }
    pub fn window_bottom(&self) -> usize { self.window_bottom }
    pub fn set_window_bottom(&mut self, value: usize) { self.window_bottom = value; }
    pub fn take_dirty(&mut self) -> bool { std::mem::replace(&mut self.dirty, false) }

    pub fn is_stick_to_bottom(&self) -> bool {
        *self.stick_to_bottom.lock().expect("stick_to_bottom lock poisoned")
    }

    pub fn set_stick_to_bottom(&self, value: bool) {
        *self.stick_to_bottom.lock().expect("stick_to_bottom lock poisoned") = value;
    }

    pub fn add_scroll_request(&self, req: ScrollRequest) {
        self.scroll_reqs.lock().expect("scroll_reqs lock poisoned").push(req);
    }

    pub fn take_scroll_requests(&self) -> Vec<ScrollRequest> {
        std::mem::take(&mut *self.scroll_reqs.lock().expect("scroll_reqs lock poisoned"))
    }

    pub fn cursor(&self) -> (usize, usize) {
        let col = self.current_line().map(Line::col).unwrap_or(1);
        (self.row, col)
    }

    fn get_line(&self, row: usize) -> Option<&Line> {
        if (1..=self.rows.len()).contains(&row) { self.rows.get(row - 1) } else { None }
    }

    fn get_line_mut(&mut self, row: usize) -> Option<&mut Line> {
        if (1..=self.rows.len()).contains(&row) { self.rows.get_mut(row - 1) } else { None }
    }

    fn current_line(&self) -> Option<&Line> { self.get_line(self.row) }
    fn current_line_mut(&mut self) -> Option<&mut Line> { self.get_line_mut(self.row) }

    fn blank_style() -> Arc<StyleRecord> { default_handle() }

    /// Apply one decoded token to the document, marking it dirty.
    pub fn apply_token(&mut self, token: Token) {
        match token {
            Token::Plain(text) => self.insert_plain_string(&text),
            Token::Ctrl(op) => self.apply_ctrl(op),
        }
        self.dirty = true;
    }

    fn apply_ctrl(&mut self, op: ControlOp) {
        use ControlOp::*;
        match op {
            Cr => self.handle_carriage_return(),
            NextLine => self.move_to_start_of_next_line(),
            Backspace => self.move_cursor_left(1),
            SaveCursor => self.store_cursor(),
            RestoreCursor => self.restore_cursor(),
            AppKeypadOn => {}
            AppKeypadOff => self.scroll_region = None,
            ReverseIndex => self.reverse_index(),
            Index => self.index(),
            CursorUp(n) => self.move_cursor_up(n),
            CursorDown(n) => self.move_cursor_down(n),
            CursorLeft(n) => self.move_cursor_left(n),
            CursorRight(n) => self.move_cursor_right(n),
            CursorTo(p) => self.handle_cursor_to(&p),
            ClearLine(p) => self.handle_clear_line(&p),
            ClearScreen(p) => self.handle_clear_screen(&p),
            SetStyle(p) => self.style_engine.update(&p),
            SetScrollRegion(p) => self.set_scroll_region(&p),
            DeleteChars(n) => self.delete_chars(n),
            InsertLines(n) => self.insert_lines(n),
            InsertBlanks(n) => self.insert_blanks(n),
            DecSet(p) => self.handle_dec_set(&p),
            DecReset(p) => self.handle_dec_reset(&p),
        }
    }

    /// Grow `rows` until `row` is a valid index, move the cursor there, and position the line's
    /// own write column, extending it with blanks if needed.
    fn set_cursor_pos(&mut self, row: usize, col: usize) {
        while self.get_line(row).is_none() {
            self.rows.push(Line::new());
        }
        self.row = row;
        let style = Self::blank_style();
        if let Some(line) = self.current_line_mut() {
            line.set_pos(col, style);
        }
    }

    fn insert_plain_string(&mut self, text: &str) {
        let style = self.style_engine.current();
        let expanded;
        let to_write: &str = if text.contains('\t') {
            expanded = expand_tabs(text);
            &expanded
        } else {
            text
        };
        if let Some(line) = self.current_line_mut() {
            line.write(to_write, style, true);
        }
    }

    /// Write a diagnostic line (e.g. a disconnect notice) through the same pipeline as remote
    /// output, so it appears in-band in the scrollback.
    pub fn insert_session_fail_msg(&mut self, text: &str) {
        self.move_to_start_of_next_line();
        self.style_engine.update("0");
        self.style_engine.update("31;1");
        self.insert_plain_string(text);
        self.style_engine.update("0");
        self.move_to_start_of_next_line();
        self.dirty = true;
    }

    fn handle_carriage_return(&mut self) {
        self.set_cursor_pos(self.row, 1);
    }

    fn store_cursor(&mut self) {
        self.saved_cursor = Some(self.cursor());
    }

    fn restore_cursor(&mut self) {
        if let Some((row, col)) = self.saved_cursor {
            self.set_cursor_pos(row, col);
        }
    }

    fn handle_clear_line(&mut self, param: &str) {
        let Some(line) = self.current_line_mut() else { return };
        match param {
            "" | "0" => line.erase_to_right(None),
            "1" => line.erase_to_left(),
            "2" => line.erase_all(),
            _ => {}
        }
    }

    fn handle_clear_screen(&mut self, param: &str) {
        if self.current_line().is_none() {
            return;
        }
        match param {
            "" | "0" => {
                if let Some(line) = self.current_line_mut() {
                    line.erase_to_right(None);
                }
                self.rows.truncate(self.row);
            }
            "1" => {
                if let Some(line) = self.current_line_mut() {
                    line.erase_to_left();
                }
                self.rows.drain(0..self.row - 1);
            }
            "2" => {
                if self.bracketed_paste_marker {
                    if self.rows.len() > 1 {
                        let keep_last = self.rows.len() - 1;
                        self.history.extend(self.rows.drain(..keep_last));
                    }
                    self.bracketed_paste_marker = false;
                }
                self.rows = vec![Line::new()];
            }
            "3" => {
                self.history.clear();
                self.rows = vec![Line::new()];
            }
            _ => {}
        }
    }

    fn set_scroll_region(&mut self, param: &str) {
        if param.is_empty() {
            self.scroll_region = Some((1, self.max_row));
            return;
        }
        if let Some((top, bottom)) = parse_two(param) {
            self.scroll_region = Some((top, bottom));
        }
    }

    fn handle_cursor_to(&mut self, param: &str) {
        let normalized = match param {
            "" | "0" | "1" | "0;1" | "1;0" => "1;1",
            other => other,
        };
        let (row, col) = parse_two(normalized).unwrap_or((1, 1));
        self.set_cursor_pos(row.max(1), col.max(1));
        self.flush_view();
    }

    fn move_cursor_up(&mut self, n: u32) {
        let (row, col) = self.cursor();
        self.set_cursor_pos(row.saturating_sub(n as usize).max(1), col);
    }

    fn move_cursor_down(&mut self, n: u32) {
        let (row, col) = self.cursor();
        self.set_cursor_pos((row + n as usize).min(self.max_row), col);
    }

    fn move_cursor_left(&mut self, n: u32) {
        let style = Self::blank_style();
        if let Some(line) = self.current_line_mut() {
            line.move_pos(-(n as isize), true, style);
        }
    }

    fn move_cursor_right(&mut self, n: u32) {
        let style = Self::blank_style();
        if let Some(line) = self.current_line_mut() {
            line.move_pos(n as isize, true, style);
        }
    }

    /// `ESC E` / `\r*\n` / VT / FF -- move to the start of the next line, rotating the scroll
    /// region when the cursor sits on its bottom row.
    fn move_to_start_of_next_line(&mut self) {
        if self.rotate_scroll_region_if_at_bottom() {
            self.set_cursor_pos(self.row, 1);
            return;
        }
        self.set_cursor_pos(self.row + 1, 1);
        self.flush_view();
    }

    /// `ESC D` -- like [`Self::move_to_start_of_next_line`] but preserves the current column.
    fn index(&mut self) {
        let (_, col) = self.cursor();
        if self.rotate_scroll_region_if_at_bottom() {
            self.set_cursor_pos(self.row, col);
            return;
        }
        self.set_cursor_pos(self.row + 1, col);
        self.flush_view();
    }

    fn rotate_scroll_region_if_at_bottom(&mut self) -> bool {
        let Some((top, bottom)) = self.scroll_region else { return false };
        if bottom != self.row {
            return false;
        }
        if (1..=self.rows.len()).contains(&top) {
            self.rows.remove(top - 1);
        }
        let insert_at = (self.row - 1).min(self.rows.len());
        self.rows.insert(insert_at, Line::new());
        true
    }

    fn reverse_index(&mut self) {
        let (top, bottom) = self.scroll_region.unwrap_or((1, self.max_row));
        if (1..=self.rows.len()).contains(&bottom) {
            self.rows.remove(bottom - 1);
        }
        let insert_at = (top - 1).min(self.rows.len());
        self.rows.insert(insert_at, Line::new());
    }

    fn insert_lines(&mut self, n: u32) {
        let (top, bottom) = self.scroll_region.unwrap_or((1, self.max_row));
        if !(top..=bottom).contains(&self.row) {
            return;
        }
        for _ in 0..n {
            if self.get_line(bottom).is_some() {
                self.rows.remove(bottom - 1);
            }
            let insert_at = (self.row - 1).min(self.rows.len());
            self.rows.insert(insert_at, Line::new());
        }
    }

    fn insert_blanks(&mut self, n: u32) {
        let style = Self::blank_style();
        if let Some(line) = self.current_line_mut() {
            line.insert_blanks(n as usize, style);
        }
    }

    fn delete_chars(&mut self, n: u32) {
        if let Some(line) = self.current_line_mut() {
            line.erase_to_right(Some(n as usize));
        }
    }

    fn handle_dec_set(&mut self, param: &str) {
        if matches!(param, "?1049" | "?47" | "?1047") {
            self.alt_buffer_on = true;
            let moved = std::mem::replace(&mut self.rows, vec![Line::new()]);
            self.history.extend(moved.iter().cloned());
            self.alt_history = moved;
            self.row = 1;
        }
    }

    fn handle_dec_reset(&mut self, param: &str) {
        if matches!(param, "?1049" | "?47" | "?1047") && self.alt_buffer_on {
            self.alt_buffer_on = false;
            let moved = std::mem::take(&mut self.alt_history);
            let pop_count = moved.len().min(self.history.len());
            let restored = self.history.split_off(self.history.len() - pop_count);
            let mut rows = if restored.len() > self.max_row {
                restored[restored.len() - self.max_row..].to_vec()
            } else {
                restored
            };
            if rows.is_empty() {
                rows.push(Line::new());
            }
            self.row = rows.len();
            self.rows = rows;
        }

        if param == "?2004" {
            self.bracketed_paste_marker = true;
        }
    }

    /// Pop rows beyond `max_row` into `history` (or discard them in alt-buffer mode), adjusting
    /// cursor and saved-cursor rows to track the shift.
    fn flush_view(&mut self) {
        while self.rows.len() > self.max_row {
            let (row, col) = self.cursor();
            if self.alt_buffer_on {
                self.rows.remove(0);
            } else {
                let popped = self.rows.remove(0);
                self.history.push(popped);
            }
            self.set_cursor_pos(row.saturating_sub(1).max(1), col);
            if let Some((backup_row, backup_col)) = self.saved_cursor {
                self.saved_cursor = Some((backup_row.saturating_sub(1).max(1), backup_col));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(doc: &ScreenDocument, row: usize) -> String {
        doc.rows()[row - 1].runs().iter().map(|r| r.text.clone()).collect()
    }

    #[test]
    fn writing_plain_text_advances_cursor() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Plain("hello".into()));
        assert_eq!(doc.cursor(), (1, 6));
        assert_eq!(line_text(&doc, 1), "hello");
    }

    #[test]
    fn carriage_return_resets_column_only() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Plain("abc".into()));
        doc.apply_token(Token::Ctrl(ControlOp::Cr));
        assert_eq!(doc.cursor(), (1, 1));
    }

    #[test]
    fn nextline_advances_row_and_resets_column() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Plain("abc".into()));
        doc.apply_token(Token::Ctrl(ControlOp::NextLine));
        assert_eq!(doc.cursor(), (2, 1));
        assert_eq!(doc.rows().len(), 2);
    }

    #[test]
    fn scrollback_flushes_oldest_row_into_history() {
        let mut doc = ScreenDocument::new(2);
        doc.apply_token(Token::Plain("a".into()));
        doc.apply_token(Token::Ctrl(ControlOp::NextLine));
        doc.apply_token(Token::Plain("b".into()));
        doc.apply_token(Token::Ctrl(ControlOp::NextLine));
        doc.apply_token(Token::Plain("c".into()));
        assert_eq!(doc.rows().len(), 2);
        assert_eq!(doc.history().len(), 1);
        assert_eq!(doc.total_lines(), 3);
    }

    #[test]
    fn cursor_to_grows_rows_and_flushes() {
        let mut doc = ScreenDocument::new(3);
        doc.apply_token(Token::Ctrl(ControlOp::CursorTo("5;1".into())));
        assert_eq!(doc.rows().len(), 3);
        assert_eq!(doc.cursor().0, 3);
        assert_eq!(doc.history().len(), 2);
    }

    #[test]
    fn clear_screen_2j_replaces_rows() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Plain("hello".into()));
        doc.apply_token(Token::Ctrl(ControlOp::ClearScreen("2".into())));
        assert_eq!(doc.rows().len(), 1);
        assert_eq!(line_text(&doc, 1), "");
    }

    #[test]
    fn alt_buffer_round_trip_restores_primary_rows() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Plain("primary".into()));
        doc.apply_token(Token::Ctrl(ControlOp::DecSet("?1049".into())));
        assert!(doc.alt_buffer_on());
        assert_eq!(doc.rows().len(), 1);

        doc.apply_token(Token::Plain("secondary screen".into()));
        doc.apply_token(Token::Ctrl(ControlOp::DecReset("?1049".into())));

        assert!(!doc.alt_buffer_on());
        assert_eq!(doc.rows().len(), 1);
        assert_eq!(line_text(&doc, 1), "primary");
    }

    #[test]
    fn save_and_restore_cursor() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Plain("abc".into()));
        doc.apply_token(Token::Ctrl(ControlOp::SaveCursor));
        doc.apply_token(Token::Ctrl(ControlOp::CursorTo("10;1".into())));
        doc.apply_token(Token::Ctrl(ControlOp::RestoreCursor));
        assert_eq!(doc.cursor(), (1, 4));
    }

    #[test]
    fn scroll_region_rotation_on_nextline_at_bottom() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Ctrl(ControlOp::SetScrollRegion("1;3".into())));
        doc.apply_token(Token::Ctrl(ControlOp::CursorTo("3;1".into())));
        doc.apply_token(Token::Plain("bottom".into()));
        doc.apply_token(Token::Ctrl(ControlOp::NextLine));
        // Row 1 rotated out, a fresh blank line inserted at row 3; cursor stays on row 3.
        assert_eq!(doc.cursor(), (3, 1));
        assert_eq!(line_text(&doc, 3), "");
    }

    #[test]
    fn insert_session_fail_msg_appends_in_band() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Plain("prompt$ ".into()));
        doc.insert_session_fail_msg("connection lost");
        assert_eq!(line_text(&doc, 2), "connection lost");
    }

    #[test]
    fn delete_chars_removes_at_cursor() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Plain("abcdef".into()));
        doc.apply_token(Token::Ctrl(ControlOp::CursorTo("1;2".into())));
        doc.apply_token(Token::Ctrl(ControlOp::DeleteChars(2)));
        assert_eq!(line_text(&doc, 1), "adef");
    }

    #[test]
    fn insert_blanks_shifts_cells_right() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Plain("ac".into()));
        doc.apply_token(Token::Ctrl(ControlOp::CursorTo("1;2".into())));
        doc.apply_token(Token::Ctrl(ControlOp::InsertBlanks(1)));
        assert_eq!(line_text(&doc, 1), "a c");
    }

    #[test]
    fn bracketed_paste_then_clear_screen_pushes_history() {
        let mut doc = ScreenDocument::new(24);
        doc.apply_token(Token::Ctrl(ControlOp::DecReset("?2004".into())));
        doc.apply_token(Token::Plain("a".into()));
        doc.apply_token(Token::Ctrl(ControlOp::NextLine));
        doc.apply_token(Token::Plain("b".into()));
        doc.apply_token(Token::Ctrl(ControlOp::ClearScreen("2".into())));
        assert_eq!(doc.history().len(), 1);
        assert_eq!(doc.rows().len(), 1);
    }
}
