//! Render-ready projection of a [`ScreenDocument`]: visible lines, cursor, and scrollbar metrics.
//!
//! Stateless by design -- all the state it folds (`window_bottom`, `stick_to_bottom`, the queued
//! scroll requests) lives on the document itself, since the UI thread posts to those fields
//! directly while the owning task runs the rest of `apply_token`.

use super::cell::StyledRun;
use super::document::ScreenDocument;

/// A scroll request queued by the UI, either relative (mouse wheel) or absolute (scrollbar drag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollRequest {
    Move(i64),
    StartLine(usize),
}

/// One rendered line: its coalesced style runs.
pub type RenderedLine = Vec<StyledRun>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub total: usize,
    pub visible: usize,
    pub first_visible: usize,
    pub hide: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub lines: Vec<RenderedLine>,
    pub cursor: Option<(usize, usize)>,
    pub scroll: ScrollMetrics,
}

/// Stateless projector: computes a [`Projection`] from a document's current content and queued
/// scroll requests, or `None` if nothing changed since the last call.
pub struct ViewProjector;

impl ViewProjector {
    /// Returns `None` when neither scroll requests nor content changed since the last call.
    pub fn project(doc: &mut ScreenDocument) -> Option<Projection> {
        let scroll_reqs = doc.take_scroll_requests();
        let content_changed = doc.take_dirty();
        if scroll_reqs.is_empty() && !content_changed {
            return None;
        }

        let row_count = doc.rows().len();
        let history_count = doc.history().len();
        let total = history_count + row_count;
        let max_row = doc.max_row();

        if !scroll_reqs.is_empty() {
            Self::fold_scroll_requests(doc, &scroll_reqs, total, max_row);
        }

        let lines = if doc.is_stick_to_bottom() {
            doc.set_window_bottom(total);
            Self::slice_stick_to_bottom(doc, row_count, history_count, max_row)
        } else {
            Self::slice_windowed(doc, history_count, max_row)
        };

        let cursor = if doc.is_stick_to_bottom() { Some(doc.cursor()) } else { None };

        Some(Projection {
            lines,
            cursor,
            scroll: ScrollMetrics {
                total,
                visible: total.min(max_row),
                first_visible: (doc.window_bottom() + 1).saturating_sub(max_row).max(1),
                hide: total <= max_row,
            },
        })
    }

    fn fold_scroll_requests(
        doc: &mut ScreenDocument,
        reqs: &[ScrollRequest],
        total: usize,
        max_row: usize,
    ) {
        if total <= max_row {
            doc.set_stick_to_bottom(true);
            doc.set_window_bottom(total);
            return;
        }

        let mut moved = doc.window_bottom();
        for req in reqs {
            match *req {
                ScrollRequest::Move(delta) => {
                    moved = (moved as i64 + delta).max(0) as usize;
                }
                ScrollRequest::StartLine(start) => {
                    moved = (start + max_row - 1).min(total);
                }
            }
        }
        Self::update_window_bottom(doc, moved, total, max_row);
    }

    fn update_window_bottom(doc: &mut ScreenDocument, new_bottom: usize, total: usize, max_row: usize) {
        if new_bottom >= total {
            doc.set_window_bottom(total);
            doc.set_stick_to_bottom(true);
            return;
        }
        doc.set_stick_to_bottom(false);
        doc.set_window_bottom(new_bottom.max(max_row));
    }

    fn slice_stick_to_bottom(
        doc: &ScreenDocument,
        row_count: usize,
        history_count: usize,
        max_row: usize,
    ) -> Vec<RenderedLine> {
        if doc.alt_buffer_on() {
            return doc.rows().iter().map(|l| l.runs()).collect();
        }
        let history_want = max_row.saturating_sub(row_count);
        if history_want > 0 && history_want <= history_count {
            let tail = &doc.history()[history_count - history_want..];
            let mut out: Vec<RenderedLine> = tail.iter().map(|l| l.runs()).collect();
            out.extend(doc.rows().iter().map(|l| l.runs()));
            return out;
        }
        doc.rows().iter().map(|l| l.runs()).collect()
    }

    fn slice_windowed(doc: &ScreenDocument, history_count: usize, max_row: usize) -> Vec<RenderedLine> {
        let window_bottom = doc.window_bottom();
        if window_bottom <= history_count {
            let end = window_bottom;
            let start = end.saturating_sub(max_row);
            return doc.history()[start..end].iter().map(|l| l.runs()).collect();
        }

        let row_count = window_bottom - history_count;
        let history_want = max_row.saturating_sub(row_count);
        let mut out: Vec<RenderedLine> = if history_want > 0 {
            let start = history_count.saturating_sub(history_want);
            doc.history()[start..].iter().map(|l| l.runs()).collect()
        } else {
            Vec::new()
        };
        out.extend(doc.rows()[..row_count.min(doc.rows().len())].iter().map(|l| l.runs()));
        out
    }
}
