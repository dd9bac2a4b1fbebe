//! Full-pipeline integration tests: raw bytes through `ByteStreamDecoder` into `ScreenDocument`,
//! then through `ViewProjector`. Each test below corresponds to one of the concrete byte-stream
//! scenarios this terminal emulator must reproduce exactly.

use floeterm::core::ansi::{ByteStreamDecoder, ControlOp, Token};
use floeterm::core::screen::{ScreenDocument, ScrollRequest, ViewProjector};

fn feed_all(doc: &mut ScreenDocument, decoder: &mut ByteStreamDecoder, bytes: &[u8]) {
    for token in decoder.feed(bytes, None) {
        doc.apply_token(token);
    }
}

fn row_text(doc: &ScreenDocument, row: usize) -> String {
    doc.rows()[row - 1].runs().iter().map(|r| r.text.clone()).collect()
}

#[test]
fn simple_text_and_color() {
    let mut decoder = ByteStreamDecoder::new();
    let mut doc = ScreenDocument::new(24);
    feed_all(&mut doc, &mut decoder, b"hello \x1b[31mworld\x1b[0m");

    let runs = doc.rows()[0].runs();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].text, "hello ");
    assert_eq!(runs[1].text, "world");
    assert_eq!(runs[1].style.fg.to_hex(), "#800000");
    assert_eq!(doc.cursor(), (1, 12));
}

#[test]
fn cr_lf_handling() {
    let mut decoder = ByteStreamDecoder::new();
    let mut doc = ScreenDocument::new(24);
    feed_all(&mut doc, &mut decoder, b"a\r\nb");

    assert_eq!(row_text(&doc, 1), "a");
    assert_eq!(row_text(&doc, 2), "b");
    assert_eq!(doc.cursor(), (2, 2));
}

#[test]
fn clear_and_home() {
    let mut decoder = ByteStreamDecoder::new();
    let mut doc = ScreenDocument::new(24);
    feed_all(&mut doc, &mut decoder, b"abc");
    feed_all(&mut doc, &mut decoder, b"\x1b[2J\x1b[H");

    assert_eq!(doc.rows().len(), 1);
    assert_eq!(row_text(&doc, 1), "");
    assert_eq!(doc.cursor(), (1, 1));
}

#[test]
fn alternate_buffer_round_trip() {
    let mut decoder = ByteStreamDecoder::new();
    let mut doc = ScreenDocument::new(24);
    feed_all(&mut doc, &mut decoder, b"line1\r\nline2");
    assert_eq!(doc.rows().len(), 2);

    feed_all(&mut doc, &mut decoder, b"\x1b[?1049h");
    assert_eq!(doc.rows().len(), 1);
    assert_eq!(row_text(&doc, 1), "");

    feed_all(&mut doc, &mut decoder, b"alt");
    assert_eq!(row_text(&doc, 1), "alt");

    feed_all(&mut doc, &mut decoder, b"\x1b[?1049l");
    assert_eq!(row_text(&doc, doc.rows().len()), "line2");
    assert!(doc.rows().iter().all(|l| {
        let text: String = l.runs().iter().map(|r| r.text.clone()).collect();
        text != "alt"
    }));
    assert_eq!(doc.cursor().0, doc.rows().len());
}

#[test]
fn chunked_csi_across_two_feeds() {
    let mut decoder = ByteStreamDecoder::new();
    let mut doc = ScreenDocument::new(24);

    let first = decoder.feed(b"\x1b[3", None);
    assert!(first.is_empty());

    let second = decoder.feed(b"1mX", None);
    assert_eq!(second, vec![Token::Ctrl(ControlOp::SetStyle("31".to_string())), Token::Plain("X".to_string())]);

    for token in second {
        doc.apply_token(token);
    }
    let runs = doc.rows()[0].runs();
    assert_eq!(runs.last().unwrap().text, "X");
    assert_eq!(runs.last().unwrap().style.fg.to_hex(), "#800000");
}

#[test]
fn scroll_region_rotation_keeps_bottom_rows_fixed_and_skips_history() {
    let mut decoder = ByteStreamDecoder::new();
    let mut doc = ScreenDocument::new(5);
    feed_all(&mut doc, &mut decoder, b"r1\r\nr2\r\nr3\r\nr4\r\nr5");
    feed_all(&mut doc, &mut decoder, b"\x1b[2;4r\x1b[4;1H");

    let before_row5 = row_text(&doc, 5);
    let history_len_before = doc.history().len();

    feed_all(&mut doc, &mut decoder, b"\n");

    assert_eq!(doc.history().len(), history_len_before);
    assert_eq!(row_text(&doc, 5), before_row5);
    assert_eq!(row_text(&doc, 4), "");
}

#[test]
fn save_and_restore_cursor_round_trip() {
    let mut decoder = ByteStreamDecoder::new();
    let mut doc = ScreenDocument::new(24);
    feed_all(&mut doc, &mut decoder, b"abc");
    let saved = doc.cursor();
    feed_all(&mut doc, &mut decoder, b"\x1b7");
    feed_all(&mut doc, &mut decoder, b"\r\nmore text here");
    feed_all(&mut doc, &mut decoder, b"\x1b8");
    assert_eq!(doc.cursor(), saved);
}

#[test]
fn decoder_chunking_matches_single_feed_for_non_echo_bytes() {
    let bytes = b"hello \x1b[31mworld\x1b[0m done";

    let mut whole = ByteStreamDecoder::new();
    let single_shot = whole.feed(bytes, None);

    let mut chunked = ByteStreamDecoder::new();
    let mut combined = Vec::new();
    for chunk in bytes.chunks(3) {
        combined.extend(chunked.feed(chunk, None));
    }

    assert_eq!(single_shot, combined);
}

#[test]
fn stick_to_bottom_view_tracks_most_recent_output() {
    let mut decoder = ByteStreamDecoder::new();
    let mut doc = ScreenDocument::new(2);
    feed_all(&mut doc, &mut decoder, b"a\r\nb\r\nc");

    let projection = ViewProjector::project(&mut doc).expect("content changed");
    assert_eq!(projection.lines.len(), 2);
    let last_line: String = projection.lines[1].iter().map(|r| r.text.clone()).collect();
    assert_eq!(last_line, "c");
}

#[test]
fn scrolling_up_then_back_down_restores_stick_to_bottom() {
    let mut decoder = ByteStreamDecoder::new();
    let mut doc = ScreenDocument::new(2);
    feed_all(&mut doc, &mut decoder, b"a\r\nb\r\nc");
    ViewProjector::project(&mut doc);

    doc.add_scroll_request(ScrollRequest::Move(-100));
    ViewProjector::project(&mut doc);
    assert!(!doc.is_stick_to_bottom());

    doc.add_scroll_request(ScrollRequest::Move(100));
    ViewProjector::project(&mut doc);
    assert!(doc.is_stick_to_bottom());
}
