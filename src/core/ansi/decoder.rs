//! Incremental tokenizer: segments an arbitrary byte stream into [`Token::Plain`] runs and
//! [`Token::Ctrl`] operations, holding back partial sequences across chunk boundaries.
//!
//! Two regexes do the work: one matches a control sequence still in progress at the tail of the
//! buffer (so `feed()` knows to keep buffering instead of scanning), the other matches every
//! complete token shape in priority order. Lone CR vs CRLF doesn't need a lookahead: ordering the
//! CRLF alternative first already gives the right leftmost-first result, since `regex`'s
//! alternation is priority-ordered the same way Perl/Python's backtracking engines are -- the CRLF
//! branch "wins" whenever it can complete, and the engine falls through to lone-CR only when it
//! can't.

use std::sync::LazyLock;

use regex::bytes::{Captures, Regex};

use super::token::{ControlOp, Token};
use super::utf8::IncrementalUtf8Decoder;

/// Suffix-matched against the last 30 bytes of the buffer. A match means the buffer's tail is a
/// control sequence still in progress, so `feed()` must keep buffering instead of scanning.
///
/// Both alternatives sit inside one outer non-capturing group before the trailing `$`, since
/// alternation binds looser than the anchor -- without the outer group the anchor applies only to
/// the `\x1b(?:...)?` branch, and the termcap-delay branch `\$(?:<\d*)?` would match a bare `$`
/// anywhere in the tail, including an ordinary shell prompt like `user@host:~$ `.
static INCOMPLETE_ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:(?:\$(?:<\d*)?)|(?:\x1b(?:\[[0-9;?>!"$']*|[#%()*+ ]|[P^_\]][^\x07\x1b\\]*)?))$"#,
    )
    .expect("INCOMPLETE_ANSI_RE must compile")
});

/// Every complete token shape this decoder recognizes, tried in priority order via named
/// alternation (first alternative that matches at a given position wins).
static COMPLETE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?P<termcap>\$<\d+>)|(?P<ascii1>[\x07\x08\x0b\x0c\x0e\x0f])|(?P<asciilf>\r*\n)|(?P<asciicr>\r+)|(?P<csi>\x1b\[(?P<csi_p>[0-9;?>!$"']*)(?P<csi_f>[@ABCDEFGHIJKLMPSTXZ`bcdfghilmnpqrstuvwxz{|]))|(?P<support_ses>\x1b[78=>DME])|(?P<ses>\x1b[HNOVWXZFclmno|}~])|(?P<esfc>\x1b[ #%()*+].)|(?P<osc>\x1b\].*?(?:\x1b\\|\x07))|(?P<dcs>\x1b[P^_].*?\x1b\\)"#,
    )
    .expect("COMPLETE_TOKEN_RE must compile")
});

fn parse_count(raw: &[u8]) -> u32 {
    if raw.is_empty() {
        return 1;
    }
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(1)
}

fn group_str(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
        .unwrap_or_default()
}

/// Incremental byte-stream tokenizer. One instance per SSH session; owns only its
/// not-yet-decodable tail (`buf`) and the UTF-8 resume state (`utf8`).
#[derive(Debug, Default)]
pub struct ByteStreamDecoder {
    buf: Vec<u8>,
    utf8: IncrementalUtf8Decoder,
}

impl ByteStreamDecoder {
    pub fn new() -> Self { Self::default() }

    /// Feed another chunk of raw bytes from the remote shell. `last_sent` is the most recent
    /// key/command the controller wrote to the remote shell; an exact echo of it is never
    /// withheld by the flush gate, even if it looks like a partial escape sequence.
    pub fn feed(&mut self, bytes: &[u8], last_sent: Option<&[u8]>) -> Vec<Token> {
        self.buf.extend_from_slice(bytes);

        let is_echo = last_sent == Some(bytes);
        if !is_echo {
            let tail_start = self.buf.len().saturating_sub(30);
            if INCOMPLETE_ANSI_RE.is_match(&self.buf[tail_start..]) {
                return Vec::new();
            }
        }

        let scan_buf = std::mem::take(&mut self.buf);
        let mut tokens = Vec::new();
        let mut last_end = 0;

        for caps in COMPLETE_TOKEN_RE.captures_iter(&scan_buf) {
            let whole = caps.get(0).expect("group 0 always present on a match");
            if whole.start() > last_end {
                self.push_plain(&scan_buf[last_end..whole.start()], &mut tokens);
            }
            last_end = whole.end();
            if let Some(tok) = Self::dispatch(&caps) {
                tokens.push(tok);
            }
        }

        if last_end < scan_buf.len() {
            self.push_plain(&scan_buf[last_end..], &mut tokens);
        }

        tokens
    }

    fn push_plain(&mut self, bytes: &[u8], tokens: &mut Vec<Token>) {
        let mut text = String::new();
        self.utf8.decode_into(bytes, &mut text);
        if !text.is_empty() {
            tokens.push(Token::Plain(text));
        }
    }

    fn dispatch(caps: &Captures<'_>) -> Option<Token> {
        use ControlOp::*;

        if caps.name("termcap").is_some() {
            return None;
        }

        if let Some(m) = caps.name("ascii1") {
            return match m.as_bytes()[0] {
                0x08 => Some(Token::Ctrl(Backspace)),
                0x0B | 0x0C => Some(Token::Ctrl(NextLine)),
                _ => None, // BEL, SO, SI
            };
        }

        if caps.name("asciilf").is_some() {
            return Some(Token::Ctrl(NextLine));
        }

        if caps.name("asciicr").is_some() {
            return Some(Token::Ctrl(Cr));
        }

        if caps.name("csi").is_some() {
            let params = group_str(caps, "csi_p");
            let final_byte = caps.name("csi_f").expect("csi match implies csi_f")
                .as_bytes()[0];
            return Self::dispatch_csi(final_byte, params);
        }

        if let Some(m) = caps.name("support_ses") {
            return match m.as_bytes()[1] {
                b'7' => Some(Token::Ctrl(SaveCursor)),
                b'8' => Some(Token::Ctrl(RestoreCursor)),
                b'=' => Some(Token::Ctrl(AppKeypadOn)),
                b'>' => Some(Token::Ctrl(AppKeypadOff)),
                b'D' => Some(Token::Ctrl(Index)),
                b'M' => Some(Token::Ctrl(ReverseIndex)),
                b'E' => Some(Token::Ctrl(NextLine)),
                _ => None,
            };
        }

        // `ses`, `esfc`, `osc`, `dcs`: recognized, always discarded.
        None
    }

    fn dispatch_csi(final_byte: u8, params: String) -> Option<Token> {
        use ControlOp::*;

        let n = || parse_count(params.as_bytes());
        match final_byte {
            b'A' => Some(Token::Ctrl(CursorUp(n()))),
            b'B' => Some(Token::Ctrl(CursorDown(n()))),
            b'C' => Some(Token::Ctrl(CursorRight(n()))),
            b'D' => Some(Token::Ctrl(CursorLeft(n()))),
            b'H' | b'f' => Some(Token::Ctrl(CursorTo(params))),
            b'K' => Some(Token::Ctrl(ClearLine(params))),
            b'J' => Some(Token::Ctrl(ClearScreen(params))),
            b'm' => Some(Token::Ctrl(SetStyle(params))),
            b'r' => Some(Token::Ctrl(SetScrollRegion(params))),
            b'P' => Some(Token::Ctrl(DeleteChars(n()))),
            b'L' => Some(Token::Ctrl(InsertLines(n()))),
            b'@' => Some(Token::Ctrl(InsertBlanks(n()))),
            b'l' => Some(Token::Ctrl(DecReset(params))),
            b'h' => Some(Token::Ctrl(DecSet(params))),
            _ => {
                tracing::trace!(final_byte = final_byte as char, "dropping unhandled CSI final");
                None
            }
        }
    }
}
