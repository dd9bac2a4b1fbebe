//! Incremental UTF-8 decoder.
//!
//! Resumes a multi-byte code point across `feed()` calls rather than requiring each chunk to be
//! self-contained. A small hand-rolled decoder following RFC 3629, holding back an in-progress
//! sequence between calls and emitting U+FFFD for anything that turns out to be malformed.

/// Decoder state carried across `feed()` calls so a multi-byte code point split across two reads
/// decodes correctly instead of being replaced twice.
#[derive(Debug, Default, Clone)]
pub struct IncrementalUtf8Decoder {
    /// Bytes of an in-progress multi-byte sequence collected so far.
    pending: Vec<u8>,
    /// Total length the in-progress sequence is expected to have, once known.
    expected_len: usize,
}

impl IncrementalUtf8Decoder {
    pub fn new() -> Self { Self::default() }

    /// Decode as much of `bytes` as forms complete UTF-8 sequences, appending the result to
    /// `out`. Any trailing partial sequence is buffered for the next call. Malformed bytes are
    /// replaced with U+FFFD immediately (rather than held back), matching `errors='replace'`.
    pub fn decode_into(&mut self, bytes: &[u8], out: &mut String) {
        let mut input = bytes;

        if !self.pending.is_empty() {
            let need = self.expected_len - self.pending.len();
            let take = need.min(input.len());
            self.pending.extend_from_slice(&input[..take]);
            input = &input[take..];

            if self.pending.len() == self.expected_len {
                Self::push_sequence(&std::mem::take(&mut self.pending), out);
                self.expected_len = 0;
            } else {
                // Still incomplete; wait for more bytes.
                return;
            }
        }

        let mut i = 0;
        while i < input.len() {
            let b = input[i];
            if b < 0x80 {
                out.push(b as char);
                i += 1;
                continue;
            }

            let seq_len = match b {
                0xC2..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF4 => 4,
                _ => {
                    tracing::trace!(byte = b, "malformed utf8 lead byte, emitting replacement char");
                    out.push('\u{FFFD}');
                    i += 1;
                    continue;
                }
            };

            let available = input.len() - i;
            if available < seq_len {
                // Sequence crosses the end of this chunk -- hold it back.
                self.pending = input[i..].to_vec();
                self.expected_len = seq_len;
                return;
            }

            Self::push_sequence(&input[i..i + seq_len], out);
            i += seq_len;
        }
    }

    fn push_sequence(seq: &[u8], out: &mut String) {
        match std::str::from_utf8(seq) {
            Ok(s) => out.push_str(s),
            Err(_) => {
                tracing::trace!(?seq, "malformed utf8 sequence, emitting replacement char");
                out.push('\u{FFFD}');
            }
        }
    }
}
