//! Key-to-byte translation table, ported from `InputHandler.handle_key_event`: the UI reports a
//! logical key press, the router turns it into the exact bytes to write to the remote shell.

/// A logical key press from the UI, already stripped of platform-specific modifier quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Tab,
    Escape,
    Up,
    Down,
    Left,
    Right,
    /// Ctrl+A .. Ctrl+Z, stored as the letter (`'a'..='z'`, case-insensitive).
    Ctrl(char),
    /// Any literal printable character (already composed, e.g. a whole grapheme).
    Printable(char),
}

impl Key {
    /// The literal bytes this key produces on the wire.
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            Key::Enter => b"\n".to_vec(),
            Key::Backspace => b"\x7f".to_vec(),
            Key::Tab => b"\t".to_vec(),
            Key::Escape => b"\x1b".to_vec(),
            Key::Up => b"\x1b[A".to_vec(),
            Key::Down => b"\x1b[B".to_vec(),
            Key::Left => b"\x1b[D".to_vec(),
            Key::Right => b"\x1b[C".to_vec(),
            Key::Ctrl(c) => {
                let lower = c.to_ascii_lowercase();
                if lower.is_ascii_lowercase() {
                    vec![(lower as u8) - b'a' + 1]
                } else {
                    Vec::new()
                }
            }
            Key::Printable(c) => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf).as_bytes().to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_is_newline() {
        assert_eq!(Key::Enter.to_bytes(), b"\n");
    }

    #[test]
    fn arrow_keys_are_csi_sequences() {
        assert_eq!(Key::Up.to_bytes(), b"\x1b[A");
        assert_eq!(Key::Down.to_bytes(), b"\x1b[B");
        assert_eq!(Key::Left.to_bytes(), b"\x1b[D");
        assert_eq!(Key::Right.to_bytes(), b"\x1b[C");
    }

    #[test]
    fn ctrl_a_through_z_map_to_0x01_through_0x1a() {
        assert_eq!(Key::Ctrl('a').to_bytes(), vec![0x01]);
        assert_eq!(Key::Ctrl('A').to_bytes(), vec![0x01]);
        assert_eq!(Key::Ctrl('z').to_bytes(), vec![0x1a]);
    }

    #[test]
    fn printable_is_literal_utf8() {
        assert_eq!(Key::Printable('x').to_bytes(), b"x");
        assert_eq!(Key::Printable('\u{e9}').to_bytes(), "\u{e9}".as_bytes());
    }
}
