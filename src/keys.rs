use std::io::Read;

/// A decoded key press. One value per read, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    CtrlC,
    CtrlN,
    CtrlP,
    CtrlU,
    CtrlW,
    Esc,
    /// Unrecognized byte or escape sequence; callers ignore it.
    Unknown,
    /// The input stream ended.
    Eof,
}

/// Byte stream the decoder reads keys from. `byte_pending` is a bounded
/// availability check used after a lead ESC: the rest of a sequence arrives
/// in the same burst, so nothing pending means the user pressed the Escape
/// key itself rather than started a sequence.
pub trait KeyInput: Read {
    fn byte_pending(&mut self) -> bool;
}

#[cfg(test)]
impl KeyInput for std::io::Cursor<Vec<u8>> {
    fn byte_pending(&mut self) -> bool {
        (self.position() as usize) < self.get_ref().len()
    }
}

/// Blocking read of the next key from a raw-mode byte stream.
pub fn read_key(input: &mut impl KeyInput) -> Key {
    let Some(byte) = read_byte(input) else {
        return Key::Eof;
    };
    match byte {
        0x1b => read_escape(input),
        0x0d | 0x0a => Key::Enter,
        0x7f | 0x08 => Key::Backspace,
        0x03 => Key::CtrlC,
        0x0e => Key::CtrlN,
        0x10 => Key::CtrlP,
        0x15 => Key::CtrlU,
        0x17 => Key::CtrlW,
        0x20..=0x7e => Key::Char(byte as char),
        _ => Key::Unknown,
    }
}

fn read_escape(input: &mut impl KeyInput) -> Key {
    if !input.byte_pending() {
        return Key::Esc;
    }
    match read_byte(input) {
        None => Key::Esc,
        Some(b'[') => read_csi(input),
        // SS3 function keys (ESC O P..S) carry one final byte.
        Some(b'O') => {
            read_byte(input);
            Key::Unknown
        }
        Some(_) => Key::Unknown,
    }
}

// Consumes one whole CSI sequence: parameter/intermediate bytes up to a
// final byte in 0x40-0x7E. ESC [ A/B/C/D are the arrow keys and ESC [ 3 ~
// is Delete; everything else is unknown, but its tail is still consumed so
// stray bytes never reach the input buffer as typed characters.
fn read_csi(input: &mut impl KeyInput) -> Key {
    let mut params: Vec<u8> = Vec::new();
    loop {
        match read_byte(input) {
            None => return Key::Unknown,
            Some(byte) if (0x40..=0x7e).contains(&byte) => {
                return match (params.as_slice(), byte) {
                    ([], b'A') => Key::Up,
                    ([], b'B') => Key::Down,
                    ([], b'C') => Key::Right,
                    ([], b'D') => Key::Left,
                    ([b'3'], b'~') => Key::Delete,
                    _ => Key::Unknown,
                };
            }
            Some(byte) => params.push(byte),
        }
    }
}

fn read_byte(input: &mut impl Read) -> Option<u8> {
    let mut buf = [0u8; 1];
    match input.read(&mut buf) {
        Ok(1) => Some(buf[0]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn keys_of(bytes: &[u8]) -> Vec<Key> {
        let mut cursor = Cursor::new(bytes.to_vec());
        let mut out = Vec::new();
        loop {
            let key = read_key(&mut cursor);
            if key == Key::Eof {
                return out;
            }
            out.push(key);
        }
    }

    #[test]
    fn printable_ascii_decodes_to_chars() {
        assert_eq!(
            keys_of(b"ab Z"),
            vec![
                Key::Char('a'),
                Key::Char('b'),
                Key::Char(' '),
                Key::Char('Z')
            ]
        );
    }

    #[test]
    fn control_bytes_map_to_named_keys() {
        assert_eq!(
            keys_of(&[0x03, 0x0e, 0x10, 0x15, 0x17, 0x0d, 0x0a, 0x7f, 0x08]),
            vec![
                Key::CtrlC,
                Key::CtrlN,
                Key::CtrlP,
                Key::CtrlU,
                Key::CtrlW,
                Key::Enter,
                Key::Enter,
                Key::Backspace,
                Key::Backspace
            ]
        );
    }

    #[test]
    fn arrow_sequences_decode() {
        assert_eq!(
            keys_of(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![Key::Up, Key::Down, Key::Right, Key::Left]
        );
    }

    #[test]
    fn delete_sequence_consumes_tilde() {
        assert_eq!(keys_of(b"\x1b[3~x"), vec![Key::Delete, Key::Char('x')]);
    }

    #[test]
    fn lone_escape_at_end_of_stream_is_esc() {
        assert_eq!(keys_of(b"\x1b"), vec![Key::Esc]);
    }

    #[test]
    fn unknown_sequences_are_not_errors() {
        assert_eq!(keys_of(b"\x1b[Z"), vec![Key::Unknown]);
        assert_eq!(keys_of(b"\x1bq"), vec![Key::Unknown]);
        assert_eq!(keys_of(&[0x01]), vec![Key::Unknown]);
    }

    #[test]
    fn unrecognized_csi_is_consumed_through_its_final_byte() {
        // PgUp is ESC [ 5 ~ ; the trailing tilde must not surface as input.
        assert_eq!(keys_of(b"\x1b[5~"), vec![Key::Unknown]);
        assert_eq!(keys_of(b"\x1b[5~x"), vec![Key::Unknown, Key::Char('x')]);
        // Modified arrows carry parameters and a non-tilde final byte.
        assert_eq!(keys_of(b"\x1b[1;5Ax"), vec![Key::Unknown, Key::Char('x')]);
        // Modified Delete is not plain Delete, but is still one sequence.
        assert_eq!(keys_of(b"\x1b[3;5~x"), vec![Key::Unknown, Key::Char('x')]);
    }

    #[test]
    fn ss3_function_keys_are_consumed_whole() {
        assert_eq!(keys_of(b"\x1bOPx"), vec![Key::Unknown, Key::Char('x')]);
    }

    #[test]
    fn non_ascii_bytes_are_ignored() {
        assert_eq!(keys_of(&[0xc3, 0xa9]), vec![Key::Unknown, Key::Unknown]);
    }
}
