use std::io::Read;

const ESC: u8 = 0x1b;
const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7f;

/// One classified keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Carriage return or newline.
    Terminate,
    /// DEL or BS.
    Backspace,
    /// `ESC [ D`.
    CursorLeft,
    /// `ESC [ C`.
    CursorRight,
    /// A byte in the printable ASCII range.
    Printable(char),
    /// Anything else, including unknown escape sequences.
    Ignored,
}

/// Turns a raw byte stream into [`InputEvent`]s, one blocking read at a time.
pub struct InputDecoder<R> {
    input: R,
}

impl<R: Read> InputDecoder<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    pub fn into_inner(self) -> R {
        self.input
    }

    /// Reads bytes until one full event is available.
    ///
    /// A failed or empty read of the leading byte is retried; the terminal is
    /// in blocking mode with `VMIN = 1`, so a read only comes back empty on a
    /// transient error. A lone ESC waits for its two trailing bytes.
    pub fn decode_one(&mut self) -> InputEvent {
        let byte = loop {
            if let Some(byte) = self.read_byte() {
                break byte;
            }
        };

        match byte {
            b'\r' | b'\n' => InputEvent::Terminate,
            DEL | BACKSPACE => InputEvent::Backspace,
            ESC => self.decode_escape(),
            0x20..=0x7e => InputEvent::Printable(byte as char),
            _ => InputEvent::Ignored,
        }
    }

    fn decode_escape(&mut self) -> InputEvent {
        let Some(first) = self.read_byte() else {
            return InputEvent::Ignored;
        };
        let Some(second) = self.read_byte() else {
            return InputEvent::Ignored;
        };
        match (first, second) {
            (b'[', b'D') => InputEvent::CursorLeft,
            (b'[', b'C') => InputEvent::CursorRight,
            _ => InputEvent::Ignored,
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.input.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}
