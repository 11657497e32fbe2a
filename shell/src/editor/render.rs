use super::buffer::LineBuffer;
use super::prompt::PromptText;
use std::io::{self, Write};
use tracing::trace;

const CLEAR_TO_EOL: &str = "\x1b[K";
const CURSOR_LEFT: &str = "\x1b[D";
const CURSOR_RIGHT: &str = "\x1b[C";

/// Keeps the terminal line in step with a [`LineBuffer`].
///
/// Every change to the contents repaints the whole line, so the screen can
/// never drift away from the buffer. Pure cursor moves are sent as single
/// column steps. All writes are flushed before returning.
pub struct Renderer<W> {
    out: W,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn show_prompt(&mut self, prompt: &PromptText) -> io::Result<()> {
        self.out.write_all(prompt.text().as_bytes())?;
        self.out.flush()
    }

    /// Emits `\r`, the prompt, `ESC[K`, the buffer and, when the cursor is not
    /// at the end, `ESC[<n>D` to walk back to it.
    pub fn redraw(&mut self, prompt: &PromptText, buffer: &LineBuffer) -> io::Result<()> {
        trace!(column = prompt.visible_len() + buffer.cursor(), "redraw");
        write!(
            self.out,
            "\r{}{CLEAR_TO_EOL}{}",
            prompt.text(),
            buffer.snapshot_text()
        )?;
        let trailing = buffer.trailing();
        if trailing > 0 {
            write!(self.out, "\x1b[{trailing}D")?;
        }
        self.out.flush()
    }

    pub fn cursor_left(&mut self) -> io::Result<()> {
        self.out.write_all(CURSOR_LEFT.as_bytes())?;
        self.out.flush()
    }

    pub fn cursor_right(&mut self) -> io::Result<()> {
        self.out.write_all(CURSOR_RIGHT.as_bytes())?;
        self.out.flush()
    }

    pub fn finish_line(&mut self) -> io::Result<()> {
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}
