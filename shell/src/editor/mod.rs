//! Raw-mode line editing.
//!
//! [`LineEditor::read_line`] switches the terminal into non-canonical,
//! non-echoing mode, decodes keystrokes into [`InputEvent`]s, applies them to a
//! [`LineBuffer`] and repaints the line after every change. The terminal mode
//! is put back before the call returns, whichever way it returns.

mod buffer;
mod decoder;
mod prompt;
mod render;
mod terminal;

pub use buffer::LineBuffer;
pub use decoder::{InputDecoder, InputEvent};
pub use prompt::PromptText;
pub use render::Renderer;
pub use terminal::{FdInput, FdTerminal, RawModeGuard, TerminalControl};

use std::collections::TryReserveError;
use std::io::{self, Read, Write};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("cannot change terminal mode: {0}")]
    TerminalMode(#[from] nix::Error),
    #[error("line buffer allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
    #[error("cannot write to terminal: {0}")]
    Output(#[from] io::Error),
}

/// Reads single lines from a terminal under raw mode.
pub struct LineEditor<T> {
    terminal: T,
}

impl<T: TerminalControl> LineEditor<T> {
    pub fn new(terminal: T) -> Self {
        Self { terminal }
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// Shows `prompt`, edits until CR or LF, and returns the line without its
    /// terminator. A newline is written once the terminal mode is restored.
    pub fn read_line<R: Read, W: Write>(
        &mut self,
        prompt: &PromptText,
        input: R,
        output: W,
    ) -> Result<String, EditorError> {
        let guard = RawModeGuard::enter(&self.terminal)?;
        let mut decoder = InputDecoder::new(input);
        let mut renderer = Renderer::new(output);
        let mut buffer = LineBuffer::new();

        renderer.show_prompt(prompt)?;
        debug!("line editing started");

        loop {
            let event = decoder.decode_one();
            trace!(?event, cursor = buffer.cursor(), "input event");
            match event {
                InputEvent::Terminate => break,
                InputEvent::Backspace => {
                    if buffer.delete_before_cursor() {
                        renderer.redraw(prompt, &buffer)?;
                    }
                }
                InputEvent::CursorLeft => {
                    if buffer.move_left() {
                        renderer.cursor_left()?;
                    }
                }
                InputEvent::CursorRight => {
                    if buffer.move_right() {
                        renderer.cursor_right()?;
                    }
                }
                InputEvent::Printable(ch) => {
                    buffer.insert(ch)?;
                    renderer.redraw(prompt, &buffer)?;
                }
                InputEvent::Ignored => {}
            }
        }

        guard.restore()?;
        renderer.finish_line()?;
        debug!(len = buffer.len(), "line editing finished");
        Ok(buffer.finish())
    }
}
