use std::collections::TryReserveError;

/// The line being edited together with the logical cursor position.
///
/// The cursor is a character offset in `[0, len]`. Every operation keeps it
/// inside that range; moves and deletions at the bounds are silent no-ops and
/// report `false` so the caller knows nothing has to be repainted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    contents: Vec<char>,
    cursor: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of columns between the cursor and the end of the line.
    pub fn trailing(&self) -> usize {
        self.contents.len() - self.cursor
    }

    /// Inserts `ch` at the cursor and advances the cursor past it.
    ///
    /// Growth goes through `try_reserve`, so a refused allocation comes back as
    /// an error instead of aborting while the terminal is still in raw mode.
    pub fn insert(&mut self, ch: char) -> Result<(), TryReserveError> {
        self.contents.try_reserve(1)?;
        self.contents.insert(self.cursor, ch);
        self.cursor += 1;
        Ok(())
    }

    pub fn delete_before_cursor(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.contents.remove(self.cursor);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor == self.contents.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn snapshot_text(&self) -> String {
        self.contents.iter().collect()
    }

    /// Consumes the buffer and returns the finished line.
    pub fn finish(self) -> String {
        self.contents.into_iter().collect()
    }
}
