use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::AsFd;
use tracing::{debug, warn};

/// Get/set access to a terminal's attributes.
///
/// The line editor only talks to the terminal through this trait, so the
/// mode handling can be driven by a fake in tests.
pub trait TerminalControl {
    type Mode: Clone;

    fn get_mode(&self) -> nix::Result<Self::Mode>;

    fn set_mode(&self, mode: &Self::Mode) -> nix::Result<()>;

    /// Derives the non-canonical, non-echoing mode from `original`.
    fn raw_from(&self, original: &Self::Mode) -> Self::Mode;
}

/// A terminal reached through a file descriptor, usually stdin.
pub struct FdTerminal<F> {
    fd: F,
}

impl<F: AsFd> FdTerminal<F> {
    pub fn new(fd: F) -> Self {
        Self { fd }
    }
}

impl FdTerminal<std::io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin())
    }
}

impl<F: AsFd> TerminalControl for FdTerminal<F> {
    type Mode = Termios;

    fn get_mode(&self) -> nix::Result<Termios> {
        termios::tcgetattr(self.fd.as_fd())
    }

    fn set_mode(&self, mode: &Termios) -> nix::Result<()> {
        termios::tcsetattr(self.fd.as_fd(), SetArg::TCSAFLUSH, mode)
    }

    fn raw_from(&self, original: &Termios) -> Termios {
        let mut raw = original.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        raw
    }
}

/// Unbuffered input read straight from a descriptor.
///
/// Every `read` is a single `read(2)` for at most the requested bytes, so
/// anything typed or piped ahead stays queued in the kernel for the next line
/// or for a child process that inherits the descriptor.
pub struct FdInput {
    file: File,
}

impl FdInput {
    /// Duplicates fd 0. Dropping the result closes only the duplicate.
    pub fn stdin() -> io::Result<Self> {
        let fd = io::stdin().as_fd().try_clone_to_owned()?;
        Ok(Self::from(File::from(fd)))
    }

    pub fn into_inner(self) -> File {
        self.file
    }
}

impl From<File> for FdInput {
    fn from(file: File) -> Self {
        Self { file }
    }
}

impl Read for FdInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Holds a terminal in raw mode until it is restored or dropped.
///
/// The attributes captured on entry are put back exactly once: either through
/// [`RawModeGuard::restore`], which reports failure, or by `Drop` on any other
/// exit path, which can only log it.
pub struct RawModeGuard<'t, T: TerminalControl> {
    terminal: &'t T,
    original: Option<T::Mode>,
}

impl<'t, T: TerminalControl> RawModeGuard<'t, T> {
    pub fn enter(terminal: &'t T) -> nix::Result<Self> {
        let original = terminal.get_mode()?;
        let raw = terminal.raw_from(&original);
        if let Err(err) = terminal.set_mode(&raw) {
            // The set may have been applied partially.
            if let Err(restore_err) = terminal.set_mode(&original) {
                warn!(%restore_err, "could not restore terminal after failed raw mode switch");
            }
            return Err(err);
        }
        debug!("terminal switched to raw mode");
        Ok(Self {
            terminal,
            original: Some(original),
        })
    }

    pub fn restore(mut self) -> nix::Result<()> {
        match self.original.take() {
            Some(original) => {
                self.terminal.set_mode(&original)?;
                debug!("terminal mode restored");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<T: TerminalControl> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            match self.terminal.set_mode(&original) {
                Ok(()) => debug!("terminal mode restored on early exit"),
                Err(err) => warn!(%err, "could not restore terminal mode"),
            }
        }
    }
}


#[cfg(test)]
pub(crate) fn scratch_input(tag: &str, bytes: &[u8]) -> FdInput {
    let path = std::env::temp_dir().join(format!("line_shell_input_{}_{tag}", std::process::id()));
    std::fs::write(&path, bytes).unwrap();
    let file = File::open(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    FdInput::from(file)
}
