//! An interactive command shell with its own raw-mode line editor.
//!
//! The [`editor`] module reads one line from a terminal in non-canonical,
//! non-echoing mode and repaints it after every keystroke. The line is then
//! split into words, `$NAME` references are expanded, and the [`Interpreter`]
//! runs either a built-in (`cd`, `pwd`, `export`, `exit`) or an external
//! program found on `PATH`.

mod builtin;
pub mod command;
pub mod editor;
pub mod env;
mod external;
mod interpreter;
pub mod lexer;

pub use editor::{EditorError, LineEditor, PromptText};
pub use interpreter::{Interpreter, session_prompt};
