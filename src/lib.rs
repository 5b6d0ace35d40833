//! A small interactive command interpreter.
//!
//! A line typed at the prompt is tokenized, split on a single `|`, scanned for one
//! `>`, `>>` or `<` redirection and checked against the built-ins (`exit`, `cd`,
//! `help`). Everything else is launched as external programs: one child per command,
//! stdout wired to a file or to the next stage through a pipe, waited for unless the
//! line ends with `&`.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`] and [`env`]
//! expose the traits and the environment the interpreter works with; [`parser`]
//! exposes the parsed form of a command line.

mod builtin;
pub mod command;
pub mod env;
mod external;
mod history;
mod interpreter;
mod lexer;
pub mod parser;
mod process;
mod prompt;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::{Dispatch, Interpreter};

/// Serializes tests that change or depend on the process working directory.
#[cfg(test)]
pub(crate) fn lock_current_dir() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
