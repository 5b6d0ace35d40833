//! Splitting of a single command stage into whitespace-delimited words.

/// Marker that, as the last word of a stage, sends the command to the background.
pub const BACKGROUND_MARKER: &str = "&";

/// Words of one command stage after tokenization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    /// The words in input order, without empty entries and without a trailing `&`.
    pub words: Vec<String>,
    /// Set when the stage ended with a standalone `&`.
    pub background: bool,
}

impl Tokens {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// The main entry point of the tokenizer.
///
/// Splits `line` on whitespace, skipping empty words. If the final word is exactly
/// `&` it is removed and [`Tokens::background`] is set. A blank line produces no
/// words, so callers must check [`Tokens::is_empty`] before looking at the first one.
///
/// # Arguments
/// * `line` - one stage of a command line (no pipe characters are interpreted here).
pub fn split_into_tokens(line: &str) -> Tokens {
    let mut words: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
    let background = words.last().is_some_and(|w| w == BACKGROUND_MARKER);
    if background {
        words.pop();
    }
    Tokens { words, background }
}
