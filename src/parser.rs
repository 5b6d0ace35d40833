//! Turning a raw input line into an owned [`CommandLine`].
//!
//! The grammar is deliberately small: one command, optionally followed by a single
//! redirection, or two commands joined by `|`, optionally ending in `&`.

use crate::lexer::{self, Tokens};
use std::path::PathBuf;
use thiserror::Error;

/// Character separating the two stages of a pipeline.
pub const PIPE: char = '|';

/// A single external program invocation: `argv[0]` is the program, the rest its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    argv: Vec<String>,
}

impl SimpleCommand {
    /// Wrap a non-empty argument vector.
    pub fn new(argv: Vec<String>) -> Result<Self, ParseError> {
        if argv.is_empty() {
            return Err(ParseError::EmptyCommand);
        }
        Ok(Self { argv })
    }

    /// Program name followed by its arguments.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// The program name (`argv[0]`).
    pub fn name(&self) -> &str {
        &self.argv[0]
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}

/// Kind of redirection
///
/// Defines which standard stream of the child is rebound and how the file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// Input redirection (`<`): standard input is read from the file.
    Input,
    /// Output redirection (`>`): standard output goes to the file, **truncating** it first.
    Output,
    /// Output redirection with append (`>>`): standard output is **appended** to the file.
    Append,
}

/// One redirection attached to a simple command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub target: PathBuf,
}

/// Structural classification of a parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// A program run with the interpreter's own standard streams.
    Simple(SimpleCommand),
    /// A program with standard input or output bound to a file.
    Redirected(SimpleCommand, Redirect),
    /// Two programs, the first one's stdout feeding the second one's stdin.
    Piped(SimpleCommand, SimpleCommand),
}

/// A fully parsed, non-empty command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub shape: Shape,
    /// Whether the line ended with `&`.
    pub background: bool,
}

impl CommandLine {
    /// The command whose name decides built-in dispatch (the first stage for pipelines).
    pub fn first(&self) -> &SimpleCommand {
        match &self.shape {
            Shape::Simple(cmd) | Shape::Redirected(cmd, _) | Shape::Piped(cmd, _) => cmd,
        }
    }
}

/// Errors that can occur while parsing a command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A `>`, `>>` or `<` marker was the last word of the command.
    #[error("missing file name after redirection `{0}`")]
    MissingRedirectTarget(String),
    /// One side of a `|` had no words.
    #[error("empty command in pipeline")]
    EmptyStage,
    /// The line had words but no program name (e.g. `> out.txt` or a lone `&`).
    #[error("missing command")]
    EmptyCommand,
}

/// Splits `line` at the first pipe character.
///
/// Returns `None` when there is no pipe. The second half ends at the next pipe
/// character; anything after it is dropped, since pipelines longer than two stages
/// are not supported.
pub fn split_pipe(line: &str) -> Option<(&str, &str)> {
    let (left, rest) = line.split_once(PIPE)?;
    let right = match rest.split_once(PIPE) {
        Some((right, dropped)) => {
            log::warn!("only two pipeline stages are supported, ignoring `|{}`", dropped);
            right
        }
        None => rest,
    };
    Some((left, right))
}

/// Removes the first redirection from `words` and returns it.
///
/// A word starting with `>>` selects append mode, any other word starting with `>`
/// selects truncating output and a word starting with `<` selects input. The word
/// after the marker names the file. The marker and everything after it are cut from
/// `words`; only one redirection per command is recognised.
pub fn take_redirect(words: &mut Vec<String>) -> Result<Option<Redirect>, ParseError> {
    let Some(pos) = words
        .iter()
        .position(|w| w.starts_with('>') || w.starts_with('<'))
    else {
        return Ok(None);
    };

    let marker = &words[pos];
    let kind = if marker.starts_with(">>") {
        RedirectKind::Append
    } else if marker.starts_with('>') {
        RedirectKind::Output
    } else {
        RedirectKind::Input
    };

    let target = match words.get(pos + 1) {
        Some(target) => PathBuf::from(target),
        None => return Err(ParseError::MissingRedirectTarget(marker.clone())),
    };

    if words.len() > pos + 2 {
        log::warn!(
            "ignoring words after redirection target: {}",
            words[pos + 2..].join(" ")
        );
    }
    words.truncate(pos);

    Ok(Some(Redirect { kind, target }))
}

/// Parses a raw input line.
///
/// Returns `Ok(None)` for a blank line. Pipelines are split first and each half is
/// tokenized on its own; only the trailing `&` of the second half backgrounds the
/// pipeline. Redirections are only recognised on lines without a pipe.
pub fn parse_line(line: &str) -> Result<Option<CommandLine>, ParseError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    if let Some((left, right)) = split_pipe(line) {
        let first = lexer::split_into_tokens(left);
        let second = lexer::split_into_tokens(right);
        if first.is_empty() || second.is_empty() {
            return Err(ParseError::EmptyStage);
        }
        if first.background {
            log::warn!("`&` before `|` has no effect; background the whole pipeline instead");
        }
        return Ok(Some(CommandLine {
            shape: Shape::Piped(
                SimpleCommand::new(first.words)?,
                SimpleCommand::new(second.words)?,
            ),
            background: second.background,
        }));
    }

    let Tokens {
        mut words,
        background,
    } = lexer::split_into_tokens(line);
    let redirect = take_redirect(&mut words)?;
    let cmd = SimpleCommand::new(words)?;
    let shape = match redirect {
        Some(redirect) => Shape::Redirected(cmd, redirect),
        None => Shape::Simple(cmd),
    };
    Ok(Some(CommandLine { shape, background }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(v: &[&str]) -> SimpleCommand {
        SimpleCommand {
            argv: v.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn parse(line: &str) -> CommandLine {
        parse_line(line).unwrap().expect("non-empty line")
    }

    #[test]
    fn test_simple_command_keeps_all_words() {
        let parsed = parse("ls -l -a /usr");
        assert_eq!(parsed.shape, Shape::Simple(cmd(&["ls", "-l", "-a", "/usr"])));
        assert!(!parsed.background);
    }

    #[test]
    fn test_simple_command_in_background() {
        let parsed = parse("sleep 10 &");
        assert_eq!(parsed.shape, Shape::Simple(cmd(&["sleep", "10"])));
        assert!(parsed.background);
    }

    #[test]
    fn test_blank_line_is_none() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line(" \t ").unwrap(), None);
    }

    #[test]
    fn test_lone_ampersand_is_missing_command() {
        assert_eq!(parse_line("&"), Err(ParseError::EmptyCommand));
    }

    #[test]
    fn test_pipe_splits_into_two_stages() {
        let parsed = parse("ls | wc -l");
        assert_eq!(parsed.shape, Shape::Piped(cmd(&["ls"]), cmd(&["wc", "-l"])));
        assert!(!parsed.background);
    }

    #[test]
    fn test_pipe_without_spaces() {
        let parsed = parse("ls|wc");
        assert_eq!(parsed.shape, Shape::Piped(cmd(&["ls"]), cmd(&["wc"])));
    }

    #[test]
    fn test_stages_after_the_second_are_dropped() {
        let parsed = parse("a | b | c");
        assert_eq!(parsed.shape, Shape::Piped(cmd(&["a"]), cmd(&["b"])));

        let parsed = parse("echo x | cat | wc -l");
        assert_eq!(parsed.shape, Shape::Piped(cmd(&["echo", "x"]), cmd(&["cat"])));
    }

    #[test]
    fn test_split_pipe_keeps_text_between_first_two_pipes() {
        assert_eq!(split_pipe("ls"), None);
        assert_eq!(split_pipe("ls | wc"), Some(("ls ", " wc")));
        assert_eq!(split_pipe("a|b|c|d"), Some(("a", "b")));
    }

    #[test]
    fn test_background_after_dropped_stage_is_ignored() {
        assert!(!parse("a | b | c &").background);
    }

    #[test]
    fn test_argv_accessor_includes_program_name() {
        let parsed = parse("grep -n main");
        let expected: Vec<String> = ["grep", "-n", "main"].iter().map(|s| s.to_string()).collect();
        assert_eq!(parsed.first().argv(), expected.as_slice());
        assert_eq!(SimpleCommand::new(Vec::new()), Err(ParseError::EmptyCommand));
    }

    #[test]
    fn test_pipeline_background_comes_from_last_stage() {
        assert!(parse("yes | head -n 1 &").background);

        let parsed = parse("yes & | head -n 1");
        assert!(!parsed.background);
        assert_eq!(parsed.shape, Shape::Piped(cmd(&["yes"]), cmd(&["head", "-n", "1"])));
    }

    #[test]
    fn test_empty_pipeline_stage_is_error() {
        assert_eq!(parse_line("ls |"), Err(ParseError::EmptyStage));
        assert_eq!(parse_line("| wc"), Err(ParseError::EmptyStage));
    }

    #[test]
    fn test_output_redirect() {
        let parsed = parse("echo hi > out.txt");
        assert_eq!(
            parsed.shape,
            Shape::Redirected(
                cmd(&["echo", "hi"]),
                Redirect {
                    kind: RedirectKind::Output,
                    target: PathBuf::from("out.txt"),
                }
            )
        );
    }

    #[test]
    fn test_append_and_input_redirects() {
        match parse("echo more >> log.txt").shape {
            Shape::Redirected(c, r) => {
                assert_eq!(c, cmd(&["echo", "more"]));
                assert_eq!(r.kind, RedirectKind::Append);
                assert_eq!(r.target, PathBuf::from("log.txt"));
            }
            other => panic!("expected redirect, got {:?}", other),
        }
        match parse("sort < names.txt").shape {
            Shape::Redirected(c, r) => {
                assert_eq!(c, cmd(&["sort"]));
                assert_eq!(r.kind, RedirectKind::Input);
            }
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[test]
    fn test_redirect_with_background() {
        let parsed = parse("echo hi > out.txt &");
        assert!(parsed.background);
        assert!(matches!(parsed.shape, Shape::Redirected(_, _)));
    }

    #[test]
    fn test_first_redirect_wins_and_rest_is_dropped() {
        let mut words: Vec<String> = ["cat", "<", "in.txt", ">", "out.txt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let redirect = take_redirect(&mut words).unwrap().unwrap();
        assert_eq!(redirect.kind, RedirectKind::Input);
        assert_eq!(redirect.target, PathBuf::from("in.txt"));
        assert_eq!(words, vec!["cat".to_string()]);
    }

    #[test]
    fn test_missing_redirect_target() {
        assert_eq!(
            parse_line("echo hi >"),
            Err(ParseError::MissingRedirectTarget(">".to_string()))
        );
    }

    #[test]
    fn test_redirect_without_command() {
        assert_eq!(parse_line("> out.txt"), Err(ParseError::EmptyCommand));
    }

    #[test]
    fn test_stderr_redirect_is_a_plain_word() {
        let parsed = parse("make 2> err.txt");
        assert_eq!(parsed.shape, Shape::Simple(cmd(&["make", "2>", "err.txt"])));
    }

    #[test]
    fn test_redirects_are_not_parsed_inside_pipelines() {
        let parsed = parse("ls | wc > out");
        assert_eq!(parsed.shape, Shape::Piped(cmd(&["ls"]), cmd(&["wc", ">", "out"])));
    }

    #[test]
    fn test_first_returns_dispatch_command() {
        assert_eq!(parse("cd /tmp | wc").first().name(), "cd");
        assert_eq!(parse("echo a b").first().args(), &["a".to_string(), "b".to_string()]);
    }
}
