/// Line that re-runs the previous command.
pub const REPEAT_LAST: &str = "!!";

/// One-slot memory of the last entered command, behind the `!!` shortcut.
///
/// Holds exactly the previous non-empty line (after `!!` substitution), or nothing
/// right after startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastCommand {
    line: Option<String>,
}

impl LastCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&str> {
        self.line.as_deref()
    }

    /// Resolve the line to run and remember it.
    ///
    /// `!!` is replaced by the remembered line. Returns `None`, leaving the slot
    /// untouched, when `!!` is entered with nothing remembered.
    pub fn expand(&mut self, line: &str) -> Option<String> {
        let line = if line.trim() == REPEAT_LAST {
            self.line.clone()?
        } else {
            line.to_owned()
        };
        self.line = Some(line.clone());
        Some(line)
    }
}
