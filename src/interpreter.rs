use crate::command::{CommandFactory, ExitCode, Stdout};
use crate::env::Environment;
use crate::history::LastCommand;
use crate::parser::{self, CommandLine};
use crate::process::{self, Jobs};
use crate::prompt;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the built-ins defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Outcome of [`Interpreter::dispatch`].
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Blank line, nothing to do.
    Empty,
    /// A built-in already ran in-process with this exit code; no external exec needed.
    Builtin(ExitCode),
    /// External programs must be launched; the shape tells simple, redirected or piped.
    External(CommandLine),
}

/// An interactive command interpreter that runs built-ins in-process and launches
/// external programs, alone, redirected or as a two-stage pipeline.
///
/// Example
/// ```no_run
/// use simple_shell::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.execute_line("echo hello world", Box::new(std::io::stdout())).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    builtins: Vec<Box<dyn CommandFactory>>,
    last: LastCommand,
    jobs: Jobs,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of built-in factories.
    pub fn new(builtins: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            builtins,
            last: LastCommand::new(),
            jobs: Jobs::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// The prompt for the next line, e.g. `[@alice]:~/src$ `.
    pub fn prompt(&self) -> String {
        let user = self.env.user();
        let home = self.env.home_dir();
        prompt::render(user.as_deref(), &self.env.current_dir, home.as_deref())
    }

    /// Parse `line` and run it if it names a built-in.
    ///
    /// The built-in check looks at the first command only, so `cd /tmp | wc` changes
    /// directory and launches nothing. Built-in output goes to `stdout`.
    pub fn dispatch(&mut self, line: &str, stdout: &mut dyn Write) -> anyhow::Result<Dispatch> {
        let Some(cmd) = parser::parse_line(line)? else {
            return Ok(Dispatch::Empty);
        };

        let first = cmd.first();
        let args: Vec<&str> = first.args().iter().map(String::as_str).collect();
        for factory in &self.builtins {
            if let Some(builtin) = factory.try_create(first.name(), &args) {
                log::debug!("running built-in {}", first.name());
                let code = builtin.execute(stdout, &mut self.env)?;
                return Ok(Dispatch::Builtin(code));
            }
        }
        Ok(Dispatch::External(cmd))
    }

    /// Dispatch and execute one line, waiting for it unless it is backgrounded.
    ///
    /// Returns the exit code of the built-in or of the last program.
    pub fn execute_line(
        &mut self,
        line: &str,
        mut stdout: Box<dyn Stdout>,
    ) -> anyhow::Result<ExitCode> {
        match self.dispatch(line, &mut stdout)? {
            Dispatch::Empty => Ok(0),
            Dispatch::Builtin(code) => Ok(code),
            Dispatch::External(cmd) => {
                process::launch(&cmd, line.trim(), &self.env, stdout, &mut self.jobs)
            }
        }
    }

    /// Handle one line as typed at the prompt: blank lines are ignored, `!!` is
    /// replaced by the last command, and the result is remembered and executed.
    ///
    /// Returns `None` when nothing ran.
    pub fn handle_input(
        &mut self,
        line: &str,
        mut stdout: Box<dyn Stdout>,
    ) -> anyhow::Result<Option<ExitCode>> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        let Some(line) = self.last.expand(line) else {
            writeln!(stdout, "No command in history!")?;
            return Ok(None);
        };
        self.execute_line(&line, stdout).map(Some)
    }

    /// Reap finished background jobs and print a notice for each.
    pub fn reap_jobs(&mut self, out: &mut dyn Write) -> io::Result<()> {
        for job in self.jobs.reap() {
            writeln!(out, "[{}] Done ({})\t{}", job.pid, job.code, job.line)?;
        }
        Ok(())
    }

    /// The Read-Eval-Print Loop.
    ///
    /// Runs until `exit` or end of input. `Ctrl-C` discards the current line.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.should_exit() {
            self.reap_jobs(&mut io::stdout())?;
            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str())?;
                    if let Err(err) = self.handle_input(&line, Box::new(io::stdout())) {
                        println!("{:#}", err);
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        self.reap_jobs(&mut io::stdout())?;
        if !self.jobs.is_empty() {
            log::info!("leaving {} background job(s) running", self.jobs.len());
        }
        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the built-ins `exit`, `cd` and `help`.
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Help>::default()),
        ])
    }
}
