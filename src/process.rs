//! Spawning, wiring and waiting for the external programs of a command line.
//!
//! Every command becomes exactly one child. Foreground lines are waited for before
//! returning; background lines are handed to [`Jobs`] and reaped later.

use crate::command::{ExitCode, Stdout};
use crate::env::Environment;
use crate::external::{self, ExternalCommand};
use crate::parser::{CommandLine, Redirect, RedirectKind, Shape};
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::process::{Child, ExitStatus, Stdio};

/// A background command line whose children have not all been reaped yet.
#[derive(Debug)]
struct Job {
    pid: u32,
    line: String,
    /// Unreaped children, tagged with their stage index.
    children: Vec<(usize, Child)>,
    /// Exit code per stage, filled in as children are reaped.
    codes: Vec<Option<ExitCode>>,
}

/// A background job that has finished since the last [`Jobs::reap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedJob {
    /// Pid of the job's first child.
    pub pid: u32,
    pub line: String,
    /// Exit code of the job's last stage, or -1 if it could not be collected.
    pub code: ExitCode,
}

/// Background children still owned by the interpreter.
#[derive(Debug, Default)]
pub struct Jobs {
    running: Vec<Job>,
}

impl Jobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs not yet reaped.
    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    fn add(&mut self, line: &str, children: Vec<Child>) {
        if children.is_empty() {
            return;
        }
        let pid = children[0].id();
        log::info!("[{}] {} running in background", pid, line);
        self.running.push(Job {
            pid,
            line: line.to_owned(),
            codes: vec![None; children.len()],
            children: children.into_iter().enumerate().collect(),
        });
    }

    /// Collects every child that has exited, without blocking.
    ///
    /// Returns the jobs whose children have all exited; they are no longer tracked.
    pub fn reap(&mut self) -> Vec<FinishedJob> {
        let mut finished = Vec::new();
        self.running.retain_mut(|job| {
            let mut remaining = Vec::with_capacity(job.children.len());
            for (stage, mut child) in job.children.drain(..) {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        log::debug!("reaped background child {}", child.id());
                        job.codes[stage] = Some(external::exit_code(status));
                    }
                    Ok(None) => remaining.push((stage, child)),
                    Err(e) => {
                        // Nothing more can be learned about this child.
                        log::warn!("failed to poll child {}: {}", child.id(), e);
                    }
                }
            }
            job.children = remaining;
            if job.children.is_empty() {
                finished.push(FinishedJob {
                    pid: job.pid,
                    line: std::mem::take(&mut job.line),
                    code: job.codes.last().copied().flatten().unwrap_or(-1),
                });
                false
            } else {
                true
            }
        });
        finished
    }
}

/// Launch the programs of `cmd` and, unless it is backgrounded, wait for them.
///
/// `stdout` is the sink for the standard output of the last program when it is not
/// redirected to a file. `text` is the line as typed, kept for job notices.
/// A backgrounded line returns 0 immediately.
pub fn launch(
    cmd: &CommandLine,
    text: &str,
    env: &Environment,
    stdout: Box<dyn Stdout>,
    jobs: &mut Jobs,
) -> Result<ExitCode> {
    let children = match &cmd.shape {
        Shape::Simple(simple) => {
            let ext = ExternalCommand::resolve(env, simple)?;
            vec![spawn(&ext, env, Stdio::inherit(), stdout.stdio())?]
        }
        Shape::Redirected(simple, redirect) => {
            let ext = ExternalCommand::resolve(env, simple)?;
            let file = open_redirect(env, redirect)?;
            let (stdin, out) = match redirect.kind {
                RedirectKind::Input => (Stdio::from(file), stdout.stdio()),
                RedirectKind::Output | RedirectKind::Append => {
                    (Stdio::inherit(), Stdio::from(file))
                }
            };
            vec![spawn(&ext, env, stdin, out)?]
        }
        Shape::Piped(first, second) => {
            let first = ExternalCommand::resolve(env, first)?;
            let second = ExternalCommand::resolve(env, second)?;
            spawn_pipeline(&first, &second, env, stdout, cmd.background, text, jobs)?
        }
    };

    if cmd.background {
        jobs.add(text, children);
        Ok(0)
    } else {
        wait_all(children)
    }
}

fn spawn(ext: &ExternalCommand, env: &Environment, stdin: Stdio, stdout: Stdio) -> Result<Child> {
    let child = ext
        .command(env)
        .stdin(stdin)
        .stdout(stdout)
        .spawn()
        .with_context(|| format!("Could not execute command {}", ext.name()))?;
    log::debug!("spawned {} as pid {}", ext.name(), child.id());
    Ok(child)
}

/// Both stages are spawned before anything is waited on. The parent's handles to the
/// pipe are moved into the children's `Stdio`, so no copy of either end stays open here.
fn spawn_pipeline(
    first: &ExternalCommand,
    second: &ExternalCommand,
    env: &Environment,
    stdout: Box<dyn Stdout>,
    background: bool,
    text: &str,
    jobs: &mut Jobs,
) -> Result<Vec<Child>> {
    let mut writer = spawn(first, env, Stdio::inherit(), Stdio::piped())?;
    let pipe = writer
        .stdout
        .take()
        .context("pipeline: first stage has no output pipe")?;

    match spawn(second, env, Stdio::from(pipe), stdout.stdio()) {
        Ok(reader) => Ok(vec![writer, reader]),
        Err(e) => {
            // The read end is gone, so the first stage sees a broken pipe and exits.
            if background {
                jobs.add(text, vec![writer]);
            } else if let Err(wait_err) = writer.wait() {
                log::warn!("failed to wait for {}: {}", first.name(), wait_err);
            }
            Err(e)
        }
    }
}

fn open_redirect(env: &Environment, redirect: &Redirect) -> Result<File> {
    let path = env.current_dir.join(&redirect.target);
    let file = match redirect.kind {
        RedirectKind::Input => File::open(&path),
        RedirectKind::Output => output_options().truncate(true).open(&path),
        RedirectKind::Append => output_options().append(true).open(&path),
    };
    file.with_context(|| format!("Could not open {}", redirect.target.display()))
}

fn output_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options
}

/// Waits for every child in order and returns the exit code of the last one.
fn wait_all(children: Vec<Child>) -> Result<ExitCode> {
    wait_each(children, Child::wait)
}

/// A failed wait does not stop the remaining children from being waited for; the
/// first such error is returned once all of them are done.
fn wait_each<F>(children: Vec<Child>, mut wait: F) -> Result<ExitCode>
where
    F: FnMut(&mut Child) -> io::Result<ExitStatus>,
{
    let mut last = 0;
    let mut first_err = None;
    for mut child in children {
        let pid = child.id();
        match wait(&mut child).with_context(|| format!("failed to wait for child {}", pid)) {
            Ok(status) => {
                last = external::exit_code(status);
                log::debug!("child {} exited with {}", pid, last);
            }
            Err(e) => {
                log::warn!("{:#}", e);
                first_err.get_or_insert(e);
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(last),
    }
}
