//! Terminal sessions that receive test commands
//!
//! The session controller only needs two things from a terminal: make sure
//! it is running, and type a line into it. `ShellTerminal` keeps one shell
//! process alive across runs and starts a new one once the old one has
//! exited. Every command runs with its stdin detached from the shell's, so a
//! prompt inside a test run cannot swallow the commands queued behind it.
//! `EchoTerminal` prints the line instead of running it.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use miette::Diagnostic;
use thiserror::Error;

/// Errors from driving a terminal session.
#[derive(Debug, Error, Diagnostic)]
pub enum TerminalError {
    #[error("failed to start terminal shell `{program}`: {source}")]
    #[diagnostic(code(djtest::terminal::spawn), help("the terminal needs a POSIX `sh` (or `cmd` on Windows) on PATH"))]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to send command to terminal: {0}")]
    #[diagnostic(code(djtest::terminal::send))]
    Send(#[source] io::Error),

    #[error("failed to wait for terminal shell: {0}")]
    #[diagnostic(code(djtest::terminal::wait))]
    Wait(#[source] io::Error),
}

/// A place test commands are typed into.
pub trait Terminal {
    /// Start the session if it is not running (or has exited).
    fn ensure_alive(&mut self) -> Result<(), TerminalError>;

    /// Send one command line.
    fn send(&mut self, command: &str) -> Result<(), TerminalError>;
}

/// Where the shell's standard output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellOutput {
    /// Share the parent's stdout (CLI use).
    #[default]
    Inherit,
    /// Send it to the parent's stderr (LSP use: stdout carries the protocol).
    Stderr,
}

/// A long-lived shell process fed through its stdin.
#[derive(Debug)]
pub struct ShellTerminal {
    name: String,
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    output: ShellOutput,
    child: Option<Child>,
}

impl ShellTerminal {
    /// A terminal running the platform shell.
    pub fn new(name: impl Into<String>) -> Self {
        let (program, args) = default_shell();
        Self::with_shell(name, program, args)
    }

    /// A terminal running a specific shell program.
    pub fn with_shell(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            working_dir: None,
            output: ShellOutput::Inherit,
            child: None,
        }
    }

    pub fn with_output(mut self, output: ShellOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Directory the next shell starts in. A running shell keeps its own.
    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        self.working_dir = Some(dir.into());
    }

    /// Whether a shell is running right now.
    pub fn is_alive(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Close the shell's input and wait for it to finish the queued commands.
    ///
    /// Returns `None` when no shell was running.
    pub fn close(&mut self) -> Result<Option<ExitStatus>, TerminalError> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };
        drop(child.stdin.take());
        let status = child.wait().map_err(TerminalError::Wait)?;
        tracing::debug!(terminal = %self.name, %status, "terminal closed");
        Ok(Some(status))
    }

    fn spawn(&mut self) -> Result<(), TerminalError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::piped());
        match self.output {
            ShellOutput::Inherit => {
                command.stdout(Stdio::inherit());
            }
            ShellOutput::Stderr => {
                command.stdout(Stdio::from(io::stderr()));
            }
        }
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| TerminalError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        tracing::info!(terminal = %self.name, shell = %self.program, pid = child.id(), "started terminal");
        self.child = Some(child);
        Ok(())
    }
}

impl Terminal for ShellTerminal {
    fn ensure_alive(&mut self) -> Result<(), TerminalError> {
        if self.is_alive() {
            return Ok(());
        }
        if let Some(mut exited) = self.child.take() {
            // Reap the old process before replacing it.
            let _ = exited.wait();
        }
        self.spawn()
    }

    fn send(&mut self, command: &str) -> Result<(), TerminalError> {
        self.ensure_alive()?;
        let stdin = self
            .child
            .as_mut()
            .and_then(|child| child.stdin.as_mut())
            .ok_or_else(|| TerminalError::Send(io::Error::new(io::ErrorKind::BrokenPipe, "terminal has no input")))?;

        tracing::debug!(terminal = %self.name, command, "sending command");
        writeln!(stdin, "{}", detach_stdin(command)).map_err(TerminalError::Send)?;
        stdin.flush().map_err(TerminalError::Send)
    }
}

#[cfg(windows)]
fn default_shell() -> (String, Vec<String>) {
    ("cmd".to_string(), vec!["/Q".to_string()])
}

#[cfg(not(windows))]
fn default_shell() -> (String, Vec<String>) {
    ("sh".to_string(), Vec::new())
}

/// Wrap a command line so it reads stdin from the null device.
///
/// The shell reads the whole group before running it, so nothing after it on
/// the control pipe is reachable from inside the command.
#[cfg(windows)]
fn detach_stdin(command: &str) -> String {
    format!("({command}) <NUL")
}

#[cfg(not(windows))]
fn detach_stdin(command: &str) -> String {
    format!("{{ {command}\n}} </dev/null")
}

/// Writes commands to a sink instead of running them.
#[derive(Debug, Default)]
pub struct EchoTerminal<W> {
    out: W,
}

impl<W: Write> EchoTerminal<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Terminal for EchoTerminal<W> {
    fn ensure_alive(&mut self) -> Result<(), TerminalError> {
        Ok(())
    }

    fn send(&mut self, command: &str) -> Result<(), TerminalError> {
        writeln!(self.out, "{command}").map_err(TerminalError::Send)
    }
}
