//! External command execution.
//!
//! Build hooks, the Debian archive builder and the package index generator are
//! all black-box programs. They are described as [`Invocation`] values and run
//! through a [`CommandExecutor`] so the pipeline never touches the process
//! working directory and tests can substitute the collaborators.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fmt;
use std::process::{Command, Output};

/// A single external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    current_dir: Option<Utf8PathBuf>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the program from `dir` instead of inheriting the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument vector, excluding the program.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Working directory, if one was set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.current_dir.as_deref()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        if let Some(dir) = &self.current_dir {
            write!(f, " (in {dir})")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs the invocation to completion and returns the captured output.
    ///
    /// A non-zero exit is not an error at this level; callers inspect
    /// `Output::status` and map failures to their own error variants.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::CommandSpawn`] when the program cannot be
    /// started.
    fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Executes commands on the host system, blocking until they exit.
///
/// # Examples
///
/// ```no_run
/// use debyw_packager::exec::{CommandExecutor, Invocation, SystemCommandExecutor};
///
/// let executor = SystemCommandExecutor;
/// let output = executor.run(&Invocation::new("dpkg-deb").arg("--version"))?;
/// assert!(output.status.success());
/// # Ok::<(), debyw_packager::error::PackagerError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        debug!("running {invocation}");

        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.arguments());
        if let Some(dir) = invocation.working_dir() {
            cmd.current_dir(dir);
        }

        cmd.output().map_err(|source| PackagerError::CommandSpawn {
            program: invocation.program().to_owned(),
            source,
        })
    }
}

/// Lossily decode captured stderr for error messages.
#[must_use]
pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}
