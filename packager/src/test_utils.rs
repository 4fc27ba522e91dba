//! Shared test utilities for the packager crate.
//!
//! [`StubExecutor`] replays a fixed queue of expected invocations.
//! [`RecordingExecutor`] stands in for the Debian tooling instead: archive
//! builds snapshot the staging tree into a JSON "archive" and index scans list
//! those archives, so whole runs can be exercised without `dpkg`.

use crate::error::{PackagerError, Result};
use crate::exec::{CommandExecutor, Invocation};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::process::{ExitStatus, Output};
use walkdir::WalkDir;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.cast_unsigned())
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// An expected command invocation for [`StubExecutor`].
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to run (e.g. `dpkg-deb`).
    pub cmd: String,
    /// The arguments passed to the program.
    pub args: Vec<String>,
    /// The expected working directory, or `None` to inherit.
    pub dir: Option<Utf8PathBuf>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Expect `cmd args...` with no working directory, succeeding.
    #[must_use]
    pub fn new<I, S>(cmd: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            result: Ok(success_output()),
        }
    }

    /// Expect the command to run from `dir`.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Return `result` from the call.
    #[must_use]
    pub fn returning(mut self, result: Result<Output>) -> Self {
        self.result = result;
        self
    }
}

/// A stub implementation of [`CommandExecutor`] for testing.
///
/// Calls must arrive in the queued order; anything else is reported as
/// [`PackagerError::StubMismatch`].
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(mismatch(format!("unexpected invocation: {invocation}")));
        };

        if call.cmd != invocation.program()
            || call.args != invocation.arguments()
            || call.dir.as_deref() != invocation.working_dir()
        {
            return Err(mismatch(format!(
                "expected {} {:?} (dir {:?}), got {invocation}",
                call.cmd, call.args, call.dir
            )));
        }

        call.result
    }
}

/// Fake Debian tooling that records every invocation.
///
/// - The archive builder (`dpkg-deb` by default) fails like the real tool
///   when the staging tree has no `DEBIAN/control`; otherwise it writes the
///   staging tree's files as a JSON map to the output path.
/// - The index scanner (`dpkg-scanpackages`) emits one stanza per `.deb` in
///   the scanned directory, built from the archive's control file.
/// - Every other program succeeds with empty output.
#[derive(Debug)]
pub struct RecordingExecutor {
    deb_tool: String,
    index_tool: String,
    calls: RefCell<Vec<Invocation>>,
    failures: RefCell<Vec<(String, String)>>,
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingExecutor {
    /// Fake the default `dpkg-deb` and `dpkg-scanpackages` tools.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deb_tool: "dpkg-deb".to_owned(),
            index_tool: "dpkg-scanpackages".to_owned(),
            calls: RefCell::new(Vec::new()),
            failures: RefCell::new(Vec::new()),
        }
    }

    /// Make `program` fail whenever one of its arguments or its working
    /// directory contains `fragment`.
    pub fn fail_when(&self, program: &str, fragment: &str) {
        self.failures
            .borrow_mut()
            .push((program.to_owned(), fragment.to_owned()));
    }

    /// Every invocation received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Invocations of `program`, in order.
    #[must_use]
    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.program() == program)
            .cloned()
            .collect()
    }

    fn should_fail(&self, invocation: &Invocation) -> bool {
        self.failures.borrow().iter().any(|(program, fragment)| {
            program == invocation.program()
                && (invocation.arguments().iter().any(|arg| arg.contains(fragment))
                    || invocation
                        .working_dir()
                        .is_some_and(|dir| dir.as_str().contains(fragment)))
        })
    }

    fn build_archive(invocation: &Invocation) -> Result<Output> {
        let [.., staging, output] = invocation.arguments() else {
            return Err(mismatch(format!("malformed archive build: {invocation}")));
        };
        let staging = Utf8Path::new(staging);
        if !staging.join("DEBIAN/control").is_file() {
            return Ok(failure_output(
                "dpkg-deb: error: failed to open package info file 'DEBIAN/control'",
            ));
        }

        let files = snapshot(staging)?;
        let encoded =
            serde_json::to_vec(&files).map_err(|e| mismatch(format!("encode archive: {e}")))?;
        fs::write(output, encoded)?;
        Ok(success_output())
    }

    fn scan(invocation: &Invocation) -> Result<Output> {
        let Some(dir) = invocation.arguments().last() else {
            return Err(mismatch(format!("malformed index scan: {invocation}")));
        };
        let base = invocation.working_dir().map_or_else(Utf8PathBuf::new, Utf8Path::to_path_buf);
        let scanned = base.join(dir);

        let mut archives: Vec<String> = Vec::new();
        if scanned.is_dir() {
            for entry in scanned.read_dir_utf8()? {
                let entry = entry?;
                if entry.file_name().ends_with(".deb") {
                    archives.push(entry.file_name().to_owned());
                }
            }
        }
        archives.sort();

        let mut listing = String::new();
        for name in archives {
            let files = read_fake_archive(&scanned.join(&name))?;
            let control = files
                .get("DEBIAN/control")
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default();
            listing.push_str(control.trim_end());
            listing.push_str(&format!("\nFilename: {dir}/{name}\n\n"));
        }

        let mut output = success_output();
        output.stdout = listing.into_bytes();
        Ok(output)
    }
}

impl CommandExecutor for RecordingExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        self.calls.borrow_mut().push(invocation.clone());

        if self.should_fail(invocation) {
            return Ok(failure_output(&format!(
                "{}: simulated failure",
                invocation.program()
            )));
        }

        if invocation.program() == self.deb_tool {
            Self::build_archive(invocation)
        } else if invocation.program() == self.index_tool {
            Self::scan(invocation)
        } else {
            Ok(success_output())
        }
    }
}

/// Decode an archive written by [`RecordingExecutor`].
///
/// Keys are `/`-separated paths relative to the staging root.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if the file cannot be read and
/// [`PackagerError::StubMismatch`] if it is not a fake archive.
pub fn read_fake_archive(path: &Utf8Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| mismatch(format!("{path} is not a fake archive: {e}")))
}

fn snapshot(root: &Utf8Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| PackagerError::Io(e.into()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| mismatch(e.to_string()))?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(key, fs::read(entry.path())?);
    }
    Ok(files)
}

fn mismatch(message: String) -> PackagerError {
    PackagerError::StubMismatch { message }
}
