//! Build hook execution.
//!
//! A manifest may declare `build` and `build-deb` scripts. Each declared
//! script is run through the configured runner (`npm run <script>` by
//! default) from the package directory, in that order, and must succeed
//! before staging starts.

use crate::config::RepoConfig;
use crate::error::{PackagerError, Result};
use crate::exec::{CommandExecutor, Invocation, stderr_text};
use crate::layout::PackageLayout;
use crate::manifest::Scripts;
use log::info;

/// Runs a package's declared build scripts.
pub struct HookRunner<'a> {
    executor: &'a dyn CommandExecutor,
    runner: &'a [String],
}

impl<'a> HookRunner<'a> {
    /// Create a hook runner using the configured script runner.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, config: &'a RepoConfig) -> Self {
        Self {
            executor,
            runner: &config.script_runner,
        }
    }

    /// The invocation used for `script` in `layout`'s package directory.
    #[must_use]
    pub fn invocation(&self, layout: &PackageLayout, script: &str) -> Invocation {
        let (program, leading) = self.runner.split_first().map_or(("", &[][..]), |(p, rest)| {
            (p.as_str(), rest)
        });
        Invocation::new(program)
            .args(leading.iter().cloned())
            .arg(script)
            .current_dir(layout.root())
    }

    /// Run every declared script in order, stopping at the first failure.
    ///
    /// Returns the names of the scripts that ran.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::HookFailed`] when a script exits
    /// unsuccessfully and [`PackagerError::CommandSpawn`] when the runner
    /// cannot be started.
    pub fn run_all(&self, layout: &PackageLayout, scripts: &Scripts) -> Result<Vec<&'static str>> {
        let declared = scripts.declared();
        for script in &declared {
            let invocation = self.invocation(layout, script);
            info!("{}: running {invocation}", layout.name());
            let output = self.executor.run(&invocation)?;
            if !output.status.success() {
                return Err(PackagerError::HookFailed {
                    package: layout.name().clone(),
                    script: (*script).to_owned(),
                    status: output.status,
                    stderr: stderr_text(&output),
                });
            }
        }
        Ok(declared)
    }
}
