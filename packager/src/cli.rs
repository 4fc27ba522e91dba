//! CLI argument definitions for `debyw-build`.
//!
//! Kept apart from the entrypoint so parsing can be tested without running a
//! build.

use crate::config::ConfigOverrides;
use crate::pipeline::PipelineOptions;
use camino::Utf8PathBuf;
use clap::Parser;

/// Build Debian packages for debyw apps and refresh the package index.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "debyw-build")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build Debian packages for debyw apps and refresh the package index.\n\n",
    "Each directory under packages/ holding a package.json is one package. ",
    "Its build scripts run first, then one .deb is produced per architecture ",
    "found under files/ (or a single architecture-independent one), and ",
    "finally dist/Packages.gz is regenerated over every archive in dist/.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build every package:\n",
    "    $ debyw-build\n\n",
    "  Build selected packages:\n",
    "    $ debyw-build clock packages/weather\n\n",
    "  Show what would be built:\n",
    "    $ debyw-build --dry-run",
))]
pub struct Cli {
    /// Packages to build (directory names under the packages directory).
    /// All packages are built when none are given.
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Repository root [default: current directory].
    #[arg(long, value_name = "DIR")]
    pub root: Option<Utf8PathBuf>,

    /// Configuration file [default: <root>/debyw.toml when present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Directory containing the packages.
    #[arg(long, value_name = "DIR")]
    pub packages_dir: Option<Utf8PathBuf>,

    /// Directory receiving archives and the package index.
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<Utf8PathBuf>,

    /// Show what would be built without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not run the packages' build scripts.
    #[arg(long)]
    pub skip_hooks: bool,

    /// Do not regenerate the package index.
    #[arg(long)]
    pub skip_index: bool,

    /// Stop at the first package that fails to build.
    #[arg(long)]
    pub fail_fast: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Pipeline switches selected on the command line.
    #[must_use]
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            dry_run: self.dry_run,
            skip_hooks: self.skip_hooks,
            skip_index: self.skip_index,
            fail_fast: self.fail_fast,
        }
    }

    /// Path overrides selected on the command line.
    #[must_use]
    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            packages_dir: self.packages_dir.clone(),
            dist_dir: self.dist_dir.clone(),
        }
    }

    /// Log level filter implied by `-v`/`-q`.
    ///
    /// # Examples
    ///
    /// ```
    /// use debyw_packager::cli::Cli;
    ///
    /// let cli = Cli { verbosity: 2, ..Cli::default() };
    /// assert_eq!(cli.log_level(), log::LevelFilter::Debug);
    /// ```
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
