//! Packaging run orchestration.
//!
//! A run walks the work list in order. For each package it loads the
//! manifest, resolves control fields, runs the build hooks, plans the
//! architecture variants and then stages and packages each variant in turn.
//! Configuration problems skip the package; execution failures fail it and,
//! with `fail_fast`, stop the run. The package index is regenerated once at
//! the end over whatever archives are in the output directory.

use crate::arch::{Architecture, ArchitecturePlan};
use crate::archive::DebBuilder;
use crate::checksum::{ArchiveDigest, compute_sha256};
use crate::config::RepoConfig;
use crate::control::ControlFields;
use crate::discovery::{discover, select};
use crate::error::{ErrorCategory, PackagerError, Result};
use crate::exec::CommandExecutor;
use crate::hooks::HookRunner;
use crate::index::{IndexSummary, IndexUpdater};
use crate::layout::PackageLayout;
use crate::manifest::Manifest;
use crate::output::Reporter;
use crate::package_name::PackageName;
use crate::staging::{self, ControlSource};
use camino::Utf8PathBuf;
use log::info;

/// Switches that change what a run does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Plan and report only; run nothing and write nothing.
    pub dry_run: bool,
    /// Do not run build hooks.
    pub skip_hooks: bool,
    /// Do not regenerate the package index.
    pub skip_index: bool,
    /// Stop at the first execution failure.
    pub fail_fast: bool,
}

/// Context for a packaging run.
pub struct PipelineContext<'a> {
    /// Resolved repository configuration.
    pub config: &'a RepoConfig,
    /// Runner for hooks and Debian tooling.
    pub executor: &'a dyn CommandExecutor,
    /// Run switches.
    pub options: PipelineOptions,
}

/// An archive written during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArchive {
    /// Variant architecture.
    pub arch: Architecture,
    /// Archive path in the output directory.
    pub path: Utf8PathBuf,
    /// SHA-256 of the archive.
    pub digest: ArchiveDigest,
    /// Whether the control file was generated or supplied by an asset layer.
    pub control: ControlSource,
}

/// An archive a dry run would write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedArchive {
    /// Variant architecture.
    pub arch: Architecture,
    /// Archive path in the output directory.
    pub path: Utf8PathBuf,
}

/// What happened to one requested package.
#[derive(Debug)]
pub enum PackageOutcome {
    /// Every variant was packaged.
    Built(Vec<BuiltArchive>),
    /// Dry run: the variants that would be packaged.
    Planned(Vec<PlannedArchive>),
    /// Skipped because of a configuration error.
    Skipped(PackagerError),
    /// Failed while building.
    Failed(PackagerError),
}

/// Report for one requested package.
#[derive(Debug)]
pub struct PackageReport {
    /// Requested package.
    pub name: PackageName,
    /// Result of processing it.
    pub outcome: PackageOutcome,
    /// Names of ignored `files/` subdirectories.
    pub rejected_architectures: Vec<String>,
}

/// What happened to the package index.
#[derive(Debug)]
pub enum IndexOutcome {
    /// The index was rewritten.
    Updated(IndexSummary),
    /// The index was left alone (dry run, `--skip-index` or an aborted run).
    NotRun,
    /// The scanner failed.
    Failed(PackagerError),
}

/// Summary of a whole run.
#[derive(Debug)]
pub struct RunReport {
    /// Per-package results, in processing order.
    pub packages: Vec<PackageReport>,
    /// Index regeneration result.
    pub index: IndexOutcome,
    /// Whether `fail_fast` stopped the run early.
    pub aborted: bool,
}

impl RunReport {
    /// Archives written (or planned, for a dry run).
    #[must_use]
    pub fn archive_count(&self) -> usize {
        self.packages
            .iter()
            .map(|report| match &report.outcome {
                PackageOutcome::Built(archives) => archives.len(),
                PackageOutcome::Planned(archives) => archives.len(),
                PackageOutcome::Skipped(_) | PackageOutcome::Failed(_) => 0,
            })
            .sum()
    }

    /// Every archive written, across packages.
    pub fn built_archives(&self) -> impl Iterator<Item = &BuiltArchive> {
        self.packages.iter().flat_map(|report| match &report.outcome {
            PackageOutcome::Built(archives) => archives.as_slice(),
            _ => &[],
        })
    }

    /// Packages skipped for configuration errors.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, PackageOutcome::Skipped(_)))
    }

    /// Packages that failed to build.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, PackageOutcome::Failed(_)))
    }

    /// Whether every package was handled and the index did not fail.
    ///
    /// Ignored architecture directories do not affect success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.aborted
            && self.skipped_count() == 0
            && self.failed_count() == 0
            && !matches!(self.index, IndexOutcome::Failed(_))
    }

    /// One-line summary for the end of the run.
    #[must_use]
    pub fn summary_line(&self, dry_run: bool) -> String {
        let verb = if dry_run { "planned" } else { "built" };
        let mut line = format!(
            "{} archive(s) {verb}, {} package(s) failed, {} skipped",
            self.archive_count(),
            self.failed_count(),
            self.skipped_count()
        );
        match &self.index {
            IndexOutcome::Updated(summary) => {
                line.push_str(&format!("; indexed {} package(s)", summary.entries));
            }
            IndexOutcome::Failed(_) => line.push_str("; index update failed"),
            IndexOutcome::NotRun => {}
        }
        line
    }

    fn count(&self, predicate: impl Fn(&PackageOutcome) -> bool) -> usize {
        self.packages
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }
}

/// Process the requested packages and regenerate the index.
///
/// An empty `requested` list means every discovered package.
///
/// # Errors
///
/// Returns [`PackagerError::PackagesDirNotFound`] or [`PackagerError::Io`]
/// when the packages directory cannot be listed. Per-package problems are
/// reported through `reporter` and recorded in the [`RunReport`].
pub fn run(
    context: &PipelineContext<'_>,
    requested: &[String],
    reporter: &mut Reporter<'_>,
) -> Result<RunReport> {
    let config = context.config;
    let discovered = discover(&config.packages_dir)?;
    let work = select(&discovered, requested, config.packages_dir_label());

    let mut packages = Vec::with_capacity(work.len());
    let mut aborted = false;

    for entry in work {
        let name = entry.name().clone();
        if let Some(err) = entry.error() {
            reporter.error(&err);
            packages.push(PackageReport {
                name,
                outcome: PackageOutcome::Skipped(err),
                rejected_architectures: Vec::new(),
            });
            continue;
        }

        reporter.title(format!("Building {}/{name}", config.packages_dir_label()));
        let layout = PackageLayout::new(config, &name);
        let mut rejected = Vec::new();
        let outcome = match build_package(context, &layout, reporter, &mut rejected) {
            Ok(outcome) => outcome,
            Err(err) => {
                reporter.error(&err);
                match err.category() {
                    ErrorCategory::Configuration => PackageOutcome::Skipped(err),
                    ErrorCategory::Execution => {
                        aborted = context.options.fail_fast;
                        PackageOutcome::Failed(err)
                    }
                }
            }
        };
        packages.push(PackageReport {
            name,
            outcome,
            rejected_architectures: rejected,
        });

        if aborted {
            reporter.warn("stopping after the first failure (--fail-fast)");
            break;
        }
    }

    let index = if context.options.dry_run || context.options.skip_index || aborted {
        IndexOutcome::NotRun
    } else {
        update_index(context, reporter)
    };

    Ok(RunReport {
        packages,
        index,
        aborted,
    })
}

/// Build (or, for a dry run, plan) every variant of one package.
///
/// Names of ignored `files/` subdirectories are appended to `rejected`.
///
/// # Errors
///
/// Returns the first error that stops the package; see
/// [`PackagerError::category`] for how the caller treats it.
pub fn build_package(
    context: &PipelineContext<'_>,
    layout: &PackageLayout,
    reporter: &mut Reporter<'_>,
    rejected: &mut Vec<String>,
) -> Result<PackageOutcome> {
    let config = context.config;
    let options = context.options;
    let manifest_path = layout.manifest_path();
    let manifest = Manifest::load(&manifest_path)?;
    let control = ControlFields::resolve(&manifest, &manifest_path, &config.runtime_depends)?;
    let builder = DebBuilder::new(context.executor, config);

    let scripts = manifest.scripts.declared();
    if !scripts.is_empty() {
        if options.dry_run || options.skip_hooks {
            reporter.step(format!("Skipping build scripts: {}", scripts.join(", ")));
        } else {
            reporter.step("Running build scripts");
            HookRunner::new(context.executor, config).run_all(layout, &manifest.scripts)?;
        }
    }

    let plan = ArchitecturePlan::from_files_dir(&layout.files_dir())?;
    for err in plan.rejection_errors() {
        reporter.error(&err);
    }
    rejected.extend(plan.rejected().iter().cloned());

    if options.dry_run {
        let planned = plan
            .targets()
            .iter()
            .map(|&arch| {
                let path = builder.output_path(&control.archive_name(arch));
                reporter.step(format!("Would package file {path}"));
                PlannedArchive { arch, path }
            })
            .collect();
        return Ok(PackageOutcome::Planned(planned));
    }

    let mut built = Vec::with_capacity(plan.targets().len());
    for &arch in plan.targets() {
        let file_name = control.archive_name(arch);
        reporter.step(format!("Packaging file {file_name}"));

        let (tree, source) = staging::assemble(layout, config, &control, arch)?;
        if source == ControlSource::Supplied {
            reporter.warn(format!(
                "{}: files/ supplies DEBIAN/control for {arch}; manifest control fields are not applied",
                layout.name()
            ));
        }
        let path = builder.build(&tree, &file_name)?;
        if let Err(err) = tree.remove() {
            reporter.warn(err);
        }

        let digest = compute_sha256(&path)?;
        info!("{path}: sha256 {digest}");
        reporter.built(&path, &digest);
        built.push(BuiltArchive {
            arch,
            path,
            digest,
            control: source,
        });
    }

    Ok(PackageOutcome::Built(built))
}

/// Regenerate the package index, reporting the outcome.
pub fn update_index(context: &PipelineContext<'_>, reporter: &mut Reporter<'_>) -> IndexOutcome {
    let config = context.config;
    reporter.title(format!("Updating {}", config.index_file));
    match IndexUpdater::new(context.executor, config).update() {
        Ok(summary) => {
            reporter.step(format!(
                "Indexed {} package(s) into {}",
                summary.entries, summary.path
            ));
            IndexOutcome::Updated(summary)
        }
        Err(err) => {
            reporter.error(&err);
            IndexOutcome::Failed(err)
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
