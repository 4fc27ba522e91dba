//! `debyw-build` CLI entrypoint.
//!
//! Builds Debian archives for the requested debyw app packages (all of them
//! by default) into the output directory and regenerates its package index.
//! Exits non-zero when any package could not be built or the index update
//! failed.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use debyw_packager::cli::Cli;
use debyw_packager::config::RepoConfig;
use debyw_packager::error::{PackagerError, Result};
use debyw_packager::exec::{CommandExecutor, SystemCommandExecutor};
use debyw_packager::output::Reporter;
use debyw_packager::pipeline::{self, PipelineContext, RunReport};
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let result = run(&cli, &SystemCommandExecutor, &mut stdout, &mut stderr, true);
    let exit_code = exit_code_for_run_result(result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install `env_logger` at the level chosen by `-v`/`-q`; `RUST_LOG` wins.
///
/// Returns whether a logger was installed by this call.
fn init_logging(cli: &Cli) -> bool {
    let installed = env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
    if installed.is_err() {
        // A logger is already in place; keep it.
        return false;
    }
    true
}

fn run(
    cli: &Cli,
    executor: &dyn CommandExecutor,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    colors: bool,
) -> Result<RunReport> {
    let root = resolve_root(cli.root.as_deref())?;
    let config = RepoConfig::load(&root, cli.config.as_deref(), &cli.config_overrides())?;
    let context = PipelineContext {
        config: &config,
        executor,
        options: cli.pipeline_options(),
    };

    let mut reporter = Reporter::new(stdout, stderr)
        .quiet(cli.quiet)
        .colored(colors);
    let report = pipeline::run(&context, &cli.packages, &mut reporter)?;
    reporter.summary(report.summary_line(cli.dry_run))?;
    Ok(report)
}

/// The repository root as an absolute UTF-8 path.
fn resolve_root(root: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| PackagerError::NonUtf8Path {
        path: e.into_path_buf().to_string_lossy().into_owned(),
    })?;
    Ok(match root {
        Some(root) if root.is_absolute() => root.to_owned(),
        Some(root) => cwd.join(root),
        None => cwd,
    })
}

fn exit_code_for_run_result(result: Result<RunReport>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(report) if report.is_success() => 0,
        Ok(_) => 1,
        Err(err) => {
            write_stderr_line(stderr, format!("ERROR: {err}"));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debyw_packager::test_utils::RecordingExecutor;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn repo_with(packages: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf8 root");
        for (name, manifest) in packages {
            let package = root.join("packages").join(name);
            fs::create_dir_all(&package).expect("package dir");
            fs::write(package.join("package.json"), manifest).expect("manifest");
        }
        (dir, root)
    }

    fn run_cli(args: &[&str]) -> (i32, String, String) {
        let cli = Cli::parse_from(std::iter::once("debyw-build").chain(args.iter().copied()));
        let executor = RecordingExecutor::new();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let result = run(&cli, &executor, &mut out, &mut err, false);
        let code = exit_code_for_run_result(result, &mut err);
        (
            code,
            String::from_utf8(out).expect("utf8 stdout"),
            String::from_utf8(err).expect("utf8 stderr"),
        )
    }

    #[test]
    fn exit_code_for_error_prints_it() {
        let mut stderr = Vec::new();
        let err = PackagerError::InvalidConfig {
            reason: "script_runner must name a program".to_owned(),
        };

        let code = exit_code_for_run_result(Err(err), &mut stderr);

        assert_eq!(code, 1);
        let text = String::from_utf8(stderr).expect("utf8");
        assert!(text.starts_with("ERROR: invalid configuration"));
    }

    #[test]
    fn successful_run_exits_zero_with_summary() {
        let (_dir, root) = repo_with(&[("foo", r#"{"name": "foo", "version": "1.0"}"#)]);

        let (code, stdout, _) = run_cli(&["--root", root.as_str()]);

        assert_eq!(code, 0);
        assert!(stdout.contains("1 archive(s) built, 0 package(s) failed, 0 skipped"));
        assert!(root.join("dist/foo-all.deb").is_file());
    }

    #[rstest]
    #[case::unknown_package(&["ghost"])]
    #[case::explicit_missing_config(&["--config", "absent.toml"])]
    fn problems_exit_one(#[case] extra: &[&str]) {
        let (_dir, root) = repo_with(&[("foo", r#"{"name": "foo"}"#)]);
        let mut args = vec!["--root", root.as_str()];
        args.extend_from_slice(extra);

        let (code, _, stderr) = run_cli(&args);

        assert_eq!(code, 1);
        assert!(stderr.contains("ERROR:"));
    }

    #[test]
    fn quiet_run_prints_only_the_summary() {
        let (_dir, root) = repo_with(&[("foo", r#"{"name": "foo"}"#)]);

        let (code, stdout, stderr) = run_cli(&["--root", root.as_str(), "-q", "--skip-index"]);

        assert_eq!(code, 0);
        assert_eq!(stdout, "1 archive(s) built, 0 package(s) failed, 0 skipped\n");
        assert!(stderr.is_empty());
    }

    #[test]
    fn logging_initialises_once_and_tolerates_repeats() {
        let cli = Cli::default();
        init_logging(&cli);
        assert!(!init_logging(&cli));
    }

    #[test]
    fn relative_root_resolves_against_cwd() {
        let root = resolve_root(Some(Utf8Path::new("repo"))).expect("root");
        assert!(root.is_absolute());
        assert!(root.ends_with("repo"));
    }
}
