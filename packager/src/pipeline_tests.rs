//! Unit tests for packaging run orchestration.
//!
//! Runs use [`RecordingExecutor`], which fakes `dpkg-deb` by snapshotting the
//! staging tree, so archive contents can be inspected directly.

use super::*;
use crate::test_utils::{RecordingExecutor, read_fake_archive};
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

struct Repo {
    _dir: TempDir,
    config: RepoConfig,
}

struct Run {
    report: RunReport,
    stdout: String,
    stderr: String,
}

impl Repo {
    fn write(&self, relative: &str, contents: &str) {
        let path = self.config.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, contents).expect("write file");
    }

    fn package(&self, dir: &str, manifest: &str) {
        self.write(&format!("packages/{dir}/package.json"), manifest);
    }

    fn run(&self, executor: &RecordingExecutor, options: PipelineOptions, requested: &[&str]) -> Run {
        let context = PipelineContext {
            config: &self.config,
            executor,
            options,
        };
        let requested: Vec<String> = requested.iter().map(|&r| r.to_owned()).collect();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let report = {
            let mut reporter = Reporter::new(&mut out, &mut err);
            run(&context, &requested, &mut reporter).expect("run completes")
        };
        Run {
            report,
            stdout: String::from_utf8(out).expect("utf8 stdout"),
            stderr: String::from_utf8(err).expect("utf8 stderr"),
        }
    }

    fn dist_files(&self) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(&self.config.dist_dir) {
            Ok(entries) => entries
                .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    fn archive_file(&self, archive: &str, path: &str) -> Option<String> {
        let files = read_fake_archive(&self.config.dist_dir.join(archive)).expect("archive");
        files
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

#[fixture]
fn repo() -> Repo {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf8 root");
    let config = RepoConfig::for_root(&root);
    fs::create_dir_all(&config.packages_dir).expect("packages dir");
    Repo { _dir: dir, config }
}

const FOO: &str = r#"{"name": "foo", "version": "1.0"}"#;

#[rstest]
fn package_without_files_builds_single_all_archive(repo: Repo) {
    repo.package("foo", FOO);
    let executor = RecordingExecutor::new();

    let run = repo.run(&executor, PipelineOptions::default(), &[]);

    assert!(run.report.is_success(), "stderr: {}", run.stderr);
    assert_eq!(repo.dist_files(), ["Packages.gz", "foo-all.deb"]);
    assert_eq!(
        repo.archive_file("foo-all.deb", "DEBIAN/control").as_deref(),
        Some("Package: foo\nVersion: 1.0\nDepends: debyw\nPriority: optional\nArchitecture: all\n")
    );
    assert!(run.stdout.contains("Building packages/foo"));
    assert!(run.stdout.contains("--> Packaging file foo-all.deb"));
}

#[rstest]
fn architecture_layers_replace_the_all_variant(repo: Repo) {
    repo.package("foo", FOO);
    repo.write("packages/foo/files/all/etc/foo.conf", "common");
    repo.write("packages/foo/files/all/etc/shared.conf", "shared");
    repo.write("packages/foo/files/armhf/etc/foo.conf", "armhf");
    let executor = RecordingExecutor::new();

    let run = repo.run(&executor, PipelineOptions::default(), &["foo"]);

    assert!(run.report.is_success());
    assert_eq!(repo.dist_files(), ["Packages.gz", "foo-armhf.deb"]);
    assert_eq!(repo.archive_file("foo-armhf.deb", "etc/foo.conf").as_deref(), Some("armhf"));
    assert_eq!(repo.archive_file("foo-armhf.deb", "etc/shared.conf").as_deref(), Some("shared"));
    assert!(
        repo.archive_file("foo-armhf.deb", "DEBIAN/control")
            .is_some_and(|c| c.ends_with("Architecture: armhf\n"))
    );
}

#[rstest]
fn invalid_architecture_is_reported_and_ignored(repo: Repo) {
    repo.package("foo", FOO);
    repo.write("packages/foo/files/bogus-arch/README", "ignored");
    let executor = RecordingExecutor::new();

    let run = repo.run(&executor, PipelineOptions::default(), &[]);

    assert!(run.report.is_success());
    assert_eq!(repo.dist_files(), ["Packages.gz", "foo-all.deb"]);
    assert!(
        run.stderr
            .contains("ERROR: architecture files/bogus-arch is not a valid architecture")
    );
    let report = run.report.packages.first().expect("one package");
    assert_eq!(report.rejected_architectures, ["bogus-arch"]);
}

#[cfg(unix)]
#[rstest]
fn non_utf8_architecture_directory_does_not_block_valid_variants(repo: Repo) {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    repo.package("foo", FOO);
    repo.write("packages/foo/files/armhf/etc/foo.conf", "armhf");
    let files = repo.config.packages_dir.join("foo/files");
    fs::create_dir(files.as_std_path().join(OsStr::from_bytes(b"bad\xff"))).expect("mkdir");
    let executor = RecordingExecutor::new();

    let run = repo.run(&executor, PipelineOptions::default(), &[]);

    assert!(run.report.is_success());
    assert_eq!(repo.dist_files(), ["Packages.gz", "foo-armhf.deb"]);
    assert!(run.stderr.contains("is not a valid architecture"), "stderr: {}", run.stderr);
}

#[rstest]
#[case::missing_manifest(None, "can't open")]
#[case::not_json(Some("{ nope"), "can't parse")]
#[case::no_name(Some(r#"{"version": "1.0"}"#), "can't parse")]
#[case::array(Some(r#"["broken"]"#), "can't parse")]
#[case::path_like_name(Some(r#"{"name": "../broken"}"#), "is not a Debian package name")]
fn unusable_manifest_skips_only_that_package(
    repo: Repo,
    #[case] manifest: Option<&str>,
    #[case] message: &str,
) {
    repo.package("foo", FOO);
    fs::create_dir_all(repo.config.packages_dir.join("broken")).expect("broken dir");
    if let Some(contents) = manifest {
        repo.package("broken", contents);
    }
    let executor = RecordingExecutor::new();

    let run = repo.run(&executor, PipelineOptions::default(), &[]);

    assert!(!run.report.is_success());
    assert_eq!(run.report.skipped_count(), 1);
    assert!(run.stderr.contains(message), "stderr: {}", run.stderr);
    assert_eq!(repo.dist_files(), ["Packages.gz", "foo-all.deb"]);
}

#[rstest]
fn absolute_package_name_writes_nothing_outside_the_repository(repo: Repo) {
    let outside = repo.config.root.join("outside/pkg");
    repo.package("foo", &format!(r#"{{"name": "{outside}"}}"#));
    repo.write("packages/foo/app/index.html", "<html></html>");
    let executor = RecordingExecutor::new();

    let run = repo.run(&executor, PipelineOptions::default(), &[]);

    assert_eq!(run.report.skipped_count(), 1);
    assert!(run.stderr.contains("is not a Debian package name"));
    assert!(!repo.config.root.join("outside").exists());
    assert!(executor.calls_to("dpkg-deb").is_empty());
    assert_eq!(repo.dist_files(), ["Packages.gz"]);
}

#[rstest]
fn unknown_request_is_reported_without_packaging(repo: Repo) {
    repo.package("foo", FOO);
    let executor = RecordingExecutor::new();

    let run = repo.run(&executor, PipelineOptions::default(), &["ghost", "packages/foo/"]);

    assert!(run.stderr.contains("ERROR: package \"ghost\" does not exist!"));
    assert_eq!(executor.calls_to("dpkg-deb").len(), 1);
    assert_eq!(run.report.archive_count(), 1);
    assert!(!run.report.is_success());
}

#[rstest]
fn hooks_run_in_order_from_the_package_directory(repo: Repo) {
    repo.package(
        "foo",
        r#"{"name": "foo", "scripts": {"build-deb": "make deb", "build": "make"}}"#,
    );
    let executor = RecordingExecutor::new();

    repo.run(&executor, PipelineOptions::default(), &[]);

    let hooks = executor.calls_to("npm");
    let scripts: Vec<&str> = hooks
        .iter()
        .filter_map(|call| call.arguments().last().map(String::as_str))
        .collect();
    assert_eq!(scripts, ["build", "build-deb"]);
    let expected_dir = repo.config.packages_dir.join("foo");
    assert!(hooks.iter().all(|call| call.working_dir() == Some(expected_dir.as_path())));
}

#[rstest]
fn hook_failure_is_isolated_per_package(repo: Repo) {
    repo.package("foo", FOO);
    repo.package("weather", r#"{"name": "weather", "scripts": {"build": "tsc"}}"#);
    let executor = RecordingExecutor::new();
    executor.fail_when("npm", "weather");

    let run = repo.run(&executor, PipelineOptions::default(), &["weather", "foo"]);

    assert_eq!(run.report.failed_count(), 1);
    assert!(matches!(run.report.index, IndexOutcome::Updated(_)));
    assert_eq!(repo.dist_files(), ["Packages.gz", "foo-all.deb"]);
    assert!(run.stderr.contains("build script \"build\" failed for weather"));
}

#[rstest]
fn fail_fast_stops_the_run_and_skips_the_index(repo: Repo) {
    repo.package("foo", FOO);
    repo.package("weather", r#"{"name": "weather"}"#);
    let executor = RecordingExecutor::new();
    executor.fail_when("dpkg-deb", "foo-all.deb");
    let options = PipelineOptions {
        fail_fast: true,
        ..PipelineOptions::default()
    };

    let run = repo.run(&executor, options, &[]);

    assert!(run.report.aborted);
    assert_eq!(run.report.packages.len(), 1);
    assert!(matches!(run.report.index, IndexOutcome::NotRun));
    assert!(executor.calls_to("dpkg-scanpackages").is_empty());
    assert!(!repo.config.packages_dir.join("foo/.deb_pkg").exists());
}

#[rstest]
fn dry_run_plans_without_side_effects(repo: Repo) {
    repo.package("foo", r#"{"name": "foo", "scripts": {"build": "tsc"}}"#);
    repo.write("packages/foo/files/amd64/usr/bin/foo", "bin");
    repo.write("packages/foo/files/arm64/usr/bin/foo", "bin");
    let executor = RecordingExecutor::new();
    let options = PipelineOptions {
        dry_run: true,
        ..PipelineOptions::default()
    };

    let run = repo.run(&executor, options, &[]);

    assert!(executor.calls().is_empty());
    assert!(!repo.config.dist_dir.exists());
    assert!(!repo.config.packages_dir.join("foo/.deb_pkg").exists());
    assert_eq!(run.report.archive_count(), 2);
    assert!(run.stdout.contains("Would package file"));
    assert!(run.report.summary_line(true).starts_with("2 archive(s) planned"));
}

#[rstest]
fn rebuilding_overwrites_archives_and_index(repo: Repo) {
    repo.package("foo", FOO);
    repo.write("packages/foo/app/index.html", "<html/>");
    let executor = RecordingExecutor::new();

    let first = repo.run(&executor, PipelineOptions::default(), &[]);
    let second = repo.run(&executor, PipelineOptions::default(), &[]);

    assert_eq!(repo.dist_files(), ["Packages.gz", "foo-all.deb"]);
    let digests = |run: &Run| -> Vec<ArchiveDigest> {
        run.report.built_archives().map(|a| a.digest.clone()).collect()
    };
    assert_eq!(digests(&first), digests(&second));
    assert!(matches!(
        second.report.index,
        IndexOutcome::Updated(IndexSummary { entries: 1, .. })
    ));
}

#[rstest]
fn index_covers_every_archive_in_dist(repo: Repo) {
    repo.package("foo", FOO);
    repo.package("bar", r#"{"name": "bar"}"#);
    let executor = RecordingExecutor::new();
    repo.run(&executor, PipelineOptions::default(), &[]);

    let run = repo.run(&executor, PipelineOptions::default(), &["foo"]);

    assert!(matches!(
        run.report.index,
        IndexOutcome::Updated(IndexSummary { entries: 2, .. })
    ));
    let scan = executor.calls_to("dpkg-scanpackages");
    let last = scan.last().expect("scanner ran");
    assert_eq!(last.arguments(), ["-m", "./dist"]);
    assert_eq!(last.working_dir(), Some(repo.config.root.as_path()));
}

#[rstest]
fn failed_packaging_removes_the_staging_tree(repo: Repo) {
    repo.package("foo", FOO);
    let executor = RecordingExecutor::new();
    executor.fail_when("dpkg-deb", "foo-all.deb");

    let run = repo.run(&executor, PipelineOptions::default(), &[]);

    assert_eq!(run.report.failed_count(), 1);
    assert!(!repo.config.packages_dir.join("foo/.deb_pkg").exists());
    assert!(run.stderr.contains("packaging"));
}

#[rstest]
fn supplied_control_file_is_kept_with_a_warning(repo: Repo) {
    repo.package("foo", FOO);
    repo.write(
        "packages/foo/files/i386/DEBIAN/control",
        "Package: foo\nVersion: 9\nArchitecture: i386\n",
    );
    let executor = RecordingExecutor::new();

    let run = repo.run(&executor, PipelineOptions::default(), &[]);

    assert_eq!(
        repo.archive_file("foo-i386.deb", "DEBIAN/control").as_deref(),
        Some("Package: foo\nVersion: 9\nArchitecture: i386\n")
    );
    assert!(run.stderr.contains("WARNING:"));
    let archive = run.report.built_archives().next().expect("built");
    assert_eq!(archive.control, ControlSource::Supplied);
}

#[rstest]
fn skip_hooks_and_skip_index_are_honoured(repo: Repo) {
    repo.package("foo", r#"{"name": "foo", "scripts": {"build": "tsc"}}"#);
    let executor = RecordingExecutor::new();
    let options = PipelineOptions {
        skip_hooks: true,
        skip_index: true,
        ..PipelineOptions::default()
    };

    let run = repo.run(&executor, options, &[]);

    assert!(executor.calls_to("npm").is_empty());
    assert!(executor.calls_to("dpkg-scanpackages").is_empty());
    assert!(run.report.is_success());
    assert_eq!(repo.dist_files(), ["foo-all.deb"]);
}

#[test]
fn missing_packages_directory_is_fatal() {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf8 root");
    let config = RepoConfig::for_root(&root);
    let executor = RecordingExecutor::new();
    let context = PipelineContext {
        config: &config,
        executor: &executor,
        options: PipelineOptions::default(),
    };
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let mut reporter = Reporter::new(&mut out, &mut err);

    let result = run(&context, &[], &mut reporter);

    assert!(matches!(result, Err(PackagerError::PackagesDirNotFound { .. })));
}
