//! Test discovery
//!
//! Three passes over the project's test directory:
//! - fixtures: C files whose annotation comments describe how to run them
//! - update scenarios: `.scn` scripts, compiled later into driver programs
//! - fuzz cases: inputs that once crashed the compiler and must not anymore
//!
//! Every listing is sorted by file name so generation is deterministic.

mod directive;

pub use directive::Directive;

use camino::{Utf8Path, Utf8PathBuf};
use kiln_meta::{ExpectedReturn, TestRecord};
use kiln_project::{FilePattern, ProjectError, Tests};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Placeholder replaced by the fixture's own path
const SELF_PLACEHOLDER: &str = "{self}";

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("failed to list {path}: {source}")]
    ReadDir {
        path: Utf8PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: malformed RET value {value:?} (expected an integer or NOCRASH)")]
    MalformedReturn {
        path: Utf8PathBuf,
        line: usize,
        value: String,
    },

    #[error("path is not valid UTF-8: {0:?}")]
    NonUtf8Path(std::path::PathBuf),

    #[error(transparent)]
    Project(#[from] ProjectError),
}

/// One test derived from a fixture or a fuzz case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    /// Project-relative, `/`-separated
    pub path: Utf8PathBuf,
    /// Arguments for the compiler under test, `{self}` already substituted
    pub run: String,
    pub ret: ExpectedReturn,
    /// Expected stdout; empty when not checked
    pub txt: String,
    pub enabled: bool,
}

impl TestDefinition {
    /// The record carried to the runner through the manifest
    pub fn to_record(&self) -> TestRecord {
        TestRecord::new(self.run.clone(), self.ret.clone(), self.txt.clone())
    }
}

/// Fold a fixture's annotations into a definition.
///
/// `path` is the project-relative fixture path used for `{self}`.
pub fn parse_fixture(
    path: &Utf8Path,
    contents: &str,
    default_run: &str,
) -> Result<TestDefinition, DiscoverError> {
    let mut run = default_run.to_string();
    let mut ret = ExpectedReturn::default();
    let mut txt = String::new();
    let mut enabled = true;

    for (index, line) in contents.lines().enumerate() {
        match Directive::tokenize(line) {
            Some(Directive::Run(value)) => run = value.to_string(),
            Some(Directive::Ret(value)) => {
                ret = ExpectedReturn::parse(value).ok_or_else(|| {
                    DiscoverError::MalformedReturn {
                        path: path.to_owned(),
                        line: index + 1,
                        value: value.to_string(),
                    }
                })?;
            }
            Some(Directive::Txt(value)) => {
                txt.push_str(value);
                txt.push('\n');
            }
            Some(Directive::Disabled) => enabled = false,
            None => {}
        }
    }

    Ok(TestDefinition {
        path: path.to_owned(),
        run: run.replace(SELF_PLACEHOLDER, path.as_str()),
        ret,
        txt: txt.replace(SELF_PLACEHOLDER, path.as_str()),
        enabled,
    })
}

/// Discover the enabled fixtures in the test directory.
///
/// The support file compiled into every fixture is not itself a fixture.
pub fn discover_fixtures(
    root: &Utf8Path,
    tests: &Tests,
) -> Result<Vec<TestDefinition>, DiscoverError> {
    let pattern = tests.fixture_pattern()?;
    let default_run = tests.default_run();

    let mut fixtures = Vec::new();
    let mut disabled = 0;
    for path in list_files(root, Utf8Path::new(&tests.dir), Some(&pattern))? {
        if path.as_str() == tests.support {
            continue;
        }

        let full = root.join(&path);
        let contents = std::fs::read_to_string(&full)
            .map_err(|e| DiscoverError::ReadFile { path: full, source: e })?;

        let definition = parse_fixture(&path, &contents, &default_run)?;
        if definition.enabled {
            fixtures.push(definition);
        } else {
            disabled += 1;
        }
    }

    debug!(count = fixtures.len(), disabled, dir = %tests.dir, "discovered fixtures");
    Ok(fixtures)
}

/// Discover update scenario scripts, as project-relative paths
pub fn discover_scenarios(
    root: &Utf8Path,
    tests: &Tests,
) -> Result<Vec<Utf8PathBuf>, DiscoverError> {
    let pattern = tests.scenario_pattern()?;
    let scenarios = list_files(root, Utf8Path::new(&tests.dir), Some(&pattern))?;
    debug!(count = scenarios.len(), dir = %tests.dir, "discovered update scenarios");
    Ok(scenarios)
}

/// Discover fuzz cases. Each one only has to finish without crashing.
///
/// Returns nothing when no fuzz directory is configured or it doesn't exist.
pub fn discover_fuzz_cases(
    root: &Utf8Path,
    tests: &Tests,
) -> Result<Vec<TestDefinition>, DiscoverError> {
    let Some(dir) = &tests.fuzz else {
        return Ok(Vec::new());
    };
    if !root.join(dir).is_dir() {
        debug!(%dir, "fuzz case directory does not exist");
        return Ok(Vec::new());
    }

    let cases: Vec<_> = list_files(root, Utf8Path::new(dir), None)?
        .into_iter()
        .map(|path| TestDefinition {
            run: path.to_string(),
            path,
            ret: ExpectedReturn::NoCrash,
            txt: String::new(),
            enabled: true,
        })
        .collect();

    debug!(count = cases.len(), %dir, "discovered fuzz cases");
    Ok(cases)
}

/// Files directly inside `dir` (relative to `root`), sorted by name,
/// returned as project-relative paths.
fn list_files(
    root: &Utf8Path,
    dir: &Utf8Path,
    pattern: Option<&FilePattern>,
) -> Result<Vec<Utf8PathBuf>, DiscoverError> {
    let full_dir = root.join(dir);
    let mut files = Vec::new();

    for entry in WalkDir::new(&full_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| DiscoverError::ReadDir {
            path: full_dir.clone(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| DiscoverError::NonUtf8Path(entry.path().to_path_buf()))?;
        if pattern.is_some_and(|p| !p.matches(name)) {
            continue;
        }

        files.push(Utf8PathBuf::from(format!("{}/{}", dir, name)));
    }

    Ok(files)
}
