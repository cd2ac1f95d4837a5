//! kiln-gen: build graph synthesis
//!
//! Reads `kiln.kdl`, discovers tests and update scenarios, and writes one
//! `build.ninja` per supported profile of the host platform. Everything is
//! built and validated in memory first; files are only written once the
//! whole generation has succeeded.

mod error;
mod graph;
mod rules;
pub mod tools;

use camino::{Utf8Path, Utf8PathBuf};
use kiln_discover::TestDefinition;
use kiln_io::WriteOutcome;
use kiln_project::{KilnManifest, MANIFEST_FILE, Origin};
use kiln_scenario::CompiledScenario;
use kiln_toolchain::Platform;
use tracing::{debug, info};
use walkdir::WalkDir;

pub use error::GenError;
pub use graph::{GraphInput, MANIFEST_NAME, TEST_TARGET, build_manifest};
pub use rules::{ABI_VAR, DATA_VAR};
pub use tools::Tools;

/// Files touched by a generation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub written: Vec<Utf8PathBuf>,
    pub unchanged: Vec<Utf8PathBuf>,
}

/// A generated file held in memory until everything has been validated
#[derive(Debug, Clone)]
struct PlannedFile {
    path: Utf8PathBuf,
    contents: String,
}

/// Generate build manifests for the host platform
pub fn generate(root: &Utf8Path, tools: &Tools) -> Result<GenerateReport, GenError> {
    generate_for(root, tools, Platform::detect_host()?)
}

/// Generate build manifests for every profile of `platform`
pub fn generate_for(
    root: &Utf8Path,
    tools: &Tools,
    platform: Platform,
) -> Result<GenerateReport, GenError> {
    let project = KilnManifest::from_path(&root.join(MANIFEST_FILE))?;
    project.validate()?;
    check_inputs(root, &project, tools)?;

    let (headers, include_dirs) = collect_headers(root, &project.includes.dir)?;
    let watched_dirs = watched_dirs(root, &project, include_dirs);
    let fixtures = kiln_discover::discover_fixtures(root, &project.tests)?;
    let fuzz_cases: Vec<TestDefinition> = if platform.profiles().iter().any(|p| p.is_fuzz()) {
        kiln_discover::discover_fuzz_cases(root, &project.tests)?
    } else {
        Vec::new()
    };
    let scenarios = compile_scenarios(root, &project)?;
    debug!(
        headers = headers.len(),
        fixtures = fixtures.len(),
        fuzz_cases = fuzz_cases.len(),
        scenarios = scenarios.len(),
        watched_dirs = watched_dirs.len(),
        "inputs collected"
    );

    let mut planned = Vec::new();
    for profile in platform.profiles() {
        let toolchain = kiln_toolchain::resolve(platform, profile)?;
        let build_dir = format!("{}/{}", project.project.out, toolchain.build_dir_tag());
        let input = GraphInput {
            project: &project,
            toolchain: &toolchain,
            tools,
            build_dir: build_dir.clone(),
            headers: &headers,
            watched_dirs: &watched_dirs,
            // fuzz cases only run against the fuzzing build
            fuzz_cases: if profile.is_fuzz() { &fuzz_cases[..] } else { &[] },
            fixtures: &fixtures,
            scenarios: &scenarios,
        };
        let manifest = build_manifest(&input)?;

        let dir = root.join(&build_dir);
        for scenario in &scenarios {
            planned.push(PlannedFile {
                path: dir.join(input.driver_source(scenario)),
                contents: scenario.driver.clone(),
            });
        }
        planned.push(PlannedFile {
            path: dir.join(MANIFEST_NAME),
            contents: manifest.render(),
        });
    }

    let mut report = GenerateReport::default();
    for file in planned {
        let outcome = kiln_io::write_if_changed(&file.path, file.contents.as_bytes())
            .map_err(|e| GenError::Write {
                path: file.path.clone(),
                source: e,
            })?;
        match outcome {
            WriteOutcome::Written => {
                info!(path = %file.path, "wrote");
                report.written.push(file.path);
            }
            WriteOutcome::Unchanged => {
                info!(path = %file.path, "unchanged");
                report.unchanged.push(file.path);
            }
        }
    }

    Ok(report)
}

/// Every project file the build graph reads directly
fn required_inputs(project: &KilnManifest, tools: &Tools) -> Result<Vec<Utf8PathBuf>, GenError> {
    let src = Utf8Path::new(&project.project.src);
    let mut paths: Vec<Utf8PathBuf> = project.sources.iter().map(|s| src.join(&s.path)).collect();

    paths.push(src.join(&project.codegen.input));
    paths.push(src.join(&project.codegen.tool));
    paths.push(src.join(&project.codegen.script));
    paths.push(src.join(&project.amalg.header));
    paths.push(Utf8PathBuf::from(&project.amalg.license));

    for item in project.amalg.prelude.iter().chain(&project.amalg.epilogue) {
        match item.origin()? {
            Origin::Src => paths.push(src.join(&item.path)),
            Origin::Top => paths.push(Utf8PathBuf::from(&item.path)),
            Origin::Out => {}
        }
    }

    paths.push(Utf8PathBuf::from(&project.includes.dir));
    paths.push(Utf8PathBuf::from(&project.tests.dir));
    paths.push(Utf8PathBuf::from(&project.tests.support));
    paths.push(tools.pack.clone());
    paths.push(tools.testrun.clone());
    Ok(paths)
}

fn check_inputs(root: &Utf8Path, project: &KilnManifest, tools: &Tools) -> Result<(), GenError> {
    for path in required_inputs(project, tools)? {
        let full = root.join(&path);
        if !full.exists() {
            return Err(GenError::MissingInput { path: full });
        }
    }
    Ok(())
}

/// Headers under the include directory, recursively, sorted, project-relative,
/// together with every directory walked (the include directory first)
fn collect_headers(
    root: &Utf8Path,
    dir: &str,
) -> Result<(Vec<Utf8PathBuf>, Vec<Utf8PathBuf>), GenError> {
    let full_dir = root.join(dir);
    let mut headers = Vec::new();
    let mut dirs = Vec::new();

    for entry in WalkDir::new(&full_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| GenError::Walk {
            path: full_dir.clone(),
            source: e,
        })?;
        let path = Utf8Path::from_path(entry.path())
            .ok_or_else(|| GenError::NonUtf8Path(entry.path().to_path_buf()))?;
        if entry.file_type().is_dir() {
            dirs.push(project_relative(root, path));
        } else if entry.file_type().is_file() && path.extension() == Some("h") {
            headers.push(project_relative(root, path));
        }
    }

    Ok((headers, dirs))
}

/// Directories whose listing feeds the graph. Adding or removing a file only
/// touches the mtime of its own directory, so each one is watched separately.
fn watched_dirs(
    root: &Utf8Path,
    project: &KilnManifest,
    include_dirs: Vec<Utf8PathBuf>,
) -> Vec<Utf8PathBuf> {
    let mut dirs = vec![Utf8PathBuf::from(&project.tests.dir)];
    if let Some(fuzz) = &project.tests.fuzz {
        if root.join(fuzz).is_dir() {
            dirs.push(Utf8PathBuf::from(fuzz));
        }
    }
    for dir in include_dirs {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

/// `path` relative to `root`, joined with `/` on every platform
fn project_relative(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined: Vec<&str> = relative.components().map(|c| c.as_str()).collect();
    Utf8PathBuf::from(joined.join("/"))
}

fn compile_scenarios(
    root: &Utf8Path,
    project: &KilnManifest,
) -> Result<Vec<CompiledScenario>, GenError> {
    let mut compiled = Vec::new();
    for script in kiln_discover::discover_scenarios(root, &project.tests)? {
        let mut scenario = kiln_scenario::compile_script(&root.join(&script))?;
        scenario.script = script;
        compiled.push(scenario);
    }
    Ok(compiled)
}

