//! Build graph construction for one (platform, profile) build directory.
//!
//! Paths in the manifest are relative to the build directory. Project files
//! are reached through two variables: `$top` (the project root) and `$root`
//! (the C source directory).

use camino::{Utf8Path, Utf8PathBuf};
use kiln_discover::TestDefinition;
use kiln_ninja::{Edge, Manifest, ManifestError, NinjaPath, PHONY};
use kiln_project::{KilnManifest, MANIFEST_FILE, Origin};
use kiln_scenario::CompiledScenario;
use kiln_toolchain::{Abi, ToolchainProfile};
use tracing::debug;

use crate::GenError;
use crate::rules::{self, ABI_VAR, DATA_VAR};
use crate::tools::Tools;

pub const TOP_VAR: &str = "top";
pub const ROOT_VAR: &str = "root";
pub const MANIFEST_NAME: &str = "build.ninja";
pub const TEST_TARGET: &str = "test";

/// Everything needed to build one manifest
#[derive(Debug, Clone)]
pub struct GraphInput<'a> {
    pub project: &'a KilnManifest,
    pub toolchain: &'a ToolchainProfile,
    pub tools: &'a Tools,
    /// Build directory relative to the project root, e.g. `out/ld`
    pub build_dir: String,
    /// Headers under the include directory, project-relative and sorted
    pub headers: &'a [Utf8PathBuf],
    /// Project directories whose listings feed the graph, project-relative
    pub watched_dirs: &'a [Utf8PathBuf],
    pub fixtures: &'a [TestDefinition],
    pub fuzz_cases: &'a [TestDefinition],
    /// Compiled scenarios; `script` is project-relative
    pub scenarios: &'a [CompiledScenario],
}

impl GraphInput<'_> {
    /// Generated code for one ABI, e.g. `codegen.l.c`
    pub fn codegen_output(&self, abi: Abi) -> String {
        format!("{}.{}.c", self.project.codegen.output, abi.tag())
    }

    /// The compiler executable, e.g. `dyibicc` or `dyibicc.exe`
    pub fn compiler_exe(&self) -> String {
        self.toolchain.exe(&self.project.project.name)
    }

    /// Path from the build directory back to the project root
    pub fn top(&self) -> String {
        let depth = Utf8Path::new(&self.build_dir).components().count();
        vec![".."; depth.max(1)].join("/")
    }

    pub fn amalg_source(&self) -> String {
        let amalg = &self.project.amalg;
        format!("{}/{}.c", amalg.dir, amalg.name)
    }

    pub fn amalg_header(&self) -> String {
        let amalg = &self.project.amalg;
        format!("{}/{}.h", amalg.dir, amalg.name)
    }

    pub fn amalg_object(&self) -> String {
        format!("{}{}", self.project.amalg.name, self.toolchain.obj_suffix)
    }

    /// Driver source written by the generator for a scenario
    pub fn driver_source(&self, scenario: &CompiledScenario) -> String {
        format!("{}.driver.c", scenario.file_name())
    }

    pub fn driver_exe(&self, scenario: &CompiledScenario) -> String {
        self.toolchain.exe(&format!("{}.driver", scenario.file_name()))
    }
}

/// Build and validate the manifest for one build directory
pub fn build_manifest(input: &GraphInput<'_>) -> Result<Manifest, GenError> {
    let wrap = |source: ManifestError| GenError::Manifest {
        build_dir: input.build_dir.clone(),
        source,
    };

    let project = input.project;
    let tc = input.toolchain;
    let tools = input.tools;
    let fuzz_build = tc.profile.is_fuzz();

    let mut m = Manifest::new();
    m.comment(format!(
        "Generated by kiln-gen from {}. Do not edit.",
        MANIFEST_FILE
    ));
    m.comment(format!("platform: {}, profile: {}", tc.platform, tc.profile));
    m.variable(TOP_VAR, input.top());
    m.variable(ROOT_VAR, format!("${}/{}", TOP_VAR, project.project.src));

    for rule in rules::rules(input) {
        m.add_rule(rule).map_err(wrap)?;
    }

    // Code generation, both ABIs
    let codegen_tool = tc.exe(project.codegen.tool_name());
    for abi in Abi::ALL {
        m.add_edge(
            Edge::new(rules::CODEGEN)
                .output(input.codegen_output(abi))
                .input(NinjaPath::under(ROOT_VAR, &project.codegen.input))
                .implicit(codegen_tool.as_str())
                .implicit(NinjaPath::under(ROOT_VAR, &project.codegen.script))
                .bind(ABI_VAR, abi.define()),
        )
        .map_err(wrap)?;
    }

    let mut objects = Vec::new();
    let host_codegen = input.codegen_output(tc.platform.abi());
    let host_codegen_obj = tc.object_for(&host_codegen);
    m.add_edge(
        Edge::new(rules::CC)
            .output(host_codegen_obj.as_str())
            .input(host_codegen.as_str()),
    )
    .map_err(wrap)?;
    objects.push(host_codegen_obj);

    // Sources
    for source in &project.sources {
        if let Some(variant) = source.variant()? {
            if !variant.included_in(fuzz_build) {
                continue;
            }
        }
        let object = tc.object_for(&source.path);
        let mut edge = Edge::new(rules::CC)
            .output(object.as_str())
            .input(NinjaPath::under(ROOT_VAR, &source.path));
        if project.includes.consumer.as_deref() == Some(source.path.as_str()) {
            edge = edge.implicit(project.includes.output.as_str());
        }
        m.add_edge(edge).map_err(wrap)?;
        objects.push(object);
    }

    // Packed compiler includes
    m.add_edge(
        Edge::new(rules::COMPINCL)
            .output(project.includes.output.as_str())
            .inputs(input.headers.iter().map(|h| NinjaPath::under(TOP_VAR, h.as_str())))
            .implicit(tools.pack.as_path()),
    )
    .map_err(wrap)?;

    // Amalgamation
    let amalg = &project.amalg;
    let mut amalg_inputs = Vec::new();
    for item in &amalg.prelude {
        amalg_inputs.push(amalg_item_path(item.origin()?, &item.path));
    }
    for source in project.library_sources() {
        amalg_inputs.push(NinjaPath::under(ROOT_VAR, &source.path));
    }
    for item in &amalg.epilogue {
        amalg_inputs.push(amalg_item_path(item.origin()?, &item.path));
    }
    m.add_edge(
        Edge::new(rules::AMALG)
            .output(input.amalg_source())
            .output(input.amalg_header())
            .output(format!("{}/LICENSE", amalg.dir))
            .inputs(amalg_inputs)
            .implicits(Abi::ALL.map(|abi| NinjaPath::new(&input.codegen_output(abi))))
            .implicit(NinjaPath::under(ROOT_VAR, &amalg.header))
            .implicit(NinjaPath::under(TOP_VAR, &amalg.license))
            .implicit(tools.pack.as_path())
            .implicit(NinjaPath::under(TOP_VAR, MANIFEST_FILE)),
    )
    .map_err(wrap)?;
    m.add_edge(
        Edge::new(rules::CC)
            .output(input.amalg_object())
            .input(input.amalg_source()),
    )
    .map_err(wrap)?;

    // Compiler and bootstrap tool
    let exe = input.compiler_exe();
    m.add_edge(Edge::new(rules::LINK).output(exe.as_str()).inputs(&objects))
        .map_err(wrap)?;
    m.add_edge(
        Edge::new(rules::TOOLCC)
            .output(codegen_tool.as_str())
            .input(NinjaPath::under(ROOT_VAR, &project.codegen.tool)),
    )
    .map_err(wrap)?;

    // Tests
    let mut test_outputs = Vec::new();
    for (test, is_fuzz_case) in input
        .fixtures
        .iter()
        .map(|t| (t, false))
        .chain(input.fuzz_cases.iter().map(|t| (t, true)))
    {
        let mut edge = Edge::new(rules::TESTRUN)
            .output(test.path.as_path())
            .input(NinjaPath::under(TOP_VAR, test.path.as_str()))
            .implicit(exe.as_str());
        if !is_fuzz_case {
            edge = edge.implicit(NinjaPath::under(TOP_VAR, &project.tests.support));
        }
        edge = edge.bind(DATA_VAR, kiln_meta::encode(&test.to_record()));
        m.add_edge(edge).map_err(wrap)?;
        test_outputs.push(NinjaPath::from(test.path.as_path()));
    }

    // Update scenarios
    for scenario in input.scenarios {
        let driver_exe = input.driver_exe(scenario);
        m.add_edge(
            Edge::new(rules::DRIVERC)
                .output(driver_exe.as_str())
                .input(input.driver_source(scenario))
                .input(input.amalg_object())
                .implicit(input.amalg_header()),
        )
        .map_err(wrap)?;
        m.add_edge(
            Edge::new(rules::RUNBIN)
                .output(scenario.script.as_path())
                .input(driver_exe.as_str()),
        )
        .map_err(wrap)?;
        test_outputs.push(NinjaPath::from(scenario.script.as_path()));
    }

    m.add_edge(Edge::new(PHONY).output(TEST_TARGET).inputs(test_outputs))
        .map_err(wrap)?;
    m.add_default(exe.as_str());

    // Self-regeneration
    m.add_edge(
        Edge::new(rules::REGEN)
            .output(MANIFEST_NAME)
            .implicit(NinjaPath::under(TOP_VAR, MANIFEST_FILE))
            .implicit(tools.gen_exe.as_path())
            .implicits(
                input
                    .watched_dirs
                    .iter()
                    .map(|d| NinjaPath::under(TOP_VAR, d.as_str())),
            )
            .implicits(
                input
                    .fixtures
                    .iter()
                    .chain(input.fuzz_cases)
                    .map(|t| NinjaPath::under(TOP_VAR, t.path.as_str())),
            )
            .implicits(
                input
                    .scenarios
                    .iter()
                    .map(|s| NinjaPath::under(TOP_VAR, s.script.as_str())),
            ),
    )
    .map_err(wrap)?;

    m.validate().map_err(wrap)?;
    debug!(
        build_dir = %input.build_dir,
        rules = m.rules().len(),
        edges = m.edges().len(),
        "built manifest"
    );
    Ok(m)
}

fn amalg_item_path(origin: Origin, path: &str) -> NinjaPath {
    match origin {
        Origin::Src => NinjaPath::under(ROOT_VAR, path),
        Origin::Top => NinjaPath::under(TOP_VAR, path),
        Origin::Out => NinjaPath::new(path),
    }
}
