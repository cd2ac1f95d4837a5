//! kiln.kdl project manifest parsing
//!
//! Describes the C project the manifests are generated for: where sources
//! live, the order-sensitive source list, the code generation step, the
//! compiler-provided headers, the amalgamation and the test layout.
//!
//! kiln.kdl is also the generator script: the manifest regeneration edge
//! depends on it, so editing it regenerates every build.ninja.

use camino::{Utf8Path, Utf8PathBuf};
use facet_kdl as kdl;
use thiserror::Error;

/// File name of the project manifest
pub const MANIFEST_FILE: &str = "kiln.kdl";

/// Errors during kiln.kdl parsing
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse kiln.kdl: {0}")]
    ParseError(String),

    #[error("no kiln.kdl found in {start} or any parent directory")]
    NotFound { start: Utf8PathBuf },

    #[error("invalid value for {property}: {reason}")]
    InvalidValue {
        property: &'static str,
        reason: String,
    },

    #[error("no sources listed")]
    NoSources,
}

/// Project metadata
#[derive(Debug, Clone, facet::Facet)]
pub struct Project {
    /// Base name of the compiler executable
    #[facet(kdl::property)]
    pub name: String,
    /// Source directory, relative to the project root
    #[facet(kdl::property)]
    pub src: String,
    /// Directory holding one build directory per platform/profile
    #[facet(kdl::property)]
    pub out: String,
}

/// Assembler-based code generation step
#[derive(Debug, Clone, facet::Facet)]
pub struct Codegen {
    /// Assembler input, relative to `src`
    #[facet(kdl::property)]
    pub input: String,
    /// Stem of the generated files (`codegen` -> `codegen.l.c`, `codegen.w.c`)
    #[facet(kdl::property)]
    pub output: String,
    /// Single-file source of the bootstrap tool that runs the assembler, relative to `src`
    #[facet(kdl::property)]
    pub tool: String,
    /// Assembler script run by the tool, relative to `src`
    #[facet(kdl::property)]
    pub script: String,
}

impl Codegen {
    /// Executable name of the bootstrap tool (without suffix)
    pub fn tool_name(&self) -> &str {
        let file = self.tool.rsplit('/').next().unwrap_or(&self.tool);
        file.strip_suffix(".c").unwrap_or(file)
    }
}

/// Compiler-provided headers packed into a single generated header
#[derive(Debug, Clone, facet::Facet)]
pub struct Includes {
    /// Header tree, relative to the project root
    #[facet(kdl::property)]
    pub dir: String,
    /// Generated header name, in the build directory
    #[facet(kdl::property)]
    pub output: String,
    /// Source (relative to `src`) that includes the generated header
    #[facet(kdl::property, default)]
    pub consumer: Option<String>,
}

/// Where an amalgamation item lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Relative to the source directory
    Src,
    /// Relative to the project root
    Top,
    /// Generated into the build directory
    Out,
}

/// One extra file in the amalgamation
#[derive(Debug, Clone, facet::Facet)]
pub struct AmalgItem {
    #[facet(kdl::property)]
    pub path: String,
    /// "src" (default), "top" or "out"
    #[facet(kdl::property, default)]
    pub from: Option<String>,
}

impl AmalgItem {
    pub fn origin(&self) -> Result<Origin, ProjectError> {
        match self.from.as_deref() {
            None | Some("src") => Ok(Origin::Src),
            Some("top") => Ok(Origin::Top),
            Some("out") => Ok(Origin::Out),
            Some(other) => Err(ProjectError::InvalidValue {
                property: "amalg.from",
                reason: format!("expected src, top or out, got {:?}", other),
            }),
        }
    }
}

/// Single translation unit distribution of the compiler as a library
#[derive(Debug, Clone, facet::Facet)]
pub struct Amalg {
    /// Output directory, relative to the build directory
    #[facet(kdl::property)]
    pub dir: String,
    /// Base name of the generated `.c`/`.h` pair
    #[facet(kdl::property)]
    pub name: String,
    /// Public header copied next to the amalgamation, relative to `src`
    #[facet(kdl::property)]
    pub header: String,
    /// License file copied next to the amalgamation, relative to the project root
    #[facet(kdl::property)]
    pub license: String,
    /// Preprocessor symbol selecting the Windows code generation variant
    #[facet(kdl::property)]
    pub switch: String,
    /// Files concatenated before the sources
    #[facet(kdl::children, rename = "prelude", default)]
    pub prelude: Vec<AmalgItem>,
    /// Files concatenated after the sources
    #[facet(kdl::children, rename = "epilogue", default)]
    pub epilogue: Vec<AmalgItem>,
}

/// Test layout
#[derive(Debug, Clone, facet::Facet)]
pub struct Tests {
    /// Fixture directory, relative to the project root
    #[facet(kdl::property)]
    pub dir: String,
    /// Support file compiled together with every fixture
    #[facet(kdl::property)]
    pub support: String,
    /// Fixture file pattern (default `*.c`)
    #[facet(kdl::property, default)]
    pub fixtures: Option<String>,
    /// Update scenario file pattern (default `update_*.scn`)
    #[facet(kdl::property, default)]
    pub scenarios: Option<String>,
    /// Directory of fuzzer-found inputs that must not crash the compiler
    #[facet(kdl::property, default)]
    pub fuzz: Option<String>,
    /// Run arguments for fixtures without a RUN directive
    #[facet(kdl::property, default)]
    pub run: Option<String>,
}

impl Tests {
    pub fn fixture_pattern(&self) -> Result<FilePattern, ProjectError> {
        FilePattern::parse(self.fixtures.as_deref().unwrap_or("*.c"))
    }

    pub fn scenario_pattern(&self) -> Result<FilePattern, ProjectError> {
        FilePattern::parse(self.scenarios.as_deref().unwrap_or("update_*.scn"))
    }

    /// Run arguments for fixtures that don't override them; `{self}` is
    /// replaced by the fixture path at discovery time.
    pub fn default_run(&self) -> String {
        match &self.run {
            Some(run) => run.clone(),
            None => format!("-I{} {} {{self}}", self.dir, self.support),
        }
    }
}

/// Mutually exclusive entry point variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// The normal command line entry point
    Main,
    /// The fuzzer harness entry point
    Fuzz,
}

impl Variant {
    /// Whether a source of this variant is compiled into a build
    pub fn included_in(&self, fuzz_build: bool) -> bool {
        match self {
            Variant::Main => !fuzz_build,
            Variant::Fuzz => fuzz_build,
        }
    }
}

/// A compiler source file
#[derive(Debug, Clone, facet::Facet)]
pub struct Source {
    /// Path relative to `src`
    #[facet(kdl::property)]
    pub path: String,
    /// "main" or "fuzz" for entry point sources
    #[facet(kdl::property, default)]
    pub variant: Option<String>,
}

impl Source {
    pub fn variant(&self) -> Result<Option<Variant>, ProjectError> {
        match self.variant.as_deref() {
            None => Ok(None),
            Some("main") => Ok(Some(Variant::Main)),
            Some("fuzz") => Ok(Some(Variant::Fuzz)),
            Some(other) => Err(ProjectError::InvalidValue {
                property: "source.variant",
                reason: format!("expected main or fuzz, got {:?}", other),
            }),
        }
    }
}

/// A file name pattern with at most one `*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    prefix: String,
    suffix: Option<String>,
}

impl FilePattern {
    pub fn parse(pattern: &str) -> Result<Self, ProjectError> {
        let mut parts = pattern.split('*');
        let prefix = parts.next().unwrap_or_default().to_string();
        let suffix = parts.next().map(str::to_string);
        if parts.next().is_some() || pattern.contains('/') {
            return Err(ProjectError::InvalidValue {
                property: "tests pattern",
                reason: format!("{:?} must be a file name with at most one '*'", pattern),
            });
        }
        Ok(Self { prefix, suffix })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        match &self.suffix {
            None => file_name == self.prefix,
            Some(suffix) => {
                file_name.len() >= self.prefix.len() + suffix.len()
                    && file_name.starts_with(&self.prefix)
                    && file_name.ends_with(suffix.as_str())
            }
        }
    }
}

/// Top-level kiln.kdl manifest
#[derive(Debug, Clone, facet::Facet)]
pub struct KilnManifest {
    #[facet(kdl::child)]
    pub project: Project,
    #[facet(kdl::child)]
    pub codegen: Codegen,
    #[facet(kdl::child)]
    pub includes: Includes,
    #[facet(kdl::child)]
    pub amalg: Amalg,
    #[facet(kdl::child)]
    pub tests: Tests,
    #[facet(kdl::children, rename = "source", default)]
    pub sources: Vec<Source>,
}

impl KilnManifest {
    /// Parse kiln.kdl from a file path
    pub fn from_path(path: &Utf8Path) -> Result<Self, ProjectError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ProjectError::ReadError {
            path: path.to_owned(),
            source: e,
        })?;

        Self::parse(&contents)
    }

    /// Parse kiln.kdl from a string
    pub fn parse(source: &str) -> Result<Self, ProjectError> {
        facet_kdl::from_str(source).map_err(|e| ProjectError::ParseError(e.to_string()))
    }

    /// Find kiln.kdl starting from the given directory and searching upward
    pub fn find(start_path: &Utf8Path) -> Result<Utf8PathBuf, ProjectError> {
        let mut current = start_path;
        loop {
            let candidate = current.join(MANIFEST_FILE);
            if candidate.exists() {
                return Ok(candidate);
            }

            current = current.parent().ok_or_else(|| ProjectError::NotFound {
                start: start_path.to_owned(),
            })?;
        }
    }

    /// Sources that belong in the amalgamation (entry point variants never do)
    pub fn library_sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.variant.is_none())
    }

    /// Validate the manifest (required fields, consistency between sections)
    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.project.name.is_empty() {
            return Err(ProjectError::InvalidValue {
                property: "project.name",
                reason: "name cannot be empty".to_string(),
            });
        }

        if self.sources.is_empty() {
            return Err(ProjectError::NoSources);
        }

        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            source.variant()?;
            if !seen.insert(source.path.as_str()) {
                return Err(ProjectError::InvalidValue {
                    property: "source.path",
                    reason: format!("{} is listed twice", source.path),
                });
            }
        }

        if let Some(consumer) = &self.includes.consumer {
            if !seen.contains(consumer.as_str()) {
                return Err(ProjectError::InvalidValue {
                    property: "includes.consumer",
                    reason: format!("{} is not a listed source", consumer),
                });
            }
        }

        for item in self.amalg.prelude.iter().chain(&self.amalg.epilogue) {
            if item.origin()? == Origin::Out && item.path != self.includes.output {
                return Err(ProjectError::InvalidValue {
                    property: "amalg.from",
                    reason: format!("{} is not generated by any step", item.path),
                });
            }
        }

        self.tests.fixture_pattern()?;
        self.tests.scenario_pattern()?;

        Ok(())
    }
}
