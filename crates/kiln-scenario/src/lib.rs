//! Update-scenario compiler
//!
//! A scenario script (`.scn`) describes a set of managed C files and a
//! sequence of edits, flushes and expectations. It is folded into a
//! [`ScenarioBuilder`], resolved into a [`Scenario`], and compiled into a
//! standalone C driver program that exercises the incremental compiler's
//! embeddable API step by step.

mod builder;
mod driver;
mod script;

pub use builder::{ScenarioBuilder, StepError};
pub use driver::{
    compile, EXIT_ENTRY_NOT_FOUND, EXIT_UPDATE_FAILED, EXIT_VALUE_MISMATCH,
};
pub use script::parse;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Entry point called by `expect` steps unless the script overrides it
pub const DEFAULT_ENTRY: &str = "main";

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{script}:{line}: {message}")]
    Syntax {
        script: String,
        line: usize,
        message: String,
    },

    #[error("{script}:{line}: {source}")]
    Step {
        script: String,
        line: usize,
        #[source]
        source: StepError,
    },
}

/// A file under the incremental compiler's management, with its initial contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    pub path: String,
    pub contents: String,
}

/// Where an expectation was written, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub script: String,
    pub line: usize,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.script, self.line)
    }
}

/// One step of the compiled driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverStep {
    /// Hand new contents for one file to the incremental compiler
    Update { file: String, contents: String },
    /// Call the entry point and compare its result
    Expect { value: i32, origin: Origin },
}

/// A fully resolved scenario, ready to compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Script file name, used in diagnostics
    pub name: String,
    /// Managed files in declaration order
    pub files: Vec<ManagedFile>,
    pub include_paths: Vec<String>,
    /// Host functions the compiled code may call
    pub host_helpers: Vec<String>,
    /// C code compiled into the driver ahead of everything else
    pub host_code: Vec<String>,
    pub entry: String,
    pub steps: Vec<DriverStep>,
}

/// A scenario script together with its driver source
#[derive(Debug, Clone)]
pub struct CompiledScenario {
    /// Script path as given
    pub script: Utf8PathBuf,
    pub scenario: Scenario,
    pub driver: String,
}

impl CompiledScenario {
    /// File name of the script, e.g. `update_basic.scn`
    pub fn file_name(&self) -> &str {
        self.script.file_name().unwrap_or(self.script.as_str())
    }
}

/// Read, parse and compile one scenario script
pub fn compile_script(path: &Utf8Path) -> Result<CompiledScenario, ScenarioError> {
    let source = std::fs::read_to_string(path).map_err(|e| ScenarioError::Read {
        path: path.to_owned(),
        source: e,
    })?;

    let name = path.file_name().unwrap_or(path.as_str());
    let scenario = parse(name, &source)?;
    let driver = compile(&scenario);

    Ok(CompiledScenario {
        script: path.to_owned(),
        scenario,
        driver,
    })
}
