use thiserror::Error;
use tracing::warn;

use crate::{DEFAULT_ENTRY, DriverStep, ManagedFile, Origin, Scenario};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("file {path} declared after the first step")]
    FileAfterSteps { path: String },

    #[error("file {path} declared twice")]
    DuplicateFile { path: String },

    #[error("edit of unknown file {path}")]
    UnknownFile { path: String },

    #[error("{path} has {lines} lines, cannot edit line {line}")]
    LineOutOfRange {
        path: String,
        line: usize,
        lines: usize,
    },

    #[error("{path}:{line} does not contain {find:?}")]
    SubstringNotFound {
        path: String,
        line: usize,
        find: String,
    },

    #[error("scenario declares no files")]
    NoFiles,
}

#[derive(Debug, Clone)]
struct FileState {
    path: String,
    initial: String,
    current: String,
    dirty: bool,
}

/// Scenario scripting state.
///
/// Every call consumes the builder and hands back the next state, so there
/// is no ambient scripting state shared between scenarios.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    name: String,
    files: Vec<FileState>,
    include_paths: Vec<String>,
    host_helpers: Vec<String>,
    host_code: Vec<String>,
    entry: Option<String>,
    steps: Vec<DriverStep>,
    started: bool,
}

impl ScenarioBuilder {
    /// `name` is the script name used in expectation diagnostics
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
            include_paths: Vec::new(),
            host_helpers: Vec::new(),
            host_code: Vec::new(),
            entry: None,
            steps: Vec::new(),
            started: false,
        }
    }

    /// Declare a managed file. Its contents are what the initial build sees.
    pub fn file(
        mut self,
        path: impl Into<String>,
        contents: impl Into<String>,
    ) -> Result<Self, StepError> {
        let path = path.into();
        if self.started {
            return Err(StepError::FileAfterSteps { path });
        }
        if self.files.iter().any(|f| f.path == path) {
            return Err(StepError::DuplicateFile { path });
        }

        let contents = contents.into();
        self.files.push(FileState {
            path,
            initial: contents.clone(),
            current: contents,
            dirty: false,
        });
        Ok(self)
    }

    pub fn include_path(mut self, path: impl Into<String>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn host_helper(mut self, name: impl Into<String>) -> Self {
        self.host_helpers.push(name.into());
        self
    }

    pub fn host_code(mut self, code: impl Into<String>) -> Self {
        self.host_code.push(code.into());
        self
    }

    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Replace every occurrence of `find` in 1-indexed `line` of `path`
    pub fn edit(
        mut self,
        path: &str,
        line: usize,
        find: &str,
        replace: &str,
    ) -> Result<Self, StepError> {
        self.started = true;
        let file = self
            .files
            .iter_mut()
            .find(|f| f.path == path)
            .ok_or_else(|| StepError::UnknownFile {
                path: path.to_string(),
            })?;

        let mut lines: Vec<&str> = file.current.split_inclusive('\n').collect();
        if line == 0 || line > lines.len() {
            return Err(StepError::LineOutOfRange {
                path: path.to_string(),
                line,
                lines: lines.len(),
            });
        }

        let target = lines[line - 1];
        let (text, ending) = match target.strip_suffix('\n') {
            Some(text) => (text, "\n"),
            None => (target, ""),
        };
        if !text.contains(find) {
            return Err(StepError::SubstringNotFound {
                path: path.to_string(),
                line,
                find: find.to_string(),
            });
        }

        let edited = format!("{}{}", text.replace(find, replace), ending);
        lines[line - 1] = &edited;
        file.current = lines.concat();
        file.dirty = true;
        Ok(self)
    }

    /// One update per dirty file, in declaration order
    pub fn flush(mut self) -> Self {
        self.started = true;
        for file in self.files.iter_mut().filter(|f| f.dirty) {
            self.steps.push(DriverStep::Update {
                file: file.path.clone(),
                contents: file.current.clone(),
            });
            file.dirty = false;
        }
        self
    }

    /// Expect the entry point to return `value`; `line` is the script line
    pub fn expect(mut self, value: i32, line: usize) -> Self {
        self.started = true;
        self.steps.push(DriverStep::Expect {
            value,
            origin: Origin {
                script: self.name.clone(),
                line,
            },
        });
        self
    }

    pub fn build(self) -> Result<Scenario, StepError> {
        if self.files.is_empty() {
            return Err(StepError::NoFiles);
        }

        let unflushed: Vec<&str> = self
            .files
            .iter()
            .filter(|f| f.dirty)
            .map(|f| f.path.as_str())
            .collect();
        if !unflushed.is_empty() {
            warn!(scenario = %self.name, files = ?unflushed, "edits never flushed");
        }

        Ok(Scenario {
            name: self.name,
            files: self
                .files
                .into_iter()
                .map(|f| ManagedFile {
                    path: f.path,
                    contents: f.initial,
                })
                .collect(),
            include_paths: self.include_paths,
            host_helpers: self.host_helpers,
            host_code: self.host_code,
            entry: self.entry.unwrap_or_else(|| DEFAULT_ENTRY.to_string()),
            steps: self.steps,
        })
    }
}
