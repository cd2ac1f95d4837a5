//! In-memory model of a ninja manifest
//!
//! A [`Manifest`] is built up rule by rule and edge by edge, validated, and
//! only then rendered. Two invariants are enforced:
//! - every output path has exactly one writing edge (checked on insertion)
//! - every edge uses a declared rule and the graph is acyclic (checked by
//!   [`Manifest::validate`])

mod render;

use std::collections::HashMap;

use camino::Utf8Path;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::debug;

pub use render::escape_path;

/// Built-in ninja rule that does nothing
pub const PHONY: &str = "phony";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("rule {0} is declared twice")]
    DuplicateRule(String),

    #[error("{path} is produced by both a {first} edge and a {second} edge")]
    DuplicateOutput {
        path: String,
        first: String,
        second: String,
    },

    #[error("a {rule} edge has no outputs")]
    NoOutputs { rule: String },

    #[error("edge producing {output} uses undeclared rule {rule}")]
    UnknownRule { rule: String, output: String },

    #[error("default target {0} is not produced by any edge")]
    UnknownDefault(String),

    #[error("dependency cycle through {0}")]
    Cycle(String),
}

/// A path as it appears in the manifest, already escaped
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NinjaPath(String);

impl NinjaPath {
    /// A literal path, relative to the build directory
    pub fn new(path: &str) -> Self {
        Self(escape_path(path).into_owned())
    }

    /// A path under a manifest variable, e.g. `$root/type.c`
    pub fn under(var: &str, path: &str) -> Self {
        Self(format!("${}/{}", var, escape_path(path)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NinjaPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for NinjaPath {
    fn from(path: String) -> Self {
        Self::new(&path)
    }
}

impl From<&String> for NinjaPath {
    fn from(path: &String) -> Self {
        Self::new(path)
    }
}

impl From<&Utf8Path> for NinjaPath {
    fn from(path: &Utf8Path) -> Self {
        Self::new(path.as_str())
    }
}

impl std::fmt::Display for NinjaPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `rule` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    /// Command template; `$in`, `$out` and manifest variables are expanded by ninja
    pub command: String,
    pub description: Option<String>,
    pub deps: Option<String>,
    pub depfile: Option<String>,
    /// Marks the rule that regenerates the manifest itself
    pub generator: bool,
    /// Re-stat outputs after the command runs, so untouched outputs don't
    /// dirty their dependents
    pub restat: bool,
}

impl Rule {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            description: None,
            deps: None,
            depfile: None,
            generator: false,
            restat: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn deps(mut self, deps: impl Into<String>) -> Self {
        self.deps = Some(deps.into());
        self
    }

    pub fn depfile(mut self, depfile: impl Into<String>) -> Self {
        self.depfile = Some(depfile.into());
        self
    }

    pub fn generator(mut self) -> Self {
        self.generator = true;
        self
    }

    pub fn restat(mut self) -> Self {
        self.restat = true;
        self
    }
}

/// A `build` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub outputs: Vec<NinjaPath>,
    pub rule: String,
    /// Substituted into `$in`, in order
    pub inputs: Vec<NinjaPath>,
    /// Affect staleness but not `$in`
    pub implicit: Vec<NinjaPath>,
    /// Must exist before the edge runs, but never make it stale
    pub order_only: Vec<NinjaPath>,
    /// Per-edge variables, rendered in insertion order
    pub bindings: Vec<(String, String)>,
}

impl Edge {
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            outputs: Vec::new(),
            rule: rule.into(),
            inputs: Vec::new(),
            implicit: Vec::new(),
            order_only: Vec::new(),
            bindings: Vec::new(),
        }
    }

    pub fn output(mut self, path: impl Into<NinjaPath>) -> Self {
        self.outputs.push(path.into());
        self
    }

    pub fn input(mut self, path: impl Into<NinjaPath>) -> Self {
        self.inputs.push(path.into());
        self
    }

    pub fn inputs<P: Into<NinjaPath>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.inputs.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn implicit(mut self, path: impl Into<NinjaPath>) -> Self {
        self.implicit.push(path.into());
        self
    }

    pub fn implicits<P: Into<NinjaPath>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.implicit.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn order_only(mut self, path: impl Into<NinjaPath>) -> Self {
        self.order_only.push(path.into());
        self
    }

    /// Bind an edge variable. The value is written verbatim.
    pub fn bind(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.bindings.push((key.into(), value.into()));
        self
    }

    /// Every path this edge reads, in any role
    fn all_inputs(&self) -> impl Iterator<Item = &NinjaPath> {
        self.inputs
            .iter()
            .chain(&self.implicit)
            .chain(&self.order_only)
    }
}

/// A complete manifest
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    header: Vec<String>,
    variables: Vec<(String, String)>,
    rules: Vec<Rule>,
    edges: Vec<Edge>,
    defaults: Vec<NinjaPath>,
    /// output path -> index of its writing edge
    writers: HashMap<NinjaPath, usize>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line to the comment block at the top of the file
    pub fn comment(&mut self, line: impl Into<String>) {
        self.header.push(line.into());
    }

    /// Declare a top-level variable
    pub fn variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.push((name.into(), value.into()));
    }

    pub fn add_rule(&mut self, rule: Rule) -> Result<(), ManifestError> {
        if rule.name == PHONY || self.rules.iter().any(|r| r.name == rule.name) {
            return Err(ManifestError::DuplicateRule(rule.name));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Insert an edge, rejecting it if any of its outputs already has a writer
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), ManifestError> {
        if edge.outputs.is_empty() {
            return Err(ManifestError::NoOutputs { rule: edge.rule });
        }

        let index = self.edges.len();
        for (i, output) in edge.outputs.iter().enumerate() {
            let earlier = self
                .writers
                .get(output)
                .map(|&w| self.edges[w].rule.clone())
                .or_else(|| edge.outputs[..i].contains(output).then(|| edge.rule.clone()));
            if let Some(first) = earlier {
                return Err(ManifestError::DuplicateOutput {
                    path: output.to_string(),
                    first,
                    second: edge.rule.clone(),
                });
            }
        }

        for output in &edge.outputs {
            self.writers.insert(output.clone(), index);
        }
        debug!(rule = %edge.rule, output = %edge.outputs[0], "edge");
        self.edges.push(edge);
        Ok(())
    }

    pub fn add_default(&mut self, path: impl Into<NinjaPath>) {
        self.defaults.push(path.into());
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// The edge that writes `path`, if any
    pub fn writer_of(&self, path: &NinjaPath) -> Option<&Edge> {
        self.writers.get(path).map(|&i| &self.edges[i])
    }

    /// Check that the manifest is safe to hand to ninja: declared rules,
    /// one writer per output, known defaults, and no cycles.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.edges.len(), 0);
        let nodes: Vec<NodeIndex> = (0..self.edges.len()).map(|i| graph.add_node(i)).collect();
        let mut producers: HashMap<&NinjaPath, usize> = HashMap::new();

        for (i, edge) in self.edges.iter().enumerate() {
            if edge.rule != PHONY && self.rule(&edge.rule).is_none() {
                return Err(ManifestError::UnknownRule {
                    rule: edge.rule.clone(),
                    output: edge.outputs.first().map(ToString::to_string).unwrap_or_default(),
                });
            }
            for output in &edge.outputs {
                if let Some(&first) = producers.get(output) {
                    return Err(ManifestError::DuplicateOutput {
                        path: output.to_string(),
                        first: self.edges[first].rule.clone(),
                        second: edge.rule.clone(),
                    });
                }
                producers.insert(output, i);
            }
        }

        for default in &self.defaults {
            if !producers.contains_key(default) {
                return Err(ManifestError::UnknownDefault(default.to_string()));
            }
        }

        // producer -> consumer
        for (i, edge) in self.edges.iter().enumerate() {
            for input in edge.all_inputs() {
                if let Some(&producer) = producers.get(input) {
                    graph.add_edge(nodes[producer], nodes[i], ());
                }
            }
        }

        toposort(&graph, None).map_err(|cycle| {
            let edge = &self.edges[graph[cycle.node_id()]];
            ManifestError::Cycle(edge.outputs.first().map(ToString::to_string).unwrap_or_default())
        })?;

        Ok(())
    }

    /// Render to ninja syntax. Call [`Manifest::validate`] first.
    pub fn render(&self) -> String {
        render::render(self)
    }
}
