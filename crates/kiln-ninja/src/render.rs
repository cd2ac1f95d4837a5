use std::borrow::Cow;
use std::fmt::Write;

use crate::{Edge, Manifest, NinjaPath, Rule};

/// Escape a path for use in a `build` line: `$`, space and `:` are special
pub fn escape_path(path: &str) -> Cow<'_, str> {
    if !path.contains(['$', ' ', ':']) {
        return Cow::Borrowed(path);
    }

    let mut escaped = String::with_capacity(path.len() + 4);
    for c in path.chars() {
        if matches!(c, '$' | ' ' | ':') {
            escaped.push('$');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

pub(crate) fn render(manifest: &Manifest) -> String {
    let mut out = String::new();

    for line in &manifest.header {
        let _ = writeln!(out, "# {}", line);
    }
    if !manifest.header.is_empty() {
        out.push('\n');
    }

    for (name, value) in &manifest.variables {
        let _ = writeln!(out, "{} = {}", name, value);
    }
    if !manifest.variables.is_empty() {
        out.push('\n');
    }

    for rule in &manifest.rules {
        render_rule(&mut out, rule);
        out.push('\n');
    }

    for edge in &manifest.edges {
        render_edge(&mut out, edge);
    }

    if !manifest.defaults.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "default {}", join(&manifest.defaults));
    }

    out
}

fn render_rule(out: &mut String, rule: &Rule) {
    let _ = writeln!(out, "rule {}", rule.name);
    let _ = writeln!(out, "  command = {}", rule.command);
    if let Some(description) = &rule.description {
        let _ = writeln!(out, "  description = {}", description);
    }
    if let Some(deps) = &rule.deps {
        let _ = writeln!(out, "  deps = {}", deps);
    }
    if let Some(depfile) = &rule.depfile {
        let _ = writeln!(out, "  depfile = {}", depfile);
    }
    if rule.generator {
        out.push_str("  generator = 1\n");
    }
    if rule.restat {
        out.push_str("  restat = 1\n");
    }
}

fn render_edge(out: &mut String, edge: &Edge) {
    let _ = write!(out, "build {}: {}", join(&edge.outputs), edge.rule);
    if !edge.inputs.is_empty() {
        let _ = write!(out, " {}", join(&edge.inputs));
    }
    if !edge.implicit.is_empty() {
        let _ = write!(out, " | {}", join(&edge.implicit));
    }
    if !edge.order_only.is_empty() {
        let _ = write!(out, " || {}", join(&edge.order_only));
    }
    out.push('\n');

    for (key, value) in &edge.bindings {
        let _ = writeln!(out, "  {} = {}", key, value);
    }
}

fn join(paths: &[NinjaPath]) -> String {
    paths
        .iter()
        .map(NinjaPath::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
