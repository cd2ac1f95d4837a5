//! Compiler-provided headers packed into a C header.
//!
//! The compiler looks headers up by virtual path (`__include__/<category>/<name>`)
//! and reads them out of one shared blob, each copy NUL-terminated.

use std::fmt::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::PackError;

/// Prefix of every virtual include path
pub const VIRTUAL_ROOT: &str = "__include__";

/// Column limit for the blob initializer
const WRAP_WIDTH: usize = 78;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeEntry {
    pub path: String,
    /// Start of this file's contents in the blob
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerIncludeBlob {
    entries: Vec<IncludeEntry>,
    blob: Vec<u8>,
}

impl CompilerIncludeBlob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file. Offsets increase in insertion order.
    pub fn push(&mut self, virtual_path: impl Into<String>, contents: &[u8]) {
        self.entries.push(IncludeEntry {
            path: virtual_path.into(),
            offset: self.blob.len(),
        });
        self.blob.extend_from_slice(contents);
        self.blob.push(0);
    }

    pub fn entries(&self) -> &[IncludeEntry] {
        &self.entries
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Contents stored for `virtual_path`, without the terminating NUL
    pub fn get(&self, virtual_path: &str) -> Option<&[u8]> {
        let entry = self.entries.iter().find(|e| e.path == virtual_path)?;
        let rest = &self.blob[entry.offset..];
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        Some(&rest[..len])
    }

    /// Render and write the generated header, leaving it untouched if unchanged
    pub fn write_to(&self, path: &Utf8Path) -> Result<(), PackError> {
        crate::write(path, self.render().as_bytes())
    }

    /// Render the generated header
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("// Generated by kiln-pack. Do not edit.\n\n");
        out.push_str(
            "typedef struct CompilerInclude {\n    char* path;\n    int offset;\n} CompilerInclude;\n\n",
        );

        let _ = writeln!(
            out,
            "static CompilerInclude compiler_includes[{}] = {{",
            self.entries.len()
        );
        for entry in &self.entries {
            let _ = writeln!(out, "    {{ \"{}\", {} }},", entry.path, entry.offset);
        }
        out.push_str("};\n");

        let _ = writeln!(
            out,
            "static unsigned char compiler_include_blob[{}] = {{",
            self.blob.len()
        );
        for line in wrap_bytes(&self.blob, WRAP_WIDTH) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("};\n");
        out
    }
}

/// Decimal byte values separated by `, `, broken into lines of at most `width`
fn wrap_bytes(bytes: &[u8], width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for (i, byte) in bytes.iter().enumerate() {
        let token = if i + 1 == bytes.len() {
            byte.to_string()
        } else {
            format!("{},", byte)
        };
        if !line.is_empty() && line.len() + 1 + token.len() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&token);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Pack `headers` (each under `root`) in the given order
pub fn pack_includes(
    root: &Utf8Path,
    headers: &[Utf8PathBuf],
) -> Result<CompilerIncludeBlob, PackError> {
    if headers.is_empty() {
        return Err(PackError::NoHeaders);
    }

    let mut packed = CompilerIncludeBlob::new();
    for header in headers {
        let relative = header
            .strip_prefix(root)
            .map_err(|_| PackError::OutsideRoot {
                path: header.clone(),
                root: root.to_owned(),
            })?;
        let virtual_path = std::iter::once(VIRTUAL_ROOT)
            .chain(relative.components().map(|c| c.as_str()))
            .collect::<Vec<_>>()
            .join("/");

        let contents = crate::read(header)?;
        packed.push(virtual_path, contents.as_bytes());
    }

    debug!(
        headers = packed.entries.len(),
        bytes = packed.blob.len(),
        "packed compiler includes"
    );
    Ok(packed)
}
