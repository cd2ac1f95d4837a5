//! Packing tools run by the generated manifests
//!
//! - [`includes`]: pack the compiler-provided headers into one generated C
//!   header holding a path/offset table and a byte blob
//! - [`amalg`]: concatenate the compiler sources into a single translation
//!   unit distributed as an embeddable library

pub mod amalg;
pub mod includes;

pub use amalg::{AmalgOptions, amalgamate};
pub use includes::{CompilerIncludeBlob, IncludeEntry, pack_includes};

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not under the include root {root}")]
    OutsideRoot { path: Utf8PathBuf, root: Utf8PathBuf },

    #[error("no headers to pack")]
    NoHeaders,
}

pub(crate) fn read(path: &camino::Utf8Path) -> Result<String, PackError> {
    std::fs::read_to_string(path).map_err(|e| PackError::Read {
        path: path.to_owned(),
        source: e,
    })
}

pub(crate) fn write(path: &camino::Utf8Path, contents: &[u8]) -> Result<(), PackError> {
    let outcome = kiln_io::write_if_changed(path, contents).map_err(|e| PackError::Write {
        path: path.to_owned(),
        source: e,
    })?;
    tracing::debug!(%path, ?outcome, "wrote");
    Ok(())
}
