//! Error types for kiln-gen.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that abort generation. Nothing is written when one occurs.
#[derive(Debug, Error)]
pub enum GenError {
    // === Configuration Errors ===
    #[error(transparent)]
    Project(#[from] kiln_project::ProjectError),

    #[error(transparent)]
    Toolchain(#[from] kiln_toolchain::ToolchainError),

    #[error("required input {path} does not exist")]
    MissingInput { path: Utf8PathBuf },

    // === Discovery Errors ===
    #[error(transparent)]
    Discover(#[from] kiln_discover::DiscoverError),

    #[error(transparent)]
    Scenario(#[from] kiln_scenario::ScenarioError),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: Utf8PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("path is not valid UTF-8: {0:?}")]
    NonUtf8Path(std::path::PathBuf),

    // === Graph Errors ===
    #[error("invalid manifest for {build_dir}: {source}")]
    Manifest {
        build_dir: String,
        #[source]
        source: kiln_ninja::ManifestError,
    },

    // === IO Errors ===
    #[error("cannot locate the kiln-gen executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
