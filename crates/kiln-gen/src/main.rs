//! kiln-gen - write build.ninja for every profile of the host platform
//!
//! Run it from anywhere inside the project; ninja re-runs it from the build
//! directory whenever kiln.kdl or the test inputs change.

use camino::Utf8PathBuf;
use eyre::{Result, WrapErr};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use kiln_gen::{Tools, generate};
use kiln_project::KilnManifest;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if std::env::args().len() > 1 {
        eprintln!("usage: kiln-gen");
        std::process::exit(1);
    }

    let cwd = std::env::current_dir().wrap_err("failed to read current directory")?;
    let cwd = Utf8PathBuf::try_from(cwd).wrap_err("current directory is not valid UTF-8")?;
    let manifest = KilnManifest::find(&cwd)?;
    let root = manifest
        .parent()
        .map(|p| p.to_owned())
        .unwrap_or_else(|| cwd.clone());

    let tools = Tools::beside_current_exe()?;
    let report = generate(&root, &tools).wrap_err_with(|| format!("generating {}", root))?;

    for path in &report.written {
        let shown = path.strip_prefix(&root).unwrap_or(path);
        println!("{} {}", "wrote".green().bold(), shown);
    }
    for path in &report.unchanged {
        let shown = path.strip_prefix(&root).unwrap_or(path);
        println!("{} {}", "unchanged".dimmed(), shown);
    }

    Ok(())
}
