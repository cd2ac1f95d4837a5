use std::fs;
use std::path::PathBuf;
use std::process::Command;

use eyre::{Result, WrapErr, bail, eyre};

/// Binaries the generated manifests invoke. They must sit in one directory.
const BINARIES: [&str; 3] = ["kiln-gen", "kiln-pack", "kiln-testrun"];

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo xtask <command>");
        eprintln!("\nAvailable commands:");
        eprintln!("  install    Build the kiln tools and install them side by side");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "install" => install(),
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
}

fn install() -> Result<()> {
    println!("Building kiln tools in release mode...\n");

    let mut cargo = Command::new("cargo");
    cargo.arg("build").arg("--release");
    for binary in BINARIES {
        cargo.arg("-p").arg(binary);
    }
    let status = cargo.status().wrap_err("failed to run cargo")?;
    if !status.success() {
        bail!("cargo build failed with {}", status);
    }

    println!("✓ Build completed\n");

    let cargo_bin = dirs::home_dir()
        .ok_or_else(|| eyre!("could not determine home directory"))?
        .join(".cargo")
        .join("bin");
    fs::create_dir_all(&cargo_bin)
        .wrap_err_with(|| format!("failed to create {}", cargo_bin.display()))?;

    let release_dir = PathBuf::from("target/release");
    println!("Installing to {}...\n", cargo_bin.display());

    for binary in BINARIES {
        let file_name = format!("{}{}", binary, std::env::consts::EXE_SUFFIX);
        let src = release_dir.join(&file_name);
        if !src.exists() {
            // the three tools are only ever installed together
            bail!("{} not found in target/release", file_name);
        }

        let dst = cargo_bin.join(&file_name);
        fs::copy(&src, &dst).wrap_err_with(|| format!("failed to install {}", file_name))?;
        println!("✓ {} installed", binary);
    }

    println!("\nkiln-gen, kiln-pack and kiln-testrun installed.");
    Ok(())
}
