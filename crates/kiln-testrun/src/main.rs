//! kiln-testrun - run one test from the generated build.ninja
//!
//! Exit status: 0 pass, 1 output mismatch, 2 wrong return code, crash, or a
//! test that could not be run at all.

use camino::Utf8PathBuf;
use eyre::{Result, WrapErr};
use facet::Facet;
use facet_args as args;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use kiln_testrun::{EXIT_ERROR, Verdict, line_diff, run};

/// kiln-testrun - run one test from the generated build.ninja
#[derive(Facet, Debug)]
struct Cli {
    /// Project root; the test runs with this as its working directory
    #[facet(args::positional)]
    root: String,

    /// Compiler under test, relative to the project root
    #[facet(args::positional)]
    exe: String,

    /// Encoded test record
    #[facet(args::positional)]
    token: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let code = match run_test() {
        Ok(verdict) => verdict.exit_code(),
        Err(e) => {
            println!("{} {:?}", "ERROR:".red().bold(), e);
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}

fn run_test() -> Result<Verdict> {
    let cli: Cli = args::from_std_args()?;

    let root = Utf8PathBuf::from(&cli.root)
        .canonicalize_utf8()
        .wrap_err_with(|| format!("project root {} does not exist", cli.root))?;
    let exe = Utf8PathBuf::from(&cli.exe);
    let exe = if exe.is_relative() { root.join(exe) } else { exe };

    let record = kiln_meta::decode(&cli.token).wrap_err("invalid test metadata")?;
    let verdict = run(&root, &exe, &record)?;

    match &verdict {
        Verdict::Pass => {}
        Verdict::OutputMismatch { expected, actual } => {
            println!("{} {}", "output mismatch:".red().bold(), record.run);
            print!("{}", line_diff(expected, actual));
        }
        Verdict::ReturnMismatch { expected, actual } => {
            println!(
                "{} got return code {}, but expected {}",
                "FAILED:".red().bold(),
                actual,
                expected
            );
        }
        Verdict::Crash { status: Some(code) } => {
            println!("{} exited with {} ({})", "CRASHED:".red().bold(), code, record.ret);
        }
        Verdict::Crash { status: None } => {
            println!("{} killed by a signal", "CRASHED:".red().bold());
        }
    }

    Ok(verdict)
}
