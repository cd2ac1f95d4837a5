//! Test execution harness
//!
//! Runs the compiler under test with the arguments from a [`TestRecord`] and
//! judges the outcome. Crashes are kept apart from ordinary failures:
//! an out-of-range exit status, death by signal, or the sanitizer sentinel
//! is always a [`Verdict::Crash`], whatever the test expected.

mod diff;

pub use diff::line_diff;

use std::ops::RangeInclusive;
use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use kiln_meta::{ExpectedReturn, TestRecord};
use thiserror::Error;
use tracing::debug;

/// Exit code the address sanitizer is told to use on error
pub const SANITIZER_EXIT_CODE: i32 = 117;

/// Environment handed to every test process
pub const SANITIZER_ENV: (&str, &str) = ("ASAN_OPTIONS", "exitcode=117");

/// Exit codes a process can produce by returning normally. Death by signal
/// carries no code at all, and unhandled Windows exceptions surface as
/// NTSTATUS values such as `0xC0000005`, far outside.
pub const NORMAL_EXIT_CODES: RangeInclusive<i32> = 0..=255;

/// Exit code for a runner that could not judge the test at all
pub const EXIT_ERROR: i32 = 2;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {exe}: {source}")]
    Spawn {
        exe: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Stdout differed from the expected text
    OutputMismatch { expected: String, actual: String },
    /// A normal exit with the wrong code
    ReturnMismatch { expected: i32, actual: i32 },
    /// Abnormal termination; `None` when killed by a signal
    Crash { status: Option<i32> },
}

impl Verdict {
    /// Process exit code reported to ninja
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::OutputMismatch { .. } => 1,
            Verdict::ReturnMismatch { .. } | Verdict::Crash { .. } => EXIT_ERROR,
        }
    }
}

/// Whether `status` is an ordinary process exit
pub fn is_normal_exit(status: Option<i32>) -> bool {
    match status {
        Some(code) => NORMAL_EXIT_CODES.contains(&code) && code != SANITIZER_EXIT_CODE,
        None => false,
    }
}

/// Judge an exit status against the expectation
pub fn judge(status: Option<i32>, expected: &ExpectedReturn) -> Verdict {
    let crashed = !is_normal_exit(status);
    match (status, expected) {
        (_, ExpectedReturn::NoCrash) if crashed => Verdict::Crash { status },
        (_, ExpectedReturn::NoCrash) => Verdict::Pass,
        (_, ExpectedReturn::Exit { .. }) if crashed => Verdict::Crash { status },
        (Some(actual), ExpectedReturn::Exit { code }) if actual == *code => Verdict::Pass,
        (Some(actual), ExpectedReturn::Exit { code }) => Verdict::ReturnMismatch {
            expected: *code,
            actual,
        },
        (None, ExpectedReturn::Exit { .. }) => Verdict::Crash { status },
    }
}

/// Split a run string into arguments on single spaces. Doubled spaces
/// produce empty arguments; there is no quoting.
pub fn split_args(run: &str) -> Vec<&str> {
    run.split(' ').collect()
}

/// Run `exe` in `root` as described by `record`
pub fn run(root: &Utf8Path, exe: &Utf8Path, record: &TestRecord) -> Result<Verdict, RunError> {
    let args = split_args(&record.run);
    debug!(%exe, ?args, %root, "running test");

    let mut command = Command::new(exe);
    command
        .args(&args)
        .current_dir(root)
        .env(SANITIZER_ENV.0, SANITIZER_ENV.1);

    let spawn_error = |source| RunError::Spawn {
        exe: exe.to_owned(),
        source,
    };

    let status = if record.checks_output() {
        let output = command
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(spawn_error)?;
        let actual = String::from_utf8_lossy(&output.stdout).replace("\r\n", "\n");
        if actual != record.txt {
            return Ok(Verdict::OutputMismatch {
                expected: record.txt.clone(),
                actual,
            });
        }
        output.status.code()
    } else {
        command.status().map_err(spawn_error)?.code()
    };

    debug!(?status, "test finished");
    Ok(judge(status, &record.ret))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_CRASH: ExpectedReturn = ExpectedReturn::NoCrash;

    #[test]
    fn sentinel_is_always_a_failure() {
        let status = Some(SANITIZER_EXIT_CODE);
        assert_eq!(judge(status, &NO_CRASH), Verdict::Crash { status });
        assert_eq!(
            judge(status, &ExpectedReturn::Exit { code: 0 }),
            Verdict::Crash { status }
        );
        assert_eq!(
            judge(status, &ExpectedReturn::Exit { code: SANITIZER_EXIT_CODE }),
            Verdict::Crash { status }
        );
    }

    #[test]
    fn no_crash_accepts_normal_exits() {
        for code in [0, 1, 116, 118, 254, 255] {
            assert_eq!(judge(Some(code), &NO_CRASH), Verdict::Pass, "code {code}");
        }
    }

    #[test]
    fn out_of_range_and_signals_are_crashes() {
        for status in [Some(-1073741819), Some(256), Some(-1), None] {
            assert_eq!(judge(status, &NO_CRASH), Verdict::Crash { status });
            assert_eq!(
                judge(status, &ExpectedReturn::Exit { code: 255 }),
                Verdict::Crash { status }
            );
        }
    }

    #[test]
    fn exact_code_required() {
        let expected = ExpectedReturn::Exit { code: 255 };
        assert_eq!(judge(Some(255), &expected), Verdict::Pass);
        assert_eq!(
            judge(Some(0), &expected),
            Verdict::ReturnMismatch {
                expected: 255,
                actual: 0
            }
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Verdict::Pass.exit_code(), 0);
        assert_eq!(
            Verdict::OutputMismatch {
                expected: "a".into(),
                actual: "b".into()
            }
            .exit_code(),
            1
        );
        assert_eq!(
            Verdict::ReturnMismatch {
                expected: 1,
                actual: 2
            }
            .exit_code(),
            2
        );
        assert_eq!(Verdict::Crash { status: None }.exit_code(), 2);
    }

    #[test]
    fn split_keeps_empty_pieces() {
        assert_eq!(
            split_args("-Itest test/common.c test/a.c"),
            vec!["-Itest", "test/common.c", "test/a.c"]
        );
        assert_eq!(
            split_args("-Itest  test/a.c "),
            vec!["-Itest", "", "test/a.c", ""]
        );
        assert_eq!(split_args(""), vec![""]);
    }
}
