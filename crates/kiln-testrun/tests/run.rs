//! Runs real child processes through `/bin/sh`, so unix only.
#![cfg(unix)]

use camino::{Utf8Path, Utf8PathBuf};
use kiln_meta::{ExpectedReturn, TestRecord};
use kiln_testrun::{EXIT_ERROR, SANITIZER_EXIT_CODE, Verdict, run};
use tempfile::TempDir;

const SH: &str = "/bin/sh";

struct Project {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl Project {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        Self { _temp: temp, root }
    }

    fn script(&self, name: &str, body: &str) -> &Self {
        std::fs::write(self.root.join(name), body).unwrap();
        self
    }

    fn run(&self, record: &TestRecord) -> Verdict {
        run(&self.root, Utf8Path::new(SH), record).unwrap()
    }
}

#[test_log::test]
fn passes_on_expected_exit_code() {
    let p = Project::new();
    p.script("t.sh", "exit 3\n");
    let record = TestRecord::new("t.sh", ExpectedReturn::Exit { code: 3 }, "");
    assert_eq!(p.run(&record), Verdict::Pass);
}

#[test_log::test]
fn runs_in_project_root() {
    let p = Project::new();
    p.script("t.sh", "test -f marker || exit 9\n")
        .script("marker", "");
    let record = TestRecord::new("t.sh", ExpectedReturn::default(), "");
    assert_eq!(p.run(&record), Verdict::Pass);
}

#[test_log::test]
fn reports_wrong_exit_code() {
    let p = Project::new();
    p.script("t.sh", "exit 1\n");
    let record = TestRecord::new("t.sh", ExpectedReturn::Exit { code: 255 }, "");
    assert_eq!(
        p.run(&record),
        Verdict::ReturnMismatch {
            expected: 255,
            actual: 1
        }
    );
}

#[test_log::test]
fn compares_stdout_literally() {
    let p = Project::new();
    p.script("t.sh", "echo \"$1:1: error\"\n");
    let ok = TestRecord::new("t.sh x.c", ExpectedReturn::default(), "x.c:1: error\n");
    assert_eq!(p.run(&ok), Verdict::Pass);

    let bad = TestRecord::new("t.sh y.c", ExpectedReturn::default(), "x.c:1: error\n");
    assert_eq!(
        p.run(&bad),
        Verdict::OutputMismatch {
            expected: "x.c:1: error\n".to_string(),
            actual: "y.c:1: error\n".to_string()
        }
    );
}

#[test_log::test]
fn doubled_spaces_pass_empty_arguments() {
    let p = Project::new();
    p.script("t.sh", "test -z \"$1\" || exit 5\ntest \"$2\" = x.c || exit 6\n");
    let record = TestRecord::new("t.sh  x.c", ExpectedReturn::default(), "");
    assert_eq!(p.run(&record), Verdict::Pass);
}

#[test_log::test]
fn sanitizer_environment_is_set() {
    let p = Project::new();
    p.script("t.sh", "test \"$ASAN_OPTIONS\" = exitcode=117 || exit 4\n");
    let record = TestRecord::new("t.sh", ExpectedReturn::default(), "");
    assert_eq!(p.run(&record), Verdict::Pass);
}

#[test_log::test]
fn sanitizer_exit_is_a_crash() {
    let p = Project::new();
    p.script("t.sh", &format!("exit {}\n", SANITIZER_EXIT_CODE));
    let record = TestRecord::new("t.sh", ExpectedReturn::NoCrash, "");
    assert_eq!(
        p.run(&record),
        Verdict::Crash {
            status: Some(SANITIZER_EXIT_CODE)
        }
    );
}

#[test_log::test]
fn signal_death_is_a_crash() {
    let p = Project::new();
    p.script("t.sh", "kill -9 $$\n");
    let record = TestRecord::new("t.sh", ExpectedReturn::NoCrash, "");
    assert_eq!(p.run(&record), Verdict::Crash { status: None });
}

#[test_log::test]
fn nonzero_normal_exit_is_not_a_crash() {
    let p = Project::new();
    p.script("t.sh", "exit 1\n");
    let record = TestRecord::new("t.sh", ExpectedReturn::NoCrash, "");
    assert_eq!(p.run(&record), Verdict::Pass);
}

#[test_log::test]
fn missing_executable_is_an_error() {
    let p = Project::new();
    let record = TestRecord::new("", ExpectedReturn::default(), "");
    assert!(run(&p.root, &p.root.join("no-such-compiler"), &record).is_err());
}

/// Run the `kiln-testrun` binary itself
fn runner(root: &Utf8Path, exe: &str, token: &str) -> Option<i32> {
    std::process::Command::new(env!("CARGO_BIN_EXE_kiln-testrun"))
        .arg(root.as_str())
        .arg(exe)
        .arg(token)
        .output()
        .unwrap()
        .status
        .code()
}

#[test_log::test]
fn runner_reports_verdicts_as_exit_codes() {
    let p = Project::new();
    p.script("t.sh", "echo wrong\n");
    let mismatch = TestRecord::new("t.sh", ExpectedReturn::default(), "right\n");
    assert_eq!(runner(&p.root, SH, &kiln_meta::encode(&mismatch)), Some(1));

    let pass = TestRecord::new("t.sh", ExpectedReturn::default(), "wrong\n");
    assert_eq!(runner(&p.root, SH, &kiln_meta::encode(&pass)), Some(0));
}

#[test_log::test]
fn runner_errors_are_not_output_mismatches() {
    let p = Project::new();
    assert_eq!(runner(&p.root, SH, "not-a-token"), Some(EXIT_ERROR));

    let record = TestRecord::new("t.sh", ExpectedReturn::default(), "x\n");
    let token = kiln_meta::encode(&record);
    assert_eq!(runner(&p.root, "no-such-compiler", &token), Some(EXIT_ERROR));
    assert_eq!(
        runner(&p.root.join("missing-root"), SH, &token),
        Some(EXIT_ERROR)
    );
}
