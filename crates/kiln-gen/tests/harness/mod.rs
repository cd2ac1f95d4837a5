//! Test harness for kiln-gen integration tests
//!
//! Builds a small but complete C project in a temp directory, with empty
//! stand-ins for the kiln tools next to it.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use kiln_gen::{GenError, GenerateReport, Tools, generate_for};
use kiln_toolchain::Platform;
use tempfile::TempDir;

pub const KILN_KDL: &str = r#"
project name="dyibicc" src="src" out="out"
codegen input="codegen.in.c" output="codegen" tool="dynasm/minilua.c" script="dynasm/dynasm.lua"
includes dir="include" output="compincl.h" consumer="preprocess.c"
amalg dir="embed" name="libdyibicc" header="libdyibicc.h" license="LICENSE" switch="X64WIN" {
    prelude path="dyibicc.h"
    prelude path="include/all/reflect.h" from="top"
    prelude path="compincl.h" from="out"
    epilogue path="dyn_basic_pdb.h"
}
tests dir="test" support="test/common.c" fuzz="test/fuzzcases"
source path="type.c"
source path="entry.c" variant="main"
source path="fuzz_entry.c" variant="fuzz"
source path="preprocess.c"
"#;

pub const UPDATE_BASIC: &str = r#"file main.c <<EOF
int main(void) {
  return 0;
}
EOF
flush
expect 0

edit main.c 2 "0" "1"
flush
expect 1
"#;

/// An isolated project plus a tool directory
pub struct TestEnv {
    _temp: TempDir,
    pub root: Utf8PathBuf,
    pub tools: Tools,
}

impl TestEnv {
    /// A project with every input the build graph needs
    pub fn new() -> Self {
        Self::with_tool_dir("bin")
    }

    /// Same project, with the tools in `tool_dir` under the temp directory
    pub fn with_tool_dir(tool_dir: &str) -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .expect("temp dir is not valid UTF-8");
        let root = base.join("project");
        let tools = Tools::in_dir(&base.join(tool_dir));

        let env = Self {
            _temp: temp,
            root,
            tools,
        };

        for tool in env.tools.iter() {
            write(tool, "");
        }

        env.write_file("kiln.kdl", KILN_KDL);
        env.write_file("LICENSE", "MIT\n");
        for src in [
            "src/type.c",
            "src/entry.c",
            "src/fuzz_entry.c",
            "src/preprocess.c",
            "src/codegen.in.c",
            "src/dynasm/minilua.c",
            "src/dynasm/dynasm.lua",
            "src/libdyibicc.h",
            "src/dyibicc.h",
            "src/dyn_basic_pdb.h",
        ] {
            env.write_file(src, "\n");
        }
        env.write_file("include/all/reflect.h", "#pragma once\n");
        env.write_file("include/all/stddef.h", "#pragma once\n");
        env.write_file("include/linux/stdarg.h", "#pragma once\n");
        env.write_file("test/common.c", "int assert(int a, int b);\n");
        env.write_file(
            "test/arith.c",
            "// RET: 0\nint main(void) { return 0; }\n",
        );
        env.write_file(
            "test/errors.c",
            "// RUN: -c {self}\n// RET: 1\n// TXT: {self}:1: error\n",
        );
        env.write_file("test/fuzzcases/crash-1", "int x = ;\n");
        env.write_file("test/update_basic.scn", UPDATE_BASIC);
        env
    }

    pub fn write_file(&self, relative: &str, contents: &str) {
        write(&self.root.join(relative), contents);
    }

    pub fn read_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.root.join(relative)).expect("failed to read file")
    }

    pub fn remove_file(&self, relative: &str) {
        std::fs::remove_file(self.root.join(relative)).expect("failed to remove file");
    }

    pub fn file_exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }

    pub fn generate(&self, platform: Platform) -> Result<GenerateReport, GenError> {
        generate_for(&self.root, &self.tools, platform)
    }

    /// Generate for Linux and return the debug manifest
    pub fn linux_debug_manifest(&self) -> String {
        self.generate(Platform::Linux).expect("generation failed");
        self.read_file("out/ld/build.ninja")
    }
}

fn write(path: &Utf8Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create parent dirs");
    }
    std::fs::write(path, contents).expect("failed to write file");
}

/// The `build` line whose first output is `output`
pub fn build_line<'a>(manifest: &'a str, output: &str) -> Option<&'a str> {
    let prefix = format!("build {}", output);
    manifest.lines().find(|line| {
        line.strip_prefix(&prefix)
            .is_some_and(|rest| rest.starts_with(':') || rest.starts_with(' '))
    })
}
