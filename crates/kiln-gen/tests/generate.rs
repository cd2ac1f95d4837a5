//! End-to-end generation tests
//!
//! Each test builds a project in a temp directory and inspects the
//! generated manifests.

mod harness;

use std::collections::HashSet;

use harness::{TestEnv, build_line};
use kiln_gen::GenError;
use kiln_meta::ExpectedReturn;
use kiln_toolchain::Platform;

#[test_log::test]
fn writes_one_manifest_per_profile() {
    let env = TestEnv::new();
    env.generate(Platform::Linux).unwrap();
    for dir in ["ld", "lr", "la", "lf"] {
        assert!(env.file_exists(&format!("out/{}/build.ninja", dir)), "out/{}", dir);
    }

    env.generate(Platform::Windows).unwrap();
    for dir in ["wd", "wr", "wa"] {
        assert!(env.file_exists(&format!("out/{}/build.ninja", dir)), "out/{}", dir);
    }
    assert!(!env.file_exists("out/wf/build.ninja"));
}

#[test_log::test]
fn regeneration_is_byte_identical() {
    let env = TestEnv::new();
    let first = env.generate(Platform::Linux).unwrap();
    assert!(first.unchanged.is_empty());
    let before = env.read_file("out/ld/build.ninja");

    let second = env.generate(Platform::Linux).unwrap();
    assert!(second.written.is_empty(), "rewrote {:?}", second.written);
    assert_eq!(second.unchanged.len(), first.written.len());
    assert_eq!(env.read_file("out/ld/build.ninja"), before);
}

#[test_log::test]
fn manifest_header_and_variables() {
    let env = TestEnv::new();
    let manifest = env.linux_debug_manifest();
    assert!(manifest.starts_with("# Generated by kiln-gen from kiln.kdl. Do not edit.\n"));
    assert!(manifest.contains("\ntop = ../..\nroot = $top/src\n"));
}

#[test_log::test]
fn regen_edge_watches_generator_inputs() {
    let env = TestEnv::new();
    let manifest = env.linux_debug_manifest();
    let regen = build_line(&manifest, "build.ninja").unwrap();

    assert!(regen.starts_with("build build.ninja: regen | $top/kiln.kdl "));
    for input in [
        env.tools.gen_exe.as_str(),
        "$top/test ",
        "$top/test/arith.c",
        "$top/test/errors.c",
        "$top/test/update_basic.scn",
        "$top/include",
    ] {
        assert!(regen.contains(input), "missing {} in {}", input, regen);
    }
    assert!(manifest.contains("rule regen\n"));
    assert!(manifest.contains("  generator = 1\n"));
}

#[test_log::test]
fn regen_edge_watches_every_listed_directory() {
    let env = TestEnv::new();
    let manifest = env.linux_debug_manifest();
    let regen = build_line(&manifest, "build.ninja").unwrap();

    for dir in [
        "$top/test/fuzzcases ",
        "$top/include ",
        "$top/include/all ",
        "$top/include/linux ",
    ] {
        assert!(regen.contains(dir), "missing {} in {}", dir, regen);
    }
}

#[test_log::test]
fn new_include_subdirectory_is_watched() {
    let env = TestEnv::new();
    let before = env.linux_debug_manifest();
    assert!(!before.contains("$top/include/win"));

    env.write_file("include/win/vadefs.h", "#pragma once\n");
    let manifest = env.linux_debug_manifest();
    let regen = build_line(&manifest, "build.ninja").unwrap();
    assert!(regen.contains("$top/include/win "), "{}", regen);
    assert!(
        build_line(&manifest, "compincl.h")
            .unwrap()
            .contains("$top/include/win/vadefs.h")
    );
}

#[test_log::test]
fn absent_fuzz_directory_is_not_watched() {
    let env = TestEnv::new();
    std::fs::remove_dir_all(env.root.join("test/fuzzcases")).unwrap();
    let manifest = env.linux_debug_manifest();
    let regen = build_line(&manifest, "build.ninja").unwrap();
    assert!(!regen.contains("fuzzcases"), "{}", regen);
}

#[test_log::test]
fn tool_paths_with_spaces_are_quoted_in_commands() {
    let env = TestEnv::with_tool_dir("kiln tools");
    let manifest = env.linux_debug_manifest();

    let quoted = format!("  command = \"{}\" compincl ", env.tools.pack);
    assert!(manifest.contains(&quoted), "{}", manifest);
    assert!(manifest.contains(&format!("  command = \"{}\"\n", env.tools.gen_exe)));
}

#[test_log::test]
fn disabled_fixtures_are_excluded() {
    let env = TestEnv::new();
    env.write_file("test/skipped.c", "// DISABLED\n// RET: 3\n");
    let manifest = env.linux_debug_manifest();

    assert!(build_line(&manifest, "test/skipped.c").is_none());
    assert!(build_line(&manifest, "test/arith.c").is_some());
    assert!(!manifest.contains("$top/test/skipped.c"));
}

#[test_log::test]
fn support_file_is_not_a_fixture() {
    let env = TestEnv::new();
    let manifest = env.linux_debug_manifest();
    assert!(build_line(&manifest, "test/common.c").is_none());
    assert_eq!(
        build_line(&manifest, "test/arith.c").unwrap(),
        "build test/arith.c: testrun $top/test/arith.c | dyibicc $top/test/common.c"
    );
}

#[test_log::test]
fn missing_input_aborts_before_writing() {
    let env = TestEnv::new();
    env.remove_file("src/type.c");

    match env.generate(Platform::Linux) {
        Err(GenError::MissingInput { path }) => assert!(path.ends_with("src/type.c")),
        other => panic!("expected MissingInput, got {:?}", other),
    }
    assert!(!env.file_exists("out/ld/build.ninja"));
    assert!(!env.file_exists("out/ld/update_basic.scn.driver.c"));
}

#[test_log::test]
fn failed_generation_keeps_previous_manifest() {
    let env = TestEnv::new();
    let before = env.linux_debug_manifest();

    env.write_file("test/broken.c", "// RET: often\n");
    assert!(matches!(
        env.generate(Platform::Linux),
        Err(GenError::Discover(_))
    ));
    assert_eq!(env.read_file("out/ld/build.ninja"), before);
}

#[test_log::test]
fn missing_tool_is_a_missing_input() {
    let env = TestEnv::new();
    std::fs::remove_file(&env.tools.testrun).unwrap();
    assert!(matches!(
        env.generate(Platform::Linux),
        Err(GenError::MissingInput { .. })
    ));
}

#[test_log::test]
fn every_output_has_one_writer() {
    let env = TestEnv::new();
    env.generate(Platform::Linux).unwrap();

    for dir in ["ld", "lr", "la", "lf"] {
        let manifest = env.read_file(&format!("out/{}/build.ninja", dir));
        let mut seen = HashSet::new();
        for line in manifest.lines().filter(|l| l.starts_with("build ")) {
            let outputs = line["build ".len()..].split(": ").next().unwrap();
            for output in outputs.split(' ') {
                assert!(seen.insert(output.to_string()), "{} written twice in {}", output, dir);
            }
        }
    }
}

#[test_log::test]
fn codegen_runs_for_both_abis() {
    let env = TestEnv::new();
    let manifest = env.linux_debug_manifest();

    let sysv = "build codegen.l.c: codegen $root/codegen.in.c | minilua $root/dynasm/dynasm.lua\n  abi = SYSV\n";
    let win = "build codegen.w.c: codegen $root/codegen.in.c | minilua $root/dynasm/dynasm.lua\n  abi = WIN\n";
    assert!(manifest.contains(sysv));
    assert!(manifest.contains(win));

    // only the host variant is compiled
    assert!(build_line(&manifest, "codegen.l.o").is_some());
    assert!(build_line(&manifest, "codegen.w.o").is_none());
    assert_eq!(
        build_line(&manifest, "minilua").unwrap(),
        "build minilua: toolcc $root/dynasm/minilua.c"
    );
}

#[test_log::test]
fn fuzz_profile_swaps_the_entry_point() {
    let env = TestEnv::new();
    env.generate(Platform::Linux).unwrap();
    let debug = env.read_file("out/ld/build.ninja");
    let fuzz = env.read_file("out/lf/build.ninja");

    assert_eq!(
        build_line(&debug, "dyibicc").unwrap(),
        "build dyibicc: link codegen.l.o type.o entry.o preprocess.o"
    );
    assert_eq!(
        build_line(&fuzz, "dyibicc").unwrap(),
        "build dyibicc: link codegen.l.o type.o fuzz_entry.o preprocess.o"
    );
    assert!(build_line(&fuzz, "entry.o").is_none());
    assert!(build_line(&debug, "fuzz_entry.o").is_none());
}

#[test_log::test]
fn fuzz_cases_only_run_in_fuzz_build() {
    let env = TestEnv::new();
    env.generate(Platform::Linux).unwrap();
    let debug = env.read_file("out/ld/build.ninja");
    let fuzz = env.read_file("out/lf/build.ninja");

    assert!(build_line(&debug, "test/fuzzcases/crash-1").is_none());
    assert_eq!(
        build_line(&fuzz, "test/fuzzcases/crash-1").unwrap(),
        "build test/fuzzcases/crash-1: testrun $top/test/fuzzcases/crash-1 | dyibicc"
    );
}

#[test_log::test]
fn include_consumer_waits_for_packed_headers() {
    let env = TestEnv::new();
    let manifest = env.linux_debug_manifest();

    assert_eq!(
        build_line(&manifest, "preprocess.o").unwrap(),
        "build preprocess.o: cc $root/preprocess.c | compincl.h"
    );
    assert_eq!(
        build_line(&manifest, "compincl.h").unwrap(),
        format!(
            "build compincl.h: compincl $top/include/all/reflect.h $top/include/all/stddef.h $top/include/linux/stdarg.h | {}",
            env.tools.pack
        )
    );
}

#[test_log::test]
fn amalgamation_inputs_follow_project_order() {
    let env = TestEnv::new();
    let manifest = env.linux_debug_manifest();

    let line = build_line(&manifest, "embed/libdyibicc.c").unwrap();
    let expected = "build embed/libdyibicc.c embed/libdyibicc.h embed/LICENSE: amalg \
        $root/dyibicc.h $top/include/all/reflect.h compincl.h \
        $root/type.c $root/preprocess.c \
        $root/dyn_basic_pdb.h \
        | codegen.l.c codegen.w.c $root/libdyibicc.h $top/LICENSE ";
    assert!(line.starts_with(expected), "{}", line);
    assert!(line.ends_with(" $top/kiln.kdl"));
    assert_eq!(
        build_line(&manifest, "libdyibicc.o").unwrap(),
        "build libdyibicc.o: cc embed/libdyibicc.c"
    );
}

#[test_log::test]
fn test_edges_carry_encoded_records() {
    let env = TestEnv::new();
    let manifest = env.linux_debug_manifest();

    let mut lines = manifest.lines();
    lines
        .by_ref()
        .find(|l| l.starts_with("build test/errors.c:"))
        .unwrap();
    let token = lines.next().unwrap().strip_prefix("  data = ").unwrap();
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let record = kiln_meta::decode(token).unwrap();
    assert_eq!(record.run, "-c test/errors.c");
    assert_eq!(record.ret, ExpectedReturn::Exit { code: 1 });
    assert_eq!(record.txt, "test/errors.c:1: error\n");
}

#[test_log::test]
fn scenarios_get_a_driver_and_a_run_edge() {
    let env = TestEnv::new();
    let manifest = env.linux_debug_manifest();

    let driver = env.read_file("out/ld/update_basic.scn.driver.c");
    assert!(driver.contains("dyibicc_update"));
    assert_eq!(
        build_line(&manifest, "update_basic.scn.driver").unwrap(),
        "build update_basic.scn.driver: driverc update_basic.scn.driver.c libdyibicc.o | embed/libdyibicc.h"
    );
    assert_eq!(
        build_line(&manifest, "test/update_basic.scn").unwrap(),
        "build test/update_basic.scn: runbin update_basic.scn.driver"
    );
    assert!(manifest.contains(
        "build test: phony test/arith.c test/errors.c test/update_basic.scn\n"
    ));
    assert!(manifest.ends_with("\ndefault dyibicc\n"));
}

#[test_log::test]
fn windows_manifests_use_windows_suffixes() {
    let env = TestEnv::new();
    env.generate(Platform::Windows).unwrap();
    let manifest = env.read_file("out/wd/build.ninja");

    assert_eq!(
        build_line(&manifest, "dyibicc.exe").unwrap(),
        "build dyibicc.exe: link codegen.w.obj type.obj entry.obj preprocess.obj"
    );
    assert!(manifest.contains("  deps = msvc\n"));
    assert!(manifest.contains("./minilua.exe $root/dynasm/dynasm.lua -D $abi -o $out $in"));
    assert!(env.file_exists("out/wd/update_basic.scn.driver.c"));
}

#[test_log::test]
fn invalid_project_is_rejected() {
    let env = TestEnv::new();
    env.write_file("kiln.kdl", "project name=\"\" src=\"src\" out=\"out\"\n");
    assert!(matches!(
        env.generate(Platform::Linux),
        Err(GenError::Project(_))
    ));
}
