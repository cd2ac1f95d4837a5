use super::*;

#[test]
fn resolve_linux_debug() {
    let tc = resolve(Platform::Linux, Profile::Debug).unwrap();
    assert_eq!(tc.build_dir_tag(), "ld");
    assert_eq!(tc.depfile, DepfileMode::Gcc);
    assert_eq!(tc.exe("dyibicc"), "dyibicc");
    assert!(tc.commands.compile.contains("-MF $out.d"));
    assert!(tc.commands.compile.contains("-O0"));
}

#[test]
fn resolve_windows_release() {
    let tc = resolve(Platform::Windows, Profile::Release).unwrap();
    assert_eq!(tc.build_dir_tag(), "wr");
    assert_eq!(tc.depfile, DepfileMode::Msvc);
    assert_eq!(tc.exe("dyibicc"), "dyibicc.exe");
    assert!(tc.commands.compile.starts_with("cl /showIncludes"));
}

#[test]
fn fuzz_is_linux_only() {
    assert!(resolve(Platform::Linux, Profile::Fuzz).is_ok());
    let err = resolve(Platform::Windows, Profile::Fuzz).unwrap_err();
    assert!(matches!(
        err,
        ToolchainError::UnsupportedProfile {
            platform: Platform::Windows,
            profile: Profile::Fuzz
        }
    ));
}

#[test]
fn profiles_are_listed_in_stable_order() {
    assert_eq!(
        Platform::Linux.profiles(),
        vec![Profile::Debug, Profile::Release, Profile::Asan, Profile::Fuzz]
    );
    assert_eq!(
        Platform::Windows.profiles(),
        vec![Profile::Debug, Profile::Release, Profile::Asan]
    );
}

#[test]
fn reject_unknown_host() {
    assert_eq!(Platform::from_os("linux").unwrap(), Platform::Linux);
    assert_eq!(Platform::from_os("windows").unwrap(), Platform::Windows);
    assert!(matches!(
        Platform::from_os("macos"),
        Err(ToolchainError::UnsupportedHost { .. })
    ));
}

#[test]
fn object_names() {
    let linux = resolve(Platform::Linux, Profile::Debug).unwrap();
    let windows = resolve(Platform::Windows, Profile::Debug).unwrap();

    assert_eq!(linux.object_for("type.c"), "type.o");
    assert_eq!(linux.object_for("codegen.l.c"), "codegen.l.o");
    assert_eq!(linux.object_for("dynasm/minilua.c"), "dynasm/minilua.o");
    assert_eq!(windows.object_for("embed/libdyibicc.c"), "embed/libdyibicc.obj");
}

#[test]
fn depfile_mode_variables() {
    assert_eq!(DepfileMode::Gcc.ninja_deps(), Some("gcc"));
    assert_eq!(DepfileMode::Gcc.ninja_depfile(), Some("$out.d"));
    assert_eq!(DepfileMode::Msvc.ninja_deps(), Some("msvc"));
    assert_eq!(DepfileMode::Msvc.ninja_depfile(), None);
    assert_eq!(DepfileMode::None.ninja_deps(), None);
}

#[test]
fn abi_tags() {
    assert_eq!(Platform::Linux.abi(), Abi::SysV);
    assert_eq!(Platform::Windows.abi(), Abi::Win64);
    assert_eq!(Abi::SysV.tag(), 'l');
    assert_eq!(Abi::Win64.define(), "WIN");
}
