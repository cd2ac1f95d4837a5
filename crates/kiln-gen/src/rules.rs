//! One ninja rule per build role, always declared in the same order.

use camino::Utf8Path;
use kiln_ninja::Rule;

use crate::graph::GraphInput;

pub const CC: &str = "cc";
pub const LINK: &str = "link";
pub const TOOLCC: &str = "toolcc";
pub const CODEGEN: &str = "codegen";
pub const AMALG: &str = "amalg";
pub const COMPINCL: &str = "compincl";
pub const TESTRUN: &str = "testrun";
pub const DRIVERC: &str = "driverc";
pub const RUNBIN: &str = "runbin";
pub const REGEN: &str = "regen";

/// Edge variable selecting the code generation ABI
pub const ABI_VAR: &str = "abi";
/// Edge variable carrying the encoded test record
pub const DATA_VAR: &str = "data";

pub(crate) fn rules(input: &GraphInput<'_>) -> Vec<Rule> {
    let tc = input.toolchain;
    let project = input.project;
    let tools = input.tools;

    let mut cc = Rule::new(CC, tc.commands.compile).description("CC $out");
    if let Some(deps) = tc.depfile.ninja_deps() {
        cc = cc.deps(deps);
    }
    if let Some(depfile) = tc.depfile.ninja_depfile() {
        cc = cc.depfile(depfile);
    }

    let codegen_tool = tc.exe(project.codegen.tool_name());
    let amalg = &project.amalg;

    vec![
        cc,
        Rule::new(LINK, tc.commands.link).description("LINK $out"),
        Rule::new(TOOLCC, tc.commands.tool).description("CC $out"),
        Rule::new(
            CODEGEN,
            format!(
                "./{} $root/{} -D ${} -o $out $in",
                codegen_tool, project.codegen.script, ABI_VAR
            ),
        )
        .description("DYNASM $out"),
        Rule::new(
            AMALG,
            format!(
                "{} amalg --dir {} --name {} --header $root/{} --license $top/{} --switch {} --win {} --sysv {} $in",
                command_path(&tools.pack),
                amalg.dir,
                amalg.name,
                amalg.header,
                amalg.license,
                amalg.switch,
                input.codegen_output(kiln_toolchain::Abi::Win64),
                input.codegen_output(kiln_toolchain::Abi::SysV),
            ),
        )
        .description(format!("AMALG {}", amalg.name))
        .restat(),
        Rule::new(
            COMPINCL,
            format!(
                "{} compincl $top/{} $out $in",
                command_path(&tools.pack),
                project.includes.dir
            ),
        )
        .description("COMPINCL $out")
        .restat(),
        Rule::new(
            TESTRUN,
            format!(
                "{} $top {}/{} ${}",
                command_path(&tools.testrun),
                input.build_dir,
                input.compiler_exe(),
                DATA_VAR
            ),
        )
        .description("TEST $in"),
        Rule::new(DRIVERC, tc.commands.driver).description("CC $out"),
        Rule::new(RUNBIN, "./$in").description("RUN $in"),
        Rule::new(REGEN, command_path(&tools.gen_exe))
            .description("GEN build.ninja")
            .generator(),
    ]
}

/// A tool path as it appears in a rule command. `$` is doubled for ninja and
/// paths with spaces are double-quoted, which both `sh -c` and Windows
/// command line parsing accept.
pub(crate) fn command_path(path: &Utf8Path) -> String {
    let escaped = path.as_str().replace('$', "$$");
    if escaped.contains(char::is_whitespace) {
        format!("\"{}\"", escaped)
    } else {
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tool_paths_are_left_alone() {
        assert_eq!(
            command_path(Utf8Path::new("/opt/kiln/bin/kiln-pack")),
            "/opt/kiln/bin/kiln-pack"
        );
    }

    #[test]
    fn tool_paths_with_spaces_are_quoted() {
        assert_eq!(
            command_path(Utf8Path::new("C:/Users/Ada Lovelace/.cargo/bin/kiln-pack.exe")),
            "\"C:/Users/Ada Lovelace/.cargo/bin/kiln-pack.exe\""
        );
        assert_eq!(command_path(Utf8Path::new("/tmp/$x/kiln-gen")), "/tmp/$$x/kiln-gen");
    }
}
