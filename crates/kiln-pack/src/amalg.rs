//! Single translation unit amalgamation.
//!
//! Inputs are concatenated in order. Internal-linkage markers are resolved
//! to `static`, extern-only declarations are dropped, and includes of files
//! that are themselves part of the amalgamation are removed. Both code
//! generation variants are appended behind a preprocessor switch.

use std::fmt::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::PackError;

/// Name of the license copy placed next to the amalgamation
pub const LICENSE_FILE: &str = "LICENSE";

/// Markers the sources use for symbols that are static in the amalgamation
const STATIC_MARKERS: [&str; 2] = ["IMPLSTATIC ", "DASM_FDEF "];
/// Lines starting with this are declarations only needed across separate objects
const EXTERN_MARKER: &str = "IMPLEXTERN ";

/// Single-letter macros the sources define locally and never undefine
const LEAKY_MACROS: [&str; 3] = ["C", "L", "VOID"];

/// MSVC warnings raised by the assembler runtime headers
const DYNASM_WARNINGS: [u32; 3] = [4127, 4242, 4244];

#[derive(Debug, Clone)]
pub struct AmalgOptions {
    /// Output directory
    pub dir: Utf8PathBuf,
    /// Base name of the `.c`/`.h` pair
    pub name: String,
    /// Public header copied to `<dir>/<name>.h`
    pub header: Utf8PathBuf,
    pub license: Utf8PathBuf,
    /// Preprocessor symbol selecting the Windows variant
    pub switch: String,
    /// Windows x64 code generation variant
    pub win: Utf8PathBuf,
    /// System V code generation variant
    pub sysv: Utf8PathBuf,
    /// Files to concatenate, in order
    pub inputs: Vec<Utf8PathBuf>,
}

/// One file going into the amalgamation
#[derive(Debug, Clone)]
pub struct AmalgInput {
    pub path: Utf8PathBuf,
    pub contents: String,
}

/// Produce `<dir>/<name>.c`, `<dir>/<name>.h` and `<dir>/LICENSE`
pub fn amalgamate(options: &AmalgOptions) -> Result<(), PackError> {
    let load = |path: &Utf8Path| -> Result<AmalgInput, PackError> {
        Ok(AmalgInput {
            path: path.to_owned(),
            contents: crate::read(path)?,
        })
    };

    let inputs = options
        .inputs
        .iter()
        .map(|p| load(p.as_path()))
        .collect::<Result<Vec<_>, _>>()?;
    let win = load(options.win.as_path())?;
    let sysv = load(options.sysv.as_path())?;

    let source = render(&inputs, &options.switch, &win, &sysv);
    let header = crate::read(&options.header)?;
    let license = crate::read(&options.license)?;

    crate::write(&options.dir.join(format!("{}.c", options.name)), source.as_bytes())?;
    crate::write(&options.dir.join(format!("{}.h", options.name)), header.as_bytes())?;
    crate::write(&options.dir.join(LICENSE_FILE), license.as_bytes())?;

    info!(
        name = %options.name,
        inputs = inputs.len(),
        bytes = source.len(),
        "amalgamated"
    );
    Ok(())
}

/// Concatenate `inputs`, then both code generation variants behind `switch`
pub fn render(inputs: &[AmalgInput], switch: &str, win: &AmalgInput, sysv: &AmalgInput) -> String {
    let members: Vec<&Utf8Path> = inputs
        .iter()
        .chain([win, sysv])
        .map(|i| i.path.as_path())
        .collect();

    let mut out = String::new();
    for input in inputs {
        include_file(&mut out, input, &members);
    }

    let _ = writeln!(out, "#if {}", switch);
    include_file(&mut out, win, &members);
    let _ = writeln!(out, "#else // ^^^ {} / !{} vvv", switch, switch);
    include_file(&mut out, sysv, &members);
    let _ = writeln!(out, "#endif // !{}", switch);
    out
}

fn include_file(out: &mut String, input: &AmalgInput, members: &[&Utf8Path]) {
    let display = display_path(&input.path);
    let dynasm = input.path.as_str().contains("dynasm/");

    for name in LEAKY_MACROS {
        let _ = writeln!(out, "#undef {}", name);
    }
    if dynasm {
        out.push_str("#ifdef _MSC_VER\n#pragma warning(push)\n");
        for warning in DYNASM_WARNINGS {
            let _ = writeln!(out, "#pragma warning(disable: {})", warning);
        }
        out.push_str("#endif\n");
    }

    let _ = writeln!(out, "//\n// START OF {}\n//", display);
    for line in input.contents.split_inclusive('\n') {
        if line.starts_with(EXTERN_MARKER) || includes_member(line, members) {
            continue;
        }
        let mut line = line.to_string();
        for marker in STATIC_MARKERS {
            line = line.replace(marker, "static ");
        }
        out.push_str(&line);
        if !line.ends_with('\n') {
            out.push('\n');
        }
    }
    let _ = writeln!(out, "//\n// END OF {}\n//", display);

    if dynasm {
        out.push_str("#ifdef _MSC_VER\n#pragma warning(pop)\n#endif\n");
    }
}

/// Whether `line` is `#include "x"` for a file that is part of the amalgamation
fn includes_member(line: &str, members: &[&Utf8Path]) -> bool {
    let Some(rest) = line.strip_prefix("#include \"") else {
        return false;
    };
    let Some(end) = rest.find('"') else {
        return false;
    };
    let included = Utf8Path::new(&rest[..end]);
    members.iter().any(|m| m.ends_with(included))
}

/// The path with leading `..` components removed, for markers
fn display_path(path: &Utf8Path) -> String {
    path.components()
        .skip_while(|c| matches!(c, camino::Utf8Component::ParentDir | camino::Utf8Component::CurDir))
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
}
