//! C driver synthesis.
//!
//! The driver owns one compiler context for its whole life. It performs the
//! initial full build from the managed files' initial contents, then walks
//! the steps in order. Every exit path goes through a single `fail:` label
//! that frees the context.

use std::fmt::Write;

use crate::{DriverStep, Scenario};

/// An initial or incremental update was rejected
pub const EXIT_UPDATE_FAILED: u8 = 255;
/// The entry point could not be resolved at an `expect` step
pub const EXIT_ENTRY_NOT_FOUND: u8 = 254;
/// The entry point returned something other than expected
pub const EXIT_VALUE_MISMATCH: u8 = 253;

/// Compiler-provided include directory, relative to where the driver runs
const COMPILER_INCLUDE_DIR: &str = "embed/include";

/// Bytes per line in emitted byte arrays
const BYTES_PER_LINE: usize = 16;

/// Synthesize the driver program for a scenario
pub fn compile(scenario: &Scenario) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "// Generated by kiln-gen from {}. Do not edit.\n",
        scenario.name
    );

    for code in &scenario.host_code {
        out.push_str(code);
        if !code.ends_with('\n') {
            out.push('\n');
        }
    }
    if !scenario.host_code.is_empty() {
        out.push('\n');
    }

    out.push_str(
        "#include \"libdyibicc.h\"\n\
         #include <stdbool.h>\n\
         #include <stdio.h>\n\
         #include <stdlib.h>\n\
         #include <string.h>\n\n",
    );

    emit_helper_lookup(&mut out, &scenario.host_helpers);
    emit_file_lookup(&mut out, scenario);
    emit_main(&mut out, scenario);

    out
}

fn emit_helper_lookup(out: &mut String, helpers: &[String]) {
    out.push_str("static void* get_host_helper_func(const char* name) {\n");
    out.push_str("  (void)name;\n");
    for helper in helpers {
        let _ = writeln!(
            out,
            "  if (strcmp({}, name) == 0) return (void*){};",
            c_string(helper),
            helper
        );
    }
    out.push_str("  return NULL;\n}\n\n");
}

/// Managed files always resolve to their initial contents; edits reach the
/// compiler only through update calls. Anything else is read from disk.
fn emit_file_lookup(out: &mut String, scenario: &Scenario) {
    out.push_str(
        "static bool get_file_by_name(const char* filename, char** contents, size_t* size) {\n",
    );

    for (index, file) in scenario.files.iter().enumerate() {
        let len = file.contents.len();
        let _ = writeln!(out, "  if (strcmp({}, filename) == 0) {{", c_string(&file.path));
        emit_byte_array(out, "    ", &format!("initial_{}", index), &file.contents);
        // The compiler takes ownership and frees the buffer.
        let _ = writeln!(out, "    *contents = malloc({});", len + 1);
        out.push_str("    if (!*contents) return false;\n");
        let _ = writeln!(out, "    memcpy(*contents, initial_{}, {});", index, len + 1);
        let _ = writeln!(out, "    *size = {};", len);
        out.push_str("    return true;\n  }\n\n");
    }

    out.push_str(
        "  FILE* fp = fopen(filename, \"rb\");\n\
         \x20 if (!fp) {\n\
         \x20   return false;\n\
         \x20 }\n\
         \x20 fseek(fp, 0, SEEK_END);\n\
         \x20 long len = ftell(fp);\n\
         \x20 rewind(fp);\n\
         \x20 if (len < 0) {\n\
         \x20   fclose(fp);\n\
         \x20   return false;\n\
         \x20 }\n\
         \x20 *size = (size_t)len;\n\
         \x20 *contents = malloc(*size + 1);\n\
         \x20 if (!*contents || fread(*contents, 1, *size, fp) != *size) {\n\
         \x20   free(*contents);\n\
         \x20   fclose(fp);\n\
         \x20   return false;\n\
         \x20 }\n\
         \x20 (*contents)[*size] = 0;\n\
         \x20 fclose(fp);\n\
         \x20 return true;\n\
         }\n\n",
    );
}

fn emit_main(out: &mut String, scenario: &Scenario) {
    out.push_str("int main(void) {\n");

    let includes: Vec<String> = scenario.include_paths.iter().map(|p| c_string(p)).collect();
    let files: Vec<String> = scenario.files.iter().map(|f| c_string(&f.path)).collect();
    let _ = writeln!(out, "  const char* include_paths[] = {{{}}};", null_terminated(&includes));
    let _ = writeln!(out, "  const char* input_paths[] = {{{}}};\n", null_terminated(&files));

    let _ = write!(
        out,
        "  DyibiccEnviromentData env_data = {{\n\
         \x20     .include_paths = include_paths,\n\
         \x20     .files = input_paths,\n\
         \x20     .dyibicc_include_dir = {},\n\
         \x20     .load_file_contents = get_file_by_name,\n\
         \x20     .get_function_address = get_host_helper_func,\n\
         \x20     .output_function = NULL,\n\
         \x20     .use_ansi_codes = false,\n\
         \x20 }};\n\n",
        c_string(COMPILER_INCLUDE_DIR)
    );

    out.push_str("  DyibiccContext* ctx = dyibicc_set_environment(&env_data);\n");
    out.push_str("  int final_result = 0;\n\n");

    out.push_str("  if (!dyibicc_update(ctx, NULL, NULL)) {\n");
    out.push_str("    printf(\"initial update failed\\n\");\n");
    let _ = writeln!(out, "    final_result = {};", EXIT_UPDATE_FAILED);
    out.push_str("    goto fail;\n  }\n\n");

    for (index, step) in scenario.steps.iter().enumerate() {
        match step {
            DriverStep::Update { file, contents } => {
                emit_update(out, index, file, contents);
            }
            DriverStep::Expect { value, origin } => {
                emit_expect(out, &scenario.entry, *value, &origin.to_string());
            }
        }
    }

    out.push_str("  printf(\"OK\\n\");\n\n");
    out.push_str("fail:\n");
    out.push_str("  dyibicc_free(ctx);\n");
    out.push_str("  return final_result;\n");
    out.push_str("}\n");
}

fn emit_update(out: &mut String, index: usize, file: &str, contents: &str) {
    out.push_str("  {\n");
    emit_byte_array(out, "    ", &format!("contents_step{}", index), contents);
    let _ = writeln!(
        out,
        "    if (!dyibicc_update(ctx, {}, contents_step{})) {{",
        c_string(file),
        index
    );
    let _ = writeln!(out, "      printf(\"%s: update failed\\n\", {});", c_string(file));
    let _ = writeln!(out, "      final_result = {};", EXIT_UPDATE_FAILED);
    out.push_str("      goto fail;\n    }\n  }\n\n");
}

fn emit_expect(out: &mut String, entry: &str, value: i32, origin: &str) {
    let origin = c_string(origin);
    out.push_str("  {\n");
    let _ = writeln!(
        out,
        "    void* entry_point = dyibicc_find_export(ctx, {});",
        c_string(entry)
    );
    out.push_str("    if (!entry_point) {\n");
    let _ = writeln!(
        out,
        "      printf(\"%s: entry point %s not found\\n\", {}, {});",
        origin,
        c_string(entry)
    );
    let _ = writeln!(out, "      final_result = {};", EXIT_ENTRY_NOT_FOUND);
    out.push_str("      goto fail;\n    }\n");
    out.push_str("    char* entry_argv[] = {\"prog\", NULL};\n");
    out.push_str("    int result = ((int (*)(int, char**))entry_point)(1, entry_argv);\n");
    let _ = writeln!(out, "    if (result != {}) {{", value);
    let _ = writeln!(
        out,
        "      printf(\"%s: got %d, but expected %d\\n\", {}, result, {});",
        origin, value
    );
    let _ = writeln!(out, "      final_result = {};", EXIT_VALUE_MISMATCH);
    out.push_str("      goto fail;\n    }\n");
    let _ = writeln!(out, "    printf(\"%s: OK (%d)\\n\", {}, result);", origin);
    out.push_str("  }\n\n");
}

/// `static char <name>[] = {...}` holding the UTF-8 bytes plus a NUL
fn emit_byte_array(out: &mut String, indent: &str, name: &str, contents: &str) {
    let _ = writeln!(out, "{}static char {}[] = {{", indent, name);
    for chunk in contents.as_bytes().chunks(BYTES_PER_LINE) {
        out.push_str(indent);
        out.push_str("  ");
        for byte in chunk {
            let _ = write!(out, "'\\x{:02x}',", byte);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "{}  '\\0'", indent);
    let _ = writeln!(out, "{}}};", indent);
}

fn null_terminated(items: &[String]) -> String {
    let mut parts: Vec<&str> = items.iter().map(String::as_str).collect();
    parts.push("NULL");
    parts.join(", ")
}

/// A C string literal. Quotes, backslashes and non-printable bytes are
/// written as octal escapes.
pub(crate) fn c_string(s: &str) -> String {
    let mut literal = String::with_capacity(s.len() + 2);
    literal.push('"');
    for byte in s.bytes() {
        if (0x20..0x7f).contains(&byte) && byte != b'"' && byte != b'\\' {
            literal.push(byte as char);
        } else {
            let _ = write!(literal, "\\{:03o}", byte);
        }
    }
    literal.push('"');
    literal
}
