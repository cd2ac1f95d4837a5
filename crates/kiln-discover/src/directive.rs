//! Fixture annotation tokenizer.
//!
//! Fixtures carry their expectations in line comments at the start of a
//! line. Anything else in the file is C source and is ignored.

const RUN_PREFIX: &str = "// RUN: ";
const RET_PREFIX: &str = "// RET: ";
const TXT_PREFIX: &str = "// TXT: ";
const DISABLED_PREFIX: &str = "// DISABLED";

/// One recognized annotation line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// Arguments for the compiler under test
    Run(&'a str),
    /// Expected exit status, not yet validated
    Ret(&'a str),
    /// One line of expected stdout
    Txt(&'a str),
    Disabled,
}

impl<'a> Directive<'a> {
    /// Recognize a single line. Values are right-trimmed.
    pub fn tokenize(line: &'a str) -> Option<Self> {
        if let Some(rest) = line.strip_prefix(RUN_PREFIX) {
            Some(Directive::Run(rest.trim_end()))
        } else if let Some(rest) = line.strip_prefix(RET_PREFIX) {
            Some(Directive::Ret(rest.trim_end()))
        } else if let Some(rest) = line.strip_prefix(TXT_PREFIX) {
            Some(Directive::Txt(rest.trim_end()))
        } else if line.starts_with(DISABLED_PREFIX) {
            Some(Directive::Disabled)
        } else {
            None
        }
    }
}
