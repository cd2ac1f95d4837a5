//! Per-test metadata carried from the generator to the test runner
//!
//! Ninja has no structured values and no quoting, so the expectations for a
//! test edge travel as a single `data = <token>` binding. The token is the
//! facet-json form of a [`TestRecord`], hex-encoded:
//!
//! - the alphabet is `[0-9a-f]`: no whitespace, no shell metacharacters,
//!   nothing ninja treats specially (`$`, `:`, `|`)
//! - the record carries a schema version so a runner never silently
//!   misreads a payload from a newer generator

use facet::Facet;
use thiserror::Error;

/// Current record schema version.
/// Bump when the record changes in backwards-incompatible ways.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Fixture directive value meaning "any exit code that isn't a crash"
pub const NO_CRASH: &str = "NOCRASH";

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("metadata token is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("metadata token does not decode to UTF-8")]
    InvalidUtf8,

    #[error("metadata record is malformed: {0}")]
    Malformed(String),

    #[error("metadata record has schema {found}, this runner understands up to {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
}

/// What exit status a test must finish with
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
#[repr(u8)]
pub enum ExpectedReturn {
    /// Exact exit code
    Exit { code: i32 },
    /// Any exit code in the platform's normal range, except the sanitizer sentinel
    NoCrash,
}

impl ExpectedReturn {
    /// Parse the value of a `RET:` directive (`0`, `255`, `NOCRASH`)
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value == NO_CRASH {
            return Some(ExpectedReturn::NoCrash);
        }
        value.parse().ok().map(|code| ExpectedReturn::Exit { code })
    }
}

impl Default for ExpectedReturn {
    fn default() -> Self {
        ExpectedReturn::Exit { code: 0 }
    }
}

impl std::fmt::Display for ExpectedReturn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedReturn::Exit { code } => write!(f, "{}", code),
            ExpectedReturn::NoCrash => write!(f, "{}", NO_CRASH),
        }
    }
}

/// Everything the runner needs to execute and judge one test
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct TestRecord {
    /// Schema version for forward compatibility
    pub schema: u32,
    /// Arguments for the compiler under test, separated by single spaces
    pub run: String,
    /// Expected exit status
    pub ret: ExpectedReturn,
    /// Expected stdout; empty means stdout is not checked
    pub txt: String,
}

impl TestRecord {
    pub fn new(run: impl Into<String>, ret: ExpectedReturn, txt: impl Into<String>) -> Self {
        Self {
            schema: RECORD_SCHEMA_VERSION,
            run: run.into(),
            ret,
            txt: txt.into(),
        }
    }

    /// Whether stdout is compared literally
    pub fn checks_output(&self) -> bool {
        !self.txt.is_empty()
    }
}

/// Encode a record into a token safe to embed as an unquoted ninja variable
pub fn encode(record: &TestRecord) -> String {
    let json = facet_json::to_string(record);
    hex::encode(json.as_bytes())
}

/// Inverse of [`encode`]
pub fn decode(token: &str) -> Result<TestRecord, MetaError> {
    let bytes = hex::decode(token.trim())?;
    let json = String::from_utf8(bytes).map_err(|_| MetaError::InvalidUtf8)?;
    let record: TestRecord =
        facet_json::from_str(&json).map_err(|e| MetaError::Malformed(e.to_string()))?;

    if record.schema > RECORD_SCHEMA_VERSION {
        return Err(MetaError::UnsupportedSchema {
            found: record.schema,
            supported: RECORD_SCHEMA_VERSION,
        });
    }

    Ok(record)
}
