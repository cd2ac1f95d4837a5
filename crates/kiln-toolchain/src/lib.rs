//! Toolchain registry for kiln
//!
//! Maps a (platform, profile) pair to the host C toolchain command lines used
//! in the generated manifests:
//! - clang on Linux (gcc-style depfiles)
//! - cl/link on Windows (`/showIncludes` dependency discovery)
//!
//! The table is closed: adding a platform or profile is a compile-time
//! checked addition to the `match` in [`table`].

mod table;

use thiserror::Error;

/// Errors that can occur while selecting a toolchain
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("unsupported host platform: {os}")]
    UnsupportedHost { os: String },

    #[error("profile {profile} is not available on {platform}")]
    UnsupportedProfile { platform: Platform, profile: Profile },
}

/// Target platform. Generation only ever targets the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    /// Detect the platform the generator is running on
    pub fn detect_host() -> Result<Self, ToolchainError> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS name as reported by `std::env::consts::OS`
    pub fn from_os(os: &str) -> Result<Self, ToolchainError> {
        match os {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            other => Err(ToolchainError::UnsupportedHost {
                os: other.to_string(),
            }),
        }
    }

    /// One-letter tag used in build directory names (`out/ld`, `out/wr`, ...)
    pub fn tag(&self) -> char {
        match self {
            Platform::Linux => 'l',
            Platform::Windows => 'w',
        }
    }

    /// The code generation ABI linked into binaries built for this platform
    pub fn abi(&self) -> Abi {
        match self {
            Platform::Linux => Abi::SysV,
            Platform::Windows => Abi::Win64,
        }
    }

    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Platform::Linux => "",
            Platform::Windows => ".exe",
        }
    }

    pub fn obj_suffix(&self) -> &'static str {
        match self {
            Platform::Linux => ".o",
            Platform::Windows => ".obj",
        }
    }

    /// How the compiler reports header dependencies on this platform
    pub fn depfile_mode(&self) -> DepfileMode {
        match self {
            Platform::Linux => DepfileMode::Gcc,
            Platform::Windows => DepfileMode::Msvc,
        }
    }

    /// Profiles with a table entry for this platform, in emission order
    pub fn profiles(&self) -> Vec<Profile> {
        Profile::ALL
            .into_iter()
            .filter(|profile| table::commands(*self, *profile).is_some())
            .collect()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Linux => write!(f, "linux"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

/// Build profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Profile {
    Debug,
    Release,
    /// AddressSanitizer build
    Asan,
    /// libFuzzer harness build; swaps the normal entry point for the fuzz one
    Fuzz,
}

impl Profile {
    pub const ALL: [Profile; 4] = [Profile::Debug, Profile::Release, Profile::Asan, Profile::Fuzz];

    pub fn tag(&self) -> char {
        match self {
            Profile::Debug => 'd',
            Profile::Release => 'r',
            Profile::Asan => 'a',
            Profile::Fuzz => 'f',
        }
    }

    pub fn is_fuzz(&self) -> bool {
        matches!(self, Profile::Fuzz)
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Profile::Debug => write!(f, "debug"),
            Profile::Release => write!(f, "release"),
            Profile::Asan => write!(f, "asan"),
            Profile::Fuzz => write!(f, "fuzz"),
        }
    }
}

/// Code generation variant produced by the assembler tool.
///
/// Both variants are generated for every build because the amalgamated
/// library embeds them behind a compile-time switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Abi {
    Win64,
    SysV,
}

impl Abi {
    /// Emission order for the code generation edges
    pub const ALL: [Abi; 2] = [Abi::SysV, Abi::Win64];

    /// Tag used in generated file names (`codegen.l.c`, `codegen.w.c`)
    pub fn tag(&self) -> char {
        match self {
            Abi::Win64 => 'w',
            Abi::SysV => 'l',
        }
    }

    /// Define passed to the assembler (`-D WIN`, `-D SYSV`)
    pub fn define(&self) -> &'static str {
        match self {
            Abi::Win64 => "WIN",
            Abi::SysV => "SYSV",
        }
    }
}

/// How the compiler reports discovered header dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepfileMode {
    /// No dependency discovery
    None,
    /// Makefile-style depfile written next to the object (`$out.d`)
    Gcc,
    /// `/showIncludes` lines on stdout
    Msvc,
}

impl DepfileMode {
    /// Value for the ninja `deps` rule variable, if any
    pub fn ninja_deps(&self) -> Option<&'static str> {
        match self {
            DepfileMode::None => None,
            DepfileMode::Gcc => Some("gcc"),
            DepfileMode::Msvc => Some("msvc"),
        }
    }

    /// Value for the ninja `depfile` rule variable, if any
    pub fn ninja_depfile(&self) -> Option<&'static str> {
        match self {
            DepfileMode::Gcc => Some("$out.d"),
            DepfileMode::None | DepfileMode::Msvc => None,
        }
    }
}

/// Command templates for one (platform, profile) pair.
///
/// Templates use ninja placeholders: `$in`, `$out` and `$root` (the source
/// directory relative to the build directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commands {
    /// Compile one translation unit to an object
    pub compile: &'static str,
    /// Link objects into the compiler executable
    pub link: &'static str,
    /// Build the code generation tool from a single source
    pub tool: &'static str,
    /// Compile and link an update-scenario driver against the amalgamation
    pub driver: &'static str,
}

/// A fully resolved toolchain selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainProfile {
    pub platform: Platform,
    pub profile: Profile,
    pub commands: Commands,
    pub depfile: DepfileMode,
    pub exe_suffix: &'static str,
    pub obj_suffix: &'static str,
}

impl ToolchainProfile {
    /// Build directory tag, e.g. `ld` for Linux debug
    pub fn build_dir_tag(&self) -> String {
        format!("{}{}", self.platform.tag(), self.profile.tag())
    }

    /// `name` with this platform's executable suffix
    pub fn exe(&self, name: &str) -> String {
        format!("{}{}", name, self.exe_suffix)
    }

    /// Object file name for a source path (`dynasm/x.c` -> `dynasm/x.o`)
    pub fn object_for(&self, source: &str) -> String {
        let stem = match source.rfind('.') {
            Some(dot) if !source[dot..].contains('/') => &source[..dot],
            _ => source,
        };
        format!("{}{}", stem, self.obj_suffix)
    }
}

/// Look up the toolchain for a (platform, profile) pair
pub fn resolve(platform: Platform, profile: Profile) -> Result<ToolchainProfile, ToolchainError> {
    let commands = table::commands(platform, profile)
        .ok_or(ToolchainError::UnsupportedProfile { platform, profile })?;

    Ok(ToolchainProfile {
        platform,
        profile,
        commands,
        depfile: platform.depfile_mode(),
        exe_suffix: platform.exe_suffix(),
        obj_suffix: platform.obj_suffix(),
    })
}

#[cfg(test)]
mod tests;
