//! The kiln executables the generated manifests invoke.
//!
//! They are installed side by side, so the generator finds its siblings
//! next to its own executable.

use camino::{Utf8Path, Utf8PathBuf};

use crate::GenError;

pub const GEN_NAME: &str = "kiln-gen";
pub const PACK_NAME: &str = "kiln-pack";
pub const TESTRUN_NAME: &str = "kiln-testrun";

/// Absolute paths of the kiln executables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    /// The generator itself, run by the regeneration edge
    pub gen_exe: Utf8PathBuf,
    /// Amalgamation and include packing
    pub pack: Utf8PathBuf,
    /// Test runner
    pub testrun: Utf8PathBuf,
}

impl Tools {
    /// Tools installed in `dir`
    pub fn in_dir(dir: &Utf8Path) -> Self {
        let exe = |name: &str| dir.join(format!("{}{}", name, std::env::consts::EXE_SUFFIX));
        Self {
            gen_exe: exe(GEN_NAME),
            pack: exe(PACK_NAME),
            testrun: exe(TESTRUN_NAME),
        }
    }

    /// Tools next to the running executable
    pub fn beside_current_exe() -> Result<Self, GenError> {
        let exe = std::env::current_exe().map_err(GenError::CurrentExe)?;
        let exe = Utf8PathBuf::from_path_buf(exe).map_err(GenError::NonUtf8Path)?;
        let dir = exe.parent().unwrap_or(Utf8Path::new("."));
        Ok(Self::in_dir(dir))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utf8Path> {
        [&self.gen_exe, &self.pack, &self.testrun]
            .into_iter()
            .map(|p| p.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_share_a_directory() {
        let tools = Tools::in_dir(Utf8Path::new("/opt/kiln/bin"));
        let suffix = std::env::consts::EXE_SUFFIX;
        assert_eq!(tools.pack.file_name(), Some(format!("kiln-pack{}", suffix).as_str()));
        assert_eq!(tools.testrun.parent(), tools.gen_exe.parent());
        assert_eq!(tools.iter().count(), 3);
    }
}
