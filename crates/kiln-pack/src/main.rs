//! kiln-pack - packing steps run from the generated build.ninja

use camino::Utf8PathBuf;
use eyre::Result;
use facet::Facet;
use facet_args as args;
use tracing_subscriber::EnvFilter;

use kiln_pack::{AmalgOptions, amalgamate, pack_includes};

/// kiln-pack - packing steps run from the generated build.ninja
#[derive(Facet, Debug)]
struct Cli {
    /// Step to run
    #[facet(args::subcommand)]
    command: PackCommand,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum PackCommand {
    /// Pack compiler-provided headers into a C header
    Compincl {
        /// Include root; virtual paths are relative to it
        #[facet(args::positional)]
        root: String,

        /// Generated header
        #[facet(args::positional)]
        out: String,

        /// Headers to pack, in order
        #[facet(args::positional)]
        headers: Vec<String>,
    },

    /// Build the single translation unit library
    Amalg {
        /// Output directory
        #[facet(args::named)]
        dir: String,

        /// Base name of the generated .c/.h pair
        #[facet(args::named)]
        name: String,

        /// Public header to copy
        #[facet(args::named)]
        header: String,

        /// License file to copy
        #[facet(args::named)]
        license: String,

        /// Preprocessor symbol selecting the Windows code generation variant
        #[facet(args::named)]
        switch: String,

        /// Windows x64 code generation variant
        #[facet(args::named)]
        win: String,

        /// System V code generation variant
        #[facet(args::named)]
        sysv: String,

        /// Files to concatenate, in order
        #[facet(args::positional)]
        inputs: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli: Cli = args::from_std_args()?;

    match cli.command {
        PackCommand::Compincl { root, out, headers } => {
            let headers: Vec<Utf8PathBuf> = headers.into_iter().map(Utf8PathBuf::from).collect();
            let packed = pack_includes(&Utf8PathBuf::from(root), &headers)?;
            packed.write_to(&Utf8PathBuf::from(out))?;
        }
        PackCommand::Amalg {
            dir,
            name,
            header,
            license,
            switch,
            win,
            sysv,
            inputs,
        } => {
            amalgamate(&AmalgOptions {
                dir: dir.into(),
                name,
                header: header.into(),
                license: license.into(),
                switch,
                win: win.into(),
                sysv: sysv.into(),
                inputs: inputs.into_iter().map(Utf8PathBuf::from).collect(),
            })?;
        }
    }

    Ok(())
}
