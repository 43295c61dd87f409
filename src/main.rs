#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use mtpack::pack;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mtpack", version, about = "mTP64 texture pack builder")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build an .mtp64 pack from KTX textures named by their CRC key.
    Build {
        /// Output pack file.
        #[arg(long, short)]
        output: PathBuf,
        /// Shared zstd dictionary embedded in the pack (size a multiple of 1024).
        #[arg(long)]
        dictionary: Option<PathBuf>,
        /// Where to list duplicate textures (default: <output>.duplicates.txt).
        #[arg(long)]
        duplicates: Option<PathBuf>,
        /// Texture pack version, MAJOR.MINOR.PATCH.
        #[arg(long, default_value = "0.0.1")]
        pack_version: String,
        /// ROM header name the pack targets (up to 20 bytes).
        #[arg(long, default_value = "")]
        rom_target: String,
        /// Pack name (up to 32 bytes).
        #[arg(long, default_value = "")]
        name: String,
        /// Pack author (up to 32 bytes).
        #[arg(long, default_value = "")]
        author: String,
        /// Zstd level (1..=22).
        #[arg(long, default_value_t = pack::DEFAULT_LEVEL)]
        zstd_level: i32,
        /// Input KTX files or directories containing them.
        inputs: Vec<PathBuf>,
    },

    /// Dump each decoded texture body raw, e.g. to train a dictionary.
    Dump {
        /// Output directory.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Input KTX files or directories containing them.
        inputs: Vec<PathBuf>,
    },

    /// Confirm the pairs of a duplicate report really are identical (blake3).
    CheckDuplicates {
        #[arg(long)]
        report: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let res = match cli.cmd {
        Command::Build {
            output,
            dictionary,
            duplicates,
            pack_version,
            rom_target,
            name,
            author,
            zstd_level,
            inputs,
        } => {
            let args = pack::BuildArgs {
                output,
                dictionary,
                duplicates,
                pack_version,
                rom_target,
                name,
                author,
                zstd_level,
            };
            pack::PackConfig::build(&inputs, args).and_then(|cfg| pack::run(&cfg))
        }
        Command::Dump { dir, inputs } => {
            pack::PackConfig::dump(&inputs, dir).and_then(|cfg| pack::run(&cfg))
        }
        Command::CheckDuplicates { report } => pack::check_duplicates(&report).map(|_| ()),
    };

    if let Err(e) = res {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
