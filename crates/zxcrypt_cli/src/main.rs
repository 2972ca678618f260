//! zxcrypt CLI
//!
//! Formats, unlocks and manages key slots of zxcrypt volume images.
//!
//! # Commands
//!
//! - `create` - Create a zeroed image file
//! - `format` - Write a new volume sealed under a root key
//! - `unlock` - Check that a root key unlocks a slot
//! - `enroll` - Seal the data key under an additional root key
//! - `revoke` - Destroy a key slot
//! - `shred` - Destroy every superblock copy
//! - `inspect` - Display the superblock header without a key

mod commands;
mod error;

use clap::{Parser, Subcommand};
use error::{CliError, CliResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use zxcrypt_core::KeySlot;

/// zxcrypt volume tools.
#[derive(Parser)]
#[command(name = "zxcrypt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the volume image
    #[arg(global = true, short, long)]
    image: Option<PathBuf>,

    /// Device block size in bytes
    #[arg(global = true, short, long, default_value = "4096")]
    block_size: u32,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a zeroed image file
    Create {
        /// Number of blocks
        #[arg(long)]
        blocks: u64,
    },

    /// Format the image with a new volume
    Format {
        /// File holding the raw 16- or 32-byte root key
        #[arg(short, long)]
        key_file: PathBuf,

        /// Key slot to seal into
        #[arg(short, long, default_value = "0")]
        slot: KeySlot,
    },

    /// Check that a root key unlocks the volume
    Unlock {
        /// File holding the raw root key
        #[arg(short, long)]
        key_file: PathBuf,

        /// Key slot to unseal
        #[arg(short, long, default_value = "0")]
        slot: KeySlot,
    },

    /// Enroll an additional root key
    Enroll {
        /// File holding an enrolled root key
        #[arg(short, long)]
        key_file: PathBuf,

        /// Slot of the enrolled key
        #[arg(short, long, default_value = "0")]
        slot: KeySlot,

        /// File holding the new root key
        #[arg(long)]
        new_key_file: PathBuf,

        /// Slot for the new key
        #[arg(long)]
        new_slot: KeySlot,
    },

    /// Destroy a key slot
    Revoke {
        /// File holding an enrolled root key
        #[arg(short, long)]
        key_file: PathBuf,

        /// Slot of the enrolled key
        #[arg(short, long, default_value = "0")]
        slot: KeySlot,

        /// Slot to destroy
        #[arg(long)]
        revoke_slot: KeySlot,
    },

    /// Destroy every superblock copy, making the volume unrecoverable
    Shred,

    /// Display the superblock header
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let block_size = cli.block_size;
    let image = || {
        cli.image
            .clone()
            .ok_or_else(|| CliError::Usage("--image is required".into()))
    };

    match &cli.command {
        Commands::Create { blocks } => commands::create::run(&image()?, block_size, *blocks),
        Commands::Format { key_file, slot } => {
            commands::format::run(&image()?, block_size, key_file, *slot)
        }
        Commands::Unlock { key_file, slot } => {
            commands::unlock::run(&image()?, block_size, key_file, *slot)
        }
        Commands::Enroll {
            key_file,
            slot,
            new_key_file,
            new_slot,
        } => commands::keys::enroll(
            &image()?,
            block_size,
            key_file,
            *slot,
            new_key_file,
            *new_slot,
        ),
        Commands::Revoke {
            key_file,
            slot,
            revoke_slot,
        } => commands::keys::revoke(&image()?, block_size, key_file, *slot, *revoke_slot),
        Commands::Shred => commands::shred::run(&image()?, block_size),
        Commands::Inspect { format } => commands::inspect::run(&image()?, block_size, format),
        Commands::Version => {
            println!("zxcrypt CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("zxcrypt core v{}", zxcrypt_core::VERSION);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn missing_image_is_usage_error() {
        let err = run(parse(&["zxcrypt", "shred"])).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn format_enroll_revoke_unlock() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("disk.img");
        let image = image.to_str().unwrap();
        let first = dir.path().join("first.key");
        let second = dir.path().join("second.key");
        fs::write(&first, [1u8; 32]).unwrap();
        fs::write(&second, [2u8; 16]).unwrap();
        let first = first.to_str().unwrap();
        let second = second.to_str().unwrap();

        run(parse(&["zxcrypt", "-i", image, "create", "--blocks", "16"])).unwrap();
        run(parse(&["zxcrypt", "-i", image, "format", "-k", first])).unwrap();
        run(parse(&[
            "zxcrypt",
            "-i",
            image,
            "enroll",
            "-k",
            first,
            "--new-key-file",
            second,
            "--new-slot",
            "1",
        ]))
        .unwrap();
        run(parse(&[
            "zxcrypt",
            "-i",
            image,
            "revoke",
            "-k",
            second,
            "-s",
            "1",
            "--revoke-slot",
            "0",
        ]))
        .unwrap();

        let err = run(parse(&["zxcrypt", "-i", image, "unlock", "-k", first])).unwrap_err();
        assert_eq!(err.code(), 2);
        run(parse(&["zxcrypt", "-i", image, "unlock", "-k", second, "-s", "1"])).unwrap();
        run(parse(&["zxcrypt", "-i", image, "inspect", "-f", "json"])).unwrap();

        run(parse(&["zxcrypt", "-i", image, "shred"])).unwrap();
        let err = run(parse(&["zxcrypt", "-i", image, "unlock", "-k", second, "-s", "1"])).unwrap_err();
        assert_eq!(err.code(), 2);
        let err = run(parse(&["zxcrypt", "-i", image, "inspect"])).unwrap_err();
        assert_eq!(err.code(), 3);
    }
}
