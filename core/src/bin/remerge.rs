//! remerge: merge a freshly generated file into its previous, possibly
//! hand-edited version.
//!
//! Usage:
//!   remerge merge <handler|app|test|barrel> --existing <path> --generated <path> [--output <path>]
//!   remerge inspect <path>
//!
//! Merged text goes to stdout unless `--output` is given; logs go to stderr
//! and are filtered by `REMERGE_LOG`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use remerge_core::{ArtifactKind, AstLanguage, Conventions, Merger, Side, parse_source};

#[derive(Parser, Debug)]
#[command(name = "remerge", version, about = "Merge regenerated TypeScript files with hand edits")]
struct Cli {
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log merge decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Parse inputs as TSX
    #[arg(long, global = true)]
    tsx: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge one generated file into its existing counterpart
    Merge {
        /// handler, app, test or barrel
        kind: ArtifactKind,

        /// Previous output; treated as empty if the file does not exist
        #[arg(long)]
        existing: PathBuf,

        /// Freshly generated candidate
        #[arg(long)]
        generated: PathBuf,

        /// Write the merged file here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// TOML file overriding the naming conventions
        #[arg(long, env = "REMERGE_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print the top-level declarations and imports of a file as JSON
    Inspect { path: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let language = if cli.tsx { AstLanguage::Tsx } else { AstLanguage::TypeScript };

    match cli.command {
        Command::Merge {
            kind,
            existing,
            generated,
            output,
            config,
        } => {
            let conventions = match config {
                Some(path) => load_conventions(&path)?,
                None => Conventions::default(),
            };
            let existing_code = read_or_empty(&existing)?;
            let generated_code = fs::read_to_string(&generated)
                .with_context(|| format!("failed to read {}", generated.display()))?;

            let merger = Merger::new(conventions, language);
            let merged = merger
                .merge(kind, &existing_code, &generated_code)
                .with_context(|| format!("failed to merge {} file {}", kind, existing.display()))?;

            match output {
                Some(path) => {
                    fs::write(&path, merged.as_bytes())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "merged");
                }
                None => io::stdout().write_all(merged.as_bytes())?,
            }
        }
        Command::Inspect { path } => {
            let code = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file = parse_source(&code, language, Side::Existing)?;
            println!("{}", serde_json::to_string_pretty(&file)?);
        }
    }

    Ok(())
}

fn read_or_empty(path: &Path) -> anyhow::Result<String> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no existing file, first run");
            Ok(String::new())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn load_conventions(path: &Path) -> anyhow::Result<Conventions> {
    let src = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    Ok(Conventions::from_toml_str(&src)?)
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("REMERGE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
