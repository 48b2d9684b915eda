use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use bibdup_core::{extract, Detector, DetectorConfig, DuplicateGroup, Entry, GroupingPolicy};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config_file;
mod output;

use output::OutputFormat;

/// Find duplicate entries in BibTeX bibliographies by cite key and DOI
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check one or more .bib files; entries from all files are checked together
    Check {
        /// BibTeX files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Configuration file (TOML, or JSON by extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// How overlapping matches are grouped: transitive or per-signal
        #[arg(long)]
        grouping: Option<GroupingPolicy>,

        /// Compare DOIs without resolver prefixes and case
        #[arg(long)]
        normalize_dois: bool,

        /// Match on cite keys only
        #[arg(long, conflicts_with = "normalize_dois")]
        ignore_dois: bool,

        /// Exit with status 1 when duplicates are found
        #[arg(long)]
        fail_on_duplicates: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Configuration file (TOML, or JSON by extension)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Entries from every input file, remembering which file each came from
pub(crate) struct Collected {
    pub files: Vec<PathBuf>,
    pub entries: Vec<Entry>,
    /// Index into `files` for each entry
    pub origins: Vec<usize>,
}

impl Collected {
    pub fn origin(&self, entry: usize) -> &Path {
        &self.files[self.origins[entry]]
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Config { config } => {
            let config = config_file::load_config(config.as_deref())?;
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            files,
            format,
            config,
            grouping,
            normalize_dois,
            ignore_dois,
            fail_on_duplicates,
        } => {
            // Resolve configuration: CLI flags > config file > defaults
            let mut config = config_file::load_config(config.as_deref())?;
            if let Some(grouping) = grouping {
                config.grouping = grouping;
            }
            if normalize_dois {
                config.normalize_dois = true;
            }
            if ignore_dois {
                config.match_dois = false;
            }

            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let found = check(&files, config, format, &mut out)?;
            out.flush()?;

            if found && fail_on_duplicates {
                Ok(ExitCode::from(1))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn collect(files: &[PathBuf]) -> anyhow::Result<Collected> {
    let mut collected = Collected {
        files: files.to_vec(),
        entries: Vec::new(),
        origins: Vec::new(),
    };

    for (index, path) in files.iter().enumerate() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let entries =
            extract(&text).with_context(|| format!("no usable entries in {}", path.display()))?;
        tracing::info!(file = %path.display(), entries = entries.len(), "read bibliography");

        collected.origins.extend(std::iter::repeat(index).take(entries.len()));
        collected.entries.extend(entries);
    }

    Ok(collected)
}

/// Run a check and write the report. Returns whether duplicates were found.
fn check(
    files: &[PathBuf],
    config: DetectorConfig,
    format: OutputFormat,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    let detector = Detector::new(config)?;
    let collected = collect(files)?;
    let groups: Vec<DuplicateGroup> = detector.groups(&collected.entries)?;

    match format {
        OutputFormat::Text => output::print_text_report(out, &collected, &groups)?,
        OutputFormat::Json => output::print_json_report(out, &collected, &groups)?,
    }

    Ok(!groups.is_empty())
}
