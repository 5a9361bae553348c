//! tx2genome CLI entry point
//!
//! Translates transcript offsets to genome coordinates for a batch of queries.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tx2genome::core::CompatMode;
use tx2genome::formats::{self, ErrorPolicy, LoadOptions, RunOptions, DEFAULT_CHROM_PREFIX};
use tx2genome::{CoordinateMapper, TranscriptTable};

/// Compatibility mode for alignment string parsing (CLI enum)
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CompatModeArg {
    /// Bare letters are length 1; consecutive bare letters are rejected
    #[default]
    #[value(name = "improved")]
    Improved,
    /// Strict mode: parse alignment strings exactly like the reference tool
    #[value(name = "strict")]
    Strict,
}

impl From<CompatModeArg> for CompatMode {
    fn from(arg: CompatModeArg) -> Self {
        match arg {
            CompatModeArg::Improved => CompatMode::Improved,
            CompatModeArg::Strict => CompatMode::Strict,
        }
    }
}

/// What to do with a bad query record (CLI enum)
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ErrorPolicyArg {
    /// Stop at the first bad query and write nothing
    #[default]
    #[value(name = "abort")]
    Abort,
    /// Skip bad queries and list them in <output>.unmap
    #[value(name = "skip")]
    Skip,
}

impl From<ErrorPolicyArg> for ErrorPolicy {
    fn from(arg: ErrorPolicyArg) -> Self {
        match arg {
            ErrorPolicyArg::Abort => ErrorPolicy::Abort,
            ErrorPolicyArg::Skip => ErrorPolicy::Skip,
        }
    }
}

#[derive(Parser)]
#[command(name = "tx2genome")]
#[command(about = "Translate transcript coordinates to genome coordinates")]
#[command(version)]
#[command(author = "tx2genome Contributors")]
struct Cli {
    /// Transcript file, 4 columns: name, chromosome, genome start, alignment
    #[arg(short = 't', long = "transcripts")]
    transcripts: PathBuf,

    /// Query file, 2 columns: transcript name, transcript offset
    #[arg(short = 'q', long = "queries")]
    queries: PathBuf,

    /// Output file (.gz for gzip output)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Alignment parsing mode: 'strict' for reference-identical parsing
    #[arg(long = "compat-mode", default_value = "improved")]
    compat_mode: CompatModeArg,

    /// Handling of bad query records
    #[arg(long = "on-error", default_value = "abort")]
    on_error: ErrorPolicyArg,

    /// Number of threads for query resolution
    #[arg(short = 'j', long, default_value = "1")]
    threads: usize,

    /// Required chromosome name prefix (case-sensitive)
    #[arg(long = "chrom-prefix", default_value = DEFAULT_CHROM_PREFIX)]
    chrom_prefix: String,

    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,
}

fn load_transcripts(cli: &Cli) -> anyhow::Result<CoordinateMapper> {
    let start = Instant::now();
    log::info!("Loading transcript table: {:?}", cli.transcripts);

    let options = LoadOptions {
        chrom_prefix: cli.chrom_prefix.clone(),
        compat_mode: cli.compat_mode.into(),
    };
    let table = TranscriptTable::from_path(&cli.transcripts, &options)
        .with_context(|| format!("Failed to load transcript table {:?}", cli.transcripts))?;

    log::info!("Transcript table loaded in {:.2}s", start.elapsed().as_secs_f64());
    Ok(CoordinateMapper::new(table))
}

fn chromosome_count(table: &TranscriptTable) -> usize {
    table.iter().map(|record| record.chrom.as_str()).collect::<HashSet<_>>().len()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
    let start = Instant::now();

    let compat_mode = CompatMode::from(cli.compat_mode);
    if compat_mode.is_strict() {
        log::info!("Compatibility mode: strict (reference-identical alignment parsing)");
    }

    let mapper = load_transcripts(&cli)?;

    let options = RunOptions {
        error_policy: cli.on_error.into(),
        threads: cli.threads.max(1),
    };
    log::info!("Mapping queries: {:?} -> {:?}", cli.queries, cli.output);
    let stats = formats::map_query_file(&mapper, &cli.queries, &cli.output, &options)
        .with_context(|| format!("Failed to map queries from {:?}", cli.queries))?;

    if !cli.quiet {
        eprintln!("\n=== Mapping Statistics ===");
        eprintln!("Transcripts:     {}", mapper.table().len());
        eprintln!("Chromosomes:     {}", chromosome_count(mapper.table()));
        eprintln!("Total queries:   {}", stats.total);
        eprintln!("Mapped:          {}", stats.mapped);
        eprintln!("Unaligned (-1):  {}", stats.unaligned);
        eprintln!("Failed:          {}", stats.failed);
        eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
    }

    Ok(())
}
