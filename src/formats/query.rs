//! Query table processing
//!
//! Each query is one tab-separated line with exactly two fields:
//!
//! ```text
//! transcript_id  transcript_offset
//! TR1            4
//! ```
//!
//! Each query produces one output row, in input order:
//!
//! ```text
//! transcript_id  transcript_offset  chromosome  genome_position
//! TR1            4                  CHR1        7
//! ```
//!
//! `genome_position` is `-1` when the offset lies beyond the aligned span.

use crate::core::{Result, TableKind, Tx2GenomeError};
use crate::core::io::{create_output, open_input, split_tabs, LineIterator};
use crate::core::CoordinateMapper;
use crate::formats::transcript::is_blank;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Number of fields in a query record
const QUERY_FIELDS: usize = 2;

/// Chunk size for parallel processing
const CHUNK_SIZE: usize = 10000;

/// A parsed query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub transcript_id: String,
    pub transcript_offset: u64,
}

impl Query {
    pub fn new(transcript_id: impl Into<String>, transcript_offset: u64) -> Self {
        Self {
            transcript_id: transcript_id.into(),
            transcript_offset,
        }
    }

    /// Parse and validate one query line
    pub fn parse(line: &str, line_number: usize) -> Result<Self> {
        let fail = |message: String| Tx2GenomeError::format(TableKind::Queries, line_number, message);

        let fields: Vec<&str> = split_tabs(line).into_iter().map(str::trim).collect();
        if fields.len() != QUERY_FIELDS {
            return Err(fail(format!(
                "expected {} columns, got {}",
                QUERY_FIELDS,
                fields.len()
            )));
        }

        let (transcript_id, offset) = (fields[0], fields[1]);
        if transcript_id.is_empty() {
            return Err(fail("missing transcript ID".to_string()));
        }
        let unsigned = match offset.strip_prefix('-') {
            Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                if digits.bytes().any(|b| b != b'0') {
                    return Err(fail(format!("offset {} for {} is negative", offset, transcript_id)));
                }
                // -0 is zero
                digits
            }
            _ => offset,
        };
        let transcript_offset = unsigned.parse::<u64>().map_err(|_| {
            fail(format!(
                "offset '{}' for {} is not a non-negative integer",
                offset, transcript_id
            ))
        })?;

        Ok(Self::new(transcript_id, transcript_offset))
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingResult {
    pub transcript_id: String,
    pub transcript_offset: u64,
    pub chrom: String,
    /// `None` when the offset lies beyond the aligned span
    pub genome_position: Option<i64>,
}

impl MappingResult {
    pub fn is_aligned(&self) -> bool {
        self.genome_position.is_some()
    }
}

impl fmt::Display for MappingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.transcript_id,
            self.transcript_offset,
            self.chrom,
            self.genome_position.unwrap_or(-1)
        )
    }
}

/// What to do with a query that cannot be parsed or resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the whole batch at the first bad query
    #[default]
    Abort,
    /// Record the bad query and continue
    Skip,
}

/// Options for a query run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub error_policy: ErrorPolicy,
    /// Number of threads (1 = sequential)
    pub threads: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::Abort,
            threads: 1,
        }
    }
}

/// A query skipped under [`ErrorPolicy::Skip`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedQuery {
    pub line: usize,
    pub record: String,
    pub reason: String,
}

/// Run statistics
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub total: usize,
    /// Rows with a genome position
    pub mapped: usize,
    /// Rows written as -1
    pub unaligned: usize,
    pub failed: usize,
    pub rejected: Vec<RejectedQuery>,
}

impl RunStats {
    fn record(&mut self, result: &MappingResult) {
        self.total += 1;
        if result.is_aligned() {
            self.mapped += 1;
        } else {
            self.unaligned += 1;
        }
    }
}

/// Resolve one parsed query
pub fn resolve(mapper: &CoordinateMapper, query: Query, line_number: usize) -> Result<MappingResult> {
    match mapper.map(&query.transcript_id, query.transcript_offset) {
        Some(locus) => {
            if locus.position.is_none() {
                debug!(
                    "Offset {} is past the aligned span of {} (line {}), written as -1",
                    query.transcript_offset, query.transcript_id, line_number
                );
            }
            Ok(MappingResult {
                chrom: locus.chrom.to_string(),
                genome_position: locus.position,
                transcript_id: query.transcript_id,
                transcript_offset: query.transcript_offset,
            })
        }
        None => Err(Tx2GenomeError::Lookup {
            table: TableKind::Queries,
            transcript_id: query.transcript_id,
            line: line_number,
        }),
    }
}

fn resolve_line(mapper: &CoordinateMapper, line: &str, line_number: usize) -> Result<MappingResult> {
    resolve(mapper, Query::parse(line, line_number)?, line_number)
}

/// Resolve already-parsed queries in order, aborting at the first unknown
/// transcript
///
/// Line numbers in errors are the 1-based positions in `queries`.
pub fn run<I>(mapper: &CoordinateMapper, queries: I) -> Result<Vec<MappingResult>>
where
    I: IntoIterator<Item = Query>,
{
    queries
        .into_iter()
        .enumerate()
        .map(|(idx, query)| resolve(mapper, query, idx + 1))
        .collect()
}

/// Apply the error policy to one resolved line
fn accept(
    outcome: Result<MappingResult>,
    line_number: usize,
    line: &str,
    policy: ErrorPolicy,
    results: &mut Vec<MappingResult>,
    stats: &mut RunStats,
) -> Result<()> {
    match outcome {
        Ok(result) => {
            stats.record(&result);
            results.push(result);
            Ok(())
        }
        Err(e) if policy == ErrorPolicy::Skip && e.is_record_error() => {
            warn!("Skipping query at line {}: {}", line_number, e);
            stats.total += 1;
            stats.failed += 1;
            stats.rejected.push(RejectedQuery {
                line: e.line().unwrap_or(line_number),
                record: line.to_string(),
                reason: e.to_string(),
            });
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Resolve every query read from `reader`
///
/// Results are in input order. With [`ErrorPolicy::Abort`] the first bad
/// query in input order is returned as the error.
pub fn run_queries<R: BufRead>(
    mapper: &CoordinateMapper,
    reader: R,
    options: &RunOptions,
) -> Result<(Vec<MappingResult>, RunStats)> {
    if options.threads > 1 {
        run_queries_parallel(mapper, reader, options)
    } else {
        run_queries_sequential(mapper, reader, options.error_policy)
    }
}

/// Sequential resolution (single-threaded), stops reading at a fatal error
fn run_queries_sequential<R: BufRead>(
    mapper: &CoordinateMapper,
    reader: R,
    policy: ErrorPolicy,
) -> Result<(Vec<MappingResult>, RunStats)> {
    let mut results = Vec::new();
    let mut stats = RunStats::default();
    let mut lines = LineIterator::new(reader);

    while let Some(line) = lines.next_line() {
        let (line_number, text) = line?;
        let line = match text {
            Ok(line) => line,
            Err(lossy) => {
                let err = Tx2GenomeError::invalid_utf8(TableKind::Queries, line_number);
                accept(Err(err), line_number, &lossy, policy, &mut results, &mut stats)?;
                continue;
            }
        };
        if is_blank(line) {
            continue;
        }
        let outcome = resolve_line(mapper, line, line_number);
        accept(outcome, line_number, line, policy, &mut results, &mut stats)?;
    }

    Ok((results, stats))
}

/// Parallel resolution using rayon
///
/// Reads all lines into memory, resolves them in parallel chunks, then
/// reassembles the results in input order.
fn run_queries_parallel<R: BufRead>(
    mapper: &CoordinateMapper,
    reader: R,
    options: &RunOptions,
) -> Result<(Vec<MappingResult>, RunStats)> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build()
        .map_err(|e| {
            Tx2GenomeError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to create thread pool: {}", e),
            ))
        })?;

    // Undecodable lines are kept (lossily) so they are reported in order
    let mut data_lines: Vec<(usize, std::result::Result<String, String>)> = Vec::new();
    let mut lines = LineIterator::new(reader);
    while let Some(line) = lines.next_line() {
        let (line_number, text) = line?;
        match text {
            Ok(line) if is_blank(line) => {}
            Ok(line) => data_lines.push((line_number, Ok(line.to_string()))),
            Err(lossy) => data_lines.push((line_number, Err(lossy))),
        }
    }

    let outcomes: Vec<Vec<Result<MappingResult>>> = pool.install(|| {
        data_lines
            .par_chunks(CHUNK_SIZE)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|(line_number, text)| match text {
                        Ok(line) => resolve_line(mapper, line, *line_number),
                        Err(_) => Err(Tx2GenomeError::invalid_utf8(TableKind::Queries, *line_number)),
                    })
                    .collect()
            })
            .collect()
    });

    let mut results = Vec::with_capacity(data_lines.len());
    let mut stats = RunStats::default();
    for ((line_number, text), outcome) in data_lines.iter().zip(outcomes.into_iter().flatten()) {
        let (Ok(record) | Err(record)) = text;
        accept(outcome, *line_number, record, options.error_policy, &mut results, &mut stats)?;
    }

    Ok((results, stats))
}

/// Write result rows, one per line
pub fn write_results<W: Write>(writer: &mut W, results: &[MappingResult]) -> std::io::Result<()> {
    for result in results {
        writeln!(writer, "{}", result)?;
    }
    Ok(())
}

/// Path of the file listing rejected queries for a given output path
pub fn unmap_path(output: &Path) -> PathBuf {
    PathBuf::from(format!("{}.unmap", output.display()))
}

/// Resolve a query file and write the results
///
/// Nothing is written unless every query was handled, so a fatal error never
/// leaves a partial output file. Rejected queries (only possible with
/// [`ErrorPolicy::Skip`]) go to `<output>.unmap`.
pub fn map_query_file<P: AsRef<Path>>(
    mapper: &CoordinateMapper,
    queries: P,
    output: P,
    options: &RunOptions,
) -> Result<RunStats> {
    let (results, stats) = run_queries(mapper, open_input(queries.as_ref())?, options)?;

    let mut writer = create_output(output.as_ref())?;
    write_results(&mut writer, &results)?;
    writer.flush()?;
    info!("Wrote {} rows to {}", results.len(), output.as_ref().display());

    if !stats.rejected.is_empty() {
        let path = unmap_path(output.as_ref());
        let mut unmap = create_output(&path)?;
        for rejected in &stats.rejected {
            writeln!(unmap, "{}\tFail\t{}", rejected.record, rejected.reason)?;
        }
        unmap.flush()?;
        warn!("{} queries rejected, see {}", stats.rejected.len(), path.display());
    }

    Ok(stats)
}
