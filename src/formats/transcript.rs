//! Transcript table loading
//!
//! Each record is one tab-separated line with exactly four fields:
//!
//! ```text
//! transcript_id  chromosome  genome_start  alignment
//! TR1            CHR1        3             8M7D6X2I2M11D7M
//! ```
//!
//! Any invalid record aborts the load; no partial table is returned.

use crate::core::cigar::{parse_cigar, CompatMode, ParsedAlignment};
use crate::core::{Result, TableKind, Tx2GenomeError};
use crate::core::io::{open_input, split_tabs, LineIterator};
use log::{debug, info};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Chromosome name prefix expected by default
pub const DEFAULT_CHROM_PREFIX: &str = "CHR";

/// Number of fields in a transcript record
const TRANSCRIPT_FIELDS: usize = 4;

/// Options controlling transcript table validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Case-sensitive prefix every chromosome name must start with
    pub chrom_prefix: String,
    /// Alignment string dialect
    pub compat_mode: CompatMode,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            chrom_prefix: DEFAULT_CHROM_PREFIX.to_string(),
            compat_mode: CompatMode::default(),
        }
    }
}

/// A validated transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRecord {
    pub transcript_id: String,
    pub chrom: String,
    /// 0-based genome coordinate of the first aligned base
    pub genome_start: u64,
    pub alignment: ParsedAlignment,
}

impl TranscriptRecord {
    /// Parse and validate one transcript line
    pub fn parse(line: &str, line_number: usize, options: &LoadOptions) -> Result<Self> {
        let fail = |message: String| Tx2GenomeError::format(TableKind::Transcripts, line_number, message);

        let fields: Vec<&str> = split_tabs(line).into_iter().map(str::trim).collect();
        if fields.len() != TRANSCRIPT_FIELDS {
            return Err(fail(format!(
                "expected {} columns, got {}",
                TRANSCRIPT_FIELDS,
                fields.len()
            )));
        }

        let (transcript_id, chrom, pos, cigar) = (fields[0], fields[1], fields[2], fields[3]);
        if transcript_id.is_empty() || chrom.is_empty() || pos.is_empty() || cigar.is_empty() {
            return Err(fail(format!(
                "missing data (transcript '{}', chromosome '{}', position '{}', alignment '{}')",
                transcript_id, chrom, pos, cigar
            )));
        }

        if !chrom.starts_with(options.chrom_prefix.as_str()) {
            return Err(fail(format!(
                "malformed chromosome name '{}', expected it to start with '{}'",
                chrom, options.chrom_prefix
            )));
        }

        let genome_start = parse_genome_start(pos).map_err(fail)?;

        let alignment = parse_cigar(cigar, options.compat_mode)
            .map_err(|e| fail(format!("invalid alignment '{}': {}", cigar, e)))?;

        // Every mapped position must fit in i64
        let span_end = u128::from(genome_start) + u128::from(alignment.genome_length());
        if span_end > i64::MAX as u128 + 1 {
            return Err(fail(format!(
                "alignment '{}' starting at {} runs past genome position {}",
                cigar,
                genome_start,
                i64::MAX
            )));
        }

        Ok(Self {
            transcript_id: transcript_id.to_string(),
            chrom: chrom.to_string(),
            genome_start,
            alignment,
        })
    }
}

fn parse_genome_start(pos: &str) -> std::result::Result<u64, String> {
    if !pos.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("genome position '{}' is not a non-negative integer", pos));
    }
    pos.parse::<u64>()
        .ok()
        .filter(|&v| i64::try_from(v).is_ok())
        .ok_or_else(|| format!("genome position '{}' is out of range", pos))
}

/// Whitespace-only lines without any tab are not records
pub(crate) fn is_blank(line: &str) -> bool {
    !line.contains('\t') && line.trim().is_empty()
}

/// Lookup of transcripts by ID
#[derive(Debug, Clone, Default)]
pub struct TranscriptTable {
    records: HashMap<String, TranscriptRecord>,
}

impl TranscriptTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a transcript table from any `BufRead` source
    pub fn from_reader<R: BufRead>(reader: R, options: &LoadOptions) -> Result<Self> {
        let mut table = Self::new();
        let mut first_lines: HashMap<String, usize> = HashMap::new();
        let mut lines = LineIterator::new(reader);

        while let Some(line) = lines.next_line() {
            let (line_number, text) = line?;
            let line = text.map_err(|_| Tx2GenomeError::invalid_utf8(TableKind::Transcripts, line_number))?;
            if is_blank(line) {
                continue;
            }
            let record = TranscriptRecord::parse(line, line_number, options)?;
            debug!(
                "Transcript {} on {} at {}: {} ({} transcript bases)",
                record.transcript_id,
                record.chrom,
                record.genome_start,
                record.alignment,
                record.alignment.transcript_length()
            );
            table.insert(record, line_number, &mut first_lines)?;
        }

        Ok(table)
    }

    /// Load a transcript table from a (possibly compressed) file
    pub fn from_path<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let table = Self::from_reader(open_input(path)?, options)?;
        info!("Loaded {} transcripts from {}", table.len(), path.display());
        Ok(table)
    }

    fn insert(
        &mut self,
        record: TranscriptRecord,
        line_number: usize,
        first_lines: &mut HashMap<String, usize>,
    ) -> Result<()> {
        match self.records.entry(record.transcript_id.clone()) {
            Entry::Occupied(_) => Err(Tx2GenomeError::DuplicateKey {
                first_line: first_lines.get(&record.transcript_id).copied().unwrap_or(0),
                transcript_id: record.transcript_id,
                line: line_number,
            }),
            Entry::Vacant(slot) => {
                first_lines.insert(record.transcript_id.clone(), line_number);
                slot.insert(record);
                Ok(())
            }
        }
    }

    pub fn get(&self, transcript_id: &str) -> Option<&TranscriptRecord> {
        self.records.get(transcript_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &TranscriptRecord> {
        self.records.values()
    }
}
