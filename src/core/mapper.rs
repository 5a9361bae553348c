//! Coordinate mapping algorithm
//!
//! Maps a 0-based transcript offset to a 0-based genome coordinate by walking
//! the alignment runs with two cursors:
//! 1. `remaining` counts transcript bases still to consume, starting at
//!    `offset + 1`
//! 2. the genome cursor starts one base before `genome_start`
//! 3. M/X runs advance both, D runs advance the genome only, I runs consume
//!    transcript bases only
//! 4. the walk stops as soon as `remaining` reaches zero
//!
//! Transcripts are assumed to be aligned to the plus strand.

use crate::core::cigar::CigarOp;
use crate::formats::transcript::{TranscriptRecord, TranscriptTable};

/// Map a transcript offset through an alignment
///
/// Returns `None` when the offset lies past the last transcript base covered
/// by the alignment. No further operation is pulled from `ops` once the
/// target base is reached, so the cost depends on where the target sits,
/// not on the alignment length.
///
/// An offset absorbed entirely by a leading insertion yields
/// `genome_start - 1`.
///
/// The walk itself cannot overflow. A position that does not fit in `i64`
/// is also reported as `None`; records loaded through
/// [`TranscriptTable`] never reach one.
///
/// # Examples
/// ```
/// use tx2genome::core::{map_offset, parse_cigar, CompatMode};
/// let aln = parse_cigar("5M3D5M", CompatMode::Improved).unwrap();
/// assert_eq!(map_offset(6, &aln, 100), Some(109));
/// assert_eq!(map_offset(10, &aln, 100), None);
/// ```
pub fn map_offset<I>(transcript_offset: u64, ops: I, genome_start: u64) -> Option<i64>
where
    I: IntoIterator<Item = CigarOp>,
{
    // Widened so that offset + 1 and the genome cursor never wrap
    let mut remaining = u128::from(transcript_offset) + 1;
    let mut cursor = i128::from(genome_start) - 1;
    let mut ops = ops.into_iter();

    while remaining > 0 {
        let Some(op) = ops.next() else {
            break;
        };
        match op {
            CigarOp::Match(n) | CigarOp::Mismatch(n) => {
                let step = u128::from(n).min(remaining);
                cursor = cursor.saturating_add(step as i128);
                remaining -= step;
            }
            CigarOp::Deletion(n) => {
                cursor = cursor.saturating_add(i128::from(n));
            }
            CigarOp::Insertion(n) => {
                remaining -= u128::from(n).min(remaining);
            }
        }
    }

    if remaining > 0 {
        return None;
    }
    i64::try_from(cursor).ok()
}

/// Result of mapping one transcript offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedLocus<'a> {
    pub chrom: &'a str,
    /// `None` when the offset is beyond the aligned span
    pub position: Option<i64>,
}

impl TranscriptRecord {
    /// Map an offset on this transcript to the genome
    pub fn map_offset(&self, transcript_offset: u64) -> Option<i64> {
        map_offset(transcript_offset, &self.alignment, self.genome_start)
    }
}

/// Coordinate mapper over a loaded transcript table
///
/// The table is read-only after construction, so a mapper can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    table: TranscriptTable,
}

impl CoordinateMapper {
    pub fn new(table: TranscriptTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TranscriptTable {
        &self.table
    }

    /// Map `transcript_offset` on `transcript_id`
    ///
    /// Returns `None` if the transcript is not in the table.
    pub fn map(&self, transcript_id: &str, transcript_offset: u64) -> Option<MappedLocus<'_>> {
        let record = self.table.get(transcript_id)?;
        Some(MappedLocus {
            chrom: &record.chrom,
            position: record.map_offset(transcript_offset),
        })
    }
}
