//! Alignment string parsing
//!
//! Parses the CIGAR-style strings that describe how a transcript aligns to
//! the genome.
//!
//! # Grammar
//!
//! ```text
//! alignment := run+
//! run       := digits? op
//! op        := 'M' | 'I' | 'D' | 'X'
//! ```
//!
//! - `M` match and `X` mismatch consume both transcript and genome bases
//! - `I` insertion consumes transcript bases only
//! - `D` deletion consumes genome bases only
//!
//! A run with no digits has length 1. How consecutive bare letters are
//! treated depends on [`CompatMode`].

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Compatibility mode for alignment string parsing
///
/// Only changes how runs without an explicit length are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompatMode {
    /// Every bare letter is a length-1 run; a bare letter directly after
    /// another bare letter is rejected
    #[default]
    Improved,
    /// Bit-for-bit behaviour of the reference tool
    /// - each non-overlapping pair of adjacent letters gets a length of 1
    ///   synthesized for its second letter
    /// - any letter left without a length is dropped
    Strict,
}

impl CompatMode {
    pub fn is_strict(&self) -> bool {
        matches!(self, CompatMode::Strict)
    }
}

/// Errors raised while parsing an alignment string
///
/// Positions are 0-based byte offsets into the alignment string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CigarParseError {
    #[error("empty alignment string")]
    Empty,

    #[error("unsupported operation '{op}' at position {position} (expected M, I, D or X)")]
    UnknownOperation { op: char, position: usize },

    #[error("run length at position {position} is not followed by an operation")]
    MissingOperation { position: usize },

    #[error("operation at position {position} follows another operation with no run length in between")]
    ConsecutiveBareOperations { position: usize },

    #[error("run length at position {position} does not fit in 64 bits")]
    LengthOverflow { position: usize },
}

/// A single alignment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarOp {
    Match(u64),
    Mismatch(u64),
    Insertion(u64),
    Deletion(u64),
}

impl CigarOp {
    /// Build an operation from its letter code
    pub fn from_code(code: u8, len: u64) -> Option<Self> {
        match code {
            b'M' => Some(CigarOp::Match(len)),
            b'X' => Some(CigarOp::Mismatch(len)),
            b'I' => Some(CigarOp::Insertion(len)),
            b'D' => Some(CigarOp::Deletion(len)),
            _ => None,
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            CigarOp::Match(n) | CigarOp::Mismatch(n) | CigarOp::Insertion(n) | CigarOp::Deletion(n) => *n,
        }
    }

    pub fn code(&self) -> char {
        match self {
            CigarOp::Match(_) => 'M',
            CigarOp::Mismatch(_) => 'X',
            CigarOp::Insertion(_) => 'I',
            CigarOp::Deletion(_) => 'D',
        }
    }

    pub fn consumes_transcript(&self) -> bool {
        matches!(self, CigarOp::Match(_) | CigarOp::Mismatch(_) | CigarOp::Insertion(_))
    }

    pub fn consumes_genome(&self) -> bool {
        matches!(self, CigarOp::Match(_) | CigarOp::Mismatch(_) | CigarOp::Deletion(_))
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len(), self.code())
    }
}

/// Ordered list of alignment runs, 5' to 3' along the transcript
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedAlignment {
    ops: Vec<CigarOp>,
}

impl ParsedAlignment {
    pub fn new(ops: Vec<CigarOp>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[CigarOp] {
        &self.ops
    }

    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, CigarOp>> {
        self.ops.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of transcript bases covered by the alignment (M, X and I runs)
    ///
    /// Saturates at `u64::MAX`.
    pub fn transcript_length(&self) -> u64 {
        self.ops
            .iter()
            .filter(|op| op.consumes_transcript())
            .fold(0u64, |acc, op| acc.saturating_add(op.len()))
    }

    /// Number of genome bases spanned by the alignment (M, X and D runs)
    ///
    /// Saturates at `u64::MAX`.
    pub fn genome_length(&self) -> u64 {
        self.ops
            .iter()
            .filter(|op| op.consumes_genome())
            .fold(0u64, |acc, op| acc.saturating_add(op.len()))
    }
}

impl<'a> IntoIterator for &'a ParsedAlignment {
    type Item = CigarOp;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, CigarOp>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ParsedAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.ops {
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

impl FromStr for ParsedAlignment {
    type Err = CigarParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cigar(s, CompatMode::Improved)
    }
}

/// One run as written, before any length is filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawRun {
    len: Option<u64>,
    code: u8,
    /// Offset of the operation letter
    position: usize,
}

/// Tokenizer over the runs of an alignment string
///
/// Yields one item per operation letter and stops after the first error.
struct RawRuns<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> RawRuns<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn fail(&mut self, err: CigarParseError) -> Option<Result<RawRun, CigarParseError>> {
        self.pos = self.text.len();
        Some(Err(err))
    }
}

impl Iterator for RawRuns<'_> {
    type Item = Result<RawRun, CigarParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }

        let start = self.pos;
        let mut pos = start;
        let mut len: Option<u64> = None;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            let digit = u64::from(bytes[pos] - b'0');
            match len.unwrap_or(0).checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => len = Some(v),
                None => return self.fail(CigarParseError::LengthOverflow { position: start }),
            }
            pos += 1;
        }

        if pos == bytes.len() {
            return self.fail(CigarParseError::MissingOperation { position: start });
        }

        let code = bytes[pos];
        if !matches!(code, b'M' | b'I' | b'D' | b'X') {
            // pos only ever advances over ASCII, so it sits on a char boundary
            let op = self.text[pos..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
            return self.fail(CigarParseError::UnknownOperation { op, position: pos });
        }

        self.pos = pos + 1;
        Some(Ok(RawRun { len, code, position: pos }))
    }
}

fn to_op(run: &RawRun, len: u64) -> Result<CigarOp, CigarParseError> {
    CigarOp::from_code(run.code, len).ok_or(CigarParseError::UnknownOperation {
        op: char::from(run.code),
        position: run.position,
    })
}

/// Parse an alignment string
///
/// # Examples
/// ```
/// use tx2genome::core::{parse_cigar, CigarOp, CompatMode};
/// let aln = parse_cigar("8M7D6X2I", CompatMode::Improved).unwrap();
/// assert_eq!(
///     aln.ops(),
///     &[CigarOp::Match(8), CigarOp::Deletion(7), CigarOp::Mismatch(6), CigarOp::Insertion(2)]
/// );
/// ```
pub fn parse_cigar(text: &str, mode: CompatMode) -> Result<ParsedAlignment, CigarParseError> {
    if text.is_empty() {
        return Err(CigarParseError::Empty);
    }

    match mode {
        CompatMode::Improved => parse_improved(text),
        CompatMode::Strict => parse_strict(text),
    }
}

fn parse_improved(text: &str) -> Result<ParsedAlignment, CigarParseError> {
    let mut ops = Vec::new();
    let mut prev_bare = false;

    for run in RawRuns::new(text) {
        let run = run?;
        let len = match run.len {
            Some(n) => {
                prev_bare = false;
                n
            }
            None if prev_bare => {
                return Err(CigarParseError::ConsecutiveBareOperations { position: run.position });
            }
            None => {
                prev_bare = true;
                1
            }
        };
        ops.push(to_op(&run, len)?);
    }

    Ok(ParsedAlignment::new(ops))
}

fn parse_strict(text: &str) -> Result<ParsedAlignment, CigarParseError> {
    // Validate the whole string before building anything
    let runs = RawRuns::new(text).collect::<Result<Vec<_>, _>>()?;

    let mut ops = Vec::with_capacity(runs.len());
    // Whether the previous letter can still start an adjacent-letter pair
    let mut pair_open = false;

    for run in &runs {
        let len = match run.len {
            Some(n) => {
                pair_open = true;
                Some(n)
            }
            None if pair_open => {
                pair_open = false;
                Some(1)
            }
            None => {
                pair_open = true;
                None
            }
        };
        if let Some(len) = len {
            ops.push(to_op(run, len)?);
        }
    }

    Ok(ParsedAlignment::new(ops))
}
