//! tx2genome - transcript to genome coordinate translation
//!
//! Converts 0-based offsets on spliced transcripts into 0-based reference
//! genome coordinates, using a CIGAR-style alignment per transcript.
//!
//! # Features
//!
//! - Early-exit alignment walk: cost depends on where the target base sits
//! - Strict validation of both input tables, aborting on the first bad record
//! - Optional lenient mode that skips bad queries and reports them
//! - Parallel query resolution with rayon, output order preserved
//! - Transparent gzip/bzip2 input
//!
//! # Example
//!
//! ```
//! use tx2genome::{CoordinateMapper, LoadOptions, Query, TranscriptTable};
//!
//! let table = TranscriptTable::from_reader(
//!     "TR1\tCHR1\t3\t8M7D6X2I2M11D7M\n".as_bytes(),
//!     &LoadOptions::default(),
//! )?;
//! let mapper = CoordinateMapper::new(table);
//!
//! let rows = tx2genome::formats::run(&mapper, vec![Query::new("TR1", 4)])?;
//! assert_eq!(rows[0].to_string(), "TR1\t4\tCHR1\t7");
//! # Ok::<(), tx2genome::Tx2GenomeError>(())
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use core::{
    map_offset, parse_cigar, CigarOp, CigarParseError, CompatMode, CoordinateMapper, ParsedAlignment,
    TableKind, Tx2GenomeError,
};
pub use formats::{
    ErrorPolicy, LoadOptions, MappingResult, Query, RunOptions, RunStats, TranscriptRecord,
    TranscriptTable,
};
