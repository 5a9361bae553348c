//! Core coordinate mapping functionality
//!
//! This module contains the alignment string parser, the mapping walk,
//! error types and I/O helpers.

pub mod cigar;
mod error;
pub mod io;
mod mapper;

pub use cigar::{parse_cigar, CigarOp, CigarParseError, CompatMode, ParsedAlignment};
pub use error::{Result, TableKind, Tx2GenomeError};
pub use io::{
    create_output, detect_compression, open_input, split_tabs, CompressionFormat, LineIterator,
    LineText, DEFAULT_BUFFER_SIZE,
};
pub use mapper::{map_offset, CoordinateMapper, MappedLocus};
