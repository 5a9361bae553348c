//! Table adapters
//!
//! Adapters for the two tab-separated inputs: the transcript table and the
//! query table.

pub mod query;
pub mod transcript;

pub use query::{
    map_query_file, resolve, run, run_queries, unmap_path, write_results, ErrorPolicy, MappingResult,
    Query, RejectedQuery, RunOptions, RunStats,
};
pub use transcript::{LoadOptions, TranscriptRecord, TranscriptTable, DEFAULT_CHROM_PREFIX};
