//! Document and query sources for osbench
//!
//! Sources yield [`osbench_core::SourceItem`]s lazily; the manager pulls them
//! one at a time, so a file is never loaded into memory as a whole.
//!
//! - [`JsonLinesSource`]: one JSON object per line, used for both documents
//!   (bulk ingest) and query bodies (search)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod jsonl;

pub use error::{SourceError, SourceResult};
pub use jsonl::{Cycle, JsonLines, JsonLinesSource};
