//! Error types shared by parsing, searching and path resolution.

use std::path::PathBuf;
use std::sync::Arc;

/// A specialized Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Failure of a forward or backward search.
///
/// Every variant is reported once, synchronously, to the caller of the search
/// entry point; nothing here is retried. Cloneable so one failed parse can be
/// handed to every request that awaited it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    /// Neither the plain nor the compressed mapping file exists.
    #[error(
        "No mapping file found: neither {} nor {} exists",
        plain.display(),
        compressed.display()
    )]
    MissingMappingFile { plain: PathBuf, compressed: PathBuf },

    /// A mapping file exists but could not be decoded.
    #[error("Mapping file {} could not be parsed: {source}", path.display())]
    CorruptMappingFile {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// No input file recorded in the mapping denotes the requested source file.
    #[error(
        "No entry for {} found in the mapping file (inputs: {})",
        requested.display(),
        inputs.join(", ")
    )]
    NoMatchingInput {
        requested: PathBuf,
        inputs: Vec<String>,
    },

    /// The index is internally inconsistent for the resolved input.
    #[error("Malformed index for {input}: {reason}")]
    MalformedIndex { input: String, reason: String },

    /// No eligible block exists on the requested page.
    #[error("Cannot find any line to jump to on page {page}")]
    NoMatch { page: u32 },

    /// The winning input file does not exist under any candidate spelling.
    #[error("Input file to jump to does not exist in the file system: {input}")]
    UnresolvableInputPath { input: String },

    /// A blocking task running a parse was lost.
    #[error("Background parse failed: {0}")]
    Task(String),
}

/// Failure to decode the bytes of a mapping file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    /// The body does not start with a `SyncTeX Version:` header.
    #[error("missing SyncTeX header")]
    MissingHeader,

    /// A recognised record carries a value that is not a number.
    #[error("invalid record on line {line}: {record}")]
    InvalidRecord { line: usize, record: String },

    /// The body looked compressed but gzip decoding failed.
    #[error("gzip decompression failed: {0}")]
    Decompress(#[source] Arc<std::io::Error>),

    /// The file exists but could not be read.
    #[error("read failed: {0}")]
    Io(#[source] Arc<std::io::Error>),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Arc::new(e))
    }
}
