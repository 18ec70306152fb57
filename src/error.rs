use std::path::PathBuf;

use crate::Hash;

/// error type for bag-of-cells operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown magic prefix: {}", hex::encode(.0))]
    UnknownMagic([u8; 4]),

    #[error("not enough bytes for {what}")]
    NotEnoughBytes { what: &'static str },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("crc32c mismatch: stored {stored:08x}, computed {computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("{0} unexpected bytes after end of boc")]
    TrailingBytes(usize),

    #[error("{0} unused bytes left in cell data")]
    TrailingCellData(usize),

    #[error("topological order is broken: cell {cell} references cell {reference}")]
    TopologicalOrder { cell: usize, reference: usize },

    #[error("cell {cell} references cell {reference}, but boc only holds {count} cells")]
    ReferenceOutOfRange {
        cell: usize,
        reference: usize,
        count: usize,
    },

    #[error("root index {root} out of range for {count} cells")]
    RootOutOfRange { root: u64, count: usize },

    #[error("cell descriptor declares {0} references, at most 4 allowed")]
    TooManyReferences(usize),

    #[error("circular reference: cell {0} reached twice")]
    CircularReference(Hash),

    #[error("cell references are filled")]
    ReferencesFull,

    #[error("bit string overflow: {requested} bits requested, {available} available")]
    BitOverflow { requested: usize, available: usize },

    #[error("bit string underflow: {requested} bits requested, {available} available")]
    ReadOutOfBounds { requested: usize, available: usize },

    #[error("value {value} does not fit in {width} bits")]
    UintOverflow { value: u64, width: usize },

    #[error("padded byte array has no terminator bit")]
    InvalidPadding,

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid encoding: {0} (expected binary, hex or base64)")]
    InvalidEncoding(String),

    #[error("boc has no root cells")]
    NoRoots,

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
