// ─── Error ──────────────────────────────────────────────────────────────────
use crate::types::StructureType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Size mismatch: record holds {actual} bytes, type needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Field at offset {offset} (+{width} bytes) exceeds record size {size}")]
    FieldOutOfRange {
        offset: usize,
        width: usize,
        size: usize,
    },
    #[error("No such link in chain: {0:?}")]
    LinkNotFound(StructureType),
    #[error("Link of record {index} points outside the chain buffer")]
    LinkOutOfBounds { index: usize },
    #[error("Link of record {index} does not point at record {}", .index + 1)]
    BrokenLink { index: usize },
    #[error("Record at {addr:#x} is not aligned to {align} bytes")]
    Misaligned { addr: usize, align: usize },
    #[error("Manifest error: {0}")]
    Manifest(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        ChainError::Manifest(e.to_string())
    }
}
