use serde::Serialize;
use thiserror::Error;

use crate::section::Tag;

/// Failures raised while reading or writing a course file.
#[derive(Debug, Error)]
pub enum KmpError {
    #[error("invalid magic: {found}")]
    BadMagic { found: Tag },

    #[error("invalid section count: {0}")]
    InvalidSectionCount(u16),

    #[error("read of {wanted} bytes at offset {offset:#x} exceeds buffer of {len} bytes")]
    OutOfBounds {
        offset: usize,
        wanted: usize,
        len: usize,
    },

    #[error("unknown section magic: {0}")]
    UnknownTag(Tag),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Field-less discriminant of [`KmpError`], used in conversion reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    BadMagic,
    InvalidSectionCount,
    OutOfBounds,
    UnknownTag,
    Io,
}

impl KmpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KmpError::BadMagic { .. } => ErrorKind::BadMagic,
            KmpError::InvalidSectionCount(_) => ErrorKind::InvalidSectionCount,
            KmpError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            KmpError::UnknownTag(_) => ErrorKind::UnknownTag,
            KmpError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, KmpError>;
