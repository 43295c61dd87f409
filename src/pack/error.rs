#![forbid(unsafe_code)]

use std::path::Path;

use thiserror::Error;

/// Coarse failure classes. None of them is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A source file was rejected; fix the input and rerun.
    InputValidation,
    /// The environment failed us (open, read, write, allocation).
    Resource,
    /// The compressor failed; no partial pack is usable.
    Compression,
    /// Conflicting or malformed options; nothing was written.
    Config,
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine file extension of {0}")]
    BadFilename(String),

    #[error("filename {0} is not a valid 32-bit CRC hash")]
    KeyTooShort(String),

    #[error("key in {0} overflows (0xFFFFFFFF is reserved)")]
    KeyOverflow(String),

    #[error("key {key:08X} appears in both {first} and {second}")]
    DuplicateKey {
        key: u32,
        first: String,
        second: String,
    },

    #[error("unsupported texture format {tag:#x} in {file}")]
    UnsupportedFormat { file: String, tag: u32 },

    #[error("unable to decode {file}: {reason}")]
    SourceDecode { file: String, reason: String },

    #[error("input file {0} larger than 4 GiB")]
    TextureTooLarge(String),

    #[error("texture {file} is {width}x{height}; dimensions are limited to 65535")]
    DimensionsTooLarge {
        file: String,
        width: u32,
        height: u32,
    },

    #[error("dictionary size {0} is not a non-zero multiple of 1024")]
    InvalidDictionarySize(u64),

    #[error("dictionary size {0} exceeds 255 KiB")]
    DictionaryTooLarge(u64),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("{0}")]
    Config(String),

    #[error("pack exceeds the addressable size ({0})")]
    PackTooLarge(&'static str),

    #[error("mapping for key {0:08X} has no texture offset")]
    UnresolvedMapping(u32),

    #[error("content of {duplicate} differs from {original} despite equal hashes")]
    HashMismatch { original: String, duplicate: String },

    #[error("invalid: {0}")]
    Invalid(String),
}

impl PackError {
    /// Wraps an I/O error with the file it happened on.
    pub fn file(path: &Path, source: std::io::Error) -> Self {
        PackError::File {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            PackError::Io(_)
            | PackError::File { .. }
            | PackError::PackTooLarge(_)
            | PackError::UnresolvedMapping(_) => ErrorClass::Resource,
            PackError::BadFilename(_)
            | PackError::KeyTooShort(_)
            | PackError::KeyOverflow(_)
            | PackError::DuplicateKey { .. }
            | PackError::UnsupportedFormat { .. }
            | PackError::SourceDecode { .. }
            | PackError::TextureTooLarge(_)
            | PackError::DimensionsTooLarge { .. }
            | PackError::HashMismatch { .. }
            | PackError::Invalid(_) => ErrorClass::InputValidation,
            PackError::Compression(_) => ErrorClass::Compression,
            PackError::InvalidDictionarySize(_)
            | PackError::DictionaryTooLarge(_)
            | PackError::Config(_) => ErrorClass::Config,
        }
    }
}

pub type PackResult<T> = Result<T, PackError>;
