#![forbid(unsafe_code)]

mod build;
mod catalog;
mod compress;
mod config;
mod dedup;
mod error;
mod format;
mod io;
mod ktx;
mod ops;
mod path;
mod report;

pub use build::{BuildSummary, FinishedPack, MappingTable, PackWriter};
pub use catalog::{parse_key, Catalog, FormatTally, ParsedKey, TextureDescriptor};
pub use compress::{Compressor, Dictionary, DEFAULT_LEVEL};
pub use config::{parse_version, BuildArgs, BuildOptions, Mode, PackConfig, PackMetadata};
pub use dedup::{content_hash, ContentBody, DedupOutcome, Deduplicator};
pub use error::{ErrorClass, PackError, PackResult};
pub use format::{
    MappingEntry, PackHeader, PixelFormat, RecordHeader, ALIGNMENT, DATA_COMPRESSED, MAGIC,
};
pub use ktx::{DecodedTexture, KtxHeader};
pub use report::{DuplicatePair, DuplicateReport};

pub use ops::{build, check_duplicates, dump, run, write_pack};
