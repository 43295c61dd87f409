#![forbid(unsafe_code)]

//! Builder for mTP64 texture packs.
//!
//! A pack is one file holding a CRC-sorted key table and deduplicated,
//! zstd-compressed texture bodies. See [`pack::build`].
//!
//! Bodies are zstd frames, flagged by `0x80` in each record's format byte.
//! A reader that expects LZ4 bodies cannot load these packs; it needs zstd
//! decompression, primed with the embedded dictionary when one is present.

pub mod pack;
