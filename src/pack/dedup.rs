#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::pack::format::PixelFormat;

/// 64-bit content hash of decoded texture bytes: the first eight bytes of
/// the blake3 digest, little-endian. The value does not depend on the host's
/// pointer width or endianness.
///
/// Equal hashes are treated as equal content; there is no byte compare.
/// `check-duplicates` re-verifies reported pairs against the full digest.
pub fn content_hash(data: &[u8]) -> u64 {
    let digest = blake3::hash(data);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// A stored texture body, recorded once per distinct content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBody {
    pub content_hash: u64,
    /// Key of the first descriptor that produced this body.
    pub key: u32,
    pub source: PathBuf,
    pub pixel_format: PixelFormat,
    pub width: u16,
    pub height: u16,
    pub compressed_len: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome<'a> {
    New,
    Duplicate {
        original_key: u32,
        original_source: &'a Path,
    },
}

/// Content hash to body map, scoped to one build.
#[derive(Debug, Default)]
pub struct Deduplicator {
    bodies: FxHashMap<u64, ContentBody>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&self, content_hash: u64) -> DedupOutcome<'_> {
        match self.bodies.get(&content_hash) {
            Some(body) => DedupOutcome::Duplicate {
                original_key: body.key,
                original_source: &body.source,
            },
            None => DedupOutcome::New,
        }
    }

    /// Records a freshly written body. The first body for a hash wins.
    pub fn register(&mut self, body: ContentBody) {
        self.bodies.entry(body.content_hash).or_insert(body);
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(hash: u64, key: u32, source: &str) -> ContentBody {
        ContentBody {
            content_hash: hash,
            key,
            source: PathBuf::from(source),
            pixel_format: PixelFormat::Etc1,
            width: 4,
            height: 4,
            compressed_len: 10,
        }
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = content_hash(b"texel data");
        assert_eq!(a, content_hash(b"texel data"));
        assert_ne!(a, content_hash(b"texel datb"));
        assert_ne!(content_hash(&[0u8; 8]), content_hash(&[0u8; 16]));
    }

    #[test]
    fn hash_is_pinned_to_the_blake3_digest() {
        // blake3("") = af1349b9f5f9a1a6...
        assert_eq!(content_hash(b""), 0xa6a1_f9f5_b949_13af);

        let data = [0x5au8; 300];
        let digest = blake3::hash(&data);
        let expect = u64::from_le_bytes(digest.as_bytes()[..8].try_into().unwrap());
        assert_eq!(content_hash(&data), expect);
    }

    #[test]
    fn second_sighting_is_a_duplicate_of_the_first() {
        let mut dedup = Deduplicator::new();
        let h = content_hash(&[1, 2, 3, 4]);
        assert_eq!(dedup.classify(h), DedupOutcome::New);

        dedup.register(body(h, 0x11, "00000011.ktx"));
        dedup.register(body(h, 0x22, "00000022.ktx"));
        assert_eq!(dedup.len(), 1);

        match dedup.classify(h) {
            DedupOutcome::Duplicate {
                original_key,
                original_source,
            } => {
                assert_eq!(original_key, 0x11);
                assert_eq!(original_source, Path::new("00000011.ktx"));
            }
            DedupOutcome::New => panic!("expected duplicate"),
        }
    }
}
