#![forbid(unsafe_code)]

use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::pack::error::{PackError, PackResult};
use crate::pack::format::DICTIONARY_UNIT;
use crate::pack::io::open_file;

/// Default zstd level: high ratio, paid once at build time.
pub const DEFAULT_LEVEL: i32 = 19;

/// Largest dictionary the one-byte size field can describe.
pub const MAX_DICTIONARY_LEN: u64 = u8::MAX as u64 * DICTIONARY_UNIT;

/// Pre-built compression dictionary, embedded verbatim in the pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    bytes: Vec<u8>,
}

impl Dictionary {
    /// Loads and validates a dictionary file. The size is checked before
    /// reading so a bad file fails without touching anything else.
    pub fn load(path: &Path) -> PackResult<Self> {
        let mut f = open_file(path)?;
        let len = f.metadata().map_err(|e| PackError::file(path, e))?.len();
        check_len(len)?;

        let mut bytes = Vec::new();
        f.read_to_end(&mut bytes).map_err(|e| PackError::file(path, e))?;
        let dict = Self::from_bytes(bytes)?;
        info!(
            "loaded {} byte dictionary from {}",
            dict.bytes.len(),
            path.display()
        );
        Ok(dict)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> PackResult<Self> {
        check_len(bytes.len() as u64)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in [`DICTIONARY_UNIT`]s, as stored in the header.
    pub fn units(&self) -> u8 {
        (self.bytes.len() as u64 / DICTIONARY_UNIT) as u8
    }
}

fn check_len(len: u64) -> PackResult<()> {
    if len == 0 || len % DICTIONARY_UNIT != 0 {
        return Err(PackError::InvalidDictionarySize(len));
    }
    if len > MAX_DICTIONARY_LEN {
        return Err(PackError::DictionaryTooLarge(len));
    }
    Ok(())
}

/// zstd frame compressor, optionally primed with a shared dictionary.
///
/// Each call yields one complete frame carrying its content size, so any
/// record can be decoded on its own given the dictionary. Readers must
/// decode zstd here; LZ4-only loaders will reject these bodies.
pub struct Compressor {
    inner: zstd::bulk::Compressor<'static>,
    level: i32,
}

impl Compressor {
    pub fn new(level: i32, dictionary: Option<&Dictionary>) -> PackResult<Self> {
        let inner = match dictionary {
            Some(dict) => zstd::bulk::Compressor::with_dictionary(level, dict.as_bytes()),
            None => zstd::bulk::Compressor::new(level),
        }
        .map_err(|e| PackError::Compression(e.to_string()))?;
        Ok(Self { inner, level })
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn compress(&mut self, data: &[u8]) -> PackResult<Vec<u8>> {
        self.inner
            .compress(data)
            .map_err(|e| PackError::Compression(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 ^ (i / 1024) as u8).collect()
    }

    #[test]
    fn dictionary_size_must_be_whole_kib() {
        assert!(matches!(
            Dictionary::from_bytes(vec![0; 1000]),
            Err(PackError::InvalidDictionarySize(1000))
        ));
        assert!(matches!(
            Dictionary::from_bytes(Vec::new()),
            Err(PackError::InvalidDictionarySize(0))
        ));
        assert!(matches!(
            Dictionary::from_bytes(vec![0; 256 * 1024]),
            Err(PackError::DictionaryTooLarge(_))
        ));
        assert_eq!(Dictionary::from_bytes(vec![0; 2048]).unwrap().units(), 2);
    }

    #[test]
    fn load_rejects_bad_size_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.bin");
        std::fs::write(&path, vec![1u8; 1000]).unwrap();
        assert!(matches!(
            Dictionary::load(&path),
            Err(PackError::InvalidDictionarySize(1000))
        ));
    }

    #[test]
    fn frames_decode_on_their_own() {
        let data = sample(8192);
        let mut c = Compressor::new(DEFAULT_LEVEL, None).unwrap();
        let frame = c.compress(&data).unwrap();
        assert!(frame.len() < data.len());
        assert_eq!(zstd::bulk::decompress(&frame, data.len()).unwrap(), data);
    }

    #[test]
    fn frames_are_zstd_not_lz4() {
        let mut c = Compressor::new(DEFAULT_LEVEL, None).unwrap();
        let frame = c.compress(&sample(512)).unwrap();
        // zstd frame magic 0xFD2FB528; an LZ4 frame would start 04 22 4D 18
        assert_eq!(&frame[..4], &[0x28, 0xB5, 0x2F, 0xFD]);
    }

    #[test]
    fn missing_dictionary_error_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.bin");
        let err = Dictionary::load(&path).unwrap_err();
        assert!(matches!(err, PackError::File { .. }));
        assert!(err.to_string().contains("dict.bin"), "{err}");
    }

    #[test]
    fn frames_decode_with_the_same_dictionary() {
        let dict = Dictionary::from_bytes(sample(4096)).unwrap();
        let data = sample(6000);
        let mut c = Compressor::new(3, Some(&dict)).unwrap();
        assert_eq!(c.level(), 3);
        let frame = c.compress(&data).unwrap();

        let mut d = zstd::bulk::Decompressor::with_dictionary(dict.as_bytes()).unwrap();
        assert_eq!(d.decompress(&frame, data.len()).unwrap(), data);
    }
}
