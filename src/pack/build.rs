#![forbid(unsafe_code)]

use std::io::{Seek, SeekFrom, Write};

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::pack::catalog::TextureDescriptor;
use crate::pack::compress::{Compressor, Dictionary};
use crate::pack::config::PackMetadata;
use crate::pack::dedup::{content_hash, ContentBody, DedupOutcome, Deduplicator};
use crate::pack::error::{PackError, PackResult};
use crate::pack::format::{
    padding_for, prefix_len, MappingEntry, PackHeader, RecordHeader, ALIGNMENT, MAPPING_LEN,
    RECORD_HEADER_LEN,
};
use crate::pack::io::write_zeros;
use crate::pack::ktx::DecodedTexture;
use crate::pack::report::DuplicateReport;

/// mTP64 v1 layout (little-endian):
/// - header:
///   - [MAGIC 10][u8 version][u8 tp_version[3]]
///   - [rom_target 20][pack_name 32][pack_author 32]
///   - [u32 pack_size / 8][u32 n_textures][u32 n_mappings][u32 first_texture_offset]
///   - [u8 dictionary_size / 1024][dictionary bytes][u8 unused[3]]
/// - mapping table, n_mappings rows sorted by crc:
///   - [u32 crc][u32 offset / 8, relative to first_texture_offset]
/// - texture records, each starting 8-aligned relative to first_texture_offset:
///   - [u8 data_format][u32 data_size][u16 width][u16 height][data][pad 0-7]
/// - zero padding up to pack_size * 8
///
/// Rules:
/// - one mapping row per catalogued key; rows of identical content share an offset
/// - bodies are written in key order, first occurrence of each content hash
/// - the header is only valid once [`PackWriter::finalize`] has run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    keys: Vec<u32>,
    offsets: Vec<Option<u32>>,
    row_of_key: FxHashMap<u32, usize>,
}

impl MappingTable {
    /// One row per key, offsets unresolved. Keys must be strictly ascending.
    pub fn allocate(keys: impl IntoIterator<Item = u32>) -> PackResult<Self> {
        let keys: Vec<u32> = keys.into_iter().collect();
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PackError::Invalid(
                "mapping keys must be unique and sorted ascending".into(),
            ));
        }
        let row_of_key = keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        Ok(Self {
            offsets: vec![None; keys.len()],
            keys,
            row_of_key,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn assign(&mut self, key: u32, offset: u32) -> PackResult<()> {
        let row = *self
            .row_of_key
            .get(&key)
            .ok_or_else(|| PackError::Invalid(format!("key {key:08X} has no mapping row")))?;
        self.offsets[row] = Some(offset);
        Ok(())
    }

    pub fn offset_of(&self, key: u32) -> Option<u32> {
        self.row_of_key.get(&key).and_then(|row| self.offsets[*row])
    }

    /// Resolved rows in key order; fails on the first row without an offset.
    pub fn entries(&self) -> PackResult<Vec<MappingEntry>> {
        self.keys
            .iter()
            .zip(&self.offsets)
            .map(|(key, offset)| {
                offset
                    .map(|offset| MappingEntry { key: *key, offset })
                    .ok_or(PackError::UnresolvedMapping(*key))
            })
            .collect()
    }

    fn write_placeholder(&self, w: &mut dyn Write) -> PackResult<()> {
        for key in &self.keys {
            MappingEntry {
                key: *key,
                offset: 0,
            }
            .write_to(w)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub n_textures: u32,
    pub n_mappings: u32,
    pub duplicates: usize,
    /// Decoded bytes of stored bodies.
    pub raw_bytes: u64,
    /// Compressed bytes of stored bodies, excluding record headers and padding.
    pub compressed_bytes: u64,
    pub pack_bytes: u64,
}

impl BuildSummary {
    pub fn ratio(&self) -> f64 {
        if self.compressed_bytes == 0 {
            return 0.0;
        }
        self.raw_bytes as f64 / self.compressed_bytes as f64
    }
}

/// Result of a completed build: the summary, the duplicate pairs and the sink.
#[derive(Debug)]
pub struct FinishedPack<W> {
    pub summary: BuildSummary,
    pub duplicates: DuplicateReport,
    pub out: W,
}

/// Streams one pack into `out`. Created with a placeholder header and table,
/// fed textures in key order, then rewritten in place by `finalize`.
pub struct PackWriter<'d, W: Write + Seek> {
    out: W,
    header: PackHeader,
    dictionary: &'d [u8],
    table: MappingTable,
    dedup: Deduplicator,
    compressor: Compressor,
    duplicates: DuplicateReport,
    first_texture_offset: u64,
    /// Bytes written after `first_texture_offset`; always aligned between records.
    region_len: u64,
    raw_bytes: u64,
    compressed_bytes: u64,
}

impl<'d, W: Write + Seek> PackWriter<'d, W> {
    /// Allocates the mapping table from sorted keys and writes the placeholder
    /// header, the dictionary and the zeroed table.
    pub fn create(
        mut out: W,
        metadata: &PackMetadata,
        dictionary: Option<&'d Dictionary>,
        compressor: Compressor,
        keys: impl IntoIterator<Item = u32>,
    ) -> PackResult<Self> {
        let table = MappingTable::allocate(keys)?;
        let dictionary_bytes = dictionary.map(Dictionary::as_bytes).unwrap_or_default();

        let first_texture_offset =
            prefix_len(dictionary_bytes.len()) as u64 + table.len() as u64 * MAPPING_LEN as u64;
        let header = PackHeader {
            tp_version: metadata.version,
            rom_target: metadata.rom_target,
            pack_name: metadata.name,
            pack_author: metadata.author,
            pack_size: 0,
            n_textures: 0,
            n_mappings: u32::try_from(table.len())
                .map_err(|_| PackError::PackTooLarge("mapping count"))?,
            first_texture_offset: u32::try_from(first_texture_offset)
                .map_err(|_| PackError::PackTooLarge("mapping table"))?,
            dictionary_size: dictionary.map(Dictionary::units).unwrap_or(0),
        };

        out.seek(SeekFrom::Start(0))?;
        header.write_to(&mut out, dictionary_bytes)?;
        table.write_placeholder(&mut out)?;

        Ok(Self {
            out,
            header,
            dictionary: dictionary_bytes,
            table,
            dedup: Deduplicator::new(),
            compressor,
            duplicates: DuplicateReport::new(),
            first_texture_offset,
            region_len: 0,
            raw_bytes: 0,
            compressed_bytes: 0,
        })
    }

    /// Stores one texture, or points its row at an already stored identical body.
    pub fn add_texture(
        &mut self,
        desc: &TextureDescriptor,
        texture: &DecodedTexture,
    ) -> PackResult<()> {
        if texture.data.len() as u64 != desc.uncompressed_size {
            return Err(PackError::SourceDecode {
                file: desc.source.display().to_string(),
                reason: format!(
                    "decoded {} bytes, catalogued {}",
                    texture.data.len(),
                    desc.uncompressed_size
                ),
            });
        }

        let hash = content_hash(&texture.data);
        if let DedupOutcome::Duplicate {
            original_key,
            original_source,
        } = self.dedup.classify(hash)
        {
            let offset = self
                .table
                .offset_of(original_key)
                .ok_or(PackError::UnresolvedMapping(original_key))?;
            warn!(
                "{} is a duplicate of {}",
                desc.source.display(),
                original_source.display()
            );
            self.duplicates.push(original_source, &desc.source);
            return self.table.assign(desc.key, offset);
        }

        let dims = (u16::try_from(texture.width), u16::try_from(texture.height));
        let (width, height) = match dims {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(PackError::DimensionsTooLarge {
                    file: desc.source.display().to_string(),
                    width: texture.width,
                    height: texture.height,
                })
            }
        };

        let frame = self.compressor.compress(&texture.data)?;
        let data_size = u32::try_from(frame.len())
            .map_err(|_| PackError::PackTooLarge("compressed texture"))?;
        let offset = u32::try_from(self.region_len / ALIGNMENT)
            .map_err(|_| PackError::PackTooLarge("texture offset"))?;

        RecordHeader::compressed(desc.pixel_format, data_size, width, height)
            .write_to(&mut self.out)?;
        self.out.write_all(&frame)?;
        let written = RECORD_HEADER_LEN as u64 + frame.len() as u64;
        let pad = padding_for(written);
        write_zeros(&mut self.out, pad)?;

        debug!(
            "stored {:08X} at {} ({} -> {} bytes)",
            desc.key,
            offset,
            texture.data.len(),
            frame.len()
        );

        self.region_len += written + pad;
        self.raw_bytes += texture.data.len() as u64;
        self.compressed_bytes += frame.len() as u64;
        self.header.n_textures += 1;
        self.table.assign(desc.key, offset)?;
        self.dedup.register(ContentBody {
            content_hash: hash,
            key: desc.key,
            source: desc.source.clone(),
            pixel_format: desc.pixel_format,
            width,
            height,
            compressed_len: data_size,
        });
        Ok(())
    }

    /// Pads the tail, then rewrites the header and the resolved table.
    pub fn finalize(mut self) -> PackResult<FinishedPack<W>> {
        let entries = self.table.entries()?;

        let mut total = self.first_texture_offset + self.region_len;
        let tail = padding_for(total);
        write_zeros(&mut self.out, tail)?;
        total += tail;

        self.header.pack_size =
            u32::try_from(total / ALIGNMENT).map_err(|_| PackError::PackTooLarge("pack size"))?;
        debug_assert!(self.header.n_mappings >= self.header.n_textures);
        debug_assert_eq!(self.dedup.len() as u32, self.header.n_textures);

        self.out.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.out, self.dictionary)?;
        for e in &entries {
            e.write_to(&mut self.out)?;
        }
        self.out.seek(SeekFrom::Start(total))?;
        self.out.flush()?;

        let summary = BuildSummary {
            n_textures: self.header.n_textures,
            n_mappings: self.header.n_mappings,
            duplicates: self.duplicates.len(),
            raw_bytes: self.raw_bytes,
            compressed_bytes: self.compressed_bytes,
            pack_bytes: total,
        };

        Ok(FinishedPack {
            summary,
            duplicates: self.duplicates,
            out: self.out,
        })
    }
}
