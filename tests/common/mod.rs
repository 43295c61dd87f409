#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub const GL_ETC1_RGB8_OES: u32 = 0x8D64;
pub const GL_RGBA8: u32 = 0x8058;

const KTX_IDENTIFIER: [u8; 12] = [
    0xAB, b'K', b'T', b'X', b' ', b'1', b'1', 0xBB, b'\r', b'\n', 0x1A, b'\n',
];

/// Writes a single-level 2D KTX 1.1 file.
pub fn write_ktx(
    dir: &Path,
    name: &str,
    gl_internal_format: u32,
    width: u32,
    height: u32,
    data: &[u8],
) -> PathBuf {
    let mut out = Vec::new();
    out.extend_from_slice(&KTX_IDENTIFIER);
    let fields = [0x0403_0201, 0, 1, 0, gl_internal_format, 0, width, height, 0, 0, 1, 1, 0];
    for v in fields {
        out.extend_from_slice(&u32::to_le_bytes(v));
    }
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    let path = dir.join(name);
    std::fs::write(&path, out).unwrap();
    path
}

/// Deterministic, moderately compressible texel bytes.
pub fn texels(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| seed.wrapping_mul(31).wrapping_add((i % 13) as u8 ^ (i / 64) as u8))
        .collect()
}

pub struct Record<'a> {
    pub data_format: u8,
    pub width: u16,
    pub height: u16,
    pub data: &'a [u8],
    /// Record length including header, excluding padding.
    pub len: usize,
}

/// Minimal reader for checking what the builder wrote.
pub struct PackFile {
    pub bytes: Vec<u8>,
}

impl PackFile {
    pub fn open(path: &Path) -> Self {
        Self { bytes: std::fs::read(path).unwrap() }
    }

    fn u32_at(&self, at: usize) -> u32 {
        u32::from_le_bytes(self.bytes[at..at + 4].try_into().unwrap())
    }

    pub fn magic(&self) -> &[u8] {
        &self.bytes[..10]
    }
    pub fn version(&self) -> u8 {
        self.bytes[10]
    }
    pub fn tp_version(&self) -> [u8; 3] {
        self.bytes[11..14].try_into().unwrap()
    }
    pub fn rom_target(&self) -> &[u8] {
        &self.bytes[14..34]
    }
    pub fn pack_name(&self) -> &[u8] {
        &self.bytes[34..66]
    }
    pub fn pack_author(&self) -> &[u8] {
        &self.bytes[66..98]
    }
    pub fn pack_size(&self) -> u32 {
        self.u32_at(98)
    }
    pub fn n_textures(&self) -> u32 {
        self.u32_at(102)
    }
    pub fn n_mappings(&self) -> u32 {
        self.u32_at(106)
    }
    pub fn first_texture_offset(&self) -> usize {
        self.u32_at(110) as usize
    }
    pub fn dictionary(&self) -> &[u8] {
        let len = self.bytes[114] as usize * 1024;
        &self.bytes[115..115 + len]
    }
    fn table_start(&self) -> usize {
        115 + self.dictionary().len() + 3
    }
    pub fn reserved(&self) -> &[u8] {
        let start = self.table_start() - 3;
        &self.bytes[start..start + 3]
    }

    pub fn mappings(&self) -> Vec<(u32, u32)> {
        let start = self.table_start();
        (0..self.n_mappings() as usize)
            .map(|i| (self.u32_at(start + i * 8), self.u32_at(start + i * 8 + 4)))
            .collect()
    }

    /// Record at a mapping offset (8-byte units from the first texture).
    pub fn record(&self, offset: u32) -> Record<'_> {
        let at = self.first_texture_offset() + offset as usize * 8;
        let size = self.u32_at(at + 1) as usize;
        Record {
            data_format: self.bytes[at],
            width: u16::from_le_bytes([self.bytes[at + 5], self.bytes[at + 6]]),
            height: u16::from_le_bytes([self.bytes[at + 7], self.bytes[at + 8]]),
            data: &self.bytes[at + 9..at + 9 + size],
            len: 9 + size,
        }
    }

    /// Decompresses a record body with the embedded dictionary, if any.
    pub fn decompress(&self, offset: u32, capacity: usize) -> Vec<u8> {
        let record = self.record(offset);
        assert_ne!(record.data_format & 0x80, 0, "record is not compressed");
        if self.dictionary().is_empty() {
            zstd::bulk::decompress(record.data, capacity).unwrap()
        } else {
            zstd::bulk::Decompressor::with_dictionary(self.dictionary())
                .unwrap()
                .decompress(record.data, capacity)
                .unwrap()
        }
    }

    /// Distinct record offsets in ascending order.
    pub fn record_offsets(&self) -> Vec<u32> {
        let mut offsets: Vec<u32> = self.mappings().iter().map(|m| m.1).collect();
        offsets.sort_unstable();
        offsets.dedup();
        offsets
    }
}
