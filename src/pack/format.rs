#![forbid(unsafe_code)]

use std::io::Write;

use crate::pack::error::PackResult;
use crate::pack::io::{write_u16, write_u32, write_u8};

/// mTP64 magic. Same trick as PNG: high-bit bytes, CRLF, ^Z, LF.
pub const MAGIC: [u8; 10] = [0xAB, b'm', b'T', b'P', b'@', 0xBB, 0x0D, 0x0A, 0x1A, 0x0A];

/// Container format version written by this builder.
pub const FORMAT_VERSION: u8 = 1;

/// Header bytes up to and including `dictionary_size`.
pub const HEADER_LEN: usize =
    MAGIC.len() + 1 + 3 + ROM_TARGET_LEN + PACK_NAME_LEN + PACK_AUTHOR_LEN + 4 * 4 + 1;

/// Reserved bytes between the dictionary and the mapping table.
pub const RESERVED_LEN: usize = 3;

pub const ROM_TARGET_LEN: usize = 20;
pub const PACK_NAME_LEN: usize = 32;
pub const PACK_AUTHOR_LEN: usize = 32;

/// One mapping row: `{crc: u32, offset: u32}`.
pub const MAPPING_LEN: usize = 8;

/// `{data_format: u8, data_size: u32, tex_width: u16, tex_height: u16}`.
pub const RECORD_HEADER_LEN: usize = 1 + 4 + 2 + 2;

/// Texture records start on multiples of this, and offsets are stored in these units.
pub const ALIGNMENT: u64 = 8;

/// Dictionaries are stored in units of this many bytes.
pub const DICTIONARY_UNIT: u64 = 1024;

/// Set in `data_format` when the body is a compressed frame.
pub const DATA_COMPRESSED: u8 = 0x80;

/// Reserved key value; never valid in a mapping row.
pub const KEY_SENTINEL: u32 = u32::MAX;

pub const GL_ETC1_RGB8_OES: u32 = 0x8D64;
pub const GL_RGBA8: u32 = 0x8058;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PixelFormat {
    Etc1 = 0,
    Rgba8888 = 1,
}

impl PixelFormat {
    pub fn from_gl_internal_format(tag: u32) -> Option<Self> {
        match tag {
            GL_ETC1_RGB8_OES => Some(PixelFormat::Etc1),
            GL_RGBA8 => Some(PixelFormat::Rgba8888),
            _ => None,
        }
    }

    /// Extension used for dumped raw bodies.
    pub fn dump_extension(self) -> &'static str {
        match self {
            PixelFormat::Etc1 => "ETC1",
            PixelFormat::Rgba8888 => "RGB8",
        }
    }
}

/// Bytes preceding the mapping table for a dictionary of `dictionary_len` bytes.
pub fn prefix_len(dictionary_len: usize) -> usize {
    HEADER_LEN + dictionary_len + RESERVED_LEN
}

/// Zero padding needed after `written` bytes to reach the next alignment boundary.
pub fn padding_for(written: u64) -> u64 {
    (ALIGNMENT - written % ALIGNMENT) % ALIGNMENT
}

/// Copies `value` into a fixed-width field. Full-width values are not NUL-terminated.
pub fn fixed_width<const N: usize>(value: &str) -> Option<[u8; N]> {
    let bytes = value.as_bytes();
    if bytes.len() > N {
        return None;
    }
    let mut out = [0u8; N];
    out[..bytes.len()].copy_from_slice(bytes);
    Some(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackHeader {
    pub tp_version: [u8; 3],
    pub rom_target: [u8; ROM_TARGET_LEN],
    pub pack_name: [u8; PACK_NAME_LEN],
    pub pack_author: [u8; PACK_AUTHOR_LEN],
    /// Total file size in units of [`ALIGNMENT`].
    pub pack_size: u32,
    pub n_textures: u32,
    pub n_mappings: u32,
    pub first_texture_offset: u32,
    /// Dictionary length in units of [`DICTIONARY_UNIT`]; 0 means none.
    pub dictionary_size: u8,
}

impl PackHeader {
    /// Writes the header, the dictionary and the reserved bytes.
    pub fn write_to(&self, w: &mut dyn Write, dictionary: &[u8]) -> PackResult<()> {
        debug_assert_eq!(
            dictionary.len() as u64,
            u64::from(self.dictionary_size) * DICTIONARY_UNIT
        );

        w.write_all(&MAGIC)?;
        write_u8(w, FORMAT_VERSION)?;
        w.write_all(&self.tp_version)?;
        w.write_all(&self.rom_target)?;
        w.write_all(&self.pack_name)?;
        w.write_all(&self.pack_author)?;
        write_u32(w, self.pack_size)?;
        write_u32(w, self.n_textures)?;
        write_u32(w, self.n_mappings)?;
        write_u32(w, self.first_texture_offset)?;
        write_u8(w, self.dictionary_size)?;
        w.write_all(dictionary)?;
        w.write_all(&[0u8; RESERVED_LEN])?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingEntry {
    pub key: u32,
    /// Record offset from `first_texture_offset`, in units of [`ALIGNMENT`].
    pub offset: u32,
}

impl MappingEntry {
    pub fn write_to(&self, w: &mut dyn Write) -> PackResult<()> {
        write_u32(w, self.key)?;
        write_u32(w, self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub data_format: u8,
    pub data_size: u32,
    pub width: u16,
    pub height: u16,
}

impl RecordHeader {
    pub fn compressed(format: PixelFormat, data_size: u32, width: u16, height: u16) -> Self {
        Self {
            data_format: format as u8 | DATA_COMPRESSED,
            data_size,
            width,
            height,
        }
    }

    pub fn write_to(&self, w: &mut dyn Write) -> PackResult<()> {
        write_u8(w, self.data_format)?;
        write_u32(w, self.data_size)?;
        write_u16(w, self.width)?;
        write_u16(w, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> PackHeader {
        PackHeader {
            tp_version: [1, 2, 3],
            rom_target: fixed_width("SUPER MARIO 64").unwrap(),
            pack_name: fixed_width("hd").unwrap(),
            pack_author: fixed_width("someone").unwrap(),
            pack_size: 0x1122_3344,
            n_textures: 2,
            n_mappings: 3,
            first_texture_offset: 142,
            dictionary_size: 0,
        }
    }

    #[test]
    fn header_without_dictionary_is_118_bytes() {
        let mut buf = Vec::new();
        header().write_to(&mut buf, &[]).unwrap();
        assert_eq!(HEADER_LEN, 115);
        assert_eq!(buf.len(), prefix_len(0));
        assert_eq!(buf.len(), 118);
        assert_eq!(&buf[..10], &MAGIC);
        assert_eq!(buf[10], FORMAT_VERSION);
        assert_eq!(&buf[11..14], &[1, 2, 3]);
        assert_eq!(&buf[14..28], b"SUPER MARIO 64");
        assert_eq!(&buf[98..102], &0x1122_3344u32.to_le_bytes());
        assert_eq!(&buf[102..106], &2u32.to_le_bytes());
        assert_eq!(&buf[106..110], &3u32.to_le_bytes());
        assert_eq!(&buf[110..114], &142u32.to_le_bytes());
        assert_eq!(buf[114], 0);
        assert_eq!(&buf[115..], &[0, 0, 0]);
    }

    #[test]
    fn dictionary_sits_between_size_byte_and_reserved() {
        let dict = vec![0x5Au8; 1024];
        let mut h = header();
        h.dictionary_size = 1;
        let mut buf = Vec::new();
        h.write_to(&mut buf, &dict).unwrap();
        assert_eq!(buf.len(), prefix_len(1024));
        assert_eq!(buf[114], 1);
        assert!(buf[115..115 + 1024].iter().all(|b| *b == 0x5A));
        assert_eq!(&buf[115 + 1024..], &[0, 0, 0]);
    }

    #[test]
    fn fixed_width_allows_exact_fit_without_terminator() {
        let full: [u8; 4] = fixed_width("abcd").unwrap();
        assert_eq!(&full, b"abcd");
        let short: [u8; 4] = fixed_width("ab").unwrap();
        assert_eq!(&short, b"ab\0\0");
        assert!(fixed_width::<4>("abcde").is_none());
    }

    #[test]
    fn padding_reaches_next_boundary() {
        assert_eq!(padding_for(0), 0);
        assert_eq!(padding_for(9), 7);
        assert_eq!(padding_for(15), 1);
        assert_eq!(padding_for(16), 0);
    }

    #[test]
    fn record_header_layout() {
        let mut buf = Vec::new();
        RecordHeader::compressed(PixelFormat::Rgba8888, 0x0102_0304, 64, 32)
            .write_to(&mut buf)
            .unwrap();
        assert_eq!(buf.len(), RECORD_HEADER_LEN);
        assert_eq!(buf[0], 0x81);
        assert_eq!(&buf[1..5], &[4, 3, 2, 1]);
        assert_eq!(&buf[5..7], &64u16.to_le_bytes());
        assert_eq!(&buf[7..9], &32u16.to_le_bytes());
    }
}
