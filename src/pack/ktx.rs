#![forbid(unsafe_code)]

//! Just enough of KTX 1.1 to pull raw texel data out of single-image
//! textures: header, key/value skip and the mip level walk.

use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::pack::error::{PackError, PackResult};
use crate::pack::format::PixelFormat;
use crate::pack::io::{open_file, read_u32};

pub const IDENTIFIER: [u8; 12] = [
    0xAB, b'K', b'T', b'X', b' ', b'1', b'1', 0xBB, b'\r', b'\n', 0x1A, b'\n',
];

const ENDIANNESS: u32 = 0x0403_0201;

/// Byte offset of `glInternalFormat`.
pub const FORMAT_FIELD_OFFSET: u64 = 28;

pub const HEADER_LEN: u64 = 64;

/// Decoded pixel payload of one source texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTexture {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KtxHeader {
    swap: bool,
    pub gl_internal_format: u32,
    pub width: u32,
    pub height: u32,
    pub array_elements: u32,
    pub faces: u32,
    pub mip_levels: u32,
    pub key_value_bytes: u32,
}

impl KtxHeader {
    pub fn read(r: &mut dyn Read, file: &str) -> PackResult<Self> {
        let mut ident = [0u8; 12];
        r.read_exact(&mut ident).map_err(|e| decode_io(file, e))?;
        if ident != IDENTIFIER {
            return Err(decode(file, "not a KTX 1.1 file"));
        }

        let swap = match read_u32(r, false).map_err(|e| decode_pack(file, e))? {
            ENDIANNESS => false,
            v if v.swap_bytes() == ENDIANNESS => true,
            other => return Err(decode(file, format!("bad endianness marker {other:#010x}"))),
        };

        let mut fields = [0u32; 12];
        for field in fields.iter_mut() {
            *field = read_u32(r, swap).map_err(|e| decode_pack(file, e))?;
        }
        let [
            _gl_type,
            _gl_type_size,
            _gl_format,
            gl_internal_format,
            _gl_base_internal_format,
            width,
            height,
            depth,
            array_elements,
            faces,
            mip_levels,
            key_value_bytes,
        ] = fields;

        if depth > 1 {
            return Err(decode(file, "3D textures are not supported"));
        }
        if faces != 1 && faces != 6 {
            return Err(decode(file, format!("invalid face count {faces}")));
        }

        Ok(Self {
            swap,
            gl_internal_format,
            width,
            height: height.max(1),
            array_elements,
            faces,
            mip_levels: mip_levels.max(1),
            key_value_bytes,
        })
    }

    /// Non-array cube maps store `imageSize` per face, everything else per level.
    fn per_face_image_size(&self) -> bool {
        self.faces == 6 && self.array_elements == 0
    }
}

/// Reads the 4-byte format field at its fixed offset, without parsing the rest.
pub fn peek_format(path: &Path) -> PackResult<PixelFormat> {
    let file = path.display().to_string();
    let mut f = open_file(path)?;
    f.seek(SeekFrom::Start(FORMAT_FIELD_OFFSET)).map_err(|e| PackError::file(path, e))?;
    let tag = read_u32(&mut f, false).map_err(|e| decode_pack(&file, e))?;
    PixelFormat::from_gl_internal_format(tag).ok_or(PackError::UnsupportedFormat { file, tag })
}

/// Header plus the total size of all image data, without loading it.
pub fn inspect(path: &Path) -> PackResult<(KtxHeader, u64)> {
    let file = path.display().to_string();
    let mut r = BufReader::new(open_file(path)?);
    let header = KtxHeader::read(&mut r, &file)?;
    let size = walk_images(&mut r, &header, &file, None)?;
    Ok((header, size))
}

/// Loads every image of every level, concatenated without padding.
pub fn load(path: &Path) -> PackResult<DecodedTexture> {
    let file = path.display().to_string();
    let mut r = BufReader::new(open_file(path)?);
    let header = KtxHeader::read(&mut r, &file)?;
    let format = PixelFormat::from_gl_internal_format(header.gl_internal_format).ok_or(
        PackError::UnsupportedFormat {
            file: file.clone(),
            tag: header.gl_internal_format,
        },
    )?;

    let mut data = Vec::new();
    walk_images(&mut r, &header, &file, Some(&mut data))?;

    Ok(DecodedTexture {
        width: header.width,
        height: header.height,
        format,
        data,
    })
}

fn walk_images<R: Read + Seek>(
    r: &mut R,
    header: &KtxHeader,
    file: &str,
    mut sink: Option<&mut Vec<u8>>,
) -> PackResult<u64> {
    let io = |e: std::io::Error| decode_io(file, e);
    let file_len = r.seek(SeekFrom::End(0)).map_err(io)?;
    r.seek(SeekFrom::Start(HEADER_LEN + u64::from(header.key_value_bytes))).map_err(io)?;

    let (images_per_level, per_face) = if header.per_face_image_size() {
        (6u32, true)
    } else {
        (1u32, false)
    };

    let mut total: u64 = 0;
    for level in 0..header.mip_levels {
        let image_size = read_u32(r, header.swap).map_err(|e| decode_pack(file, e))?;
        let image_size = u64::from(image_size);

        for _ in 0..images_per_level {
            let pos = r.stream_position().map_err(io)?;
            if pos + image_size > file_len {
                return Err(decode(file, format!("mip level {level} runs past end of file")));
            }

            match sink.as_deref_mut() {
                Some(buf) => {
                    let start = buf.len();
                    buf.resize(start + image_size as usize, 0);
                    r.read_exact(&mut buf[start..]).map_err(io)?;
                }
                None => {
                    r.seek(SeekFrom::Current(image_size as i64)).map_err(io)?;
                }
            }
            total += image_size;

            if per_face {
                r.seek(SeekFrom::Current(pad4(image_size) as i64)).map_err(io)?;
            }
        }

        if !per_face {
            r.seek(SeekFrom::Current(pad4(image_size) as i64)).map_err(io)?;
        }
    }

    Ok(total)
}

fn pad4(n: u64) -> u64 {
    (4 - n % 4) % 4
}

fn decode(file: &str, reason: impl Into<String>) -> PackError {
    PackError::SourceDecode {
        file: file.to_string(),
        reason: reason.into(),
    }
}

fn decode_io(file: &str, e: std::io::Error) -> PackError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        decode(file, "truncated file")
    } else {
        PackError::File {
            path: file.to_string(),
            source: e,
        }
    }
}

fn decode_pack(file: &str, e: PackError) -> PackError {
    match e {
        PackError::Io(io) => decode_io(file, io),
        other => other,
    }
}

/// Builds a KTX file in memory. Each level lists its images: one for a
/// plain 2D level, six for a cube map level.
#[cfg(test)]
pub(crate) fn encode_levels_for_test(
    gl_internal_format: u32,
    width: u32,
    height: u32,
    faces: u32,
    levels: &[&[&[u8]]],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&IDENTIFIER);
    let fields = [
        ENDIANNESS,
        0,
        1,
        0,
        gl_internal_format,
        0,
        width,
        height,
        0,
        0,
        faces,
        levels.len() as u32,
        0,
    ];
    for v in fields {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for images in levels {
        out.extend_from_slice(&(images[0].len() as u32).to_le_bytes());
        for image in images.iter() {
            out.extend_from_slice(image);
            out.resize(out.len() + pad4(image.len() as u64) as usize, 0);
        }
    }
    out
}

/// Builds a single-level 2D KTX file in memory.
#[cfg(test)]
pub(crate) fn encode_for_test(
    gl_internal_format: u32,
    width: u32,
    height: u32,
    data: &[u8],
) -> Vec<u8> {
    encode_levels_for_test(gl_internal_format, width, height, 1, &[&[data]])
}
