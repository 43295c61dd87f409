#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::pack::error::{PackError, PackResult};
use crate::pack::format::{PixelFormat, KEY_SENTINEL};
use crate::pack::ktx;

/// Hex digits of a CRC32 key.
pub const KEY_LEN: usize = 8;

/// One catalogued source texture. Pixel data is not held here; it is
/// reloaded from `source` when the body is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub key: u32,
    pub pixel_format: PixelFormat,
    pub uncompressed_size: u64,
    pub source: PathBuf,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FormatTally {
    pub etc1: usize,
    pub rgba8888: usize,
}

impl FormatTally {
    fn count(&mut self, format: PixelFormat) {
        match format {
            PixelFormat::Etc1 => self.etc1 += 1,
            PixelFormat::Rgba8888 => self.rgba8888 += 1,
        }
    }
}

/// Validated source textures sorted ascending by key.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    descriptors: Vec<TextureDescriptor>,
    tally: FormatTally,
    truncated_names: usize,
    truncation_warnings: usize,
}

/// Key parsed from a file name, plus whether extra leading characters were dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedKey {
    pub key: u32,
    pub truncated: bool,
}

/// Parses the 8 hex digits that immediately precede the extension.
pub fn parse_key(path: &Path) -> PackResult<ParsedKey> {
    let display = path.display().to_string();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PackError::BadFilename(display.clone()))?;

    let dot = name
        .rfind('.')
        .ok_or_else(|| PackError::BadFilename(display.clone()))?;
    let stem = &name[..dot];

    if stem.len() < KEY_LEN {
        return Err(PackError::KeyTooShort(display));
    }

    let digits = stem
        .get(stem.len() - KEY_LEN..)
        .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| PackError::BadFilename(display.clone()))?;

    let key =
        u32::from_str_radix(digits, 16).map_err(|_| PackError::BadFilename(display.clone()))?;
    if key == KEY_SENTINEL {
        return Err(PackError::KeyOverflow(display));
    }

    Ok(ParsedKey {
        key,
        truncated: stem.len() > KEY_LEN,
    })
}

impl Catalog {
    /// Validates every input and sorts the result by key. Any rejected file
    /// fails the whole catalog.
    pub fn build(inputs: &[PathBuf]) -> PackResult<Self> {
        let mut descriptors = Vec::with_capacity(inputs.len());
        let mut tally = FormatTally::default();
        let mut truncated_names = 0;
        let mut truncation_warnings = 0;

        for path in inputs {
            let parsed = parse_key(path)?;
            if parsed.truncated {
                truncated_names += 1;
                if truncation_warnings == 0 {
                    truncation_warnings += 1;
                    warn!(
                        "CRC file names longer than {KEY_LEN} characters will be truncated ({})",
                        path.display()
                    );
                }
            }

            let pixel_format = ktx::peek_format(path)?;
            let (header, uncompressed_size) = ktx::inspect(path)?;
            let file = path.display().to_string();

            if uncompressed_size > u64::from(u32::MAX) {
                return Err(PackError::TextureTooLarge(file));
            }
            if header.width > u32::from(u16::MAX) || header.height > u32::from(u16::MAX) {
                return Err(PackError::DimensionsTooLarge {
                    file,
                    width: header.width,
                    height: header.height,
                });
            }

            debug!(
                ?pixel_format,
                uncompressed_size,
                "catalogued {file} as {:08X}",
                parsed.key
            );
            tally.count(pixel_format);
            descriptors.push(TextureDescriptor {
                key: parsed.key,
                pixel_format,
                uncompressed_size,
                source: path.clone(),
            });
        }

        info!(
            "processed {} ETC1 and {} RGBA8888 textures",
            tally.etc1, tally.rgba8888
        );

        descriptors.sort_by_key(|d| d.key);
        for w in descriptors.windows(2) {
            if w[0].key == w[1].key {
                return Err(PackError::DuplicateKey {
                    key: w[0].key,
                    first: w[0].source.display().to_string(),
                    second: w[1].source.display().to_string(),
                });
            }
        }
        info!("sorted {} CRC keys", descriptors.len());

        Ok(Self {
            descriptors,
            tally,
            truncated_names,
            truncation_warnings,
        })
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> &[TextureDescriptor] {
        &self.descriptors
    }

    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.descriptors.iter().map(|d| d.key)
    }

    pub fn tally(&self) -> FormatTally {
        self.tally
    }

    /// Inputs whose file names carried more than the eight key digits.
    pub fn truncated_names(&self) -> usize {
        self.truncated_names
    }

    /// Truncation warnings logged by this build; at most one.
    pub fn truncation_warnings(&self) -> usize {
        self.truncation_warnings
    }
}
