#![forbid(unsafe_code)]

use std::path::PathBuf;

use crate::pack::compress::{Dictionary, DEFAULT_LEVEL};
use crate::pack::error::{PackError, PackResult};
use crate::pack::format::{fixed_width, PACK_AUTHOR_LEN, PACK_NAME_LEN, ROM_TARGET_LEN};
use crate::pack::path::{default_report_path, expand_inputs};

/// Fixed-width descriptive header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackMetadata {
    pub version: [u8; 3],
    pub rom_target: [u8; ROM_TARGET_LEN],
    pub name: [u8; PACK_NAME_LEN],
    pub author: [u8; PACK_AUTHOR_LEN],
}

impl Default for PackMetadata {
    fn default() -> Self {
        Self {
            version: [0, 0, 1],
            rom_target: [0; ROM_TARGET_LEN],
            name: [0; PACK_NAME_LEN],
            author: [0; PACK_AUTHOR_LEN],
        }
    }
}

impl PackMetadata {
    pub fn new(version: &str, rom_target: &str, name: &str, author: &str) -> PackResult<Self> {
        Ok(Self {
            version: parse_version(version)?,
            rom_target: field("rom target", rom_target)?,
            name: field("pack name", name)?,
            author: field("pack author", author)?,
        })
    }
}

fn field<const N: usize>(what: &str, value: &str) -> PackResult<[u8; N]> {
    fixed_width(value)
        .ok_or_else(|| PackError::Config(format!("{what} is longer than {N} bytes: {value:?}")))
}

/// Parses `MAJOR.MINOR.PATCH`, each part 0..=255.
pub fn parse_version(s: &str) -> PackResult<[u8; 3]> {
    let bad = || {
        PackError::Config(format!(
            "pack version must be MAJOR.MINOR.PATCH, got {s:?}"
        ))
    };
    let mut out = [0u8; 3];
    let mut parts = s.trim().split('.');
    for slot in out.iter_mut() {
        *slot = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(bad)?;
    }
    if parts.next().is_some() {
        return Err(bad());
    }
    Ok(out)
}

/// Unvalidated build options as given on the command line.
#[derive(Debug, Clone)]
pub struct BuildArgs {
    pub output: PathBuf,
    pub dictionary: Option<PathBuf>,
    pub duplicates: Option<PathBuf>,
    pub pack_version: String,
    pub rom_target: String,
    pub name: String,
    pub author: String,
    pub zstd_level: i32,
}

impl BuildArgs {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            dictionary: None,
            duplicates: None,
            pack_version: "0.0.1".into(),
            rom_target: String::new(),
            name: String::new(),
            author: String::new(),
            zstd_level: DEFAULT_LEVEL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub output: PathBuf,
    pub dictionary: Option<Dictionary>,
    pub duplicate_report: PathBuf,
    pub metadata: PackMetadata,
    pub zstd_level: i32,
}

#[derive(Debug, Clone)]
pub enum Mode {
    /// Write one pack file.
    Build(BuildOptions),
    /// Write each decoded body as a raw file into `dir`; no pack, no compression.
    Dump { dir: PathBuf },
}

/// Validated configuration. Nothing is written until one of these exists.
#[derive(Debug, Clone)]
pub struct PackConfig {
    pub inputs: Vec<PathBuf>,
    pub mode: Mode,
}

impl PackConfig {
    pub fn build(inputs: &[PathBuf], args: BuildArgs) -> PackResult<Self> {
        let inputs = resolve_inputs(inputs)?;

        if !(1..=22).contains(&args.zstd_level) {
            return Err(PackError::Config(format!(
                "zstd level must be within 1..=22, got {}",
                args.zstd_level
            )));
        }
        if inputs.iter().any(|p| p == &args.output) {
            return Err(PackError::Config(format!(
                "output {} is also an input",
                args.output.display()
            )));
        }

        let metadata =
            PackMetadata::new(&args.pack_version, &args.rom_target, &args.name, &args.author)?;
        let dictionary = args.dictionary.as_deref().map(Dictionary::load).transpose()?;
        let duplicate_report = args
            .duplicates
            .unwrap_or_else(|| default_report_path(&args.output));

        Ok(Self {
            inputs,
            mode: Mode::Build(BuildOptions {
                output: args.output,
                dictionary,
                duplicate_report,
                metadata,
                zstd_level: args.zstd_level,
            }),
        })
    }

    pub fn dump(inputs: &[PathBuf], dir: impl Into<PathBuf>) -> PackResult<Self> {
        Ok(Self {
            inputs: resolve_inputs(inputs)?,
            mode: Mode::Dump { dir: dir.into() },
        })
    }
}

fn resolve_inputs(inputs: &[PathBuf]) -> PackResult<Vec<PathBuf>> {
    if inputs.is_empty() {
        return Err(PackError::Config("no file names specified".into()));
    }
    let files = expand_inputs(inputs)?;
    if files.is_empty() {
        return Err(PackError::Config("no .ktx files found in the given inputs".into()));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::error::ErrorClass;

    #[test]
    fn version_parsing() {
        assert_eq!(parse_version("1.2.3").unwrap(), [1, 2, 3]);
        assert!(parse_version("1.2").is_err());
        assert!(parse_version("1.2.3.4").is_err());
        assert!(parse_version("1.2.256").is_err());
        assert!(parse_version("a.b.c").is_err());
    }

    #[test]
    fn metadata_fields_must_fit() {
        let m = PackMetadata::new("0.0.1", &"R".repeat(20), "name", "author").unwrap();
        assert_eq!(m.rom_target, [b'R'; 20]);
        assert!(PackMetadata::new("0.0.1", &"R".repeat(21), "", "").is_err());
        assert!(PackMetadata::new("0.0.1", "", &"n".repeat(33), "").is_err());
    }

    #[test]
    fn zero_inputs_is_a_config_error() {
        let err = PackConfig::build(&[], BuildArgs::new("out.mtp64")).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Config);
        assert_eq!(err.to_string(), "no file names specified");
        assert!(PackConfig::dump(&[], ".").is_err());
    }

    #[test]
    fn bad_dictionary_fails_before_output_exists() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("AABBCCDD.ktx");
        std::fs::write(&input, b"placeholder").unwrap();
        let dict = dir.path().join("dict.bin");
        std::fs::write(&dict, vec![0u8; 1000]).unwrap();
        let output = dir.path().join("out.mtp64");

        let mut args = BuildArgs::new(&output);
        args.dictionary = Some(dict);
        assert!(matches!(
            PackConfig::build(&[input], args),
            Err(PackError::InvalidDictionarySize(1000))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn report_path_defaults_next_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("AABBCCDD.ktx");
        std::fs::write(&input, b"placeholder").unwrap();
        let output = dir.path().join("out.mtp64");

        let cfg = PackConfig::build(&[input], BuildArgs::new(&output)).unwrap();
        match cfg.mode {
            Mode::Build(opts) => {
                assert_eq!(opts.duplicate_report, dir.path().join("out.mtp64.duplicates.txt"));
                assert!(opts.dictionary.is_none());
            }
            Mode::Dump { .. } => panic!("expected build mode"),
        }
    }

    #[test]
    fn zstd_level_is_range_checked() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("AABBCCDD.ktx");
        std::fs::write(&input, b"placeholder").unwrap();
        let mut args = BuildArgs::new(dir.path().join("out.mtp64"));
        args.zstd_level = 0;
        assert!(matches!(PackConfig::build(&[input], args), Err(PackError::Config(_))));
    }
}
