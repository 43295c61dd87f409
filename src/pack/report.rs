#![forbid(unsafe_code)]

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::pack::error::{PackError, PackResult};
use crate::pack::io::{create_file, open_file};

/// A body that was stored once but is referenced by a second source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePair {
    pub original: PathBuf,
    pub duplicate: PathBuf,
}

/// Duplicate pairs found during one build.
///
/// Text format: one `original<TAB>duplicate` pair per line.
#[derive(Debug, Clone, Default)]
pub struct DuplicateReport {
    pairs: Vec<DuplicatePair>,
}

impl DuplicateReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, original: &Path, duplicate: &Path) {
        self.pairs.push(DuplicatePair {
            original: original.to_path_buf(),
            duplicate: duplicate.to_path_buf(),
        });
    }

    pub fn pairs(&self) -> &[DuplicatePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Writes the report and returns `true`. With no pairs nothing is written,
    /// and a report left at `path` by an earlier build is removed.
    pub fn write_or_clear(&self, path: &Path) -> PackResult<bool> {
        if self.pairs.is_empty() {
            return match std::fs::remove_file(path) {
                Ok(()) => Ok(false),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(PackError::file(path, e)),
            };
        }
        let mut w = BufWriter::new(create_file(path)?);
        for p in &self.pairs {
            writeln!(w, "{}\t{}", p.original.display(), p.duplicate.display())
                .map_err(|e| PackError::file(path, e))?;
        }
        w.flush().map_err(|e| PackError::file(path, e))?;
        Ok(true)
    }

    pub fn read(path: &Path) -> PackResult<Self> {
        let r = BufReader::new(open_file(path)?);
        let mut pairs = Vec::new();
        for (n, line) in r.lines().enumerate() {
            let line = line.map_err(|e| PackError::file(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let (original, duplicate) = line.split_once('\t').ok_or_else(|| {
                PackError::Invalid(format!(
                    "{}:{}: expected two tab-separated paths",
                    path.display(),
                    n + 1
                ))
            })?;
            pairs.push(DuplicatePair {
                original: PathBuf::from(original),
                duplicate: PathBuf::from(duplicate),
            });
        }
        Ok(Self { pairs })
    }
}
