#![forbid(unsafe_code)]

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::pack::error::{PackError, PackResult};
use crate::pack::format::PixelFormat;

pub const SOURCE_EXTENSION: &str = "ktx";

/// Files pass through unchanged; directories expand to the `.ktx` files below
/// them, sorted by path. Symlinks are not followed.
pub fn expand_inputs(inputs: &[PathBuf]) -> PackResult<Vec<PathBuf>> {
    let mut out = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !input.is_dir() {
            out.push(input.clone());
            continue;
        }

        let mut found = Vec::new();
        for ent in WalkDir::new(input).follow_links(false) {
            let ent = ent.map_err(|e| {
                let path = e.path().unwrap_or(input).to_path_buf();
                let msg = e.to_string();
                let io = e.into_io_error().unwrap_or_else(|| std::io::Error::other(msg));
                PackError::file(&path, io)
            })?;
            if ent.file_type().is_file() && is_source(ent.path()) {
                found.push(ent.into_path());
            }
        }
        found.sort();
        out.extend(found);
    }
    Ok(out)
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
}

/// `<output>.duplicates.txt`
pub fn default_report_path(output: &Path) -> PathBuf {
    let mut s = OsString::from(output.as_os_str());
    s.push(".duplicates.txt");
    PathBuf::from(s)
}

/// `<dir>/<KEY>.ETC1` or `<dir>/<KEY>.RGB8`, key as 8 upper-case hex digits.
pub fn dump_path(dir: &Path, key: u32, format: PixelFormat) -> PathBuf {
    dir.join(format!("{key:08X}.{}", format.dump_extension()))
}
