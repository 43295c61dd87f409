#![forbid(unsafe_code)]

use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::pack::build::{BuildSummary, FinishedPack, PackWriter};
use crate::pack::catalog::Catalog;
use crate::pack::compress::Compressor;
use crate::pack::config::{BuildOptions, Mode, PackConfig};
use crate::pack::error::{PackError, PackResult};
use crate::pack::io::create_file;
use crate::pack::ktx;
use crate::pack::path::dump_path;
use crate::pack::report::DuplicateReport;

/// Runs whichever mode the configuration selects.
pub fn run(config: &PackConfig) -> PackResult<()> {
    match &config.mode {
        Mode::Build(opts) => build(&config.inputs, opts).map(|_| ()),
        Mode::Dump { dir } => dump(&config.inputs, dir).map(|_| ()),
    }
}

/// Builds a pack from `inputs`. Catalog and compressor failures happen before
/// the output file is created; later failures leave an invalid file behind.
pub fn build(inputs: &[PathBuf], opts: &BuildOptions) -> PackResult<BuildSummary> {
    let catalog = Catalog::build(inputs)?;
    let compressor = Compressor::new(opts.zstd_level, opts.dictionary.as_ref())?;

    let out = BufWriter::new(create_file(&opts.output)?);
    let finished = write_pack(out, &catalog, opts, compressor).inspect_err(|e| {
        error!(
            "{} is incomplete and must be discarded ({e})",
            opts.output.display()
        );
    })?;

    let summary = finished.summary;
    if finished.duplicates.write_or_clear(&opts.duplicate_report)? {
        warn!(
            "{} duplicate textures listed in {}",
            finished.duplicates.len(),
            opts.duplicate_report.display()
        );
    }

    info!(
        "wrote {}: {} textures, {} mappings, {} bytes (compression ratio {:.2})",
        opts.output.display(),
        summary.n_textures,
        summary.n_mappings,
        summary.pack_bytes,
        summary.ratio()
    );
    Ok(summary)
}

/// Runs the writer over a finished catalog: header, body pass, finalize.
pub fn write_pack<W: Write + Seek>(
    out: W,
    catalog: &Catalog,
    opts: &BuildOptions,
    compressor: Compressor,
) -> PackResult<FinishedPack<W>> {
    let mut writer = PackWriter::create(
        out,
        &opts.metadata,
        opts.dictionary.as_ref(),
        compressor,
        catalog.keys(),
    )?;

    info!("writing texture data");
    for desc in catalog.descriptors() {
        let texture = ktx::load(&desc.source)?;
        writer.add_texture(desc, &texture)?;
    }
    writer.finalize()
}

/// Writes every catalogued body raw into `dir` as `<KEY>.ETC1` / `<KEY>.RGB8`.
pub fn dump(inputs: &[PathBuf], dir: &Path) -> PackResult<usize> {
    let catalog = Catalog::build(inputs)?;
    std::fs::create_dir_all(dir).map_err(|e| PackError::file(dir, e))?;

    for desc in catalog.descriptors() {
        let texture = ktx::load(&desc.source)?;
        let path = dump_path(dir, desc.key, desc.pixel_format);
        std::fs::write(&path, &texture.data).map_err(|e| PackError::file(&path, e))?;
    }

    info!("dumped {} textures into {}", catalog.len(), dir.display());
    Ok(catalog.len())
}

/// Re-decodes every pair in a duplicate report and confirms the bodies are
/// byte-identical by blake3 digest.
pub fn check_duplicates(report: &Path) -> PackResult<usize> {
    let report = DuplicateReport::read(report)?;

    for pair in report.pairs() {
        let original = digest(&pair.original)?;
        let duplicate = digest(&pair.duplicate)?;
        if original != duplicate {
            return Err(PackError::HashMismatch {
                original: pair.original.display().to_string(),
                duplicate: pair.duplicate.display().to_string(),
            });
        }
    }

    info!("ok: {} duplicate pairs confirmed", report.len());
    Ok(report.len())
}

fn digest(path: &Path) -> PackResult<blake3::Hash> {
    let texture = ktx::load(path)?;
    Ok(blake3::hash(&texture.data))
}
