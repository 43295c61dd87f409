#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::pack::error::{PackError, PackResult};

pub fn open_file(path: &Path) -> PackResult<File> {
    File::open(path).map_err(|e| PackError::file(path, e))
}

pub fn create_file(path: &Path) -> PackResult<File> {
    File::create(path).map_err(|e| PackError::file(path, e))
}

pub fn write_u8(w: &mut dyn Write, v: u8) -> PackResult<()> {
    w.write_all(&[v])?;
    Ok(())
}

pub fn write_u16(w: &mut dyn Write, v: u16) -> PackResult<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_u32(w: &mut dyn Write, v: u32) -> PackResult<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Writes `n` zero bytes (`n` is always below the alignment unit).
pub fn write_zeros(w: &mut dyn Write, n: u64) -> PackResult<()> {
    const ZEROS: [u8; 8] = [0u8; 8];
    let mut left = n as usize;
    while left > 0 {
        let chunk = left.min(ZEROS.len());
        w.write_all(&ZEROS[..chunk])?;
        left -= chunk;
    }
    Ok(())
}

pub fn read_exact<const N: usize>(r: &mut dyn Read) -> PackResult<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads a u32 in file order; `swap` flips it for opposite-endian sources.
pub fn read_u32(r: &mut dyn Read, swap: bool) -> PackResult<u32> {
    let v = u32::from_le_bytes(read_exact::<4>(r)?);
    Ok(if swap { v.swap_bytes() } else { v })
}
