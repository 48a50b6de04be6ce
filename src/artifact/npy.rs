//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use std::io::{Cursor, Write};

/// Serializes an n-dimensional `f64` array to `.npy` bytes.
pub fn npy_bytes(shape: &[u64], data: &[f64]) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut writer = npyz::WriteOptions::new()
            .default_dtype()
            .shape(shape)
            .writer(&mut bytes)
            .begin_nd()?;
        writer.extend(data.iter().copied())?;
        writer.finish()?;
    }
    Ok(bytes)
}

/// Bundles several named `.npy` members into a single `.npz` zip archive,
/// the standard numpy on-disk convention (SPEC_FULL.md §4.5 `heatmap.npz`).
pub fn npz_bytes(members: &[(&str, Vec<u8>)]) -> std::io::Result<Vec<u8>> {
    let buffer = Cursor::new(Vec::new());
    let mut zip = zip::ZipWriter::new(buffer);
    let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, contents) in members {
        zip.start_file(*name, options)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        zip.write_all(contents)?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npy_bytes_start_with_magic() {
        let bytes = npy_bytes(&[2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(&bytes[1..6], b"NUMPY");
    }

    #[test]
    fn npz_bytes_start_with_zip_magic() {
        let npy = npy_bytes(&[2], &[1.0, 2.0]).unwrap();
        let bytes = npz_bytes(&[("values.npy", npy)]).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }
}
