// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! NumPy `.npy` persistence for result columns.
//!
//! Only the subset the analysis needs is supported: little-endian `f64`,
//! C order, one dimension. Zero-dimensional arrays are read as a single
//! value so scalar files saved by older runs load too.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::batch::{Arity, BatchOutput};
use crate::error::{SpacedError, SpacedResult};
use crate::geometry::ModelKind;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
/// Magic, version and header length together must end on this boundary.
const HEADER_ALIGN: usize = 64;
const PREAMBLE_V1: usize = MAGIC.len() + 2 + 2;

fn invalid(reason: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.into())
}

fn header_text(len: usize) -> String {
    let dict = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': ({len},), }}");
    let unpadded = PREAMBLE_V1 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    format!("{dict}{}\n", " ".repeat(padding))
}

/// Serialises `values` as a version 1.0 `.npy` stream.
pub fn write_npy_to<W: Write>(mut writer: W, values: &[f64]) -> io::Result<()> {
    let header = header_text(values.len());
    let header_len = u16::try_from(header.len()).map_err(|_| invalid("header too long"))?;
    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(header.as_bytes())?;
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()
}

/// Pulls the quoted or parenthesised value following `key` out of a header dict.
fn header_field<'h>(header: &'h str, key: &str) -> io::Result<&'h str> {
    let needle = format!("'{key}':");
    let at = header
        .find(&needle)
        .ok_or_else(|| invalid(format!("header has no {key}")))?;
    let rest = header[at + needle.len()..].trim_start();
    let (open, close) = match rest.chars().next() {
        Some('\'') => ('\'', '\''),
        Some('(') => ('(', ')'),
        _ => {
            let end = rest.find(&[',', '}'][..]).unwrap_or(rest.len());
            return Ok(rest[..end].trim());
        }
    };
    let body = &rest[open.len_utf8()..];
    let end = body
        .find(close)
        .ok_or_else(|| invalid(format!("unterminated {key}")))?;
    Ok(&body[..end])
}

fn parse_shape(shape: &str) -> io::Result<usize> {
    let dims: Vec<&str> = shape
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .collect();
    match dims.as_slice() {
        [] => Ok(1),
        [len] => len
            .parse()
            .map_err(|_| invalid(format!("bad dimension {len:?}"))),
        _ => Err(invalid(format!("expected a 1-D array, got shape ({shape})"))),
    }
}

/// Reads a `.npy` stream holding `<f8` values.
pub fn read_npy_from<R: Read>(mut reader: R) -> io::Result<Vec<f64>> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(invalid("missing NUMPY magic"));
    }
    let mut version = [0u8; 2];
    reader.read_exact(&mut version)?;
    let header_len = match version[0] {
        1 => {
            let mut len = [0u8; 2];
            reader.read_exact(&mut len)?;
            usize::from(u16::from_le_bytes(len))
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            reader.read_exact(&mut len)?;
            usize::try_from(u32::from_le_bytes(len)).map_err(|_| invalid("header too long"))?
        }
        major => return Err(invalid(format!("unsupported format version {major}"))),
    };
    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8_lossy(&header);

    let descr = header_field(&header, "descr")?;
    if descr != "<f8" {
        return Err(invalid(format!("unsupported dtype {descr}")));
    }
    if header_field(&header, "fortran_order")? != "False" {
        return Err(invalid("fortran-ordered arrays are not supported"));
    }
    let len = parse_shape(header_field(&header, "shape")?)?;

    let mut values = Vec::with_capacity(len);
    let mut bytes = [0u8; 8];
    for _ in 0..len {
        reader.read_exact(&mut bytes)?;
        values.push(f64::from_le_bytes(bytes));
    }
    Ok(values)
}

fn path_error(path: &Path, err: io::Error) -> SpacedError {
    match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => SpacedError::Npy {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
        _ => SpacedError::io(path, err),
    }
}

pub fn write_npy(path: impl AsRef<Path>, values: &[f64]) -> SpacedResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|err| SpacedError::io(path, err))?;
    write_npy_to(BufWriter::new(file), values).map_err(|err| path_error(path, err))?;
    debug!(path = ?path, len = values.len(), "array written");
    Ok(())
}

pub fn read_npy(path: impl AsRef<Path>) -> SpacedResult<Vec<f64>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| SpacedError::io(path, err))?;
    read_npy_from(BufReader::new(file)).map_err(|err| path_error(path, err))
}

/// File names of the arrays one analysis produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactNames {
    pub cos_primary: String,
    pub cos_secondary: Option<String>,
    pub spacing: String,
}

impl ArtifactNames {
    pub fn new(model: ModelKind, arity: Arity) -> Self {
        let suffix = arity.as_str();
        match model {
            ModelKind::Hyperbolic => Self {
                cos_primary: format!("cosangle_{suffix}.npy"),
                cos_secondary: None,
                spacing: format!("spacing_{suffix}.npy"),
            },
            ModelKind::Rank2 => Self {
                cos_primary: format!("cosangleP_{suffix}.npy"),
                cos_secondary: Some(format!("cosangleM_{suffix}.npy")),
                spacing: format!("spacing_{suffix}.npy"),
            },
        }
    }
}

/// Writes every column of `output` into `dir`, creating it if needed.
pub fn write_output(dir: impl AsRef<Path>, output: &BatchOutput) -> SpacedResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|err| SpacedError::io(dir, err))?;
    let names = ArtifactNames::new(output.summary.model, output.summary.arity);

    let mut columns: Vec<(&str, &[f64])> = vec![
        (names.cos_primary.as_str(), output.cos_primary.as_slice()),
        (names.spacing.as_str(), output.spacing.as_slice()),
    ];
    if let (Some(name), Some(column)) = (&names.cos_secondary, &output.cos_secondary) {
        columns.insert(1, (name.as_str(), column.as_slice()));
    }

    let mut written = Vec::with_capacity(columns.len());
    for (name, column) in columns {
        let path = dir.join(name);
        write_npy(&path, column)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_aligned_and_numpy_shaped() {
        for len in [0, 3, 1_000_000] {
            let header = header_text(len);
            assert_eq!((PREAMBLE_V1 + header.len()) % HEADER_ALIGN, 0);
            assert!(header.ends_with('\n'));
            assert!(header.contains(&format!("'shape': ({len},)")));
        }
    }

    #[test]
    fn values_survive_bit_for_bit() {
        let values = [0.1, -0.0, f64::NAN, f64::INFINITY, 1e-310, 0.9642676992711171];
        let mut bytes = Vec::new();
        write_npy_to(&mut bytes, &values).unwrap();
        assert_eq!(bytes.len(), 128 + 8 * values.len());
        let back = read_npy_from(bytes.as_slice()).unwrap();
        assert_eq!(back.len(), values.len());
        for (a, b) in values.iter().zip(&back) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn scalar_arrays_read_as_one_value() {
        let header = "{'descr': '<f8', 'fortran_order': False, 'shape': (), }";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&5.25f64.to_le_bytes());
        assert_eq!(read_npy_from(bytes.as_slice()).unwrap(), [5.25]);
    }

    #[test]
    fn foreign_dtypes_are_rejected() {
        let header = "{'descr': '<f4', 'fortran_order': False, 'shape': (1,), }";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        let err = read_npy_from(bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_file_is_an_npy_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.npy");
        let mut bytes = Vec::new();
        write_npy_to(&mut bytes, &[1.0, 2.0]).unwrap();
        bytes.truncate(bytes.len() - 3);
        fs::write(&path, bytes).unwrap();
        assert!(matches!(read_npy(&path), Err(SpacedError::Npy { .. })));
        assert!(matches!(
            read_npy(dir.path().join("missing.npy")),
            Err(SpacedError::Io { .. })
        ));
    }

    #[test]
    fn artifact_names_follow_the_model() {
        let hyperbolic = ArtifactNames::new(ModelKind::Hyperbolic, Arity::Triples);
        assert_eq!(hyperbolic.cos_primary, "cosangle_triples.npy");
        assert_eq!(hyperbolic.spacing, "spacing_triples.npy");
        assert!(hyperbolic.cos_secondary.is_none());

        let rank2 = ArtifactNames::new(ModelKind::Rank2, Arity::Pairs);
        assert_eq!(rank2.cos_primary, "cosangleP_pairs.npy");
        assert_eq!(rank2.cos_secondary.as_deref(), Some("cosangleM_pairs.npy"));
    }
}
