//! NumPy `.npy` array files.
//!
//! Layout: the magic string `\x93NUMPY`, a major/minor version byte pair,
//! a little-endian header length (`u16` for 1.0, `u32` for 2.0 and 3.0),
//! then a Python dict literal such as
//! `{'descr': '<f8', 'fortran_order': False, 'shape': (3, 4), }`
//! padded with spaces and a final `\n` so the raw data starts on a 64-byte
//! boundary. The data follows with no further framing.
//!
//! Writing always produces little-endian `f64` in C order. Reading accepts
//! the numeric dtypes NumPy commonly emits and widens them to `f64`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::PrepError;
use crate::types::Array;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ARRAY_ALIGN: usize = 64;

/// Append `.npy` to `stem` unless it already ends with it.
pub fn npy_file_name(stem: impl Into<PathBuf>) -> PathBuf {
    let stem = stem.into();
    if stem.extension().is_some_and(|ext| ext == "npy") {
        stem
    } else {
        let mut name = stem.into_os_string();
        name.push(".npy");
        PathBuf::from(name)
    }
}

// ─── Writing ─────────────────────────────────────────────────────────

fn shape_literal(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({},)", n),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}

/// Build the padded header dict for `shape`, returning it with the
/// version it needs.
fn encode_header(shape: &[usize]) -> (u8, Vec<u8>) {
    let dict = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': {}, }}",
        shape_literal(shape)
    );
    for (major, prefix_len) in [(1u8, MAGIC.len() + 2 + 2), (2u8, MAGIC.len() + 2 + 4)] {
        let unpadded = prefix_len + dict.len() + 1;
        let padding = (ARRAY_ALIGN - unpadded % ARRAY_ALIGN) % ARRAY_ALIGN;
        let header_len = dict.len() + padding + 1;
        if major == 2 || header_len <= u16::MAX as usize {
            let mut header = dict.into_bytes();
            header.resize(header.len() + padding, b' ');
            header.push(b'\n');
            return (major, header);
        }
    }
    unreachable!("version 2.0 accepts any header length")
}

/// Save an array as a `.npy` file at exactly `path`.
pub fn save_npy(path: &Path, array: &Array) -> Result<(), PrepError> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_npy(&mut writer, array)?;
    writer.flush()?;
    Ok(())
}

/// Write an array in `.npy` format to any writer.
pub fn write_npy(mut w: impl Write, array: &Array) -> Result<(), PrepError> {
    let (major, header) = encode_header(array.shape());

    w.write_all(MAGIC)?;
    w.write_all(&[major, 0])?;
    if major == 1 {
        w.write_all(&(header.len() as u16).to_le_bytes())?;
    } else {
        let len = u32::try_from(header.len())
            .map_err(|_| PrepError::NpyFormat("header exceeds 4 GiB".into()))?;
        w.write_all(&len.to_le_bytes())?;
    }
    w.write_all(&header)?;

    let mut buf = Vec::with_capacity(8 * 4096);
    for chunk in array.as_slice().chunks(4096) {
        buf.clear();
        for v in chunk {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        w.write_all(&buf)?;
    }
    Ok(())
}

// ─── Reading ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Float,
    Int,
    Uint,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    kind: Kind,
    size: usize,
    big_endian: bool,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self, PrepError> {
        let unsupported = || PrepError::NpyFormat(format!("unsupported dtype: {}", descr));
        let mut chars = descr.chars();
        let order = chars.next().ok_or_else(unsupported)?;
        let kind = chars.next().ok_or_else(unsupported)?;
        let size: usize = chars.as_str().parse().map_err(|_| unsupported())?;

        let big_endian = match order {
            '<' | '|' => false,
            '>' => true,
            '=' => cfg!(target_endian = "big"),
            _ => return Err(unsupported()),
        };
        let kind = match (kind, size) {
            ('f', 4 | 8) => Kind::Float,
            ('i', 1 | 2 | 4 | 8) => Kind::Int,
            ('u', 1 | 2 | 4 | 8) => Kind::Uint,
            ('b', 1) => Kind::Bool,
            _ => return Err(unsupported()),
        };
        Ok(Self {
            kind,
            size,
            big_endian,
        })
    }

    fn decode(&self, bytes: &[u8]) -> f64 {
        let mut raw = [0u8; 8];
        let raw = &mut raw[..self.size];
        raw.copy_from_slice(bytes);
        if self.big_endian {
            raw.reverse();
        }
        match (self.kind, self.size) {
            (Kind::Float, 8) => f64::from_le_bytes(to_array(raw)),
            (Kind::Float, _) => f32::from_le_bytes(to_array(raw)) as f64,
            (Kind::Int, 8) => i64::from_le_bytes(to_array(raw)) as f64,
            (Kind::Int, 4) => i32::from_le_bytes(to_array(raw)) as f64,
            (Kind::Int, 2) => i16::from_le_bytes(to_array(raw)) as f64,
            (Kind::Int, _) => raw[0] as i8 as f64,
            (Kind::Uint, 8) => u64::from_le_bytes(to_array(raw)) as f64,
            (Kind::Uint, 4) => u32::from_le_bytes(to_array(raw)) as f64,
            (Kind::Uint, 2) => u16::from_le_bytes(to_array(raw)) as f64,
            (Kind::Uint, _) | (Kind::Bool, _) => raw[0] as f64,
        }
    }
}

fn to_array<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&raw[..N]);
    out
}

/// Return the text after `'key':` (either quote style) in a header dict.
fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str, PrepError> {
    for quote in ['\'', '"'] {
        let needle = format!("{quote}{key}{quote}");
        if let Some(pos) = header.find(&needle) {
            let rest = header[pos + needle.len()..].trim_start();
            if let Some(value) = rest.strip_prefix(':') {
                return Ok(value.trim_start());
            }
        }
    }
    Err(PrepError::NpyFormat(format!("header has no '{}' entry", key)))
}

fn parse_descr(header: &str) -> Result<&str, PrepError> {
    let value = dict_value(header, "descr")?;
    let quote = value
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| PrepError::NpyFormat("structured dtypes are not supported".into()))?;
    let body = &value[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| PrepError::NpyFormat("unterminated descr".into()))?;
    Ok(&body[..end])
}

fn parse_fortran_order(header: &str) -> Result<bool, PrepError> {
    let value = dict_value(header, "fortran_order")?;
    if value.starts_with("True") {
        Ok(true)
    } else if value.starts_with("False") {
        Ok(false)
    } else {
        Err(PrepError::NpyFormat("fortran_order is not a bool".into()))
    }
}

fn parse_shape(header: &str) -> Result<Vec<usize>, PrepError> {
    let value = dict_value(header, "shape")?;
    let body = value
        .strip_prefix('(')
        .and_then(|v| v.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or_else(|| PrepError::NpyFormat("shape is not a tuple".into()))?;
    body.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| PrepError::NpyFormat(format!("invalid dimension: {}", s)))
        })
        .collect()
}

/// Reorder a column-major buffer into row-major order.
fn fortran_to_c(shape: &[usize], data: Vec<f64>) -> Vec<f64> {
    if shape.len() < 2 {
        return data;
    }
    let mut out = vec![0.0; data.len()];
    let mut f_strides = vec![1usize; shape.len()];
    for d in 1..shape.len() {
        f_strides[d] = f_strides[d - 1] * shape[d - 1];
    }
    let mut idx = vec![0usize; shape.len()];
    for slot in out.iter_mut() {
        let src: usize = idx.iter().zip(&f_strides).map(|(i, s)| i * s).sum();
        *slot = data[src];
        // Advance the C-order multi-index, last axis fastest.
        for d in (0..shape.len()).rev() {
            idx[d] += 1;
            if idx[d] < shape[d] {
                break;
            }
            idx[d] = 0;
        }
    }
    out
}

/// Load a `.npy` file.
pub fn load_npy(path: &Path) -> Result<Array, PrepError> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    read_npy(reader)
}

/// Read a `.npy` array from any reader, widening the data to `f64`.
pub fn read_npy(mut r: impl Read) -> Result<Array, PrepError> {
    let mut prefix = [0u8; 8];
    r.read_exact(&mut prefix)
        .map_err(|_| PrepError::NpyFormat("file too short for npy magic".into()))?;
    if &prefix[..6] != MAGIC {
        return Err(PrepError::NpyFormat("bad magic string".into()));
    }

    let header_len = match prefix[6] {
        1 => {
            let mut len = [0u8; 2];
            r.read_exact(&mut len)?;
            u16::from_le_bytes(len) as usize
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            r.read_exact(&mut len)?;
            u32::from_le_bytes(len) as usize
        }
        v => {
            return Err(PrepError::NpyFormat(format!(
                "unsupported format version {}.{}",
                v, prefix[7]
            )))
        }
    };

    let mut header = Vec::new();
    (&mut r).take(header_len as u64).read_to_end(&mut header)?;
    if header.len() != header_len {
        return Err(PrepError::NpyFormat("truncated header".into()));
    }
    let header = String::from_utf8(header)
        .map_err(|_| PrepError::NpyFormat("header is not valid text".into()))?;

    let dtype = Dtype::parse(parse_descr(&header)?)?;
    let fortran_order = parse_fortran_order(&header)?;
    let shape = parse_shape(&header)?;

    let count = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| PrepError::NpyFormat(format!("shape {:?} overflows", shape)))?;
    let byte_len = count
        .checked_mul(dtype.size)
        .ok_or_else(|| PrepError::NpyFormat(format!("shape {:?} overflows", shape)))?;

    let mut raw = Vec::new();
    r.take(byte_len as u64).read_to_end(&mut raw)?;
    if raw.len() != byte_len {
        return Err(PrepError::NpyFormat(format!(
            "expected {} data bytes, found {}",
            byte_len,
            raw.len()
        )));
    }

    let data: Vec<f64> = raw.chunks_exact(dtype.size).map(|b| dtype.decode(b)).collect();
    let data = if fortran_order {
        fortran_to_c(&shape, data)
    } else {
        data
    };
    Array::from_shape(shape, data)
}
