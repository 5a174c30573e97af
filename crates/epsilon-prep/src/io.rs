//! Text I/O: SVM-light problem files in, delimited text out (and back).
//!
//! Float output follows the C conventions NumPy's `savetxt` relies on, so
//! files written here are byte-identical to the ones the Python tooling
//! produces for the same values.

use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::error::PrepError;
use crate::types::*;
use crate::util::{parse_feature_index, MAX_FEATURE_INDEX};

// ─── C-compatible %e / %g formatting ────────────────────────────────

/// Formats `f64` like C's `%.Pe`.
struct Efmt {
    value: f64,
    precision: usize,
}

impl fmt::Display for Efmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.value;
        let p = self.precision;

        if v.is_nan() {
            return write!(f, "nan");
        }
        if v.is_infinite() {
            return write!(f, "{}", if v < 0.0 { "-inf" } else { "inf" });
        }
        if v == 0.0 {
            let sign = if v.is_sign_negative() { "-" } else { "" };
            return if p == 0 {
                write!(f, "{}0e+00", sign)
            } else {
                write!(f, "{}0.{}e+00", sign, "0".repeat(p))
            };
        }

        // Rust prints `1.5e-7`; C prints `1.5e-07`.
        let s = format!("{:.prec$e}", v, prec = p);
        match s.split_once('e') {
            Some((mantissa, exponent)) => {
                let exp_val: i32 = exponent.parse().unwrap_or(0);
                let sign = if exp_val < 0 { '-' } else { '+' };
                write!(f, "{}e{}{:02}", mantissa, sign, exp_val.unsigned_abs())
            }
            None => write!(f, "{}", s),
        }
    }
}

/// Formats `f64` like C's `%.Pg`.
///
/// Scientific notation when the exponent is < -4 or >= precision, fixed
/// otherwise; trailing zeros are stripped in both cases.
struct Gfmt {
    value: f64,
    precision: usize,
}

impl fmt::Display for Gfmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.value;
        let p = self.precision.max(1);

        if !v.is_finite() {
            return fmt::Display::fmt(&Efmt { value: v, precision: 0 }, f);
        }
        if v == 0.0 {
            return write!(f, "{}", if v.is_sign_negative() { "-0" } else { "0" });
        }

        let exp = v.abs().log10().floor() as i32;
        if exp < -4 || exp >= p as i32 {
            let s = format!("{}", Efmt { value: v, precision: p - 1 });
            match s.split_once('e') {
                Some((mantissa, exponent)) => {
                    let mantissa = if mantissa.contains('.') {
                        mantissa.trim_end_matches('0').trim_end_matches('.')
                    } else {
                        mantissa
                    };
                    write!(f, "{}e{}", mantissa, exponent)
                }
                None => write!(f, "{}", s),
            }
        } else {
            let decimal_places = if exp >= 0 {
                p.saturating_sub((exp + 1) as usize)
            } else {
                p + (-1 - exp) as usize
            };
            let s = format!("{:.prec$}", v, prec = decimal_places);
            let s = if s.contains('.') {
                s.trim_end_matches('0').trim_end_matches('.')
            } else {
                &s
            };
            write!(f, "{}", s)
        }
    }
}

/// Format a float like C's `%.{precision}e`.
pub fn format_e(v: f64, precision: usize) -> String {
    Efmt { value: v, precision }.to_string()
}

/// Format a float like C's `%g` (6 significant digits).
pub fn format_g(v: f64) -> String {
    Gfmt { value: v, precision: 6 }.to_string()
}

/// Digits after the point in NumPy's default `savetxt` format (`%.18e`).
pub const SAVETXT_PRECISION: usize = 18;

// ─── SVM-light problem files ────────────────────────────────────────

/// How feature indices in an SVM-light file map onto columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroBased {
    /// Zero-based if any index in the file is 0, one-based otherwise.
    #[default]
    Auto,
    /// Index `k` is column `k`.
    Yes,
    /// Index `k` is column `k - 1`; index 0 is rejected.
    No,
}

/// Options for [`load_svmlight`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    /// Force the column count. Must cover every index in the file.
    pub n_features: Option<usize>,
    /// Index base of the file.
    pub zero_based: ZeroBased,
}

/// Load a labelled sparse dataset from an SVM-light file.
///
/// Format: `<label> [qid:<id>] <index1>:<value1> <index2>:<value2> ... [# comment]`
pub fn load_svmlight(path: &Path, options: &LoadOptions) -> Result<Dataset, PrepError> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    load_svmlight_from_reader(reader, options)
}

/// Load an SVM-light dataset from any buffered reader.
pub fn load_svmlight_from_reader(
    reader: impl BufRead,
    options: &LoadOptions,
) -> Result<Dataset, PrepError> {
    let mut labels = Vec::new();
    let mut instances: Vec<Vec<FeatureNode>> = Vec::new();
    let mut query_ids: Vec<i64> = Vec::new();
    let mut saw_qid = false;
    let mut saw_zero = false;
    let mut max_index: Option<usize> = None;

    for (line_idx, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line = match line.split_once('#') {
            Some((data, _comment)) => data,
            None => line.as_str(),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let line_num = line_idx + 1;
        let mut parts = line.split_whitespace().peekable();

        let label_str = parts.next().ok_or_else(|| PrepError::ParseError {
            line: line_num,
            message: "missing label".into(),
        })?;
        let label: f64 = label_str.parse().map_err(|_| PrepError::ParseError {
            line: line_num,
            message: format!("invalid label: {}", label_str),
        })?;

        let mut qid = 0i64;
        if let Some(qid_str) = parts.peek().and_then(|t| t.strip_prefix("qid:")) {
            qid = qid_str.parse().map_err(|_| PrepError::ParseError {
                line: line_num,
                message: format!("invalid qid: {}", qid_str),
            })?;
            saw_qid = true;
            parts.next();
        }

        // Features must be sorted and unique within a line.
        let mut nodes = Vec::new();
        let mut prev_index = 0usize;
        for token in parts {
            let (idx_str, val_str) = token.split_once(':').ok_or_else(|| PrepError::ParseError {
                line: line_num,
                message: format!("expected index:value, got: {}", token),
            })?;
            let index = parse_feature_index(idx_str, MAX_FEATURE_INDEX).map_err(|message| {
                PrepError::ParseError {
                    line: line_num,
                    message,
                }
            })?;
            if !nodes.is_empty() && index <= prev_index {
                return Err(PrepError::ParseError {
                    line: line_num,
                    message: format!(
                        "feature indices must be ascending: {} follows {}",
                        index, prev_index
                    ),
                });
            }
            if index == 0 {
                if options.zero_based == ZeroBased::No {
                    return Err(PrepError::ParseError {
                        line: line_num,
                        message: "feature index 0 in a one-based file".into(),
                    });
                }
                saw_zero = true;
            }
            let value: f64 = val_str.parse().map_err(|_| PrepError::ParseError {
                line: line_num,
                message: format!("invalid value: {}", val_str),
            })?;
            prev_index = index;
            max_index = Some(max_index.map_or(index, |m| m.max(index)));
            nodes.push(FeatureNode { index, value });
        }

        labels.push(label);
        instances.push(nodes);
        query_ids.push(qid);
    }

    let one_based = match options.zero_based {
        ZeroBased::Auto => !saw_zero,
        ZeroBased::Yes => false,
        ZeroBased::No => true,
    };
    if one_based {
        for node in instances.iter_mut().flatten() {
            node.index -= 1;
        }
    }

    let file_features = match max_index {
        Some(m) if one_based => m,
        Some(m) => m + 1,
        None => 0,
    };
    let n_features = match options.n_features {
        Some(n) if n < file_features => {
            return Err(PrepError::InvalidParameter(format!(
                "n_features was set to {}, but input file contains {} features",
                n, file_features
            )));
        }
        Some(n) => n,
        None => file_features,
    };

    if !saw_qid {
        query_ids.clear();
    }

    Ok(Dataset {
        labels,
        instances,
        query_ids,
        n_features,
    })
}

// ─── Delimited text arrays ──────────────────────────────────────────

/// Rows formatted per batch when writing delimited text.
const ROWS_PER_BATCH: usize = 1024;

fn format_row(row: &[f64], delimiter: &str) -> String {
    let mut line = String::with_capacity(row.len() * (SAVETXT_PRECISION + 8));
    for (j, &v) in row.iter().enumerate() {
        if j > 0 {
            line.push_str(delimiter);
        }
        line.push_str(&format_e(v, SAVETXT_PRECISION));
    }
    line.push('\n');
    line
}

#[cfg(feature = "rayon")]
fn format_batch(rows: &[&[f64]], delimiter: &str) -> Vec<String> {
    use rayon::prelude::*;
    rows.par_iter().map(|row| format_row(row, delimiter)).collect()
}

#[cfg(not(feature = "rayon"))]
fn format_batch(rows: &[&[f64]], delimiter: &str) -> Vec<String> {
    rows.iter().map(|row| format_row(row, delimiter)).collect()
}

/// Save a 1-D or 2-D array as delimited text.
pub fn save_delimited(path: &Path, array: &Array, delimiter: &str) -> Result<(), PrepError> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_delimited(&mut writer, array, delimiter)?;
    writer.flush()?;
    Ok(())
}

/// Write a 1-D or 2-D array as delimited text to any writer.
///
/// One line per row, values in `%.18e`, no header. A 1-D array is written
/// one value per line.
pub fn write_delimited(mut w: impl Write, array: &Array, delimiter: &str) -> Result<(), PrepError> {
    let rows: Vec<&[f64]> = array.rows()?.collect();
    for batch in rows.chunks(ROWS_PER_BATCH) {
        for line in format_batch(batch, delimiter) {
            w.write_all(line.as_bytes())?;
        }
    }
    Ok(())
}

/// Load an array written by [`save_delimited`].
pub fn load_delimited(path: &Path, delimiter: &str) -> Result<Array, PrepError> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    read_delimited(reader, delimiter)
}

/// Read delimited text from any buffered reader.
///
/// Blank lines and lines starting with `#` are skipped. A file with a
/// single column comes back 1-D, anything wider as a 2-D matrix.
pub fn read_delimited(reader: impl BufRead, delimiter: &str) -> Result<Array, PrepError> {
    if delimiter.is_empty() {
        return Err(PrepError::InvalidParameter("empty delimiter".into()));
    }

    let mut data = Vec::new();
    let mut rows = 0usize;
    let mut cols: Option<usize> = None;

    for (line_idx, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_num = line_idx + 1;

        let before = data.len();
        for field in line.split(delimiter) {
            let field = field.trim();
            let value: f64 = field.parse().map_err(|_| PrepError::ParseError {
                line: line_num,
                message: format!("invalid value: {}", field),
            })?;
            data.push(value);
        }
        let width = data.len() - before;
        match cols {
            None => cols = Some(width),
            Some(c) if c != width => {
                return Err(PrepError::ParseError {
                    line: line_num,
                    message: format!("expected {} columns, got {}", c, width),
                });
            }
            Some(_) => {}
        }
        rows += 1;
    }

    match cols {
        None => Ok(Array::vector(Vec::new())),
        Some(1) => Ok(Array::vector(data)),
        Some(c) => Array::matrix(rows, c, data),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("data")
    }

    fn parse(input: &[u8]) -> Result<Dataset, PrepError> {
        load_svmlight_from_reader(input, &LoadOptions::default())
    }

    #[test]
    fn parse_epsilon_sample() {
        let path = data_dir().join("epsilon_sample");
        let ds = load_svmlight(&path, &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 40);
        assert_eq!(ds.n_features, 8);
        assert_eq!(ds.nnz(), 214);
        assert!(ds.query_ids.is_empty());
        assert_eq!(ds.labels.iter().filter(|&&l| l == 1.0).count(), 22);
        // First row: +1 2:-0.042756 3:-0.013431 5:-0.046250 6:-0.043014 8:0.032685
        assert_eq!(ds.labels[0], 1.0);
        assert_eq!(
            ds.instances[0][0],
            FeatureNode {
                index: 1,
                value: -0.042756
            }
        );
        assert_eq!(ds.instances[0].last().unwrap().index, 7);
    }

    #[test]
    fn parse_skips_blank_and_comment_lines() {
        let input = b"# header\n+1 1:0.5\n\n   \n-1 2:0.3 # trailing note\n";
        let ds = parse(input).unwrap();
        assert_eq!(ds.labels, vec![1.0, -1.0]);
        assert_eq!(ds.instances[1], vec![FeatureNode { index: 1, value: 0.3 }]);
    }

    #[test]
    fn auto_detects_zero_based_files() {
        let ds = parse(b"1 0:1.0 2:3.0\n0 1:2.0\n").unwrap();
        assert_eq!(ds.n_features, 3);
        assert_eq!(ds.instances[0][0].index, 0);
        assert_eq!(ds.instances[0][1].index, 2);
    }

    #[test]
    fn explicit_one_based_rejects_index_zero() {
        let options = LoadOptions {
            zero_based: ZeroBased::No,
            ..Default::default()
        };
        let err = load_svmlight_from_reader(&b"1 0:1.0\n"[..], &options).unwrap_err();
        assert!(format!("{}", err).contains("one-based"), "error: {}", err);
    }

    #[test]
    fn explicit_zero_based_keeps_indices() {
        let options = LoadOptions {
            zero_based: ZeroBased::Yes,
            ..Default::default()
        };
        let ds = load_svmlight_from_reader(&b"1 1:1.0 4:2.0\n"[..], &options).unwrap();
        assert_eq!(ds.n_features, 5);
        assert_eq!(ds.instances[0][1].index, 4);
    }

    #[test]
    fn n_features_widens_but_never_truncates() {
        let wide = LoadOptions {
            n_features: Some(10),
            ..Default::default()
        };
        let ds = load_svmlight_from_reader(&b"1 3:1.0\n"[..], &wide).unwrap();
        assert_eq!(ds.n_features, 10);

        let narrow = LoadOptions {
            n_features: Some(2),
            ..Default::default()
        };
        let err = load_svmlight_from_reader(&b"1 3:1.0\n"[..], &narrow).unwrap_err();
        assert!(format!("{}", err).contains("contains 3 features"), "error: {}", err);
    }

    #[test]
    fn parse_query_ids() {
        let ds = parse(b"3 qid:1 1:0.5\n2 qid:1 2:0.1\n1 1:0.2\n").unwrap();
        assert_eq!(ds.query_ids, vec![1, 1, 0]);
        assert_eq!(ds.instances[0], vec![FeatureNode { index: 0, value: 0.5 }]);
    }

    #[test]
    fn rows_without_features_are_kept() {
        let ds = parse(b"1\n-1 2:1.0\n").unwrap();
        assert_eq!(ds.len(), 2);
        assert!(ds.instances[0].is_empty());
    }

    #[test]
    fn empty_input_gives_empty_dataset() {
        let ds = parse(b"").unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.n_features, 0);
    }

    #[test]
    fn parse_error_unsorted_indices() {
        let err = parse(b"+1 3:0.5 1:0.3\n").unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("ascending"), "error: {}", msg);
        assert!(msg.contains("line 1"), "error: {}", msg);
    }

    #[test]
    fn parse_error_duplicate_indices() {
        assert!(parse(b"+1 1:0.5 1:0.3\n").is_err());
    }

    #[test]
    fn parse_error_missing_colon() {
        assert!(parse(b"+1 1:0.5 bad_token\n").is_err());
    }

    #[test]
    fn parse_error_reports_line_number() {
        let err = parse(b"1 1:0.5\n\nx 1:0.5\n").unwrap_err();
        match err {
            PrepError::ParseError { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("invalid label"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_error_negative_index() {
        let err = parse(b"1 -1:0.5\n").unwrap_err();
        assert!(format!("{}", err).contains("out of valid range"));
    }

    #[test]
    fn efmt_matches_c_printf() {
        // Reference values from C's printf("%.18e\n", v)
        let cases: &[(f64, &str)] = &[
            (1.0, "1.000000000000000000e+00"),
            (0.0, "0.000000000000000000e+00"),
            (-0.0, "-0.000000000000000000e+00"),
            (-1.0, "-1.000000000000000000e+00"),
            (0.5, "5.000000000000000000e-01"),
            (1e-5, "1.000000000000000082e-05"),
            (1e20, "1.000000000000000000e+20"),
            (1e100, "1.000000000000000016e+100"),
            (0.708333, "7.083329999999999904e-01"),
            (-0.0123, "-1.230000000000000017e-02"),
            (123456.789, "1.234567890000000043e+05"),
            (5e-324, "4.940656458412465442e-324"),
        ];
        for &(v, expected) in cases {
            assert_eq!(format_e(v, 18), expected, "%.18e mismatch for {}", v);
        }
        assert_eq!(format_e(f64::NAN, 18), "nan");
        assert_eq!(format_e(f64::INFINITY, 18), "inf");
        assert_eq!(format_e(f64::NEG_INFINITY, 18), "-inf");
    }

    #[test]
    fn gfmt_matches_c_printf() {
        let cases: &[(f64, &str)] = &[
            (0.5, "0.5"),
            (-1.0, "-1"),
            (0.0, "0"),
            (1e-5, "1e-05"),
            (1e-4, "0.0001"),
            (1e20, "1e+20"),
            (0.708333, "0.708333"),
            (123456.789, "123457"),
            (1234567.0, "1.23457e+06"),
            (75.0, "75"),
        ];
        for &(v, expected) in cases {
            assert_eq!(format_g(v), expected, "%g mismatch for {}", v);
        }
    }

    #[test]
    fn write_matrix_as_savetxt() {
        let m = Array::matrix(2, 2, vec![1.0, -0.5, 0.0, 2.0]).unwrap();
        let mut buf = Vec::new();
        write_delimited(&mut buf, &m, ",").unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "1.000000000000000000e+00,-5.000000000000000000e-01\n\
             0.000000000000000000e+00,2.000000000000000000e+00\n"
        );
    }

    #[test]
    fn write_vector_one_value_per_line() {
        let v = Array::vector(vec![1.0, -1.0]);
        let mut buf = Vec::new();
        write_delimited(&mut buf, &v, ",").unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "1.000000000000000000e+00\n-1.000000000000000000e+00\n"
        );
    }

    #[test]
    fn write_zero_width_matrix_as_empty_lines() {
        let m = Array::matrix(3, 0, Vec::new()).unwrap();
        let mut buf = Vec::new();
        write_delimited(&mut buf, &m, ",").unwrap();
        assert_eq!(buf, b"\n\n\n");
    }

    fn wide_matrix(rows: usize, cols: usize) -> Array {
        let data = (0..rows * cols)
            .map(|i| (i as f64 * 0.37).sin() * 10f64.powi((i % 9) as i32 - 4))
            .collect();
        Array::matrix(rows, cols, data).unwrap()
    }

    #[test]
    fn write_spanning_several_batches_keeps_row_order() {
        let m = wide_matrix(3 * ROWS_PER_BATCH - 72, 3);
        let mut buf = Vec::new();
        write_delimited(&mut buf, &m, ",").unwrap();

        let expected: String = m.as_slice().chunks(3).map(|r| format_row(r, ",")).collect();
        assert_eq!(String::from_utf8(buf).unwrap(), expected);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn parallel_batches_match_sequential_formatting() {
        let m = wide_matrix(3000, 4);
        let rows: Vec<&[f64]> = m.rows().unwrap().collect();
        let sequential: Vec<String> = rows.iter().map(|r| format_row(r, ";")).collect();
        assert_eq!(format_batch(&rows, ";"), sequential);

        let mut buf = Vec::new();
        write_delimited(&mut buf, &m, ";").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), sequential.concat());
    }

    #[test]
    fn write_rejects_three_dimensions() {
        let a = Array::from_shape(vec![2, 1, 1], vec![1.0, 2.0]).unwrap();
        let mut buf = Vec::new();
        assert!(matches!(
            write_delimited(&mut buf, &a, ","),
            Err(PrepError::Shape(_))
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn delimited_text_reads_back_exactly() {
        let values = vec![0.1, -2.5e-300, 1.0 / 3.0, 42.0, -0.0123, 7.0e12];
        let m = Array::matrix(3, 2, values).unwrap();
        let mut buf = Vec::new();
        write_delimited(&mut buf, &m, ",").unwrap();
        let back = read_delimited(&buf[..], ",").unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn read_single_column_is_vector() {
        let back = read_delimited(&b"1.0\n-1.0\n\n1.0\n"[..], ",").unwrap();
        assert_eq!(back.shape(), &[3]);
    }

    #[test]
    fn read_rejects_ragged_rows() {
        let err = read_delimited(&b"1,2\n3\n"[..], ",").unwrap_err();
        assert!(format!("{}", err).contains("expected 2 columns"));
    }

    #[test]
    fn read_honors_other_delimiters() {
        let back = read_delimited(&b"1;2\n3;4\n"[..], ";").unwrap();
        assert_eq!(back.shape(), &[2, 2]);
        assert_eq!(back.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn nan_and_infinity_survive_text() {
        let v = Array::vector(vec![f64::NAN, f64::INFINITY, f64::NEG_INFINITY]);
        let mut buf = Vec::new();
        write_delimited(&mut buf, &v, ",").unwrap();
        let back = read_delimited(&buf[..], ",").unwrap();
        assert!(back.as_slice()[0].is_nan());
        assert_eq!(back.as_slice()[1], f64::INFINITY);
        assert_eq!(back.as_slice()[2], f64::NEG_INFINITY);
    }

    #[test]
    fn file_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        let m = Array::matrix(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        save_delimited(&path, &m, ",").unwrap();
        assert_eq!(load_delimited(&path, ",").unwrap(), m);
    }
}
