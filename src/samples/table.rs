//! samples::table — `%`-commented numeric tables on disk.
//!
//! Tables are whitespace separated; a file whose rows do not split on
//! whitespace is re-read comma separated. Lines starting with `%` and blank
//! lines are skipped. Written numbers use C-style `%1.4e` formatting.
use crate::samples::errors::{SampleError, SampleResult};
use ndarray::{Array2, ArrayView2};
use std::{fs, path::Path};

/// Read a numeric table and require `expected_cols` columns when given.
///
/// Errors
/// ------
/// - `SampleError::Io` when the file cannot be read.
/// - `SampleError::Parse` for a non-numeric token.
/// - `SampleError::ColumnCount` when any row has the wrong width.
pub fn read_table(path: &Path, expected_cols: Option<usize>) -> SampleResult<Array2<f64>> {
    let text = fs::read_to_string(path).map_err(|e| SampleError::io(path, &e))?;
    let shown = path.display().to_string();
    let mut rows: Vec<(usize, Vec<&str>)> = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        let mut tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() == 1 && trimmed.contains(',') {
            tokens = trimmed.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
        }
        rows.push((i + 1, tokens));
    }

    let width = match (expected_cols, rows.first()) {
        (Some(w), _) => w,
        (None, Some((_, first))) => first.len(),
        (None, None) => 0,
    };
    let mut values = Vec::with_capacity(rows.len() * width);
    for (line, tokens) in &rows {
        if tokens.len() != width {
            return Err(SampleError::ColumnCount {
                path: shown,
                line: *line,
                expected: width,
                found: tokens.len(),
            });
        }
        for token in tokens {
            let v = token.parse::<f64>().map_err(|_| SampleError::Parse {
                path: shown.clone(),
                line: *line,
                token: token.to_string(),
            })?;
            values.push(v);
        }
    }
    Array2::from_shape_vec((rows.len(), width), values).map_err(|_| SampleError::ShapeMismatch {
        what: "table cells",
        expected: rows.len() * width,
        found: 0,
    })
}

/// Write `rows` under a `%`-prefixed header line.
pub fn write_table(path: &Path, header: &[String], rows: ArrayView2<f64>) -> SampleResult<()> {
    let mut out = String::new();
    out.push('%');
    out.push_str(&header.join("\t"));
    out.push('\n');
    for row in rows.rows() {
        let line: Vec<String> = row.iter().map(|&v| format_sci(v)).collect();
        out.push_str(&line.join("\t"));
        out.push('\n');
    }
    fs::write(path, out).map_err(|e| SampleError::io(path, &e))
}

/// `%1.4e` formatting: four decimals and a signed two-digit exponent.
pub fn format_sci(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    let s = format!("{v:.4e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Whitespace and comma tables with comments.
    // - Column-count errors and `%1.4e` formatting.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Comments are skipped and both separators parse.
    //
    // Given
    // -----
    // - A whitespace table and a comma table, each with a `%` header.
    //
    // Expect
    // ------
    // - Identical 2×2 matrices.
    fn read_table_accepts_both_separators() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let ws = dir.path().join("ws.txt");
        let csv = dir.path().join("csv.txt");
        fs::write(&ws, "% a b\n1.0 2.0\n\n3.5\t-4\n").expect("write");
        fs::write(&csv, "%a,b\n1.0,2.0\n3.5,-4\n").expect("write");

        // Act
        let a = read_table(&ws, Some(2)).expect("whitespace");
        let b = read_table(&csv, None).expect("comma");

        // Assert
        assert_eq!(a, array![[1.0, 2.0], [3.5, -4.0]]);
        assert_eq!(a, b);
    }

    #[test]
    // Purpose
    // -------
    // A width mismatch names the offending line.
    //
    // Given
    // -----
    // - Five columns where three are expected.
    //
    // Expect
    // ------
    // - `ColumnCount { line: 2, expected: 3, found: 5 }`.
    fn read_table_reports_column_mismatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("x.txt");
        fs::write(&path, "%h\n1 2 3 4 5\n").expect("write");
        assert!(matches!(
            read_table(&path, Some(3)),
            Err(SampleError::ColumnCount { line: 2, expected: 3, found: 5, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Numbers follow C `%1.4e` formatting and round-trip through the reader.
    //
    // Given
    // -----
    // - 1234.5, -0.000012345 and 0.
    //
    // Expect
    // ------
    // - "1.2345e+03", "-1.2345e-05", "0.0000e+00".
    fn format_sci_matches_c_style() {
        assert_eq!(format_sci(1234.5), "1.2345e+03");
        assert_eq!(format_sci(-0.000012345), "-1.2345e-05");
        assert_eq!(format_sci(0.0), "0.0000e+00");
    }
}
