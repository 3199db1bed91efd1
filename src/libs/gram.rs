//! Precomputed training gram matrices.
//!
//! A matrix file starts with a `row_count col_count` header line; every
//! following non-empty line is one whitespace-separated matrix row.

use crate::libs::error::{LocError, Result};
use nalgebra::DMatrix;
use std::io::BufRead;

/// Self-similarity of every training item, indexed `0..len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingDiagonal {
    values: Vec<i64>,
}

// never empty, the header counts are positive
#[allow(clippy::len_without_is_empty)]
impl TrainingDiagonal {
    pub fn new(values: Vec<i64>) -> Self {
        Self { values }
    }

    /// Read the diagonal of the raw (unnormalized) training matrix.
    ///
    /// ```
    /// let diag = locnuc::libs::gram::TrainingDiagonal::from_path("tests/gram/l2.matrix").unwrap();
    /// assert_eq!(diag.len(), 2);
    /// assert_eq!(diag.get(1), Some(10));
    /// ```
    pub fn from_path(path: &str) -> Result<Self> {
        log::debug!("Reading diagonal values from {}", path);
        let reader = crate::reader(path)?;
        Self::from_reader(reader, path)
    }

    pub fn from_reader<R: BufRead>(reader: R, origin: &str) -> Result<Self> {
        let mut lines = crate::libs::io::content_lines(reader);

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(LocError::format(origin, "empty matrix file")),
        };
        let (row_count, col_count) = parse_header(&header, origin)?;
        if row_count != col_count {
            return Err(LocError::format(
                origin,
                format!("matrix is not square ({} x {})", row_count, col_count),
            ));
        }

        let mut values = Vec::with_capacity(row_count);
        for line in lines.take(row_count) {
            let line = line?;
            let row = values.len();
            let field = line.split_whitespace().nth(row).ok_or_else(|| {
                LocError::format(
                    origin,
                    format!("row {} is too short to hold diagonal position {}/{}", row, row, row),
                )
            })?;
            let value = field.parse::<i64>().map_err(|_| {
                LocError::format(
                    origin,
                    format!("diagonal value `{}` at position {}/{} is not an integer", field, row, row),
                )
            })?;
            values.push(value);
        }

        if values.len() != row_count {
            return Err(LocError::format(
                origin,
                format!("header announces {} rows, found {}", row_count, values.len()),
            ));
        }

        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        self.values.get(index).copied()
    }

    /// `(index, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.values.iter().copied().enumerate()
    }
}

/// Parse a `row_count col_count` header into two positive integers.
pub fn parse_header(line: &str, origin: &str) -> Result<(usize, usize)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(LocError::format(
            origin,
            format!("unable to parse row/column counts from `{}`", line),
        ));
    }
    let parse = |s: &str| {
        s.parse::<usize>().map_err(|_| {
            LocError::format(origin, format!("unable to parse row/column counts from `{}`", line))
        })
    };

    let (rows, cols) = (parse(fields[0])?, parse(fields[1])?);
    if rows == 0 || cols == 0 {
        return Err(LocError::format(
            origin,
            format!("row/column counts must be positive, got `{}`", line),
        ));
    }

    Ok((rows, cols))
}

/// Load a square gram matrix of floats.
///
/// The header dimensions are checked against the body.
pub fn read_gram_matrix(path: &str) -> Result<DMatrix<f64>> {
    let reader = crate::reader(path)?;
    let matrix = gram_from_reader(reader, path)?;
    log::debug!("gram_train shape: {} x {}", matrix.nrows(), matrix.ncols());

    Ok(matrix)
}

pub fn gram_from_reader<R: BufRead>(reader: R, origin: &str) -> Result<DMatrix<f64>> {
    let mut lines = crate::libs::io::content_lines(reader);

    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(LocError::format(origin, "empty matrix file")),
    };
    let (n, m) = parse_header(&header, origin)?;
    if n != m {
        return Err(LocError::format(
            origin,
            format!("matrix is not square ({} x {})", n, m),
        ));
    }

    let mut data: Vec<f64> = Vec::with_capacity(n * n);
    let mut rows = 0;
    for line in lines {
        let line = line?;
        if rows == n {
            return Err(LocError::format(
                origin,
                format!("more than the announced {} rows", n),
            ));
        }
        let mut fields = 0;
        for field in line.split_whitespace() {
            let value = field.parse::<f64>().map_err(|_| {
                LocError::format(origin, format!("row {}: `{}` is not a number", rows, field))
            })?;
            data.push(value);
            fields += 1;
        }
        if fields != n {
            return Err(LocError::format(
                origin,
                format!("row {} has {} columns, expected {}", rows, fields, n),
            ));
        }
        rows += 1;
    }

    if rows != n {
        return Err(LocError::format(
            origin,
            format!("header announces {} rows, found {}", n, rows),
        ));
    }

    Ok(DMatrix::from_row_slice(n, n, &data))
}

/// Headerless rows of floats, as written by `locnuc normalize`.
pub fn read_dense_matrix(path: &str) -> Result<DMatrix<f64>> {
    let reader = crate::reader(path)?;
    dense_from_reader(reader, path)
}

pub fn dense_from_reader<R: BufRead>(reader: R, origin: &str) -> Result<DMatrix<f64>> {
    let mut data: Vec<f64> = vec![];
    let mut cols = None;
    let mut rows = 0;

    for line in crate::libs::io::content_lines(reader) {
        let line = line?;
        let row = line
            .split_whitespace()
            .map(|field| {
                field.parse::<f64>().map_err(|_| {
                    LocError::format(origin, format!("row {}: `{}` is not a number", rows, field))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        match cols {
            None => cols = Some(row.len()),
            Some(n) if n != row.len() => {
                return Err(LocError::format(
                    origin,
                    format!("row {} has {} columns, expected {}", rows, row.len(), n),
                ))
            }
            _ => {}
        }
        data.extend(row);
        rows += 1;
    }

    let cols = cols.ok_or_else(|| LocError::format(origin, "empty matrix file"))?;
    Ok(DMatrix::from_row_slice(rows, cols, &data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_diagonal() {
        let input = "3 3\n5 1 2\n1 7 3\n2 3 9\n";
        let diag = TrainingDiagonal::from_reader(Cursor::new(input), "test").unwrap();
        assert_eq!(diag.len(), 3);
        let pairs: Vec<_> = diag.iter().collect();
        assert_eq!(pairs, vec![(0, 5), (1, 7), (2, 9)]);
    }

    #[test]
    fn test_diagonal_keys_cover_rows() {
        let n = 17;
        let mut input = format!("{} {}\n", n, n);
        for i in 0..n {
            let row: Vec<String> = (0..n)
                .map(|j| if i == j { (100 + i).to_string() } else { "1".to_string() })
                .collect();
            input.push_str(&row.join(" "));
            input.push('\n');
        }
        let diag = TrainingDiagonal::from_reader(Cursor::new(input), "test").unwrap();
        assert_eq!(diag.len(), n);
        for (i, v) in diag.iter() {
            assert_eq!(v, (100 + i) as i64);
        }
        assert_eq!(diag.get(n), None);
    }

    #[test]
    fn test_diagonal_ignores_trailing_lines() {
        let input = "2 2\n10 3\n3 10\n# trailing 1 2\n";
        let diag = TrainingDiagonal::from_reader(Cursor::new(input), "test").unwrap();
        assert_eq!(diag, TrainingDiagonal::new(vec![10, 10]));
    }

    #[test]
    fn test_diagonal_not_square() {
        let input = "2 3\n10 3 1\n3 10 1\n";
        let err = TrainingDiagonal::from_reader(Cursor::new(input), "test").unwrap_err();
        assert!(matches!(err, LocError::Format { .. }));
        assert!(err.to_string().contains("not square"));
    }

    #[test]
    fn test_diagonal_bad_header() {
        let input = "two 2\n10 3\n3 10\n";
        let err = TrainingDiagonal::from_reader(Cursor::new(input), "test").unwrap_err();
        assert!(matches!(err, LocError::Format { .. }));
    }

    #[test]
    fn test_diagonal_non_numeric() {
        let input = "2 2\n10 3\n3 x\n";
        let err = TrainingDiagonal::from_reader(Cursor::new(input), "test").unwrap_err();
        assert!(err.to_string().contains("1/1"));
    }

    #[test]
    fn test_diagonal_short_row() {
        let input = "3 3\n1 2 3\n4\n5 6 7\n";
        let err = TrainingDiagonal::from_reader(Cursor::new(input), "test").unwrap_err();
        assert!(matches!(err, LocError::Format { .. }));
    }

    #[test]
    fn test_diagonal_missing_rows() {
        let input = "3 3\n1 2 3\n4 5 6\n";
        let err = TrainingDiagonal::from_reader(Cursor::new(input), "test").unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_gram_matrix() {
        let input = "2 2\n1.0 0.3\n0.3 1.0\n";
        let gram = gram_from_reader(Cursor::new(input), "test").unwrap();
        assert_eq!(gram.nrows(), 2);
        assert_eq!(gram[(0, 1)], 0.3);
        assert_eq!(gram[(1, 1)], 1.0);
    }

    #[test]
    fn test_gram_matrix_ragged() {
        let input = "2 2\n1.0 0.3\n0.3\n";
        let err = gram_from_reader(Cursor::new(input), "test").unwrap_err();
        assert!(err.to_string().contains("row 1 has 1 columns"));
    }

    #[test]
    fn test_dense_matrix() {
        let m = dense_from_reader(Cursor::new("0.4\t0.2\n\n0.1 0.9\n"), "test").unwrap();
        assert_eq!((m.nrows(), m.ncols()), (2, 2));
        assert_eq!(m[(1, 0)], 0.1);
        assert!(dense_from_reader(Cursor::new("0.4 0.2\n0.1\n"), "test").is_err());
        assert!(dense_from_reader(Cursor::new(""), "test").is_err());
    }
}
