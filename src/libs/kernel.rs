//! Output of the external string-kernel tool and its normalization.
//!
//! The tool prints an optional banner, a `row_count col_count` header and then
//! one row per query protein. Each row holds `col_count` raw similarities
//! against the training items followed by the query's self-similarity.

use crate::libs::error::{LocError, Result};
use crate::libs::gram::TrainingDiagonal;
use nalgebra::DMatrix;
use std::path::{Path, PathBuf};

/// Banner the kernel tool prints before the matrix header.
pub const KERNEL_BANNER: &str = "Read in all data files.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Waiting for the `row_count col_count` line
    Header,
    /// Reading query rows
    Data {
        row_count: usize,
        col_count: usize,
        /// Absolute row number, offset by the training-set size
        row_index: usize,
    },
}

/// Line-driven parser turning a kernel block into a cosine-normalized
/// query x train matrix.
pub struct KernelOutputParser<'a> {
    diagonal: &'a TrainingDiagonal,
    state: ParserState,
    rows: Vec<Vec<f64>>,
}

impl<'a> KernelOutputParser<'a> {
    pub fn new(diagonal: &'a TrainingDiagonal) -> Self {
        Self {
            diagonal,
            state: ParserState::Header,
            rows: vec![],
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn feed_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        match self.state {
            ParserState::Header => {
                if line.starts_with(KERNEL_BANNER) {
                    return Ok(());
                }
                let (row_count, col_count) = parse_dimensions(line)?;
                if col_count != self.diagonal.len() {
                    return Err(LocError::kernel(format!(
                        "kernel output has {} training columns but the training diagonal has {} entries",
                        col_count,
                        self.diagonal.len()
                    )));
                }
                self.state = ParserState::Data {
                    row_count,
                    col_count,
                    row_index: self.diagonal.len(),
                };
            }
            ParserState::Data {
                row_count,
                col_count,
                row_index,
            } => {
                let query_row = row_index - self.diagonal.len();
                if query_row >= row_count {
                    return Err(LocError::kernel(format!(
                        "more than the announced {} query rows",
                        row_count
                    )));
                }
                let row = self.normalize_row(line, col_count, query_row)?;
                self.rows.push(row);
                self.state = ParserState::Data {
                    row_count,
                    col_count,
                    row_index: row_index + 1,
                };
            }
        }

        Ok(())
    }

    fn normalize_row(&self, line: &str, col_count: usize, query_row: usize) -> Result<Vec<f64>> {
        let values = line
            .split_whitespace()
            .map(|f| {
                f.parse::<f64>().map_err(|_| {
                    LocError::kernel(format!("query row {}: `{}` is not a number", query_row, f))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if values.len() != col_count + 1 {
            return Err(LocError::kernel(format!(
                "query row {} has {} fields, expected {} similarities plus the self-hit",
                query_row,
                values.len(),
                col_count
            )));
        }

        let self_hit = values[col_count];
        let mut row = Vec::with_capacity(col_count);
        for (col, raw) in values[..col_count].iter().enumerate() {
            // diagonal.len() == col_count was checked on the header
            let diag = self.diagonal.get(col).unwrap_or_default() as f64;
            let product = diag * self_hit;
            if !(product > 0.0 && product.is_finite()) {
                return Err(LocError::kernel(format!(
                    "query row {}, column {}: cannot normalize with diagonal {} and self-hit {}",
                    query_row, col, diag, self_hit
                )));
            }
            row.push(normalize(*raw, diag, self_hit));
        }

        Ok(row)
    }

    pub fn finish(self) -> Result<DMatrix<f64>> {
        match self.state {
            ParserState::Header => Err(LocError::kernel(
                "kernel output ended before the row/column header",
            )),
            ParserState::Data {
                row_count,
                col_count,
                ..
            } => {
                if self.rows.len() != row_count {
                    return Err(LocError::kernel(format!(
                        "header announces {} query rows, found {}",
                        row_count,
                        self.rows.len()
                    )));
                }
                let flat: Vec<f64> = self.rows.into_iter().flatten().collect();
                Ok(DMatrix::from_row_slice(row_count, col_count, &flat))
            }
        }
    }
}

/// Cosine normalization of one similarity value.
pub fn normalize(raw: f64, diag_train: f64, self_hit: f64) -> f64 {
    raw / (diag_train * self_hit).sqrt()
}

fn parse_dimensions(line: &str) -> Result<(usize, usize)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let bad = || {
        LocError::kernel(format!(
            "unable to parse row/column counts from kernel output line `{}`",
            line
        ))
    };
    if fields.len() != 2 {
        return Err(bad());
    }
    let rows = fields[0].parse::<usize>().map_err(|_| bad())?;
    let cols = fields[1].parse::<usize>().map_err(|_| bad())?;
    if rows == 0 || cols == 0 {
        return Err(bad());
    }

    Ok((rows, cols))
}

/// Normalize a complete kernel block as captured from the tool's stdout.
pub fn normalize_kernel_output(raw: &[u8], diagonal: &TrainingDiagonal) -> Result<DMatrix<f64>> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| LocError::kernel(format!("kernel output is not valid UTF-8: {}", e)))?;

    let mut parser = KernelOutputParser::new(diagonal);
    for line in text.lines() {
        parser.feed_line(line)?;
    }
    let matrix = parser.finish()?;
    log::debug!(
        "Normalized query matrix: {} x {}",
        matrix.nrows(),
        matrix.ncols()
    );

    Ok(matrix)
}

/// Fixed inputs of the string-kernel tool; only the query side and the
/// (k-mer length, substitution score) pair change between calls.
#[derive(Debug, Clone)]
pub struct KernelTool {
    pub exe: PathBuf,
    pub train_ids: PathBuf,
    pub train_input: PathBuf,
    pub amino: PathBuf,
    pub globals: PathBuf,
}

impl KernelTool {
    pub fn args(&self, query_ids: &Path, query_input: &Path, kmer: usize, sub_score: usize) -> Vec<String> {
        vec![
            "-o".to_string(),
            query_ids.display().to_string(),
            "-O".to_string(),
            self.train_ids.display().to_string(),
            "-p".to_string(),
            query_input.display().to_string(),
            "-P".to_string(),
            self.train_input.display().to_string(),
            "-K".to_string(),
            "-L".to_string(),
            kmer.to_string(),
            "-Y".to_string(),
            sub_score.to_string(),
            "-i".to_string(),
            self.amino.display().to_string(),
            "-g".to_string(),
            self.globals.display().to_string(),
        ]
    }

    /// Run the tool and return its stdout.
    pub fn run(&self, query_ids: &Path, query_input: &Path, kmer: usize, sub_score: usize) -> Result<Vec<u8>> {
        let args = self.args(query_ids, query_input, kmer, sub_score);
        log::debug!("{} {}", self.exe.display(), args.join(" "));

        let start = std::time::Instant::now();
        let output = std::process::Command::new(&self.exe).args(&args).output()?;
        if !output.status.success() {
            return Err(LocError::ExternalTool {
                tool: self.exe.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !output.stderr.is_empty() {
            log::debug!("{}", String::from_utf8_lossy(&output.stderr).trim());
        }
        log::info!(
            "String kernel finished for k-mer length {} and substitution score {} in {:.1?}",
            kmer,
            sub_score,
            start.elapsed()
        );

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_formula() {
        assert_eq!(normalize(50.0, 100.0, 100.0), 0.5);
    }

    #[test]
    fn test_parse_with_banner() {
        let diag = TrainingDiagonal::new(vec![10, 10]);
        let out = b"Read in all data files.\n1 2\n4 2 10\n";
        let m = normalize_kernel_output(out, &diag).unwrap();
        assert_eq!(m.shape(), (1, 2));
        assert_relative_eq!(m[(0, 0)], 0.4);
        assert_relative_eq!(m[(0, 1)], 0.2);
    }

    #[test]
    fn test_parse_rows_keep_order() {
        let diag = TrainingDiagonal::new(vec![4, 16, 25]);
        let out = b"2 3\n2 4 5 1\n4 8 10 4\n";
        let m = normalize_kernel_output(out, &diag).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_relative_eq!(m[(0, 0)], 1.0);
        assert_relative_eq!(m[(0, 1)], 1.0);
        assert_relative_eq!(m[(0, 2)], 1.0);
        assert_relative_eq!(m[(1, 0)], 1.0);
        assert_relative_eq!(m[(1, 1)], 1.0);
        assert_relative_eq!(m[(1, 2)], 1.0);

        let out = b"2 3\n1 1 1 1\n2 2 2 4\n";
        let m = normalize_kernel_output(out, &diag).unwrap();
        assert_relative_eq!(m[(0, 0)], 0.5);
        assert_relative_eq!(m[(1, 2)], 0.2);
    }

    #[test]
    fn test_short_row_rejected() {
        let diag = TrainingDiagonal::new(vec![1, 1, 1]);
        let out = b"2 3\n1 2 3 4\n1 2 3\n";
        let err = normalize_kernel_output(out, &diag).unwrap_err();
        assert!(matches!(err, LocError::KernelOutput(_)));
    }

    #[test]
    fn test_state_transitions() {
        let diag = TrainingDiagonal::new(vec![1, 1, 1]);
        let mut parser = KernelOutputParser::new(&diag);
        assert_eq!(parser.state(), ParserState::Header);
        parser.feed_line(KERNEL_BANNER).unwrap();
        assert_eq!(parser.state(), ParserState::Header);
        parser.feed_line("2 3").unwrap();
        assert_eq!(
            parser.state(),
            ParserState::Data {
                row_count: 2,
                col_count: 3,
                row_index: 3
            }
        );
        parser.feed_line("1 1 1 1").unwrap();
        assert_eq!(
            parser.state(),
            ParserState::Data {
                row_count: 2,
                col_count: 3,
                row_index: 4
            }
        );
    }

    #[test]
    fn test_garbage_header() {
        let diag = TrainingDiagonal::new(vec![1]);
        let err = normalize_kernel_output(b"Segmentation fault\n1 1\n1 1\n", &diag).unwrap_err();
        assert!(matches!(err, LocError::KernelOutput(_)));
    }

    #[test]
    fn test_diagonal_length_mismatch() {
        let diag = TrainingDiagonal::new(vec![1, 1]);
        let err = normalize_kernel_output(b"1 3\n1 1 1 1\n", &diag).unwrap_err();
        assert!(err.to_string().contains("training diagonal has 2 entries"));
    }

    #[test]
    fn test_row_count_mismatch() {
        let diag = TrainingDiagonal::new(vec![1]);
        let err = normalize_kernel_output(b"2 1\n1 1\n", &diag).unwrap_err();
        assert!(err.to_string().contains("found 1"));

        let err = normalize_kernel_output(b"1 1\n1 1\n1 1\n", &diag).unwrap_err();
        assert!(err.to_string().contains("more than"));
    }

    #[test]
    fn test_zero_self_hit() {
        let diag = TrainingDiagonal::new(vec![1]);
        let err = normalize_kernel_output(b"1 1\n1 0\n", &diag).unwrap_err();
        assert!(matches!(err, LocError::KernelOutput(_)));
    }

    #[test]
    fn test_empty_output() {
        let diag = TrainingDiagonal::new(vec![1]);
        let err = normalize_kernel_output(b"", &diag).unwrap_err();
        assert!(err.to_string().contains("before the row/column header"));
    }

    #[test]
    fn test_deterministic() {
        let diag = TrainingDiagonal::new(vec![7, 13, 29]);
        let out = b"2 3\n3 5 11 17\n2 9 4 23\n";
        let a = normalize_kernel_output(out, &diag).unwrap();
        let b = normalize_kernel_output(out, &diag).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_tool_args() {
        let tool = KernelTool {
            exe: PathBuf::from("my-string-kernel"),
            train_ids: PathBuf::from("sn_train.idList"),
            train_input: PathBuf::from("sn_train.psiBlastMat"),
            amino: PathBuf::from("Amino.txt"),
            globals: PathBuf::from("sn.globals"),
        };
        let args = tool.args(Path::new("q.lst"), Path::new("q.psiBlastMat"), 4, 7);
        assert_eq!(
            args.join(" "),
            "-o q.lst -O sn_train.idList -p q.psiBlastMat -P sn_train.psiBlastMat -K -L 4 -Y 7 -i Amino.txt -g sn.globals"
        );
    }
}
