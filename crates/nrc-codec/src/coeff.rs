//! Coefficient table loading.
//!
//! One row per line, cells separated by `,` or `;`, `#` starts a comment
//! line, blank lines skipped. Function families 1..4 take 3 cells per row,
//! family 5 takes 4. The table must have exactly 2^Q rows.

use alloc::format;
use alloc::vec::Vec;

use nrc_core::{Error, Result};

/// Immutable table of per-function coefficient rows. Rows are stored as
/// `[i32; 4]`; three-column families leave the last slot at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoeffTable {
    rows: Vec<[i32; 4]>,
    cols: usize,
}

impl CoeffTable {
    /// Columns required per row for a function family.
    pub fn cols_for(fun_type: u8) -> usize {
        if fun_type == 5 {
            4
        } else {
            3
        }
    }

    pub fn parse(text: &str, fun_type: u8, bits_q: u32) -> Result<Self> {
        let cols = Self::cols_for(fun_type);
        let expected_rows = 1usize << bits_q;
        let mut rows = Vec::with_capacity(expected_rows);

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut row = [0i32; 4];
            let mut count = 0;
            for cell in line.split([',', ';']) {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                let value: i32 = cell.parse().map_err(|_| {
                    Error::InvalidCoefficients(format!(
                        "line {}: not a signed integer: {cell:?}",
                        lineno + 1
                    ))
                })?;
                if count >= cols {
                    return Err(Error::InvalidCoefficients(format!(
                        "line {}: expected {cols} columns",
                        lineno + 1
                    )));
                }
                row[count] = value;
                count += 1;
            }
            if count != cols {
                return Err(Error::InvalidCoefficients(format!(
                    "line {}: expected {cols} columns, got {count}",
                    lineno + 1
                )));
            }
            rows.push(row);
        }

        if rows.len() != expected_rows {
            return Err(Error::InvalidCoefficients(format!(
                "expected {expected_rows} rows for Q={bits_q}, got {}",
                rows.len()
            )));
        }
        Ok(Self { rows, cols })
    }

    #[cfg(feature = "std")]
    pub fn load(path: &std::path::Path, fun_type: u8, bits_q: u32) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidCoefficients(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text, fun_type, bits_q)
    }

    pub fn row(&self, k: usize) -> &[i32; 4] {
        &self.rows[k]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }
}
