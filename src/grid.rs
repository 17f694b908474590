// WHY: A skip-d hit laid out on a grid d columns wide becomes a vertical line,
// so grid projection is the basic presentation primitive for ELS results

use serde::Serialize;
use std::ops::Range;

use crate::error::{ElsError, Result};
use crate::normalizer::StrippedText;

/// Zero-based grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GridCoord {
    pub row: usize,
    pub col: usize,
}

fn check_columns(columns: usize) -> Result<()> {
    if columns == 0 {
        return Err(ElsError::invalid("columns", "grid width must be at least 1"));
    }
    Ok(())
}

/// Map a buffer position onto a grid `columns` wide
pub fn project(position: usize, columns: usize) -> Result<GridCoord> {
    check_columns(columns)?;
    Ok(GridCoord {
        row: position / columns,
        col: position % columns,
    })
}

/// Inverse of `project`
pub fn position_of(coord: GridCoord, columns: usize) -> Result<usize> {
    check_columns(columns)?;
    if coord.col >= columns {
        return Err(ElsError::invalid(
            "col",
            format!("column {} is outside a grid {columns} wide", coord.col),
        ));
    }
    Ok(coord.row * columns + coord.col)
}

/// Divisors of `n` in ascending order
/// WHY: any divisor of |skip| renders a hit as evenly spaced columns, which is how
/// presentation layers pick alternative grid widths
pub fn divisors(n: usize) -> Vec<usize> {
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut d = 1;
    while d * d <= n {
        if n % d == 0 {
            small.push(d);
            if d != n / d {
                large.push(n / d);
            }
        }
        d += 1;
    }
    small.extend(large.into_iter().rev());
    small
}

/// Text rendering of a window of the letters grid
pub struct GridView<'a> {
    stripped: &'a StrippedText,
    columns: usize,
}

impl<'a> GridView<'a> {
    pub fn new(stripped: &'a StrippedText, columns: usize) -> Result<Self> {
        check_columns(columns)?;
        Ok(Self { stripped, columns })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        self.stripped.len().div_ceil(self.columns)
    }

    /// Rows covering buffer span `[first, last]` plus `margin` rows either side
    pub fn window(&self, first: usize, last: usize, margin: usize) -> Range<usize> {
        let top = (first.min(last) / self.columns).saturating_sub(margin);
        let bottom = (first.max(last) / self.columns + margin + 1).min(self.row_count());
        top..bottom
    }

    /// Render `rows`, bracketing every letter whose buffer index is in `highlight`
    pub fn render(&self, highlight: &[usize], rows: Range<usize>) -> Vec<String> {
        let letters = self.stripped.raw_letters();
        let rows = rows.start.min(self.row_count())..rows.end.min(self.row_count());

        rows.map(|row| {
            let start = row * self.columns;
            let end = (start + self.columns).min(letters.len());
            let mut line = String::with_capacity(self.columns * 3);
            for (pos, &ch) in letters[start..end].iter().enumerate().map(|(i, ch)| (start + i, ch)) {
                if highlight.contains(&pos) {
                    line.push('[');
                    line.push(ch);
                    line.push(']');
                } else {
                    line.push(' ');
                    line.push(ch);
                    line.push(' ');
                }
            }
            line.truncate(line.trim_end().len());
            line
        })
        .collect()
    }
}
