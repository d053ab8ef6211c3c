use serde::{Deserialize, Serialize};
use std::fmt;

/// One reconstructed table value. Tokens that parse as numbers stay numeric,
/// short rows are padded with `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if token.is_empty() {
            Cell::Null
        } else if let Ok(n) = token.parse::<f64>() {
            Cell::Number(n)
        } else {
            Cell::Text(token.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Number(_) => false,
            Cell::Text(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Table reconstructed from recognized text. Rows are aligned positionally
/// with `headers`; header order is the iteration order everywhere. Headers
/// are not deduplicated, lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Split recognized text into a table: the first non-blank line becomes
    /// the headers, every following line is split on whitespace runs and
    /// zipped against them. Missing trailing columns become `Null`, surplus
    /// tokens are dropped. Text with at most one non-blank line yields no
    /// rows.
    pub fn reconstruct(text: &str) -> Self {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let headers: Vec<String> = match lines.next() {
            Some(line) => line.split_whitespace().map(str::to_string).collect(),
            None => return Self::default(),
        };

        let rows = lines
            .map(|line| {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                (0..headers.len())
                    .map(|i| tokens.get(i).map_or(Cell::Null, |t| Cell::parse(t)))
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn get(&self, row: usize, header: &str) -> Option<&Cell> {
        let col = self.column_index(header)?;
        self.rows.get(row)?.get(col)
    }

    /// Replace one cell with a re-parsed value. Out-of-range coordinates are
    /// ignored.
    pub fn set(&mut self, row: usize, col: usize, raw: &str) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = Cell::parse(raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_or_empty_text_yields_no_rows() {
        assert!(Table::reconstruct("").rows.is_empty());
        assert!(Table::reconstruct("A B C").rows.is_empty());
        assert!(Table::reconstruct("\n  \nA B C\n\n").rows.is_empty());
    }

    #[test]
    fn body_lines_zip_against_headers_positionally() {
        let table = Table::reconstruct("A B\nx y");
        assert_eq!(table.headers, vec!["A", "B"]);
        assert_eq!(table.get(0, "A"), Some(&Cell::Text("x".into())));
        assert_eq!(table.get(0, "B"), Some(&Cell::Text("y".into())));
    }

    #[test]
    fn short_rows_pad_missing_headers_with_null() {
        let table = Table::reconstruct("A B C\nx y");
        assert_eq!(table.rows[0][2], Cell::Null);
    }

    #[test]
    fn surplus_tokens_are_dropped() {
        let table = Table::reconstruct("A\nx y z");
        assert_eq!(table.rows[0], vec![Cell::Text("x".into())]);
    }

    #[test]
    fn numeric_tokens_stay_numeric() {
        let table = Table::reconstruct("A B\nfoo 42");
        assert_eq!(table.rows[0][1], Cell::Number(42.0));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let table = Table::reconstruct("A B\n\nx y\n   \nz w");
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn set_reparses_the_replacement_value() {
        let mut table = Table::reconstruct("A B\nx y");
        table.set(0, 1, "12.5");
        assert_eq!(table.rows[0][1], Cell::Number(12.5));
        table.set(0, 1, "");
        assert_eq!(table.rows[0][1], Cell::Null);
    }

    #[test]
    fn duplicate_headers_resolve_to_the_first_column() {
        let table = Table::reconstruct("A A\nx y");
        assert_eq!(table.get(0, "A"), Some(&Cell::Text("x".into())));
    }
}
