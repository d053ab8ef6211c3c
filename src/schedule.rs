//! Schedule derivation: the pure mapping from a reconstructed table to Gantt
//! tasks, applied identically on initial extraction and after every manual
//! edit.

use crate::mapping::{ColumnMap, Field};
use crate::table::{Cell, Table};
use chrono::{Duration, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Assumed throughput when estimating progress from a piece count.
pub const PIECES_PER_HOUR: f64 = 100.0;
pub const WORK_HOURS_PER_DAY: f64 = 8.0;
/// Progress used when no quantity/worker columns are usable.
pub const DEFAULT_PROGRESS: f64 = 50.0;

const DATE_FORMATS: [&str; 2] = ["%Y/%m/%d", "%Y-%m-%d"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// 1-based position of the source row.
    pub id: String,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Always within [0, 100].
    pub progress: f64,
    /// Present for the chart consumer, never populated.
    pub dependencies: String,
}

impl Task {
    /// Chart span in whole days, never shorter than one.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days().max(1)
    }
}

fn date_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}[/-]\d{1,2}[/-]\d{1,2}").expect("date token pattern"))
}

fn find_date_token(cell: &Cell) -> Option<String> {
    let text = cell.to_string();
    date_token_re().find(&text).map(|m| m.as_str().to_string())
}

fn parse_date(token: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
}

/// First non-empty cell of a row among the given columns.
fn first_value<'a>(row: &'a [Cell], cols: &[usize]) -> Option<&'a Cell> {
    cols.iter()
        .filter_map(|&c| row.get(c))
        .find(|cell| !cell.is_empty())
}

/// Numeric reading of a cell; text cells contribute their leading numeric
/// prefix so unit suffixes like 人 are stripped.
fn numeric_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => {
            let prefix: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            prefix.parse().ok()
        }
        Cell::Null => None,
    }
}

/// Derive the full task list from a table. Rows missing the required field
/// or a findable start/end date pair are dropped; everything else degrades
/// to defaults instead of failing.
pub fn derive_tasks(table: &Table, map: &ColumnMap) -> Vec<Task> {
    let fields = map.classify_headers(&table.headers);
    let columns_of = |field: Field| -> Vec<usize> {
        fields
            .iter()
            .enumerate()
            .filter(|(_, f)| **f == Some(field))
            .map(|(i, _)| i)
            .collect()
    };

    let name_cols = columns_of(Field::Name);
    let start_cols = columns_of(Field::Start);
    let end_cols = columns_of(Field::End);
    let quantity_cols = columns_of(Field::Quantity);
    let worker_cols = columns_of(Field::Workers);
    let progress_cols = columns_of(Field::Progress);
    let required_cols = columns_of(map.required);

    let mut tasks = Vec::new();
    for (index, row) in table.rows.iter().enumerate() {
        // A row without its required field never becomes a task.
        if !required_cols
            .iter()
            .any(|&c| row.get(c).is_some_and(|cell| !cell.is_empty()))
        {
            continue;
        }

        let name = first_value(row, &name_cols)
            .map(|cell| cell.to_string())
            .unwrap_or_else(|| format!("Task {}", index + 1));

        let mut start_token = first_value(row, &start_cols).and_then(find_date_token);
        let mut end_token = first_value(row, &end_cols).and_then(find_date_token);

        if start_token.is_none() || end_token.is_none() {
            // Scan the remaining columns in header order for date-like
            // tokens; the first matches fill whichever ends are missing.
            let mut scans = row
                .iter()
                .enumerate()
                .filter(|(c, _)| !start_cols.contains(c) && !end_cols.contains(c))
                .filter_map(|(_, cell)| find_date_token(cell));
            if start_token.is_none() {
                start_token = scans.next();
            }
            if end_token.is_none() {
                end_token = scans.next();
            }
        }

        let (Some(start_token), Some(end_token)) = (start_token, end_token) else {
            continue;
        };

        let today = Local::now().date_naive();
        let start = parse_date(&start_token).unwrap_or(today);
        let end = parse_date(&end_token).unwrap_or_else(|| start + Duration::days(1));
        let span_days = (end - start).num_days().max(1) as f64;

        let progress = if let Some(p) = first_value(row, &progress_cols).and_then(numeric_value) {
            p.clamp(0.0, 100.0)
        } else {
            let quantity = first_value(row, &quantity_cols).and_then(numeric_value);
            let workers = first_value(row, &worker_cols).and_then(numeric_value);
            match (quantity, workers) {
                (Some(quantity), Some(workers)) if workers > 0.0 => {
                    let hours = quantity / PIECES_PER_HOUR / workers;
                    let duration_days = hours / WORK_HOURS_PER_DAY;
                    (duration_days / span_days * 100.0).clamp(0.0, 100.0)
                }
                _ => DEFAULT_PROGRESS,
            }
        };

        tasks.push(Task {
            id: (index + 1).to_string(),
            name,
            start,
            end,
            progress,
            dependencies: String::new(),
        });
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn recognized_schedule_line_becomes_one_task() {
        let table = Table::reconstruct("マテハン 開始 終了\nA 2025/01/01 2025/01/03");
        let tasks = derive_tasks(&table, &ColumnMap::default());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "1");
        assert_eq!(tasks[0].name, "A");
        assert_eq!(tasks[0].start, date(2025, 1, 1));
        assert_eq!(tasks[0].end, date(2025, 1, 3));
        assert!(tasks[0].dependencies.is_empty());
    }

    #[test]
    fn rows_without_the_required_field_never_produce_tasks() {
        let table = Table {
            headers: vec!["マテハン".into(), "開始".into(), "終了".into()],
            rows: vec![vec![
                Cell::Null,
                Cell::Text("2025/01/01".into()),
                Cell::Text("2025/01/03".into()),
            ]],
        };
        assert!(derive_tasks(&table, &ColumnMap::default()).is_empty());
    }

    #[test]
    fn rows_without_a_date_pair_are_dropped() {
        let table = Table::reconstruct("マテハン 開始 終了\nA 2025/01/01 未定");
        assert!(derive_tasks(&table, &ColumnMap::default()).is_empty());
    }

    #[test]
    fn unmapped_date_columns_are_found_by_scanning() {
        let table = Table::reconstruct("マテハン 期間A 期間B\nA 2025/02/01 2025/02/05");
        let tasks = derive_tasks(&table, &ColumnMap::default());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].start, date(2025, 2, 1));
        assert_eq!(tasks[0].end, date(2025, 2, 5));
    }

    #[test]
    fn unparseable_date_tokens_fall_back_to_defaults() {
        let table = Table::reconstruct("マテハン 開始 終了\nA 2025/13/45 2025/13/45");
        let tasks = derive_tasks(&table, &ColumnMap::default());
        assert_eq!(tasks.len(), 1);
        let today = Local::now().date_naive();
        assert_eq!(tasks[0].start, today);
        assert_eq!(tasks[0].end, today + Duration::days(1));
    }

    #[test]
    fn progress_comes_from_quantity_and_workers() {
        // 2400 pieces / 100 per hour / 2 workers = 12 h = 1.5 days of work
        // over a 3 day span.
        let table =
            Table::reconstruct("マテハン 開始 終了 数量 人数\nA 2025/01/01 2025/01/04 2400 2人");
        let tasks = derive_tasks(&table, &ColumnMap::default());
        assert_eq!(tasks[0].progress, 50.0);
    }

    #[test]
    fn progress_is_clamped_to_a_percentage() {
        let table =
            Table::reconstruct("マテハン 開始 終了 数量 人数\nA 2025/01/01 2025/01/02 999999 1人");
        let tasks = derive_tasks(&table, &ColumnMap::default());
        assert_eq!(tasks[0].progress, 100.0);
    }

    #[test]
    fn explicit_progress_column_wins() {
        let table = Table::reconstruct(
            "マテハン 開始 終了 数量 人数 進捗\nA 2025/01/01 2025/01/04 2400 2人 75",
        );
        let tasks = derive_tasks(&table, &ColumnMap::default());
        assert_eq!(tasks[0].progress, 75.0);
    }

    #[test]
    fn missing_numeric_fields_use_the_default_progress() {
        let table = Table::reconstruct("マテハン 開始 終了\nA 2025/01/01 2025/01/03");
        let tasks = derive_tasks(&table, &ColumnMap::default());
        assert_eq!(tasks[0].progress, DEFAULT_PROGRESS);
    }

    #[test]
    fn derivation_is_a_pure_function_of_the_table() {
        let table = Table::reconstruct(
            "マテハン 開始 終了\nA 2025/01/01 2025/01/03\nB 2025/01/02 2025/01/06",
        );
        let map = ColumnMap::default();
        assert_eq!(derive_tasks(&table, &map), derive_tasks(&table, &map));
    }

    #[test]
    fn task_ids_track_row_positions_across_skips() {
        let text = "マテハン 開始 終了\nA 2025/01/01 2025/01/03\n- x y\nC 2025/01/04 2025/01/06";
        let table = Table::reconstruct(text);
        let tasks = derive_tasks(&table, &ColumnMap::default());
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "1");
        assert_eq!(tasks[1].id, "3");
    }

    #[test]
    fn worker_counts_strip_unit_suffixes() {
        assert_eq!(numeric_value(&Cell::Text("3人".into())), Some(3.0));
        assert_eq!(numeric_value(&Cell::Text("12.5kg".into())), Some(12.5));
        assert_eq!(numeric_value(&Cell::Text("未定".into())), None);
        assert_eq!(numeric_value(&Cell::Null), None);
    }
}
