//! Data-driven column mapping: declared header synonyms resolve each table
//! column to a semantic schedule field, so layout quirks live in data
//! instead of conditional chains.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Start,
    End,
    Quantity,
    Workers,
    Progress,
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read mapping file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed mapping file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Header synonyms per semantic field, plus the field a row must carry to
/// produce a task at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub name: Vec<String>,
    pub start: Vec<String>,
    pub end: Vec<String>,
    pub quantity: Vec<String>,
    pub workers: Vec<String>,
    pub progress: Vec<String>,
    pub required: Field,
}

impl Default for ColumnMap {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            name: list(&["マテハン", "作業名", "品名", "工程", "task", "name", "item"]),
            start: list(&["開始", "開始日", "着手", "start", "from"]),
            end: list(&["終了", "終了日", "完了", "end", "to"]),
            quantity: list(&["数量", "個数", "ピース", "qty", "quantity", "pieces"]),
            workers: list(&["人数", "作業者", "workers", "crew"]),
            progress: list(&["進捗", "進捗率", "progress"]),
            required: Field::Name,
        }
    }
}

impl ColumnMap {
    pub fn from_file(path: &Path) -> Result<Self, MappingError> {
        Ok(Self::from_json(&fs::read_to_string(path)?)?)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Resolve a header to its semantic field, ignoring case and surrounding
    /// whitespace. Fields are tried in a fixed order, first match wins.
    pub fn classify(&self, header: &str) -> Option<Field> {
        let header = header.trim().to_lowercase();
        let groups = [
            (&self.name, Field::Name),
            (&self.start, Field::Start),
            (&self.end, Field::End),
            (&self.quantity, Field::Quantity),
            (&self.workers, Field::Workers),
            (&self.progress, Field::Progress),
        ];
        groups
            .iter()
            .find(|(synonyms, _)| synonyms.iter().any(|s| s.to_lowercase() == header))
            .map(|(_, field)| *field)
    }

    pub fn classify_headers(&self, headers: &[String]) -> Vec<Option<Field>> {
        headers.iter().map(|h| self.classify(h)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mapping_classifies_japanese_headers() {
        let map = ColumnMap::default();
        assert_eq!(map.classify("マテハン"), Some(Field::Name));
        assert_eq!(map.classify("開始"), Some(Field::Start));
        assert_eq!(map.classify("終了"), Some(Field::End));
        assert_eq!(map.classify("数量"), Some(Field::Quantity));
        assert_eq!(map.classify("人数"), Some(Field::Workers));
        assert_eq!(map.classify("備考"), None);
    }

    #[test]
    fn classification_ignores_case_and_whitespace() {
        let map = ColumnMap::default();
        assert_eq!(map.classify(" Start "), Some(Field::Start));
        assert_eq!(map.classify("NAME"), Some(Field::Name));
    }

    #[test]
    fn mapping_file_overrides_the_defaults() {
        let json = r#"{ "name": ["工事名"], "start": ["着工"], "end": ["竣工"] }"#;
        let map = ColumnMap::from_json(json).unwrap();
        assert_eq!(map.classify("工事名"), Some(Field::Name));
        assert_eq!(map.classify("着工"), Some(Field::Start));
        assert_eq!(map.classify("竣工"), Some(Field::End));
        assert_eq!(map.classify("マテハン"), None);
        // unspecified fields keep their defaults
        assert_eq!(map.classify("数量"), Some(Field::Quantity));
        assert_eq!(map.required, Field::Name);
    }
}
