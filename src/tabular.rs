//! Normalization of pasted text and scraped tables into [`TabularData`].
//!
//! Pasted text is split line by line. The delimiter is chosen from the first
//! line: comma when it contains a comma and no tab, otherwise tab. The
//! default [`ParseMode::Legacy`] tokenizer splits naively on the delimiter, so
//! a cell that contains the delimiter shifts the columns of its row.
//! [`ParseMode::Quoted`] runs the same heuristic through the `csv` tokenizer
//! and honours quoted fields.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

pub const COMMA: u8 = b',';
pub const TAB: u8 = b'\t';

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularData {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Returns the cell at `(row, column)`, or `""` for cells a ragged row lacks.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Pads or truncates every row to the header width.
    pub fn normalized(mut self) -> Self {
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ParseMode {
    #[default]
    Legacy,
    Quoted,
}

/// One table as returned by the external page scraper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCandidate {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

pub fn parse(raw_text: &str) -> Option<TabularData> {
    let lines = content_lines(raw_text);
    let (&first, rest) = lines.split_first()?;
    let delimiter = detect_delimiter(first) as char;
    let split = |line: &str| line.split(delimiter).map(debracket).collect::<Vec<_>>();
    Some(TabularData {
        headers: split(first),
        rows: rest.iter().map(|&line| split(line)).collect(),
    })
}

pub fn parse_with(raw_text: &str, mode: ParseMode) -> Result<Option<TabularData>, ImportError> {
    match mode {
        ParseMode::Legacy => Ok(parse(raw_text)),
        ParseMode::Quoted => parse_quoted(raw_text),
    }
}

fn parse_quoted(raw_text: &str) -> Result<Option<TabularData>, ImportError> {
    let text = raw_text.trim();
    let Some(first) = content_lines(text).first().copied() else {
        return Ok(None);
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(detect_delimiter(first))
        .double_quote(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        records.push(record.iter().map(debracket).collect::<Vec<_>>());
    }
    let mut records = records.into_iter();
    let Some(headers) = records.next() else {
        return Ok(None);
    };
    Ok(Some(TabularData {
        headers,
        rows: records.collect(),
    }))
}

fn content_lines(raw_text: &str) -> Vec<&str> {
    raw_text
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect()
}

pub fn detect_delimiter(first_line: &str) -> u8 {
    if first_line.contains(',') && !first_line.contains('\t') {
        COMMA
    } else {
        TAB
    }
}

/// Trims a cell and strips a single pair of wrapping square brackets.
pub fn debracket(cell: &str) -> String {
    let trimmed = cell.trim();
    trimmed
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(trimmed)
        .to_string()
}

pub fn from_candidate(candidate: &TableCandidate) -> TabularData {
    TabularData {
        headers: candidate.headers.iter().map(|h| debracket(h)).collect(),
        rows: candidate
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| debracket(cell)).collect())
            .collect(),
    }
}

/// Picks the table to import. A single candidate is selected automatically.
pub fn select_table(
    candidates: &[TableCandidate],
    choice: Option<usize>,
) -> Result<TabularData, ImportError> {
    match (candidates.len(), choice) {
        (0, _) => Err(ImportError::NoTables),
        (count, Some(index)) => candidates
            .get(index)
            .map(from_candidate)
            .ok_or(ImportError::TableIndexOutOfRange { index, count }),
        (1, None) => Ok(from_candidate(&candidates[0])),
        (count, None) => Err(ImportError::AmbiguousTables { count }),
    }
}

pub fn render_delimited(data: &TabularData, delimiter: u8) -> String {
    let separator = (delimiter as char).to_string();
    std::iter::once(&data.headers)
        .chain(data.rows.iter())
        .map(|cells| cells.join(separator.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}
