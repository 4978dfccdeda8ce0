// Plate extraction: pattern scan over every cell, normalization,
// deduplication and column auto-detection.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};

use crate::error::{ReportError, Result};
use crate::table::{Column, RawTable};

// One to four alphanumerics, followed by any number of whole 1-4 character
// tokens joined by a single space, hyphen or slash. The boundary is ASCII
// only, so a trailing accented letter still ends a token.
static PLATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[A-Z0-9]{1,4}(?:[ /-][A-Z0-9]{1,4}(?-u:\b))*")
        .expect("plate pattern compiles")
});

// Two alphanumerics in a row, either case. Lowercase prose scores too.
static CODE_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[A-Z0-9]{2}").expect("code hint pattern compiles"));

pub fn normalize(candidate: &str) -> String {
    candidate
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

// raw matches, not yet normalized
pub fn candidates(cell: &str) -> impl Iterator<Item = &str> {
    PLATE_PATTERN.find_iter(cell).map(|m| m.as_str())
}

/// Deduplicated plates in ascending ordinal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlateSet {
    plates: Vec<String>,
}

impl PlateSet {
    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.plates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.plates.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for PlateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let unique: BTreeSet<String> = iter
            .into_iter()
            .map(Into::into)
            .filter(|plate| !plate.is_empty())
            .collect();
        Self {
            plates: unique.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PlateSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.plates.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnChoice<'a> {
    Auto,
    Named(&'a str),
}

/// Result of an extraction run: the plates and the column that was
/// treated as primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub plates: PlateSet,
    pub column: Option<String>,
    pub auto_detected: bool,
}

impl Extraction {
    pub fn total(&self) -> usize {
        self.plates.len()
    }
}

pub fn score_column(column: &Column) -> usize {
    column.values().filter(|v| CODE_HINT.is_match(v)).count()
}

/// Highest-scoring column; ties go to the earliest column.
pub fn detect_column(table: &RawTable) -> Option<&Column> {
    detect_index(table).map(|idx| &table.columns()[idx])
}

fn detect_index(table: &RawTable) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (idx, column) in table.columns().iter().enumerate() {
        let score = score_column(column);
        debug!(column = %column.name, score, "Column scored");
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Extract plates from every column of the table.
pub fn extract(table: &RawTable) -> PlateSet {
    table
        .columns()
        .iter()
        .flat_map(|column| column.values())
        .flat_map(candidates)
        .map(normalize)
        .collect()
}

/// Extract plates, scanning the chosen (or detected) column first and then
/// the rest in table order.
#[instrument(skip(table), fields(columns = table.columns().len()))]
pub fn extract_with(table: &RawTable, choice: ColumnChoice<'_>) -> Result<Extraction> {
    let (primary_idx, auto_detected) = match choice {
        ColumnChoice::Named(name) => {
            let idx = table
                .column_index(name)
                .ok_or_else(|| ReportError::ColumnNotFound(name.to_string()))?;
            (Some(idx), false)
        }
        ColumnChoice::Auto => (detect_index(table), true),
    };

    let columns = table.columns();
    let primary = primary_idx.map(|idx| &columns[idx]);
    let ordered = primary.into_iter().chain(
        columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != primary_idx)
            .map(|(_, column)| column),
    );

    let plates: PlateSet = ordered
        .flat_map(|column| column.values())
        .flat_map(candidates)
        .map(normalize)
        .collect();

    let column = primary.map(|c| c.name.clone());
    info!(
        column = column.as_deref().unwrap_or("<none>"),
        auto_detected,
        total = plates.len(),
        "Plates extracted"
    );

    Ok(Extraction {
        plates,
        column,
        auto_detected,
    })
}
