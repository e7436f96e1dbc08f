//! Two-column data ingest.
//!
//! This module turns a rheometer export (or hand-typed numbers) into an
//! `Observations` value that is safe to fit.
//!
//! Design goals:
//! - **Tolerant format detection**: comma, semicolon, tab or whitespace
//!   separated columns; up to two leading header lines are skipped
//! - **Strict values**: a non-numeric cell after the header is an error
//!   that names its line, never a silently dropped row
//! - **Separation of concerns**: no fitting logic here

use std::path::Path;

use crate::domain::Observations;
use crate::error::AppError;

/// Leading non-numeric lines tolerated before the data starts.
const MAX_HEADER_LINES: usize = 2;

/// Column separator detected from the first data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
    Whitespace,
}

impl Delimiter {
    fn byte(self) -> Option<u8> {
        match self {
            Delimiter::Comma => Some(b','),
            Delimiter::Semicolon => Some(b';'),
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Whitespace => None,
        }
    }
}

/// Ingest output: validated observations plus what the parser saw.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: Observations,
    pub delimiter: Delimiter,
    pub header_lines: usize,
    pub rows_used: usize,
}

/// Load a two-column numeric file (`.csv`, `.txt`, `.dat`).
pub fn load_observations(path: &Path) -> Result<IngestedData, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to open data file '{}': {e}", path.display())))?;
    parse_table(&text)
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))
}

/// Parse two-column text. Extra columns are ignored.
pub fn parse_table(text: &str) -> Result<IngestedData, AppError> {
    let Some(delimiter) = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(detect_delimiter_and_check)
        .find_map(Result::ok)
    else {
        return Err(AppError::new(2, "No numeric rows found."));
    };

    let rows = read_rows(text, delimiter)?;

    let mut x = Vec::with_capacity(rows.len());
    let mut y = Vec::with_capacity(rows.len());
    let mut header_lines = 0usize;
    for (line, cells) in rows {
        match cells_to_pair(&cells) {
            Ok((a, b)) => {
                x.push(a);
                y.push(b);
            }
            Err(_) if x.is_empty() && header_lines < MAX_HEADER_LINES => header_lines += 1,
            Err(msg) => return Err(AppError::new(2, format!("line {line}: {msg}"))),
        }
    }

    let rows_used = x.len();
    let observations = Observations::new(x, y)?;
    Ok(IngestedData {
        observations,
        delimiter,
        header_lines,
        rows_used,
    })
}

/// Parse whitespace-separated shear rates and responses typed by hand.
pub fn parse_inline(x: &str, y: &str) -> Result<Observations, AppError> {
    let x = parse_numbers(x, "x")?;
    let y = parse_numbers(y, "y")?;
    Ok(Observations::new(x, y)?)
}

/// Parse a list of numbers separated by whitespace and/or commas.
pub fn parse_numbers(text: &str, what: &str) -> Result<Vec<f64>, AppError> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| AppError::new(2, format!("Invalid number '{t}' in {what}.")))
        })
        .collect()
}

pub fn detect_delimiter(line: &str) -> Delimiter {
    if line.contains(';') {
        Delimiter::Semicolon
    } else if line.contains('\t') {
        Delimiter::Tab
    } else if line.contains(',') {
        Delimiter::Comma
    } else {
        Delimiter::Whitespace
    }
}

/// Split the whole text into `(line number, cells)` records, skipping blank
/// and `#` lines. Delimited text goes through one csv reader so quoted cells
/// survive; whitespace tables are split by hand.
fn read_rows(text: &str, delimiter: Delimiter) -> Result<Vec<(usize, Vec<String>)>, AppError> {
    let Some(byte) = delimiter.byte() else {
        return Ok(text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
            .map(|(n, l)| (n, l.split_whitespace().map(str::to_string).collect()))
            .collect());
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .delimiter(byte)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error: {e}")))?;
        if record.iter().all(str::is_empty) || record.get(0).is_some_and(|c| c.starts_with('#')) {
            continue;
        }
        let line = record
            .position()
            .map_or(rows.len() + 1, |p| p.line() as usize);
        rows.push((line, record.iter().map(str::to_string).collect()));
    }
    Ok(rows)
}

/// The delimiter a line implies, if the line reads as a numeric pair under it.
fn detect_delimiter_and_check(line: &str) -> Result<Delimiter, String> {
    let delimiter = detect_delimiter(line);
    let cells: Vec<String> = match delimiter.byte() {
        Some(b) => line.split(b as char).map(|c| c.trim().to_string()).collect(),
        None => line.split_whitespace().map(str::to_string).collect(),
    };
    cells_to_pair(&cells).map(|_| delimiter)
}

fn cells_to_pair(cells: &[String]) -> Result<(f64, f64), String> {
    if cells.len() < 2 {
        return Err(format!("expected two columns, found {}", cells.len()));
    }
    let parse = |s: &str| {
        s.trim_matches('"')
            .parse::<f64>()
            .map_err(|_| format!("'{s}' is not a number"))
    };
    Ok((parse(cells[0].as_str())?, parse(cells[1].as_str())?))
}
