//! Tabular input parsing
//!
//! Reads comma-separated text with a header line into a [`RowSet`]. Parsing is
//! lenient: empty lines are skipped, short rows are padded, surplus fields are
//! dropped and undecodable records are skipped. A line with only separators or
//! whitespace is still a row. Only unreadable input or a missing header aborts.

use crate::error::ParseError;
use crate::types::{Row, RowSet};
use std::path::Path;
use std::sync::Arc;

const UTF8_BOM: char = '\u{feff}';

/// Parse CSV text from any reader
pub fn parse_reader<R: std::io::Read>(reader: R) -> Result<RowSet, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(header_error)?
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i == 0 {
                name.trim_start_matches(UTF8_BOM).to_string()
            } else {
                name.to_string()
            }
        })
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParseError::MissingHeader);
    }

    let columns: Arc<[String]> = headers.clone().into();
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line());
                match e.into_kind() {
                    csv::ErrorKind::Io(io) => return Err(ParseError::Io(io)),
                    kind => {
                        tracing::warn!(line = ?line, error = ?kind, "skipping unreadable record");
                        skipped += 1;
                        continue;
                    }
                }
            }
        };

        if record.len() > columns.len() {
            tracing::debug!(
                line = ?record.position().map(|p| p.line()),
                fields = record.len(),
                columns = columns.len(),
                "dropping fields beyond header width"
            );
        }

        let values = record
            .iter()
            .take(columns.len())
            .map(str::to_string)
            .collect();
        rows.push(Row::new(Arc::clone(&columns), values));
    }

    tracing::debug!(
        rows = rows.len(),
        columns = columns.len(),
        skipped,
        "parsed tabular input"
    );

    Ok(RowSet::new(headers, rows))
}

/// Parse CSV text held in memory
pub fn parse_bytes(data: &[u8]) -> Result<RowSet, ParseError> {
    parse_reader(data)
}

/// Parse CSV text from a string
pub fn parse_str(data: &str) -> Result<RowSet, ParseError> {
    parse_reader(data.as_bytes())
}

/// Read and parse a CSV file
///
/// The file name is recorded as the row set's `source_name`.
pub async fn parse_file(path: impl AsRef<Path>) -> Result<RowSet, ParseError> {
    let path = path.as_ref();
    let data = tokio::fs::read(path).await?;
    let rows = parse_bytes(&data)?;

    Ok(match path.file_name() {
        Some(name) => rows.with_source_name(name.to_string_lossy()),
        None => rows,
    })
}

fn header_error(err: csv::Error) -> ParseError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io) => ParseError::Io(io),
        _ => ParseError::Header(message),
    }
}
