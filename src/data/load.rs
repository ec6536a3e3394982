use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{RaceError, RaceResult};

/// Wide input table: one header row, one row per entity, one column per year.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WideTable {
    pub headers: Vec<String>,
    /// Rows padded to `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
    /// Rows dropped because they were malformed.
    pub skipped_rows: usize,
}

impl WideTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Read and parse a comma-delimited table from `path`.
#[tracing::instrument]
pub fn load_table(path: &Path) -> RaceResult<WideTable> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read input table '{}'", path.display()))?;
    let table = parse_table(&bytes).map_err(|e| match e {
        RaceError::Input(msg) => RaceError::input(format!("'{}': {msg}", path.display())),
        other => other,
    })?;
    tracing::info!(
        rows = table.rows.len(),
        columns = table.headers.len(),
        skipped = table.skipped_rows,
        "loaded input table"
    );
    Ok(table)
}

/// Parse a comma-delimited table held in memory.
///
/// Rows with more cells than the header, or that are not valid UTF-8, are skipped. Rows with
/// fewer cells are padded with empty (missing) cells. A quoted field that never terminates makes
/// the whole input unparseable.
pub fn parse_table(bytes: &[u8]) -> RaceResult<WideTable> {
    if let Some(line) = unterminated_quote_line(bytes) {
        return Err(RaceError::input(format!(
            "unterminated quoted field starting on line {line}"
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .quote(b'"')
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| RaceError::input(format!("cannot read header row: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(RaceError::input("missing header row"));
    }

    let mut table = WideTable {
        headers,
        ..WideTable::default()
    };

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => match e.kind() {
                csv::ErrorKind::Utf8 { pos, .. } => {
                    tracing::debug!(line = pos.as_ref().map(|p| p.line()), "skipping non-utf8 row");
                    table.skipped_rows += 1;
                    continue;
                }
                _ => return Err(RaceError::input(format!("cannot parse table: {e}"))),
            },
        };

        if record.len() > table.headers.len() {
            tracing::debug!(
                line = record.position().map(|p| p.line()),
                fields = record.len(),
                expected = table.headers.len(),
                "skipping row with too many fields"
            );
            table.skipped_rows += 1;
            continue;
        }

        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(table.headers.len(), String::new());
        table.rows.push(row);
    }

    Ok(table)
}

/// Line (1-based) where a never-closed quoted field starts, if any.
fn unterminated_quote_line(bytes: &[u8]) -> Option<usize> {
    let mut line = 1usize;
    let mut open_at = None;
    let mut in_quotes = false;
    let mut field_start = true;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quotes {
            if b == b'"' {
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 1;
                } else {
                    in_quotes = false;
                    open_at = None;
                }
            } else if b == b'\n' {
                line += 1;
            }
        } else {
            match b {
                b'"' if field_start => {
                    in_quotes = true;
                    open_at = Some(line);
                }
                b',' | b'\r' => {
                    field_start = true;
                    i += 1;
                    continue;
                }
                b'\n' => {
                    line += 1;
                    field_start = true;
                    i += 1;
                    continue;
                }
                _ => {}
            }
        }
        field_start = false;
        i += 1;
    }

    if in_quotes { open_at } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let t = parse_table(b"Country Name,2000,2001\nGermany,1,2\nJapan,3,4\n").unwrap();
        assert_eq!(t.headers, vec!["Country Name", "2000", "2001"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[1], vec!["Japan", "3", "4"]);
        assert_eq!(t.column_index("2001"), Some(2));
        assert_eq!(t.column_index("1999"), None);
        assert_eq!(t.skipped_rows, 0);
    }

    #[test]
    fn rows_with_too_many_fields_are_skipped() {
        let t = parse_table(b"Country Name,2000\nGermany,1\nBad,1,2,3\nJapan,3\n").unwrap();
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.skipped_rows, 1);
        assert_eq!(t.rows[1][0], "Japan");
    }

    #[test]
    fn short_rows_are_padded() {
        let t = parse_table(b"Country Name,2000,2001\nGermany,1\n").unwrap();
        assert_eq!(t.rows[0], vec!["Germany", "1", ""]);
    }

    #[test]
    fn quoted_fields_with_commas_and_escaped_quotes() {
        let t = parse_table(b"Country Name,2000\n\"Korea, Rep.\",5\n\"The \"\"Big\"\" One\",6\n")
            .unwrap();
        assert_eq!(t.rows[0][0], "Korea, Rep.");
        assert_eq!(t.rows[1][0], "The \"Big\" One");
    }

    #[test]
    fn unterminated_quote_is_an_input_error() {
        let err = parse_table(b"Country Name,2000\nGermany,1\n\"Japan,3\n").unwrap_err();
        assert!(matches!(err, RaceError::Input(_)));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn empty_input_is_an_input_error() {
        assert!(matches!(parse_table(b"").unwrap_err(), RaceError::Input(_)));
    }

    #[test]
    fn quote_scanner_ignores_mid_field_quotes() {
        assert_eq!(unterminated_quote_line(b"a,b\"c\n1,2\n"), None);
        assert_eq!(unterminated_quote_line(b"a,\"b\nc\"\n"), None);
        assert_eq!(unterminated_quote_line(b"a\n\"x\n"), Some(2));
    }

    #[test]
    fn load_table_reports_missing_file() {
        let err = load_table(Path::new("target/definitely/not/here.csv")).unwrap_err();
        assert!(err.to_string().contains("not/here.csv"));
    }
}
