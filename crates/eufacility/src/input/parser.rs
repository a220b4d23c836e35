//! Multi-strategy loader for raw facility sources.
//!
//! A source is tried, in order, as delimited text with the declared encoding and
//! separator, as a spreadsheet workbook, and as compressed delimited text. The
//! first strategy that yields a table wins.

use std::fs;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::Utc;
use encoding_rs::{Encoding, UTF_8};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::source::{DataTable, SourceFormat, SourceMetadata};
use crate::error::{FacilityError, Result};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xd0, 0xcf, 0x11, 0xe0];

/// Options passed to the load step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Declared text encoding label (e.g. `latin1`, `utf-8`). Defaults to UTF-8.
    #[serde(alias = "enc")]
    pub encoding: Option<String>,
    /// Declared separator. Auto-detected when unset.
    #[serde(alias = "sep")]
    pub separator: Option<String>,
    /// Date pattern of the source (chrono `strftime` syntax).
    #[serde(alias = "dtfmt")]
    pub date_format: Option<String>,
    /// Worksheet to read from a workbook (first sheet when unset).
    pub sheet: Option<String>,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
}

impl LoadOptions {
    /// Set the encoding label.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Set the separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }
}

/// A successfully loaded source.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub table: DataTable,
    pub metadata: SourceMetadata,
}

/// Parses raw facility sources.
pub struct Parser {
    options: LoadOptions,
}

impl Parser {
    /// Create a parser with default options.
    pub fn new() -> Self {
        Self {
            options: LoadOptions::default(),
        }
    }

    /// Create a parser with custom options.
    pub fn with_options(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Load a local file.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<LoadedSource> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FacilityError::SourceNotFound(path.display().to_string()));
        }
        let bytes = fs::read(path).map_err(|e| FacilityError::io(path, e))?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut loaded = self.load_bytes(&bytes, &name)?;
        loaded.metadata.path = Some(path.to_path_buf());
        Ok(loaded)
    }

    /// Load from raw bytes, e.g. a fetched remote source.
    pub fn load_bytes(&self, bytes: &[u8], name: &str) -> Result<LoadedSource> {
        let mut failures = Vec::new();

        let attempt = match self.read_delimited(bytes) {
            Ok((table, encoding, sep)) => Some((table, SourceFormat::Delimited, encoding, Some(sep))),
            Err(e) => {
                debug!(source = name, error = %e, "delimited read failed");
                failures.push(format!("delimited: {}", e));
                None
            }
        };

        let attempt = attempt.or_else(|| match self.read_spreadsheet(bytes) {
            Ok(table) => Some((table, SourceFormat::Spreadsheet, "utf-8".to_string(), None)),
            Err(e) => {
                debug!(source = name, error = %e, "spreadsheet read failed");
                failures.push(format!("spreadsheet: {}", e));
                None
            }
        });

        let attempt = attempt.or_else(|| match self.read_compressed(bytes) {
            Ok((table, encoding, sep)) => Some((
                table,
                SourceFormat::CompressedDelimited,
                encoding,
                Some(sep),
            )),
            Err(e) => {
                debug!(source = name, error = %e, "compressed read failed");
                failures.push(format!("compressed: {}", e));
                None
            }
        });

        let Some((table, format, encoding, separator)) = attempt else {
            return Err(FacilityError::SourceLoad {
                source_name: name.to_string(),
                reason: failures.join("; "),
            });
        };

        let metadata = SourceMetadata {
            file: name.to_string(),
            path: None,
            hash: fingerprint(bytes),
            size_bytes: bytes.len() as u64,
            format,
            encoding,
            separator: separator.map(char::from),
            row_count: table.row_count(),
            column_count: table.column_count(),
            loaded_at: Utc::now(),
        };
        Ok(LoadedSource { table, metadata })
    }

    /// Delimited text with the declared encoding and separator.
    fn read_delimited(&self, bytes: &[u8]) -> Result<(DataTable, String, u8)> {
        if [GZIP_MAGIC, ZIP_MAGIC, OLE_MAGIC]
            .iter()
            .any(|magic| bytes.starts_with(magic))
        {
            return Err(FacilityError::UnsupportedFormat(
                "binary content is not delimited text".to_string(),
            ));
        }

        let encoding = self.encoding()?;
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            return Err(FacilityError::UnsupportedFormat(format!(
                "content is not valid {}",
                encoding.name()
            )));
        }

        let delimiter = match self.separator()? {
            Some(d) => d,
            None => detect_delimiter(&text)?,
        };
        let table = self.parse_text(&text, delimiter)?;
        Ok((table, encoding.name().to_lowercase(), delimiter))
    }

    /// Spreadsheet workbooks (xlsx, xls, ods).
    fn read_spreadsheet(&self, bytes: &[u8]) -> Result<DataTable> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| FacilityError::UnsupportedFormat(e.to_string()))?;

        let sheet = match &self.options.sheet {
            Some(sheet) => sheet.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| FacilityError::UnsupportedFormat("workbook has no sheets".into()))?,
        };
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| FacilityError::UnsupportedFormat(e.to_string()))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| FacilityError::UnsupportedFormat("empty worksheet".into()))?
            .iter()
            .map(cell_to_string)
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(FacilityError::UnsupportedFormat("worksheet has no header".into()));
        }

        let limit = self.options.max_rows.unwrap_or(usize::MAX);
        let data = rows
            .take(limit)
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        Ok(DataTable::new(headers, data))
    }

    /// Gzip-compressed delimited text.
    fn read_compressed(&self, bytes: &[u8]) -> Result<(DataTable, String, u8)> {
        if !bytes.starts_with(GZIP_MAGIC) {
            return Err(FacilityError::UnsupportedFormat(
                "no known compression detected".to_string(),
            ));
        }
        let mut decoder = GzDecoder::new(bytes);
        let mut raw = Vec::new();
        decoder
            .read_to_end(&mut raw)
            .map_err(|e| FacilityError::UnsupportedFormat(format!("gzip: {}", e)))?;
        self.read_delimited(&raw)
    }

    fn encoding(&self) -> Result<&'static Encoding> {
        match &self.options.encoding {
            None => Ok(UTF_8),
            Some(label) => Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| FacilityError::Config(format!("unknown encoding '{}'", label))),
        }
    }

    fn separator(&self) -> Result<Option<u8>> {
        let Some(sep) = &self.options.separator else {
            return Ok(None);
        };
        match sep.as_str() {
            "\\t" | "tab" => Ok(Some(b'\t')),
            s if s.len() == 1 && s.is_ascii() => Ok(Some(s.as_bytes()[0])),
            s => Err(FacilityError::Config(format!("unsupported separator '{}'", s))),
        }
    }

    /// Parse decoded text with a known delimiter.
    fn parse_text(&self, text: &str, delimiter: u8) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(FacilityError::UnsupportedFormat("no columns found".to_string()));
        }

        let mut rows = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.options.max_rows {
                if row_idx >= max {
                    break;
                }
            }
            let record = result?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(DataTable::new(headers, rows))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 fingerprint of raw source bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(text: &str) -> Result<u8> {
    let reader = BufReader::new(text.as_bytes());
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(FacilityError::UnsupportedFormat("no lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        // Higher count with consistent lines wins; tab gets a small bonus
        let consistent = counts.iter().all(|&c| c == first_count);
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3\n4,5,6").unwrap(), b',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3").unwrap(), b';');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3").unwrap(), b'\t');
    }

    #[test]
    fn test_load_declared_separator() {
        let parser = Parser::with_options(LoadOptions::default().with_separator(";"));
        let loaded = parser.load_bytes(b"Name;City\nLKH;Graz\n", "AT.csv").unwrap();

        assert_eq!(loaded.table.headers, vec!["Name", "City"]);
        assert_eq!(loaded.table.get(0, 1), Some("Graz"));
        assert_eq!(loaded.metadata.format, SourceFormat::Delimited);
        assert_eq!(loaded.metadata.separator, Some(';'));
        assert!(loaded.metadata.hash.starts_with("sha256:"));
    }

    #[test]
    fn test_load_latin1() {
        // "Krankenhaus Mödling" in latin1
        let mut bytes = b"Name\nKrankenhaus M".to_vec();
        bytes.push(0xf6);
        bytes.extend_from_slice(b"dling\n");

        let parser = Parser::with_options(LoadOptions::default().with_encoding("latin1"));
        let loaded = parser.load_bytes(&bytes, "AT.csv").unwrap();
        assert_eq!(loaded.table.get(0, 0), Some("Krankenhaus Mödling"));

        let strict = Parser::new();
        assert!(strict.load_bytes(&bytes, "AT.csv").is_err());
    }

    #[test]
    fn test_load_gzip_falls_through() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"id,name\n1,Spital\n").unwrap();
        let bytes = encoder.finish().unwrap();

        let loaded = Parser::new().load_bytes(&bytes, "CH.csv.gz").unwrap();
        assert_eq!(loaded.metadata.format, SourceFormat::CompressedDelimited);
        assert_eq!(loaded.table.get(0, 1), Some("Spital"));
    }

    #[test]
    fn test_all_strategies_fail() {
        let bytes = [0x1f, 0x8b, 0x00, 0x01];
        let err = Parser::new().load_bytes(&bytes, "broken.gz").unwrap_err();
        assert!(matches!(err, FacilityError::SourceLoad { .. }));
    }

    #[test]
    fn test_missing_path() {
        let err = Parser::new().load_path("/nonexistent/AT.csv").unwrap_err();
        assert!(matches!(err, FacilityError::SourceNotFound(_)));
    }
}
