//! In-memory tabular dataset and its file adapter.
//!
//! All tabular file I/O flows through this module:
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Reading**: a whole source table is materialised as one [`Dataset`];
//!   any parse failure is a single [`Error::Read`] for that file.
//! - **Writing**: CSV output uses `QuoteStyle::Always` for round-trip safety.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::anyhow;
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::error::{Error, Result};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// One source table: ordered column list plus rows, tagged with the source
/// file name for provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub source: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Reader configuration shared by every command that loads tabular files.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

impl ReadOptions {
    pub fn new(delimiter: Option<u8>, encoding_label: Option<&str>) -> Result<Self> {
        Ok(Self {
            delimiter,
            encoding: resolve_encoding(encoding_label)?,
        })
    }
}

impl Dataset {
    pub fn new(source: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            source: source.into(),
            columns,
            rows,
        }
    }

    /// Reads a whole CSV/TSV file into memory. Any failure while opening,
    /// parsing, or decoding is reported as a single read error for the file.
    pub fn read(path: &Path, options: &ReadOptions) -> Result<Self> {
        let delimiter = resolve_input_delimiter(path, options.delimiter);
        let file = File::open(path).map_err(|err| Error::read(path, err))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .double_quote(true)
            .flexible(false)
            .from_reader(BufReader::new(file));

        let headers = reader
            .byte_headers()
            .map_err(|err| Error::read(path, err))?
            .clone();
        let columns = decode_record(&headers, options.encoding)
            .map_err(|err| Error::read(path, anyhow_to_box(err)))?;

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record.map_err(|err| Error::read(path, err))?;
            let decoded = decode_record(&record, options.encoding)
                .map_err(|err| Error::read(path, anyhow_to_box(err)))?;
            rows.push(decoded);
        }

        Ok(Self::new(file_name(path), columns, rows))
    }

    /// Writes the dataset as CSV with every field quoted.
    pub fn write_csv(&self, path: &Path, delimiter: u8) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(QuoteStyle::Always)
            .double_quote(true)
            .from_path(path)
            .map_err(|err| Error::persistence(path, err))?;
        writer
            .write_record(self.columns.iter())
            .map_err(|err| Error::persistence(path, err))?;
        for row in &self.rows {
            writer
                .write_record(row.iter())
                .map_err(|err| Error::persistence(path, err))?;
        }
        writer.flush().map_err(|err| Error::persistence(path, err))?;
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of missing cells in the column at `index`.
    pub fn null_count(&self, index: usize) -> usize {
        self.rows
            .iter()
            .filter(|row| row.get(index).map(|cell| is_missing(cell)).unwrap_or(true))
            .count()
    }

    /// Total missing cells across every column.
    pub fn missing_cells(&self) -> usize {
        (0..self.columns.len()).map(|idx| self.null_count(idx)).sum()
    }
}

/// A cell is missing when its trimmed value is empty.
pub fn is_missing(cell: &str) -> bool {
    cell.trim().is_empty()
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| Error::Validation(format!("unknown encoding '{value}'")))
    } else {
        Ok(UTF_8)
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name(path))
}

fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> anyhow::Result<Vec<String>> {
    record
        .iter()
        .map(|field| {
            let (text, _, had_errors) = encoding.decode(field);
            if had_errors {
                Err(anyhow!("failed to decode text as {}", encoding.name()))
            } else {
                Ok(text.into_owned())
            }
        })
        .collect()
}

fn anyhow_to_box(err: anyhow::Error) -> Box<dyn std::error::Error + Send + Sync> {
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("sample.csv");
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write contents");
        (dir, path)
    }

    #[test]
    fn read_materialises_headers_and_rows() {
        let (_dir, path) = write_temp("id,nombre\n1,Ana\n2,Luis\n");
        let dataset = Dataset::read(&path, &ReadOptions::default()).expect("read");
        assert_eq!(dataset.source, "sample.csv");
        assert_eq!(dataset.columns, vec!["id", "nombre"]);
        assert_eq!(dataset.rows.len(), 2);
        assert_eq!(dataset.rows[1], vec!["2", "Luis"]);
    }

    #[test]
    fn read_fails_on_missing_file() {
        let err = Dataset::read(Path::new("does-not-exist.csv"), &ReadOptions::default())
            .expect_err("missing file");
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn read_fails_on_ragged_rows() {
        let (_dir, path) = write_temp("a,b\n1\n");
        let err = Dataset::read(&path, &ReadOptions::default()).expect_err("ragged");
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn null_counts_treat_blank_cells_as_missing() {
        let dataset = Dataset::new(
            "x.csv",
            vec!["a".into(), "b".into()],
            vec![
                vec!["1".into(), " ".into()],
                vec!["".into(), "2".into()],
            ],
        );
        assert_eq!(dataset.null_count(0), 1);
        assert_eq!(dataset.null_count(1), 1);
        assert_eq!(dataset.missing_cells(), 2);
    }

    #[test]
    fn delimiter_resolution_prefers_override_then_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("x.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("x.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("x.tsv"), Some(b';')), b';');
    }
}
