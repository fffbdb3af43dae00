//! Multi-format exporter: CSV re-delimiting, JSON records, and SQL scripts
//! with per-column type inference.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use heck::ToSnakeCase;
use log::info;
use serde_json::{Map, Value};

use crate::{
    cli::{ExportArgs, ExportFormat},
    dataset::{self, Dataset, ReadOptions},
    error::{self, Error},
};

/// Formats used when the caller requests none. Immutable; callers copy it
/// per invocation.
pub const DEFAULT_FORMATS: &[ExportFormat] = &[ExportFormat::Csv, ExportFormat::Json];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlType {
    Integer,
    Decimal,
    Timestamp,
    Varchar,
}

impl SqlType {
    fn ddl(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Decimal => "DECIMAL(10,2)",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Varchar => "VARCHAR(255)",
        }
    }

    fn quotes_values(&self) -> bool {
        matches!(self, SqlType::Timestamp | SqlType::Varchar)
    }
}

/// Re-writes the dataset as CSV under `output_dir`.
pub fn export_csv(
    dataset: &Dataset,
    output_dir: &Path,
    output_name: Option<&str>,
    delimiter: u8,
) -> error::Result<PathBuf> {
    let stem = Path::new(&dataset.source);
    let name = output_name
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("{}.csv", dataset::file_stem(stem)));
    let path = output_dir.join(name);
    dataset.write_csv(&path, delimiter)?;
    Ok(path)
}

/// Writes the dataset as a JSON array of records; missing cells become null.
pub fn export_json(
    dataset: &Dataset,
    output_dir: &Path,
    output_name: Option<&str>,
) -> error::Result<PathBuf> {
    let stem = Path::new(&dataset.source);
    let name = output_name
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("{}.json", dataset::file_stem(stem)));
    let path = output_dir.join(name);

    let records: Vec<Value> = dataset
        .rows
        .iter()
        .map(|row| {
            let mut record = Map::new();
            for (column, cell) in dataset.columns.iter().zip(row.iter()) {
                let value = if dataset::is_missing(cell) {
                    Value::Null
                } else {
                    Value::String(cell.clone())
                };
                record.insert(column.clone(), value);
            }
            Value::Object(record)
        })
        .collect();

    let contents = serde_json::to_string_pretty(&records)
        .map_err(|err| Error::persistence(&path, err))?;
    std::fs::write(&path, contents).map_err(|err| Error::persistence(&path, err))?;
    Ok(path)
}

/// Generates a SQL script with CREATE TABLE and one INSERT per row. Column
/// types are inferred by candidate elimination over the non-missing cells.
pub fn export_sql(
    dataset: &Dataset,
    table_name: &str,
    output_dir: &Path,
    output_name: Option<&str>,
) -> error::Result<PathBuf> {
    let name = output_name
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("{table_name}.sql"));
    let path = output_dir.join(name);
    let file = File::create(&path).map_err(|err| Error::persistence(&path, err))?;
    let mut out = BufWriter::new(file);

    let types: Vec<SqlType> = (0..dataset.columns.len())
        .map(|idx| infer_sql_type(dataset, idx))
        .collect();

    write_sql_script(&mut out, dataset, table_name, &types)
        .map_err(|err| Error::persistence(&path, err))?;
    Ok(path)
}

fn write_sql_script(
    out: &mut impl Write,
    dataset: &Dataset,
    table_name: &str,
    types: &[SqlType],
) -> std::io::Result<()> {
    writeln!(out, "-- Tabla: {table_name}")?;
    writeln!(out, "CREATE TABLE IF NOT EXISTS {table_name} (")?;
    let columns = dataset
        .columns
        .iter()
        .zip(types.iter())
        .map(|(column, sql_type)| format!("    {column} {}", sql_type.ddl()))
        .collect::<Vec<_>>();
    writeln!(out, "{}", columns.join(",\n"))?;
    writeln!(out, ");")?;
    writeln!(out)?;
    writeln!(out, "-- Inserts para {table_name}")?;
    for row in &dataset.rows {
        let values = row
            .iter()
            .zip(types.iter())
            .map(|(cell, sql_type)| render_sql_value(cell, *sql_type))
            .collect::<Vec<_>>();
        writeln!(out, "INSERT INTO {table_name} VALUES ({});", values.join(", "))?;
    }
    out.flush()
}

fn render_sql_value(cell: &str, sql_type: SqlType) -> String {
    if dataset::is_missing(cell) {
        return "NULL".to_string();
    }
    if sql_type.quotes_values() {
        format!("'{}'", cell.replace('\'', "''"))
    } else {
        cell.trim().to_string()
    }
}

struct TypeCandidate {
    possible_integer: bool,
    possible_float: bool,
    possible_timestamp: bool,
    seen_values: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            possible_integer: true,
            possible_float: true,
            possible_timestamp: true,
            seen_values: false,
        }
    }

    fn decide(&self) -> SqlType {
        if !self.seen_values {
            SqlType::Varchar
        } else if self.possible_integer {
            SqlType::Integer
        } else if self.possible_float {
            SqlType::Decimal
        } else if self.possible_timestamp {
            SqlType::Timestamp
        } else {
            SqlType::Varchar
        }
    }
}

fn infer_sql_type(dataset: &Dataset, index: usize) -> SqlType {
    let mut candidate = TypeCandidate::new();
    for row in &dataset.rows {
        let Some(cell) = row.get(index) else { continue };
        if dataset::is_missing(cell) {
            continue;
        }
        let value = cell.trim();
        candidate.seen_values = true;
        if candidate.possible_integer && value.parse::<i64>().is_err() {
            candidate.possible_integer = false;
        }
        if candidate.possible_float && value.parse::<f64>().is_err() {
            candidate.possible_float = false;
        }
        if candidate.possible_timestamp && !parses_as_timestamp(value) {
            candidate.possible_timestamp = false;
        }
    }
    candidate.decide()
}

fn parses_as_timestamp(value: &str) -> bool {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

/// Runs the requested exports, recording each outcome. A format that fails
/// contributes an `<fmt>_error` entry instead of aborting the others.
pub fn export_multiple(
    dataset: &Dataset,
    formats: &[ExportFormat],
    table_name: &str,
    output_dir: &Path,
    output_name: Option<&str>,
    csv_delimiter: u8,
) -> BTreeMap<String, String> {
    let mut results = BTreeMap::new();
    // An explicit output name only applies to a single-format export.
    let chosen_name = if formats.len() == 1 { output_name } else { None };

    for format in formats {
        let outcome = match format {
            ExportFormat::Csv => export_csv(dataset, output_dir, chosen_name, csv_delimiter),
            ExportFormat::Json => export_json(dataset, output_dir, chosen_name),
            ExportFormat::Sql => export_sql(dataset, table_name, output_dir, chosen_name),
        };
        let key = format.as_str();
        match outcome {
            Ok(path) => {
                results.insert(key.to_string(), path.display().to_string());
            }
            Err(err) => {
                results.insert(format!("{key}_error"), err.to_string());
            }
        }
    }
    results
}

pub fn execute(args: &ExportArgs) -> Result<()> {
    let options = ReadOptions::new(args.delimiter, args.input_encoding.as_deref())?;
    let dataset = Dataset::read(&args.input, &options)?;

    let formats: Vec<ExportFormat> = if args.formats.is_empty() {
        DEFAULT_FORMATS.to_vec()
    } else {
        args.formats.clone()
    };
    let table_name = args
        .table_name
        .clone()
        .unwrap_or_else(|| dataset::file_stem(&args.input).to_snake_case());

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Creating output directory {:?}", args.output_dir))?;

    let results = export_multiple(
        &dataset,
        &formats,
        &table_name,
        &args.output_dir,
        args.output_name.as_deref(),
        args.output_delimiter.unwrap_or(dataset::DEFAULT_CSV_DELIMITER),
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (key, value) in &results {
            println!("{key}: {value}");
        }
    }

    if results.keys().any(|key| key.ends_with("_error")) {
        anyhow::bail!("one or more export formats failed");
    }
    info!("Exported {:?} to {} format(s)", args.input, formats.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::new(
            "ventas.csv",
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn sql_type_inference_eliminates_candidates() {
        let data = dataset(
            &["id", "precio", "alta", "nombre", "vacia"],
            &[
                &["1", "10.50", "2024-01-02", "Ana", ""],
                &["2", "7", "2024-02-03 10:00:00", "O'Brien", ""],
            ],
        );
        assert_eq!(infer_sql_type(&data, 0), SqlType::Integer);
        assert_eq!(infer_sql_type(&data, 1), SqlType::Decimal);
        assert_eq!(infer_sql_type(&data, 2), SqlType::Timestamp);
        assert_eq!(infer_sql_type(&data, 3), SqlType::Varchar);
        assert_eq!(infer_sql_type(&data, 4), SqlType::Varchar);
    }

    #[test]
    fn sql_export_escapes_quotes_and_emits_nulls() {
        let dir = tempfile::tempdir().expect("temp dir");
        let data = dataset(&["id", "nombre"], &[&["1", "O'Brien"], &["2", ""]]);
        let path = export_sql(&data, "ventas", dir.path(), None).expect("export");

        let contents = std::fs::read_to_string(&path).expect("read sql");
        assert!(contents.contains("CREATE TABLE IF NOT EXISTS ventas ("));
        assert!(contents.contains("    id INTEGER"));
        assert!(contents.contains("    nombre VARCHAR(255)"));
        assert!(contents.contains("INSERT INTO ventas VALUES (1, 'O''Brien');"));
        assert!(contents.contains("INSERT INTO ventas VALUES (2, NULL);"));
    }

    #[test]
    fn json_export_turns_missing_cells_into_null() {
        let dir = tempfile::tempdir().expect("temp dir");
        let data = dataset(&["id", "email"], &[&["1", ""]]);
        let path = export_json(&data, dir.path(), None).expect("export");

        let contents = std::fs::read_to_string(&path).expect("read json");
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&contents).expect("parse");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["id"], "1");
        assert!(parsed[0]["email"].is_null());
    }

    #[test]
    fn multiple_export_records_per_format_outcomes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let data = dataset(&["id"], &[&["1"]]);
        let results = export_multiple(
            &data,
            DEFAULT_FORMATS,
            "ventas",
            dir.path(),
            None,
            b',',
        );
        assert!(results.contains_key("csv"));
        assert!(results.contains_key("json"));
        assert!(!results.contains_key("sql"));
        assert!(dir.path().join("ventas.csv").exists());
        assert!(dir.path().join("ventas.json").exists());
    }
}
