//! Dataset unifier.
//!
//! Merges N source tables into one normalized table: outer union of columns
//! in first-seen order, missing cells filled with the empty marker, optional
//! provenance column, optional exact-row deduplication. Partial-failure
//! tolerant: unreadable sources are skipped, and the operation only fails
//! when nothing at all could be read.

use std::path::PathBuf;

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{
    cli::UnifyArgs,
    dataset::{self, Dataset, ReadOptions},
    error::{self, Error},
    normalize::normalize_key,
};

/// Name of the injected provenance column.
pub const SOURCE_COLUMN: &str = "archivo_origen";

#[derive(Debug, Clone, Copy)]
pub struct UnifyOptions {
    pub remove_duplicates: bool,
    pub add_source_column: bool,
}

impl Default for UnifyOptions {
    fn default() -> Self {
        Self {
            remove_duplicates: false,
            add_source_column: true,
        }
    }
}

/// Merged table plus the counts callers report.
#[derive(Debug)]
pub struct Unified {
    pub dataset: Dataset,
    pub files_processed: usize,
    pub duplicates_removed: usize,
}

#[derive(Debug, Serialize)]
pub struct UnifySummary {
    pub output_file: String,
    pub total_rows: usize,
    pub total_columns: usize,
    pub files_processed: usize,
    pub duplicates_removed: usize,
    pub columns: Vec<String>,
}

/// Loads every path, skipping unreadable files, then merges the survivors.
/// `files_processed` counts the paths supplied, not only the successes.
pub fn unify_files(
    paths: &[PathBuf],
    read_options: &ReadOptions,
    options: &UnifyOptions,
) -> error::Result<Unified> {
    let mut loaded = Vec::new();
    for path in paths {
        match Dataset::read(path, read_options) {
            Ok(dataset) => loaded.push(dataset),
            Err(err) => {
                warn!("Skipping {path:?}: {err}");
                continue;
            }
        }
    }
    merge(loaded, paths.len(), options)
}

/// Merges already-loaded datasets in input order.
///
/// When the provenance column is injected alongside deduplication, two
/// otherwise-identical rows from different sources keep both copies: the
/// injected column differs, so they are not duplicates. That interplay is
/// intended.
pub fn merge(
    datasets: Vec<Dataset>,
    files_processed: usize,
    options: &UnifyOptions,
) -> error::Result<Unified> {
    if datasets.is_empty() {
        return Err(Error::NoReadableSources);
    }

    let mut datasets = datasets;
    if options.add_source_column {
        for dataset in &mut datasets {
            let label = dataset.source.clone();
            dataset.columns.push(SOURCE_COLUMN.to_string());
            for row in &mut dataset.rows {
                row.push(label.clone());
            }
        }
    }

    // Outer union of raw column names, first-seen order.
    let mut union: Vec<String> = Vec::new();
    for dataset in &datasets {
        for column in &dataset.columns {
            if !union.contains(column) {
                union.push(column.clone());
            }
        }
    }

    let mut rows = Vec::new();
    for dataset in &datasets {
        let targets: Vec<usize> = dataset
            .columns
            .iter()
            .map(|column| union.iter().position(|u| u == column).expect("union member"))
            .collect();
        for row in &dataset.rows {
            let mut merged = vec![String::new(); union.len()];
            for (value, &target) in row.iter().zip(targets.iter()) {
                merged[target] = value.clone();
            }
            rows.push(merged);
        }
    }

    // Canonical normalization applies to the merged schema, after the union.
    let columns: Vec<String> = union.iter().map(|column| normalize_key(column)).collect();

    let duplicates_removed = if options.remove_duplicates {
        let before = rows.len();
        rows = rows.into_iter().unique().collect();
        before - rows.len()
    } else {
        0
    };

    Ok(Unified {
        dataset: Dataset::new("unificado", columns, rows),
        files_processed,
        duplicates_removed,
    })
}

pub fn execute(args: &UnifyArgs) -> Result<()> {
    let read_options = ReadOptions::new(args.delimiter, args.input_encoding.as_deref())?;
    let options = UnifyOptions {
        remove_duplicates: args.remove_duplicates,
        add_source_column: !args.no_source_column,
    };
    let unified = unify_files(&args.inputs, &read_options, &options)
        .with_context(|| format!("Unifying {} input file(s)", args.inputs.len()))?;

    let delimiter = dataset::resolve_input_delimiter(&args.output, None);
    unified.dataset.write_csv(&args.output, delimiter)?;

    let summary = UnifySummary {
        output_file: args.output.display().to_string(),
        total_rows: unified.dataset.row_count(),
        total_columns: unified.dataset.column_count(),
        files_processed: unified.files_processed,
        duplicates_removed: unified.duplicates_removed,
        columns: unified.dataset.columns.clone(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!(
            "Unified {} file(s) into {:?}: {} row(s), {} column(s), {} duplicate(s) removed",
            summary.files_processed,
            args.output,
            summary.total_rows,
            summary.total_columns,
            summary.duplicates_removed
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(source: &str, columns: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::new(
            source,
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
    }

    fn plain_options() -> UnifyOptions {
        UnifyOptions {
            remove_duplicates: false,
            add_source_column: false,
        }
    }

    #[test]
    fn merge_unions_columns_in_first_seen_order() {
        let a = dataset("a.csv", &["ID", "Nombre"], &[&["1", "Ana"]]);
        let b = dataset("b.csv", &["ID", "Email"], &[&["2", "luis@x.com"]]);
        let unified = merge(vec![a, b], 2, &plain_options()).expect("merge");

        assert_eq!(unified.dataset.columns, vec!["id", "nombre", "email"]);
        assert_eq!(
            unified.dataset.rows,
            vec![
                vec!["1".to_string(), "Ana".to_string(), String::new()],
                vec!["2".to_string(), String::new(), "luis@x.com".to_string()],
            ]
        );
    }

    #[test]
    fn merge_preserves_row_order_across_sources() {
        let a = dataset("a.csv", &["v"], &[&["1"], &["2"]]);
        let b = dataset("b.csv", &["v"], &[&["3"]]);
        let unified = merge(vec![a, b], 2, &plain_options()).expect("merge");
        let values: Vec<&str> = unified.dataset.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(values, vec!["1", "2", "3"]);
    }

    #[test]
    fn source_column_carries_the_file_label() {
        let a = dataset("a.csv", &["v"], &[&["1"]]);
        let options = UnifyOptions {
            remove_duplicates: false,
            add_source_column: true,
        };
        let unified = merge(vec![a], 1, &options).expect("merge");
        assert_eq!(unified.dataset.columns, vec!["v", SOURCE_COLUMN]);
        assert_eq!(unified.dataset.rows[0], vec!["1".to_string(), "a.csv".to_string()]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let a = dataset("a.csv", &["v"], &[&["1"], &["1"], &["2"]]);
        let options = UnifyOptions {
            remove_duplicates: true,
            add_source_column: false,
        };
        let unified = merge(vec![a], 1, &options).expect("merge");
        assert_eq!(unified.duplicates_removed, 1);
        let values: Vec<&str> = unified.dataset.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(values, vec!["1", "2"]);
    }

    #[test]
    fn source_column_defeats_cross_file_dedup() {
        let a = dataset("a.csv", &["v"], &[&["1"]]);
        let b = dataset("b.csv", &["v"], &[&["1"]]);
        let options = UnifyOptions {
            remove_duplicates: true,
            add_source_column: true,
        };
        let unified = merge(vec![a.clone(), b.clone()], 2, &options).expect("merge");
        assert_eq!(unified.duplicates_removed, 0);
        assert_eq!(unified.dataset.row_count(), 2);

        let without_source = UnifyOptions {
            remove_duplicates: true,
            add_source_column: false,
        };
        let unified = merge(vec![a, b], 2, &without_source).expect("merge");
        assert_eq!(unified.duplicates_removed, 1);
        assert_eq!(unified.dataset.row_count(), 1);
    }

    #[test]
    fn empty_input_set_is_a_no_readable_sources_error() {
        let err = merge(Vec::new(), 3, &plain_options()).expect_err("empty");
        assert!(matches!(err, Error::NoReadableSources));
    }

    #[test]
    fn files_processed_counts_supplied_paths() {
        let a = dataset("a.csv", &["v"], &[&["1"]]);
        let unified = merge(vec![a], 3, &plain_options()).expect("merge");
        assert_eq!(unified.files_processed, 3);
    }
}
