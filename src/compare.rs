//! Schema comparator.
//!
//! Measures how well a dataset's columns match a caller-supplied model column
//! list and inspects cell-level data quality. Column names on both sides are
//! folded with `trim + lowercase` only — weaker than the unifier's canonical
//! normalizer, and kept that way so spaced headers still line up (see
//! `normalize`).

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    cli::CompareArgs,
    dataset::{self, Dataset, ReadOptions},
    error,
    normalize::fold,
    store::{ProfileStore, ReportStore},
};

/// Fixed similarity threshold separating `completo` from `incompleto`.
const COMPLETE_THRESHOLD: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Completo,
    Incompleto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTypeIssue {
    pub column: String,
    pub issue: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingData {
    pub total_cells: usize,
    pub missing_cells: usize,
    pub missing_percentage: f64,
}

/// Immutable result of one dataset-vs-model comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub source_file: String,
    pub timestamp: String,
    pub similarity_percentage: f64,
    pub total_model_columns: usize,
    pub total_file_columns: usize,
    pub matching_columns: Vec<String>,
    pub missing_columns: Vec<String>,
    pub extra_columns: Vec<String>,
    pub data_type_issues: Vec<DataTypeIssue>,
    pub missing_data: MissingData,
    pub status: ReportStatus,
}

/// Compares `dataset` against the expected model columns.
///
/// Membership tests are set-like but run over the full lists, so duplicate
/// names on either side produce proportional duplicate entries in
/// `matching_columns`/`extra_columns`.
pub fn compare(dataset: &Dataset, model_columns: &[String]) -> ComparisonReport {
    let model_norm: Vec<String> = model_columns.iter().map(|c| fold(c)).collect();
    let file_norm: Vec<String> = dataset.columns.iter().map(|c| fold(c)).collect();

    let missing_columns: Vec<String> = model_norm
        .iter()
        .filter(|c| !file_norm.contains(c))
        .cloned()
        .collect();
    let extra_columns: Vec<String> = file_norm
        .iter()
        .filter(|c| !model_norm.contains(c))
        .cloned()
        .collect();
    let matching_columns: Vec<String> = file_norm
        .iter()
        .filter(|c| model_norm.contains(c))
        .cloned()
        .collect();

    let similarity = if model_columns.is_empty() {
        0.0
    } else {
        round2(matching_columns.len() as f64 / model_columns.len() as f64 * 100.0)
    };
    let status = if similarity >= COMPLETE_THRESHOLD {
        ReportStatus::Completo
    } else {
        ReportStatus::Incompleto
    };

    let data_type_issues = check_data_types(dataset, &matching_columns);
    let missing_data = check_missing_data(dataset);

    ComparisonReport {
        source_file: dataset.source.clone(),
        timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        similarity_percentage: similarity,
        total_model_columns: model_columns.len(),
        total_file_columns: dataset.columns.len(),
        matching_columns,
        missing_columns,
        extra_columns,
        data_type_issues,
        missing_data,
        status,
    }
}

/// Store key for a report on `path`, embedding the file stem and a
/// second-resolution timestamp.
pub fn report_key(path: &Path) -> String {
    format!(
        "comparison_{}_{}",
        dataset::file_stem(path),
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Null-cell issues for matching columns. A matching (folded) name counts
/// only when it appears verbatim in the dataset header, so headers that fold
/// to the same value but differ in case or padding are passed over.
fn check_data_types(dataset: &Dataset, matching_columns: &[String]) -> Vec<DataTypeIssue> {
    let mut issues = Vec::new();
    for column in matching_columns {
        let Some(index) = dataset.columns.iter().position(|c| c == column) else {
            continue;
        };
        let count = dataset.null_count(index);
        if count > 0 {
            issues.push(DataTypeIssue {
                column: column.clone(),
                issue: "missing_values".to_string(),
                count,
                percentage: round2(count as f64 / dataset.row_count() as f64 * 100.0),
            });
        }
    }
    issues
}

fn check_missing_data(dataset: &Dataset) -> MissingData {
    let total_cells = dataset.row_count() * dataset.column_count();
    let missing_cells = dataset.missing_cells();
    let missing_percentage = if total_cells > 0 {
        round2(missing_cells as f64 / total_cells as f64 * 100.0)
    } else {
        0.0
    };
    MissingData {
        total_cells,
        missing_cells,
        missing_percentage,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn execute(args: &CompareArgs) -> Result<()> {
    let options = ReadOptions::new(args.delimiter, args.input_encoding.as_deref())?;
    let dataset = Dataset::read(&args.input, &options)?;
    let model_columns = load_model_columns(args)?;

    let report = compare(&dataset, &model_columns);
    let key = report_key(&args.input);
    let store = ReportStore::open(&args.data_dir)?;
    store.put(&key, &report)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    info!("Report saved under key '{key}'");
    Ok(())
}

fn load_model_columns(args: &CompareArgs) -> Result<Vec<String>> {
    if let Some(path) = &args.model {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Reading model columns from {path:?}"))?;
        let columns: Vec<String> = serde_yaml::from_str(&contents)
            .with_context(|| format!("Parsing model columns from {path:?}"))?;
        return Ok(columns);
    }
    let id = args
        .profile
        .as_deref()
        .ok_or_else(|| error::Error::Validation("a model file or profile id is required".into()))?;
    let store = ProfileStore::open(&args.data_dir)?;
    let profile = store.get(id)?;
    Ok(profile.fields.into_iter().map(|field| field.name).collect())
}

fn print_report(report: &ComparisonReport) {
    let status = match report.status {
        ReportStatus::Completo => "completo",
        ReportStatus::Incompleto => "incompleto",
    };
    println!("file:       {}", report.source_file);
    println!(
        "similarity: {:.2}% ({status})",
        report.similarity_percentage
    );
    println!(
        "columns:    {} matching, {} missing, {} extra",
        report.matching_columns.len(),
        report.missing_columns.len(),
        report.extra_columns.len()
    );
    if !report.missing_columns.is_empty() {
        println!("missing:    {}", report.missing_columns.join(", "));
    }
    if !report.extra_columns.is_empty() {
        println!("extra:      {}", report.extra_columns.join(", "));
    }
    for issue in &report.data_type_issues {
        println!(
            "issue:      {} has {} missing value(s) ({:.2}%)",
            issue.column, issue.count, issue.percentage
        );
    }
    println!(
        "cells:      {}/{} missing ({:.2}%)",
        report.missing_data.missing_cells,
        report.missing_data.total_cells,
        report.missing_data.missing_percentage
    );
}
