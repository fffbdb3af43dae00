//! Pattern-based column classifier.
//!
//! A fixed-order rule table maps raw column headers to semantic field
//! categories. Categories are evaluated top-to-bottom and each category's
//! patterns in declared order; the first pattern that matches wins, so a
//! column never produces more than one suggestion. Precedence depends on
//! declaration order, which is why the table is an ordered slice and not a
//! map.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    cli::DetectArgs,
    dataset::{Dataset, ReadOptions},
    error, profile,
    store::ProfileStore,
    table,
};

/// Closed set of semantic field categories, in match-precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldCategory {
    Cedula,
    Nombre,
    Email,
    Telefono,
    Direccion,
    Fecha,
    Monto,
    Codigo,
    Descripcion,
    Estado,
}

impl FieldCategory {
    pub fn name(&self) -> &'static str {
        match self {
            FieldCategory::Cedula => "cedula",
            FieldCategory::Nombre => "nombre",
            FieldCategory::Email => "email",
            FieldCategory::Telefono => "telefono",
            FieldCategory::Direccion => "direccion",
            FieldCategory::Fecha => "fecha",
            FieldCategory::Monto => "monto",
            FieldCategory::Codigo => "codigo",
            FieldCategory::Descripcion => "descripcion",
            FieldCategory::Estado => "estado",
        }
    }

    /// Canonical data type carried by each category.
    pub fn data_type(&self) -> DataType {
        match self {
            FieldCategory::Email => DataType::Email,
            FieldCategory::Fecha => DataType::Fecha,
            FieldCategory::Monto => DataType::Numero,
            _ => DataType::Texto,
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Texto,
    Email,
    Fecha,
    Numero,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DataType::Texto => "texto",
            DataType::Email => "email",
            DataType::Fecha => "fecha",
            DataType::Numero => "numero",
        };
        f.write_str(label)
    }
}

/// One field-type suggestion for a raw column header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub original_column: String,
    pub suggested_field: FieldCategory,
    pub data_type: DataType,
    pub confidence: f64,
    pub keywords: Vec<String>,
}

const PATTERN_TABLE: &[(FieldCategory, &[&str])] = &[
    (
        FieldCategory::Cedula,
        &[r"c[eé]dula", r"ci\b", r"identificaci[oó]n", r"documento", r"ruc"],
    ),
    (
        FieldCategory::Nombre,
        &[r"nombre", r"apellido", r"raz[oó]n social", r"cliente"],
    ),
    (FieldCategory::Email, &[r"email", r"correo", r"e-mail", r"mail"]),
    (
        FieldCategory::Telefono,
        &[r"tel[eé]fono", r"celular", r"móvil", r"tel\b", r"cel\b"],
    ),
    (
        FieldCategory::Direccion,
        &[r"direcci[oó]n", r"domicilio", r"ubicaci[oó]n"],
    ),
    (FieldCategory::Fecha, &[r"fecha", r"date", r"día"]),
    (
        FieldCategory::Monto,
        &[r"monto", r"valor", r"precio", r"total", r"importe", r"cantidad"],
    ),
    (
        FieldCategory::Codigo,
        &[r"c[oó]digo", r"code", r"id\b", r"num", r"número"],
    ),
    (
        FieldCategory::Descripcion,
        &[r"descripci[oó]n", r"detalle", r"observaci[oó]n", r"nota"],
    ),
    (FieldCategory::Estado, &[r"estado", r"status", r"situaci[oó]n"]),
];

struct Rule {
    category: FieldCategory,
    patterns: Vec<Regex>,
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        PATTERN_TABLE
            .iter()
            .map(|(category, patterns)| Rule {
                category: *category,
                patterns: patterns
                    .iter()
                    .map(|pattern| Regex::new(pattern).expect("rule table pattern"))
                    .collect(),
            })
            .collect()
    })
}

/// Classifies distinct raw column names in first-seen order. Pure; columns
/// that match no category are simply absent from the result.
pub fn classify(columns: &[String]) -> Vec<DetectionResult> {
    let mut seen = HashSet::new();
    let mut detections = Vec::new();

    for column in columns {
        if !seen.insert(column.as_str()) {
            continue;
        }
        let lowered = column.to_lowercase();
        'rules: for rule in rules() {
            for pattern in &rule.patterns {
                if pattern.is_match(&lowered) {
                    detections.push(DetectionResult {
                        original_column: column.clone(),
                        suggested_field: rule.category,
                        data_type: rule.category.data_type(),
                        confidence: confidence(&lowered, pattern),
                        keywords: vec![lowered.clone()],
                    });
                    break 'rules;
                }
            }
        }
    }

    detections
}

/// Confidence of `pattern` against an already-lowercased column name:
/// full-string match 1.0, match anchored at the start 0.9, elsewhere 0.7.
/// The 0.5 fallback is part of the scoring contract but unreachable from
/// [`classify`], which only scores patterns that already matched.
fn confidence(column: &str, pattern: &Regex) -> f64 {
    match pattern.find(column) {
        Some(found) if found.start() == 0 && found.end() == column.len() => 1.0,
        Some(found) if found.start() == 0 => 0.9,
        Some(_) => 0.7,
        None => 0.5,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub file: String,
    pub columns: Vec<String>,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisStats {
    pub total_files: usize,
    pub total_columns: usize,
    pub unique_columns: usize,
    pub files_analyzed: Vec<FileStats>,
}

/// Result of classifying the pooled columns of several source files.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub detected_fields: Vec<DetectionResult>,
    pub statistics: AnalysisStats,
    pub column_frequency: BTreeMap<String, usize>,
}

/// Reads each file, pools every column name, and classifies the pool.
/// Unreadable files are skipped; `total_files` still counts every path
/// supplied. Fails only when no file at all could be read.
pub fn analyze_files(paths: &[PathBuf], options: &ReadOptions) -> error::Result<Analysis> {
    let mut all_columns = Vec::new();
    let mut file_stats = Vec::new();

    for path in paths {
        match Dataset::read(path, options) {
            Ok(dataset) => {
                all_columns.extend(dataset.columns.iter().cloned());
                file_stats.push(FileStats {
                    file: dataset.source.clone(),
                    columns: dataset.columns,
                    rows: dataset.rows.len(),
                });
            }
            Err(err) => {
                warn!("Skipping {path:?}: {err}");
                continue;
            }
        }
    }

    if file_stats.is_empty() {
        return Err(error::Error::NoReadableSources);
    }

    let detected_fields = classify(&all_columns);
    let mut column_frequency = BTreeMap::new();
    for column in &all_columns {
        *column_frequency.entry(column.clone()).or_insert(0) += 1;
    }

    Ok(Analysis {
        detected_fields,
        statistics: AnalysisStats {
            total_files: paths.len(),
            total_columns: all_columns.len(),
            unique_columns: column_frequency.len(),
            files_analyzed: file_stats,
        },
        column_frequency,
    })
}

pub fn execute(args: &DetectArgs) -> Result<()> {
    let options = ReadOptions::new(args.delimiter, args.input_encoding.as_deref())?;
    let analysis = analyze_files(&args.inputs, &options)
        .with_context(|| format!("Analyzing {} input file(s)", args.inputs.len()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_detections(&analysis);
    }

    if let Some(name) = &args.save_profile {
        let built = profile::build_profile(
            &analysis.detected_fields,
            name,
            args.description.as_deref().unwrap_or(""),
        );
        let store = ProfileStore::open(&args.data_dir)?;
        store.put(&built)?;
        info!("Saved profile '{}' with id {}", built.name, built.id);
    }

    Ok(())
}

fn print_detections(analysis: &Analysis) {
    let headers = vec![
        "column".to_string(),
        "field".to_string(),
        "type".to_string(),
        "confidence".to_string(),
    ];
    let rows = analysis
        .detected_fields
        .iter()
        .map(|detection| {
            vec![
                detection.original_column.clone(),
                detection.suggested_field.to_string(),
                detection.data_type.to_string(),
                format!("{:.2}", detection.confidence),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!(
        "Detected {} field(s) across {} file(s), {} unique column(s)",
        analysis.detected_fields.len(),
        analysis.statistics.total_files,
        analysis.statistics.unique_columns
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn classify_is_exclusive_per_column() {
        let detections = classify(&names(&["cédula", "Nombre Cliente", "randomxyz"]));
        assert_eq!(detections.len(), 2);

        let cedula = &detections[0];
        assert_eq!(cedula.original_column, "cédula");
        assert_eq!(cedula.suggested_field, FieldCategory::Cedula);
        assert_eq!(cedula.confidence, 1.0);
        assert_eq!(cedula.keywords, vec!["cédula".to_string()]);

        // "Nombre Cliente" also contains "cliente" but the first matching
        // pattern within the first matching category wins.
        let nombre = &detections[1];
        assert_eq!(nombre.original_column, "Nombre Cliente");
        assert_eq!(nombre.suggested_field, FieldCategory::Nombre);
        assert_eq!(nombre.confidence, 0.9);
    }

    #[test]
    fn classify_is_deterministic() {
        let columns = names(&["Email", "fecha_pago", "Total", "Email"]);
        let first = classify(&columns);
        let second = classify(&columns);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.original_column, b.original_column);
            assert_eq!(a.suggested_field, b.suggested_field);
            assert_eq!(a.confidence, b.confidence);
        }
    }

    #[test]
    fn duplicate_columns_yield_one_detection() {
        let detections = classify(&names(&["email", "email", "EMAIL"]));
        // "EMAIL" is a distinct raw name, so it classifies separately.
        assert_eq!(detections.len(), 2);
        assert!(detections.iter().all(|d| d.suggested_field == FieldCategory::Email));
    }

    #[test]
    fn confidence_orders_full_prefix_substring() {
        let full = classify(&names(&["email"]))[0].confidence;
        let prefix = classify(&names(&["email_contacto"]))[0].confidence;
        let inner = classify(&names(&["dirección de email"]))[0].confidence;
        assert_eq!(full, 1.0);
        assert_eq!(prefix, 0.9);
        assert_eq!(inner, 0.7);
        assert!(full > prefix && prefix > inner);
    }

    #[test]
    fn category_precedence_follows_declared_order() {
        // "fecha de pago" matches both fecha and (via "pago"? no) — use a
        // name matching fecha and monto: "fecha total" → fecha declared first.
        let detections = classify(&names(&["fecha total"]));
        assert_eq!(detections[0].suggested_field, FieldCategory::Fecha);

        // "total" alone falls through to monto.
        let monto = classify(&names(&["total"]));
        assert_eq!(monto[0].suggested_field, FieldCategory::Monto);
        assert_eq!(monto[0].data_type, DataType::Numero);
    }

    #[test]
    fn data_types_follow_category_table() {
        assert_eq!(FieldCategory::Cedula.data_type(), DataType::Texto);
        assert_eq!(FieldCategory::Email.data_type(), DataType::Email);
        assert_eq!(FieldCategory::Fecha.data_type(), DataType::Fecha);
        assert_eq!(FieldCategory::Monto.data_type(), DataType::Numero);
        assert_eq!(FieldCategory::Estado.data_type(), DataType::Texto);
    }

    #[test]
    fn word_boundary_patterns_do_not_overreach() {
        // "ciudad" must not match the `ci\b` cedula pattern.
        let detections = classify(&names(&["ciudad"]));
        assert!(detections.iter().all(|d| d.suggested_field != FieldCategory::Cedula));
    }

    #[test]
    fn unreachable_confidence_fallback_is_point_five() {
        let pattern = Regex::new("telefono").expect("pattern");
        assert_eq!(confidence("sin coincidencia", &pattern), 0.5);
    }
}
