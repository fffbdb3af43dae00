//! Folder scanner for tabular files, plus batch-config CSV generation.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;
use serde::Serialize;

use crate::{
    cli::ScanArgs,
    error::{self, Error},
    table,
};

pub const TABULAR_EXTENSIONS: &[&str] = &["csv", "tsv"];

#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub modified: String,
    pub extension: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResult {
    pub folder: String,
    pub files_found: usize,
    pub total_size_mb: f64,
    pub files: Vec<FileInfo>,
}

/// Scans `folder` for tabular files, newest first.
pub fn scan_folder(folder: &Path, recursive: bool) -> error::Result<ScanResult> {
    if !folder.is_dir() {
        return Err(Error::Validation(format!(
            "folder does not exist: {}",
            folder.display()
        )));
    }

    let mut paths = Vec::new();
    collect_files(folder, recursive, &mut paths)
        .map_err(|err| Error::read(folder, err))?;

    let mut files = Vec::new();
    let mut total_size = 0u64;
    for path in paths {
        let metadata = fs::metadata(&path).map_err(|err| Error::read(&path, err))?;
        let modified = metadata
            .modified()
            .map(|time| DateTime::<Local>::from(time).format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_default();
        total_size += metadata.len();
        files.push(FileInfo {
            name: crate::dataset::file_name(&path),
            path: path.display().to_string(),
            size_bytes: metadata.len(),
            size_mb: to_mb(metadata.len()),
            modified,
            extension: path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| format!(".{ext}"))
                .unwrap_or_default(),
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified));

    Ok(ScanResult {
        folder: folder.display().to_string(),
        files_found: files.len(),
        total_size_mb: to_mb(total_size),
        files,
    })
}

fn collect_files(folder: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, out)?;
            }
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                TABULAR_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);
        if matches {
            out.push(path);
        }
    }
    Ok(())
}

fn to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Writes the batch configuration CSV (`input_file,process`) for the scanned
/// files, every row flagged for processing.
pub fn write_config_csv(files: &[FileInfo], output: &Path) -> error::Result<()> {
    let mut writer = csv::Writer::from_path(output)
        .map_err(|err| Error::persistence(output, err))?;
    writer
        .write_record(["input_file", "process"])
        .map_err(|err| Error::persistence(output, err))?;
    for file in files {
        writer
            .write_record([file.path.as_str(), "true"])
            .map_err(|err| Error::persistence(output, err))?;
    }
    writer.flush().map_err(|err| Error::persistence(output, err))?;
    Ok(())
}

pub fn execute(args: &ScanArgs) -> Result<()> {
    let result = scan_folder(&args.folder, !args.no_recursive)
        .with_context(|| format!("Scanning {:?}", args.folder))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let headers = vec![
            "name".to_string(),
            "size_mb".to_string(),
            "modified".to_string(),
            "path".to_string(),
        ];
        let rows = result
            .files
            .iter()
            .map(|file| {
                vec![
                    file.name.clone(),
                    format!("{:.2}", file.size_mb),
                    file.modified.clone(),
                    file.path.clone(),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(&headers, &rows);
        info!(
            "Found {} file(s) totalling {:.2} MB under {:?}",
            result.files_found, result.total_size_mb, args.folder
        );
    }

    if let Some(config_csv) = &args.config_csv {
        write_config_csv(&result.files, config_csv)?;
        info!("Wrote batch config for {} file(s) to {config_csv:?}", result.files_found);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn touch(path: &Path, contents: &str) {
        let mut file = File::create(path).expect("create file");
        file.write_all(contents.as_bytes()).expect("write file");
    }

    #[test]
    fn scan_finds_only_tabular_extensions() {
        let dir = tempfile::tempdir().expect("temp dir");
        touch(&dir.path().join("a.csv"), "x\n1\n");
        touch(&dir.path().join("b.tsv"), "x\n1\n");
        touch(&dir.path().join("notes.txt"), "hola");

        let result = scan_folder(dir.path(), true).expect("scan");
        assert_eq!(result.files_found, 2);
        let mut names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a.csv", "b.tsv"]);
    }

    #[test]
    fn recursion_is_optional() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir(dir.path().join("sub")).expect("mkdir");
        touch(&dir.path().join("top.csv"), "x\n");
        touch(&dir.path().join("sub").join("nested.csv"), "x\n");

        let flat = scan_folder(dir.path(), false).expect("flat scan");
        assert_eq!(flat.files_found, 1);

        let deep = scan_folder(dir.path(), true).expect("deep scan");
        assert_eq!(deep.files_found, 2);
    }

    #[test]
    fn missing_folder_is_a_validation_error() {
        let err = scan_folder(Path::new("no-such-folder"), true).expect_err("missing");
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn config_csv_lists_every_file_as_processable() {
        let dir = tempfile::tempdir().expect("temp dir");
        touch(&dir.path().join("a.csv"), "x\n");
        let result = scan_folder(dir.path(), false).expect("scan");

        let config = dir.path().join("config.csv");
        write_config_csv(&result.files, &config).expect("write config");

        let contents = fs::read_to_string(&config).expect("read config");
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("input_file,process"));
        let row = lines.next().expect("one row");
        assert!(row.ends_with(",true"));
        assert!(row.contains("a.csv"));
    }
}
