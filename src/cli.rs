use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Reconcile heterogeneous CSV datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect semantic field types from the column headers of one or more files
    Detect(DetectArgs),
    /// Compare a file's columns against a model column list or a stored profile
    Compare(CompareArgs),
    /// Merge multiple files into one normalized table with provenance tracking
    Unify(UnifyArgs),
    /// Manage stored field-mapping profiles
    Profile(ProfileArgs),
    /// Scan a folder for tabular files
    Scan(ScanArgs),
    /// Export a file to CSV, JSON, and/or SQL
    Export(ExportArgs),
    /// Generate batch-processing scripts and manage saved batch jobs
    Batch(BatchArgs),
    /// Preview the first few rows of a file in a formatted table
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// One or more input files to analyze
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Emit the full analysis as JSON instead of a table
    #[arg(long)]
    pub json: bool,
    /// Build a profile from the detections and save it under this name
    #[arg(long = "save-profile")]
    pub save_profile: Option<String>,
    /// Description for the saved profile
    #[arg(long)]
    pub description: Option<String>,
    /// Root directory for stored profiles and reports
    #[arg(long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Input file to compare
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML or JSON file holding the expected model column list
    #[arg(long, conflicts_with = "profile", required_unless_present = "profile")]
    pub model: Option<PathBuf>,
    /// Stored profile id whose field names form the model columns
    #[arg(long)]
    pub profile: Option<String>,
    /// Root directory for stored profiles and reports
    #[arg(long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
    /// Emit the comparison report as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct UnifyArgs {
    /// One or more input files to merge
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Destination file for the unified table
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Drop exact full-row duplicates, keeping the first occurrence
    #[arg(long = "remove-duplicates")]
    pub remove_duplicates: bool,
    /// Skip injecting the provenance column
    #[arg(long = "no-source-column")]
    pub no_source_column: bool,
    /// Emit the unification summary as JSON
    #[arg(long)]
    pub json: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommands,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommands {
    /// List stored profiles, newest first
    List(ProfileListArgs),
    /// Print one profile as JSON
    Show(ProfileShowArgs),
    /// Import a profile from a JSON document
    Import(ProfileImportArgs),
    /// Delete a profile by id
    Delete(ProfileDeleteArgs),
    /// Search profiles by name or description
    Search(ProfileSearchArgs),
}

#[derive(Debug, Args)]
pub struct ProfileListArgs {
    /// Root directory for stored profiles
    #[arg(long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
    /// Emit the profile list as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ProfileShowArgs {
    /// Profile id to show
    pub id: String,
    /// Root directory for stored profiles
    #[arg(long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ProfileImportArgs {
    /// Profile JSON document to import
    pub file: PathBuf,
    /// Root directory for stored profiles
    #[arg(long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ProfileDeleteArgs {
    /// Profile id to delete
    pub id: String,
    /// Root directory for stored profiles
    #[arg(long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ProfileSearchArgs {
    /// Case-insensitive query over names and descriptions
    pub query: String,
    /// Root directory for stored profiles
    #[arg(long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
    /// Emit matches as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Folder to scan for tabular files
    pub folder: PathBuf,
    /// Only scan the top-level folder
    #[arg(long = "no-recursive")]
    pub no_recursive: bool,
    /// Also write a batch config CSV (`input_file,process`) to this path
    #[arg(long = "config-csv")]
    pub config_csv: Option<PathBuf>,
    /// Emit the scan result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Sql,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Sql => "sql",
        }
    }
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Input file to export
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Formats to export (repeatable; defaults to csv and json)
    #[arg(long = "format", value_enum, action = clap::ArgAction::Append)]
    pub formats: Vec<ExportFormat>,
    /// SQL table name (defaults to the snake_cased file stem)
    #[arg(long = "table-name")]
    pub table_name: Option<String>,
    /// Directory to write exported files into
    #[arg(long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,
    /// Output file name (single-format exports only)
    #[arg(long = "output-name")]
    pub output_name: Option<String>,
    /// CSV delimiter character for reading input
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter for CSV output (defaults to comma)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Emit the per-format results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    #[command(subcommand)]
    pub command: BatchCommands,
}

#[derive(Debug, Subcommand)]
pub enum BatchCommands {
    /// Render a batch-processing shell script
    Generate(BatchGenerateArgs),
    /// Save a named batch job configuration
    SaveJob(BatchSaveJobArgs),
    /// Print a saved batch job configuration as JSON
    ShowJob(BatchShowJobArgs),
}

#[derive(Debug, Args)]
pub struct BatchGenerateArgs {
    /// Profile name the script is generated for
    #[arg(long)]
    pub profile: String,
    /// Batch config CSV (`input_file,process`)
    #[arg(long)]
    pub config: PathBuf,
    /// Folder the script writes processed files into
    #[arg(long = "output-folder")]
    pub output_folder: PathBuf,
    /// Prefix for processed file names
    #[arg(long = "file-prefix", default_value = "procesado")]
    pub file_prefix: String,
    /// Destination script path (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct BatchSaveJobArgs {
    /// Name to save the job under
    pub name: String,
    /// Profile name the job uses
    #[arg(long)]
    pub profile: String,
    /// Batch config CSV path
    #[arg(long)]
    pub config: PathBuf,
    /// Folder processed files are written into
    #[arg(long = "output-folder")]
    pub output_folder: PathBuf,
    /// Prefix for processed file names
    #[arg(long = "file-prefix", default_value = "procesado")]
    pub file_prefix: String,
    /// Root directory for stored batch jobs
    #[arg(long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct BatchShowJobArgs {
    /// Saved job name
    pub name: String,
    /// Root directory for stored batch jobs
    #[arg(long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input file to preview
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_aliases_resolve() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter("pipe").unwrap(), b'|');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
    }
}
