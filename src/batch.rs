//! Batch-script templating and named job configurations.
//!
//! The generated artifact is a POSIX shell script that loops a batch config
//! CSV (`input_file,process`) and invokes this binary's `export` command for
//! every flagged file. Templating only; no reconciliation logic runs here.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    cli::{BatchArgs, BatchCommands},
    store::BatchJobStore,
};

/// A saved batch job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub profile: String,
    pub config_csv: String,
    pub output_folder: String,
    pub file_prefix: String,
    pub created_at: String,
}

/// Renders the batch-processing shell script.
pub fn render_script(
    profile_name: &str,
    config_csv: &str,
    output_folder: &str,
    file_prefix: &str,
) -> String {
    format!(
        r#"#!/usr/bin/env sh
# Procesamiento por lotes generado automáticamente
# Perfil: {profile_name}

CONFIG_CSV="{config_csv}"
OUTPUT_FOLDER="{output_folder}"
FILE_PREFIX="{file_prefix}"

mkdir -p "$OUTPUT_FOLDER"

if [ ! -f "$CONFIG_CSV" ]; then
    echo "configuración no encontrada: $CONFIG_CSV" >&2
    exit 1
fi

index=0
tail -n +2 "$CONFIG_CSV" | while IFS=, read -r input_file process; do
    case "$process" in
        [Tt]rue|[Yy]es|1) ;;
        *) continue ;;
    esac
    if [ ! -f "$input_file" ]; then
        echo "  archivo no encontrado: $input_file"
        continue
    fi
    index=$((index + 1))
    if csv-reconcile export -i "$input_file" --format csv \
        --output-dir "$OUTPUT_FOLDER" \
        --output-name "${{FILE_PREFIX}}_${{index}}.csv"; then
        echo "✓ procesado: $input_file"
    else
        echo "✗ error procesando $input_file"
    fi
done

echo "procesamiento completado"
"#
    )
}

pub fn execute(args: &BatchArgs) -> Result<()> {
    match &args.command {
        BatchCommands::Generate(generate) => {
            let script = render_script(
                &generate.profile,
                &generate.config.display().to_string(),
                &generate.output_folder.display().to_string(),
                &generate.file_prefix,
            );
            match &generate.output {
                Some(path) => {
                    std::fs::write(path, &script)
                        .with_context(|| format!("Writing batch script to {path:?}"))?;
                    info!("Wrote batch script for profile '{}' to {path:?}", generate.profile);
                }
                None => {
                    std::io::stdout()
                        .write_all(script.as_bytes())
                        .context("Writing batch script to stdout")?;
                }
            }
            Ok(())
        }
        BatchCommands::SaveJob(save) => {
            let job = BatchJob {
                profile: save.profile.clone(),
                config_csv: save.config.display().to_string(),
                output_folder: save.output_folder.display().to_string(),
                file_prefix: save.file_prefix.clone(),
                created_at: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            };
            let store = BatchJobStore::open(&save.data_dir)?;
            store.save(&save.name, &job)?;
            info!("Saved batch job '{}'", save.name);
            Ok(())
        }
        BatchCommands::ShowJob(show) => {
            let store = BatchJobStore::open(&show.data_dir)?;
            let job = store.load(&show.name)?;
            println!("{}", serde_json::to_string_pretty(&job)?);
            Ok(())
        }
    }
}
