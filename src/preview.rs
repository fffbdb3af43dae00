use anyhow::Result;
use log::info;

use crate::{
    cli::PreviewArgs,
    dataset::{Dataset, ReadOptions},
    table,
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let options = ReadOptions::new(args.delimiter, args.input_encoding.as_deref())?;
    let dataset = Dataset::read(&args.input, &options)?;
    let rows = dataset
        .rows
        .iter()
        .take(args.rows)
        .cloned()
        .collect::<Vec<_>>();
    table::print_table(&dataset.columns, &rows);
    info!("Displayed {} row(s) from {:?}", rows.len(), args.input);
    Ok(())
}
