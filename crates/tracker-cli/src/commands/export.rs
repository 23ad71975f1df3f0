use std::path::Path;

use tracker_core::export;

use crate::cli::ExportFormat;
use crate::commands::common::open_service;
use crate::error::CliError;

impl From<ExportFormat> for export::ExportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Json => Self::Json,
            ExportFormat::Markdown => Self::Markdown,
        }
    }
}

pub async fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let rendered = service.export_items(format.into()).await?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}

pub async fn run_import(file: &Path, db_path: &Path) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(file)?;
    let service = open_service(db_path).await?;
    let summary = service.import_items(&raw).await?;

    println!(
        "Imported {} items ({} kept newer local copies, {} unreadable)",
        summary.applied, summary.kept_existing, summary.skipped
    );
    Ok(())
}
