use std::path::Path;

use fiszki_core::CategorySnapshot;

use crate::commands::common::{open_coordinator, read_input, resolve_category, CliEnv};
use crate::error::CliError;

pub async fn run_export(
    category: &str,
    output_path: Option<&Path>,
    env: &CliEnv,
) -> Result<(), CliError> {
    let coordinator = open_coordinator(env).await?;
    let category = resolve_category(&coordinator, category).await?;
    let snapshot = coordinator.export_category(&category.id).await?;
    let rendered = snapshot.to_json_pretty()?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }
    coordinator.flush()?;
    Ok(())
}

pub async fn run_import(input_path: Option<&Path>, env: &CliEnv) -> Result<(), CliError> {
    let snapshot = CategorySnapshot::from_json(&read_input(input_path)?)?;
    let coordinator = open_coordinator(env).await?;
    let category = coordinator.import_category_from_snapshot(&snapshot).await?;
    println!(
        "Imported {} with {} word pair(s) ({})",
        category.name,
        snapshot.words.len(),
        category.id
    );
    coordinator.flush()?;
    Ok(())
}
