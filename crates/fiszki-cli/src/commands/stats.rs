use crate::commands::common::{open_coordinator, print_json, CliEnv};
use crate::error::CliError;

pub async fn run_stats(as_json: bool, env: &CliEnv) -> Result<(), CliError> {
    let coordinator = open_coordinator(env).await?;
    let stats = coordinator.get_statistics().await?;

    if as_json {
        print_json(&stats)?;
    } else {
        println!(
            "{} categories, {} word pairs",
            stats.total_categories, stats.total_words
        );
        for category in &stats.categories {
            println!("  {:<24}  {:>5}", category.name, category.word_count);
        }
    }
    coordinator.flush()?;
    Ok(())
}
