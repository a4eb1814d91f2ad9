use fiszki_core::{CategoryUpdate, LanguagePair};

use crate::cli::CategoryCommands;
use crate::commands::common::{
    category_to_list_item, format_category_lines, format_timestamp, open_coordinator, print_json,
    resolve_category, CategoryListItem, CliCoordinator, CliEnv,
};
use crate::error::CliError;

pub async fn run_category(command: CategoryCommands, env: &CliEnv) -> Result<(), CliError> {
    let coordinator = open_coordinator(env).await?;
    match command {
        CategoryCommands::Add {
            name,
            description,
            lang1,
            lang2,
        } => {
            let language_pair = language_pair(lang1, lang2);
            let category = coordinator
                .add_category(&name, &description, &language_pair)
                .await?;
            println!("{}", category.id);
        }
        CategoryCommands::List { json } => run_list(&coordinator, json).await?,
        CategoryCommands::Show { category, json } => {
            let category = resolve_category(&coordinator, &category).await?;
            if json {
                print_json(&category_to_list_item(&category))?;
            } else {
                println!("ID:          {}", category.id);
                println!("Name:        {}", category.name);
                if !category.description.is_empty() {
                    println!("Description: {}", category.description);
                }
                println!(
                    "Languages:   {} / {}",
                    category.language_pair.lang1, category.language_pair.lang2
                );
                println!("Words:       {}", category.word_count);
                println!("Created:     {}", format_timestamp(category.created_at));
                println!("Updated:     {}", format_timestamp(category.updated_at));
            }
        }
        CategoryCommands::Update {
            category,
            name,
            description,
            lang1,
            lang2,
        } => {
            let existing = resolve_category(&coordinator, &category).await?;
            let update = category_update(&existing.language_pair, name, description, lang1, lang2);
            if update.is_empty() {
                return Err(CliError::InvalidInput(
                    "nothing to update: pass --name, --description, --lang1 or --lang2".to_string(),
                ));
            }
            let updated = coordinator.update_category(&existing.id, &update).await?;
            println!("Updated category {} ({})", updated.name, updated.id);
        }
        CategoryCommands::Delete { category } => {
            let existing = resolve_category(&coordinator, &category).await?;
            coordinator.delete_category(&existing.id).await?;
            println!("Deleted category {} ({})", existing.name, existing.id);
        }
    }
    coordinator.flush()?;
    Ok(())
}

async fn run_list(coordinator: &CliCoordinator, as_json: bool) -> Result<(), CliError> {
    let categories = coordinator.get_all_categories().await?;

    if as_json {
        let items = categories
            .iter()
            .map(category_to_list_item)
            .collect::<Vec<CategoryListItem>>();
        return print_json(&items);
    }

    if categories.is_empty() {
        println!("No categories yet. Create one with `fiszki category add <NAME>`.");
        return Ok(());
    }
    for line in format_category_lines(&categories) {
        println!("{line}");
    }
    Ok(())
}

pub fn language_pair(lang1: Option<String>, lang2: Option<String>) -> LanguagePair {
    let defaults = LanguagePair::default();
    LanguagePair::new(
        lang1.unwrap_or(defaults.lang1),
        lang2.unwrap_or(defaults.lang2),
    )
}

/// Build an update; a single language flag keeps the other side as it is.
pub fn category_update(
    current: &LanguagePair,
    name: Option<String>,
    description: Option<String>,
    lang1: Option<String>,
    lang2: Option<String>,
) -> CategoryUpdate {
    let language_pair = if lang1.is_none() && lang2.is_none() {
        None
    } else {
        Some(LanguagePair::new(
            lang1.unwrap_or_else(|| current.lang1.clone()),
            lang2.unwrap_or_else(|| current.lang2.clone()),
        ))
    };
    CategoryUpdate {
        name,
        description,
        language_pair,
    }
}
