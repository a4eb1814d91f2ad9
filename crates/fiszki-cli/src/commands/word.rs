use fiszki_core::{NewWordPair, WordId, WordSide};

use crate::cli::WordCommands;
use crate::commands::common::{
    format_word_lines, normalize_identifier, open_coordinator, print_json, read_input,
    resolve_category, CliEnv,
};
use crate::error::CliError;

const COLUMN_SEPARATOR: char = '|';

pub async fn run_word(command: WordCommands, env: &CliEnv) -> Result<(), CliError> {
    let coordinator = open_coordinator(env).await?;
    match command {
        WordCommands::Add {
            category,
            word1,
            word2,
            pron1,
            pron2,
        } => {
            let category = resolve_category(&coordinator, &category).await?;
            let pair = NewWordPair::new(WordSide::new(word1, pron1), WordSide::new(word2, pron2));
            let word = coordinator.add_word(&category.id, &pair).await?;
            println!("{}", word.id);
        }
        WordCommands::List { category, json } => {
            let category = resolve_category(&coordinator, &category).await?;
            let words = coordinator.get_words_by_category(&category.id).await?;
            if json {
                print_json(&words)?;
            } else if words.is_empty() {
                println!("No word pairs in {}.", category.name);
            } else {
                for line in format_word_lines(&words) {
                    println!("{line}");
                }
            }
        }
        WordCommands::Delete { id } => {
            let id = WordId::from(normalize_identifier(&id, "Word")?);
            coordinator.delete_word(&id).await?;
            println!("Deleted word pair {id}");
        }
        WordCommands::Import { category, file } => {
            let category = resolve_category(&coordinator, &category).await?;
            let pairs = parse_word_lines(&read_input(file.as_deref())?)?;
            if pairs.is_empty() {
                return Err(CliError::InvalidInput("no word pairs found in input".to_string()));
            }
            let imported = coordinator
                .import_words_to_category(&category.id, &pairs)
                .await?;
            println!("Imported {imported} word pair(s) into {}", category.name);
        }
        WordCommands::Clear { category } => {
            let category = resolve_category(&coordinator, &category).await?;
            coordinator.delete_words_by_category(&category.id).await?;
            println!("Removed all word pairs from {}", category.name);
        }
    }
    coordinator.flush()?;
    Ok(())
}

/// Parse `word1 | word2` or `word1 | pron1 | word2 | pron2` lines.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_word_lines(input: &str) -> Result<Vec<NewWordPair>, CliError> {
    let mut pairs = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let columns = line.split(COLUMN_SEPARATOR).map(str::trim).collect::<Vec<_>>();
        let pair = match columns.as_slice() {
            [word1, word2] => NewWordPair::new(WordSide::new(*word1, ""), WordSide::new(*word2, "")),
            [word1, pron1, word2, pron2] => NewWordPair::new(
                WordSide::new(*word1, *pron1),
                WordSide::new(*word2, *pron2),
            ),
            _ => {
                return Err(CliError::InvalidInput(format!(
                    "line {}: expected 2 or 4 columns separated by '{COLUMN_SEPARATOR}'",
                    index + 1
                )))
            }
        };
        let pair = pair
            .validate()
            .map_err(|error| CliError::InvalidInput(format!("line {}: {error}", index + 1)))?;
        pairs.push(pair);
    }
    Ok(pairs)
}
