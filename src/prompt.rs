use anyhow::Result;
use dialoguer::{Confirm, Input, Select};

use crate::model::{Category, Game};
use crate::src_api::SrcApi;

const GAME_SEARCH_MAX: usize = 5;
const NONE_MATCH: &str = "[none match]";

/// Loops until the user confirms a game.
pub fn choose_game(api: &SrcApi) -> Result<Game> {
    loop {
        let query: String = Input::new()
            .with_prompt("Game name or abbreviation")
            .interact_text()?;

        let mut games = match api.search_games(query.trim(), GAME_SEARCH_MAX) {
            Ok(games) if !games.is_empty() => games,
            Ok(_) => {
                println!("No game found for '{}', please try again.", query.trim());
                continue;
            }
            Err(err) => {
                println!("Page not found ({err:#}), please try again.");
                continue;
            }
        };

        if games.len() == 1 {
            let game = games.remove(0);
            let correct = Confirm::new()
                .with_prompt(format!("Is {} correct?", game.name()))
                .default(true)
                .interact()?;
            if correct {
                return Ok(game);
            }
            continue;
        }

        let labels = games.iter().map(|g| g.name().to_string()).collect::<Vec<_>>();
        if let Some(idx) = select_with_none("Select the game", &labels)? {
            return Ok(games.remove(idx));
        }
    }
}

/// `None` means the user rejected every category, or the game has none.
pub fn choose_category(api: &SrcApi, game: &Game) -> Result<Option<Category>> {
    let mut categories = api.per_game_categories(&game.id)?;
    match categories.len() {
        0 => {
            println!("No categories found.");
            Ok(None)
        }
        1 => {
            let category = categories.remove(0);
            println!("Using the only category {}.", category.name);
            Ok(Some(category))
        }
        _ => {
            let labels = categories.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
            Ok(select_with_none("Select the category", &labels)?.map(|idx| categories.remove(idx)))
        }
    }
}

pub fn ask_avatar_count() -> Result<usize> {
    let count: usize = Input::new()
        .with_prompt("How many runners per day should get avatars? (0 skips)")
        .default(0)
        .interact_text()?;
    Ok(count)
}

// Index into `labels`, or `None` for the leading "[none match]" entry.
fn select_with_none(prompt: &str, labels: &[String]) -> Result<Option<usize>> {
    let mut items = Vec::with_capacity(labels.len() + 1);
    items.push(NONE_MATCH.to_string());
    items.extend(labels.iter().cloned());

    let choice = Select::new()
        .with_prompt(prompt)
        .items(&items[..])
        .default(1)
        .interact()?;
    Ok(choice.checked_sub(1))
}
