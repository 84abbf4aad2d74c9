use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pb_timeline::config::{Cli, CollectorConfig};
use pb_timeline::pipeline::{self, CollectOutcome, Selection};
use pb_timeline::prompt;
use pb_timeline::src_api::SrcApi;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let config = CollectorConfig::from_cli(Cli::parse())?;
    config
        .assets
        .ensure_dirs()
        .context("unable to prepare asset directories")?;
    let api = SrcApi::new(config.api_base.clone())?;

    let Some(selection) = resolve_selection(&config, &api)? else {
        println!("No category selected, nothing to collect.");
        return Ok(());
    };
    if config.multi_category() {
        info!(
            categories = selection.categories.len(),
            "merging categories into one table"
        );
    }

    match pipeline::run(&config, &api, &selection)? {
        CollectOutcome::NoRuns => {
            println!("No verified runs found for {}.", selection.category_label());
        }
        CollectOutcome::NoDatedRuns { runs_fetched } => {
            println!("None of the {runs_fetched} runs has a usable date, nothing written.");
        }
        CollectOutcome::Written(summary) => {
            println!("Collection complete");
            println!("Game: {}", summary.game);
            println!("Category: {}", summary.category);
            println!(
                "Runs dated: {}/{}",
                summary.runs_dated, summary.runs_fetched
            );
            println!(
                "Columns: {} rows: {} ({} .. {})",
                summary.identities,
                summary.rows,
                summary
                    .first_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "n/a".to_string()),
                summary
                    .last_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            );
            println!(
                "Avatars: {} flags: {} cover: {}",
                summary.avatars,
                summary.flags,
                if summary.cover { "yes" } else { "no" }
            );
            println!("Timeline: {}", summary.timeline_path.display());
            println!("Metadata: {}", summary.metadata_path.display());
            if !summary.errors.is_empty() {
                println!("  errors: {}", summary.errors.len());
                for err in summary.errors.iter().take(6) {
                    println!("   - {err}");
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "pb_timeline=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_selection(config: &CollectorConfig, api: &SrcApi) -> Result<Option<Selection>> {
    let game = match &config.game_id {
        Some(id) => api
            .fetch_game(id)
            .with_context(|| format!("unknown game id {id}"))?,
        None => prompt::choose_game(api)?,
    };

    let categories = if config.category_ids.is_empty() {
        match prompt::choose_category(api, &game)? {
            Some(category) => vec![category],
            None => return Ok(None),
        }
    } else {
        config
            .category_ids
            .iter()
            .map(|id| {
                api.fetch_category(id)
                    .with_context(|| format!("unknown category id {id}"))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let avatar_limit = match config.avatar_limit {
        Some(limit) => limit,
        None if config.is_non_interactive() => 0,
        None => prompt::ask_avatar_count()?,
    };

    Ok(Some(Selection {
        game,
        categories,
        avatar_limit,
    }))
}
