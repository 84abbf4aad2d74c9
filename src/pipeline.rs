use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::assets::{FlagDownloader, FlagSource, download_cover};
use crate::avatars::{AvatarChain, avatar_candidates};
use crate::config::CollectorConfig;
use crate::model::{Category, Game, NormalizedRun, RawRun};
use crate::normalize::Normalizer;
use crate::output::{
    METADATA_FILE, Metadata, TIMELINE_FILE, write_metadata_file, write_timeline_file,
};
use crate::players::{PlayerDirectory, build_player_directory};
use crate::session::SessionCache;
use crate::src_api::SrcApi;
use crate::timeline::{Aggregation, aggregate};
use crate::twitch::TwitchClient;
use crate::youtube::YoutubeClient;

pub const CATEGORY_SEPARATOR: &str = " / ";

/// What the user (or the command line) picked.
#[derive(Debug, Clone)]
pub struct Selection {
    pub game: Game,
    pub categories: Vec<Category>,
    pub avatar_limit: usize,
}

impl Selection {
    pub fn category_label(&self) -> String {
        self.categories
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(CATEGORY_SEPARATOR)
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub runs: Vec<NormalizedRun>,
    pub aggregation: Aggregation,
    pub players: PlayerDirectory,
}

impl Dataset {
    pub fn dated_runs(&self) -> usize {
        self.runs.iter().filter(|r| r.performed_date.is_some()).count()
    }
}

#[derive(Debug, Clone)]
pub struct CollectionSummary {
    pub game: String,
    pub category: String,
    pub runs_fetched: usize,
    pub runs_dated: usize,
    pub identities: usize,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub avatars: usize,
    pub flags: usize,
    pub cover: bool,
    pub timeline_path: PathBuf,
    pub metadata_path: PathBuf,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum CollectOutcome {
    Written(CollectionSummary),
    /// The selected categories returned no verified runs.
    NoRuns,
    /// Runs were fetched but none had a resolvable date.
    NoDatedRuns { runs_fetched: usize },
}

/// Normalizes every run and aggregates the dated ones. `Ok(None)` means
/// nothing was dated.
pub fn build_dataset(
    raws: &[RawRun],
    normalizer: &Normalizer,
    session: &mut SessionCache,
    flags: &dyn FlagSource,
) -> Result<Option<Dataset>> {
    let runs = raws
        .iter()
        .map(|raw| normalizer.normalize(raw, session, flags))
        .collect::<Result<Vec<_>>>()?;

    let Some(aggregation) = aggregate(&runs) else {
        return Ok(None);
    };
    let players = build_player_directory(&runs);
    Ok(Some(Dataset {
        runs,
        aggregation,
        players,
    }))
}

pub fn run(config: &CollectorConfig, api: &SrcApi, selection: &Selection) -> Result<CollectOutcome> {
    let mut raws = Vec::new();
    for category in &selection.categories {
        raws.extend(api.fetch_category_runs(category)?);
    }
    if raws.is_empty() {
        return Ok(CollectOutcome::NoRuns);
    }
    let runs_fetched = raws.len();

    let mut session = SessionCache::new();
    let normalizer = Normalizer::new(config.normalize.clone());
    let flag_source = FlagDownloader::new(&config.assets);
    let Some(dataset) = build_dataset(&raws, &normalizer, &mut session, &flag_source)? else {
        return Ok(CollectOutcome::NoDatedRuns { runs_fetched });
    };
    let timeline = &dataset.aggregation.timeline;
    info!(
        identities = timeline.identities.len(),
        rows = timeline.rows.len(),
        "timeline built"
    );

    let mut errors = Vec::new();
    let cover = match download_cover(&selection.game, &config.assets) {
        Ok(found) => found,
        Err(err) => {
            warn!("cover download failed: {err:#}");
            errors.push(format!("cover: {err:#}"));
            false
        }
    };

    if selection.avatar_limit > 0 {
        let by_id = dataset
            .runs
            .iter()
            .map(|r| (r.id.as_str(), r))
            .collect::<HashMap<_, _>>();
        let candidates = avatar_candidates(timeline, &by_id, selection.avatar_limit);
        let mut chain = AvatarChain::new(
            config.avatar_chain.clone(),
            twitch_client(config, &mut errors),
            youtube_client(config, &mut errors),
        );
        let resolved = chain.resolve(&candidates, &config.assets, &mut session);
        info!(
            candidates = candidates.len(),
            resolved, "avatar lookups finished"
        );
    }

    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("create {}", config.out_dir.display()))?;
    let timeline_path = config.out_dir.join(TIMELINE_FILE);
    let metadata_path = config.out_dir.join(METADATA_FILE);
    let category = selection.category_label();

    write_timeline_file(timeline, &timeline_path)?;
    let metadata = Metadata {
        game: selection.game.name(),
        category: &category,
        runs: &dataset.aggregation.details,
        players: &dataset.players,
        pfps: session.avatars(),
        cover,
        flags: session.flags(),
    };
    write_metadata_file(&metadata, &metadata_path)?;

    Ok(CollectOutcome::Written(CollectionSummary {
        game: selection.game.name().to_string(),
        category,
        runs_fetched,
        runs_dated: dataset.dated_runs(),
        identities: timeline.identities.len(),
        rows: timeline.rows.len(),
        first_date: timeline.first_date(),
        last_date: timeline.last_date(),
        avatars: session.avatars().len(),
        flags: session.flags().len(),
        cover,
        timeline_path,
        metadata_path,
        errors,
    }))
}

fn twitch_client(config: &CollectorConfig, errors: &mut Vec<String>) -> Option<TwitchClient> {
    let credentials = config.twitch.clone()?;
    TwitchClient::new(credentials)
        .map_err(|err| errors.push(format!("twitch client: {err:#}")))
        .ok()
}

fn youtube_client(config: &CollectorConfig, errors: &mut Vec<String>) -> Option<YoutubeClient> {
    let credentials = config.youtube.clone()?;
    YoutubeClient::new(credentials)
        .map_err(|err| errors.push(format!("youtube client: {err:#}")))
        .ok()
}
