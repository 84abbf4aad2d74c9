use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use crate::assets::AssetLayout;
use crate::avatars::{AvatarStrategy, parse_chain};
use crate::normalize::{NormalizeOptions, UnverifiedMarker};
use crate::src_api::DEFAULT_API_BASE;
use crate::twitch::TwitchCredentials;
use crate::youtube::YoutubeCredentials;

// Super Mario 64's "unverified" sub-category marker.
const DEFAULT_UNVERIFIED_VARIABLE: &str = "kn04ewol";
const DEFAULT_UNVERIFIED_VALUE: &str = "4qyxop3l";

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Collect a leaderboard's personal-best history into a daily CSV timeline"
)]
pub struct Cli {
    /// Game id; skips the interactive game search
    #[arg(long, env = "PB_GAME")]
    pub game: Option<String>,

    /// Category id (repeat to merge several categories into one table)
    #[arg(long = "category", env = "PB_CATEGORIES", value_delimiter = ',')]
    pub categories: Vec<String>,

    /// Runners per day to fetch avatars for (0 disables avatars)
    #[arg(long, env = "PB_AVATARS")]
    pub avatars: Option<usize>,

    /// Ordered avatar lookup strategies: profile, twitch, youtube, vod
    #[arg(long, env = "PB_AVATAR_CHAIN", default_value = "profile,twitch,youtube,vod")]
    pub avatar_chain: String,

    /// Omit the hours field from time strings
    #[arg(long)]
    pub no_hours: bool,

    /// Omit milliseconds from time strings
    #[arg(long)]
    pub no_milliseconds: bool,

    /// Record region, platform, emulation and category per run
    #[arg(long)]
    pub extended: bool,

    /// Custom variable whose sentinel value marks a run as undated
    #[arg(long, default_value = DEFAULT_UNVERIFIED_VARIABLE)]
    pub unverified_variable: String,

    /// Sentinel value for --unverified-variable (empty disables the check)
    #[arg(long, default_value = DEFAULT_UNVERIFIED_VALUE)]
    pub unverified_value: String,

    /// Directory for runs.csv and metadata.json
    #[arg(long, env = "PB_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Directory for avatars and the cover image
    #[arg(long, env = "PB_AVATAR_DIR", default_value = "../data/pfps")]
    pub avatar_dir: PathBuf,

    /// Directory for country flags
    #[arg(long, env = "PB_FLAG_DIR", default_value = "../data/flags")]
    pub flag_dir: PathBuf,

    /// Leaderboard API base URL
    #[arg(long, env = "PB_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub api_base: String,
    pub game_id: Option<String>,
    pub category_ids: Vec<String>,
    pub avatar_limit: Option<usize>,
    pub avatar_chain: Vec<AvatarStrategy>,
    pub normalize: NormalizeOptions,
    pub out_dir: PathBuf,
    pub assets: AssetLayout,
    pub twitch: Option<TwitchCredentials>,
    pub youtube: Option<YoutubeCredentials>,
}

impl CollectorConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let avatar_chain = parse_chain(&cli.avatar_chain).context("invalid --avatar-chain")?;
        let unverified_marker = (!cli.unverified_variable.trim().is_empty()
            && !cli.unverified_value.trim().is_empty())
        .then(|| UnverifiedMarker {
            variable: cli.unverified_variable.trim().to_string(),
            value: cli.unverified_value.trim().to_string(),
        });

        let mut category_ids = Vec::new();
        for id in cli.categories.iter().map(|c| c.trim()) {
            if !id.is_empty() && !category_ids.iter().any(|c: &String| c == id) {
                category_ids.push(id.to_string());
            }
        }

        Ok(Self {
            api_base: cli.api_base,
            game_id: cli.game.filter(|g| !g.trim().is_empty()),
            category_ids,
            avatar_limit: cli.avatars,
            avatar_chain,
            normalize: NormalizeOptions {
                use_hours: !cli.no_hours,
                use_milliseconds: !cli.no_milliseconds,
                include_extended: cli.extended,
                unverified_marker,
            },
            out_dir: cli.out_dir,
            assets: AssetLayout::new(cli.avatar_dir, cli.flag_dir),
            twitch: load_twitch_credentials(),
            youtube: load_youtube_credentials(),
        })
    }

    /// Game and categories were given up front, so no prompt is needed.
    pub fn is_non_interactive(&self) -> bool {
        self.game_id.is_some() && !self.category_ids.is_empty()
    }

    pub fn multi_category(&self) -> bool {
        self.category_ids.len() > 1
    }
}

fn load_twitch_credentials() -> Option<TwitchCredentials> {
    let (client_id, access_token) =
        env_pair("TWITCH_CLIENT_ID", "TWITCH_ACCESS_TOKEN").or_else(|| file_pair("twitch.txt"))?;
    Some(TwitchCredentials {
        client_id,
        access_token,
    })
}

fn load_youtube_credentials() -> Option<YoutubeCredentials> {
    let (api_key, access_token) =
        env_pair("YOUTUBE_API_KEY", "YOUTUBE_ACCESS_TOKEN").or_else(|| file_pair("youtube.txt"))?;
    Some(YoutubeCredentials {
        api_key,
        access_token,
    })
}

fn env_pair(first: &str, second: &str) -> Option<(String, String)> {
    let a = std::env::var(first).ok().filter(|v| !v.trim().is_empty())?;
    let b = std::env::var(second).unwrap_or_default();
    Some((a.trim().to_string(), b.trim().to_string()))
}

fn file_pair(path: impl AsRef<Path>) -> Option<(String, String)> {
    let raw = fs::read_to_string(path).ok()?;
    parse_credential_lines(&raw)
}

/// First line is the client id / key, second the token.
pub fn parse_credential_lines(raw: &str) -> Option<(String, String)> {
    let mut lines = raw.lines().map(str::trim);
    let first = lines.next().filter(|l| !l.is_empty())?;
    let second = lines.next().unwrap_or("");
    Some((first.to_string(), second.to_string()))
}
