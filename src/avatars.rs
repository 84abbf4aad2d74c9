use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use tracing::{debug, warn};

use crate::assets::{AssetLayout, download_file};
use crate::model::{NormalizedRun, Performer};
use crate::session::SessionCache;
use crate::timeline::Timeline;
use crate::twitch::{TwitchClient, handle_from_uri};
use crate::youtube::YoutubeClient;

const PROFILE_IMAGE_URL: &str = "https://www.speedrun.com/themes/user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvatarStrategy {
    /// Leaderboard-hosted profile image.
    Profile,
    /// Linked stream channel's profile image.
    Twitch,
    /// Linked video channel's thumbnail.
    Youtube,
    /// Channel inferred from the run's own video links.
    Vod,
}

impl AvatarStrategy {
    pub const DEFAULT_CHAIN: [AvatarStrategy; 4] = [
        AvatarStrategy::Profile,
        AvatarStrategy::Twitch,
        AvatarStrategy::Youtube,
        AvatarStrategy::Vod,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AvatarStrategy::Profile => "profile",
            AvatarStrategy::Twitch => "twitch",
            AvatarStrategy::Youtube => "youtube",
            AvatarStrategy::Vod => "vod",
        }
    }
}

impl fmt::Display for AvatarStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AvatarStrategy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "profile" | "src" => Ok(AvatarStrategy::Profile),
            "twitch" => Ok(AvatarStrategy::Twitch),
            "youtube" | "yt" => Ok(AvatarStrategy::Youtube),
            "vod" | "vods" => Ok(AvatarStrategy::Vod),
            other => Err(anyhow!("unknown avatar strategy '{other}'")),
        }
    }
}

/// Comma/space separated strategy list, duplicates dropped, order kept.
pub fn parse_chain(raw: &str) -> Result<Vec<AvatarStrategy>> {
    let mut seen = HashSet::new();
    let mut chain = Vec::new();
    for part in raw.split([',', ';', ' ']).filter(|p| !p.trim().is_empty()) {
        let strategy = part.parse::<AvatarStrategy>()?;
        if seen.insert(strategy) {
            chain.push(strategy);
        }
    }
    Ok(chain)
}

/// For every timeline row, the `limit` fastest referenced runs; first
/// occurrence order across rows.
pub fn avatar_candidates<'a>(
    timeline: &Timeline,
    runs: &HashMap<&str, &'a NormalizedRun>,
    limit: usize,
) -> Vec<&'a NormalizedRun> {
    if limit == 0 {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in &timeline.rows {
        let mut referenced = row
            .cells
            .iter()
            .flatten()
            .filter_map(|id| runs.get(id.as_str()).copied())
            .collect::<Vec<_>>();
        referenced.sort_by(|a, b| a.elapsed_seconds.total_cmp(&b.elapsed_seconds));
        for run in referenced.into_iter().take(limit) {
            if seen.insert(run.id.as_str()) {
                out.push(run);
            }
        }
    }
    out
}

pub struct AvatarChain {
    strategies: Vec<AvatarStrategy>,
    twitch: Option<TwitchClient>,
    youtube: Option<YoutubeClient>,
}

impl AvatarChain {
    pub fn new(
        strategies: Vec<AvatarStrategy>,
        twitch: Option<TwitchClient>,
        youtube: Option<YoutubeClient>,
    ) -> Self {
        Self {
            strategies,
            twitch,
            youtube,
        }
    }

    /// Walks the candidates in order and returns how many identities gained
    /// an avatar.
    pub fn resolve(
        &mut self,
        candidates: &[&NormalizedRun],
        layout: &AssetLayout,
        session: &mut SessionCache,
    ) -> usize {
        let scan_vods = self.strategies.contains(&AvatarStrategy::Vod);
        let mut resolved = 0usize;
        for run in candidates {
            let dest = layout.avatar_path(&run.identity);
            if session.begin_identity_lookup(&run.identity) && self.resolve_identity(run, &dest) {
                session.mark_avatar(&run.identity);
                resolved += 1;
            }

            if scan_vods
                && !session.has_avatar(&run.identity)
                && !run.video_links.is_empty()
                && session.begin_vod_scan(&run.id)
                && self.scan_vods(run, &dest)
            {
                session.mark_avatar(&run.identity);
                resolved += 1;
            }
        }
        resolved
    }

    // Identity-level strategies only apply to solo runs by a linked account.
    fn resolve_identity(&mut self, run: &NormalizedRun, dest: &Path) -> bool {
        let [performer] = run.performers.as_slice() else {
            return false;
        };
        let Some(weblink) = performer.weblink.as_deref() else {
            return false;
        };
        if !self.strategies.iter().any(|s| *s != AvatarStrategy::Vod) {
            return false;
        }
        if dest.exists() {
            return true;
        }

        let strategies = self.strategies.clone();
        for strategy in strategies {
            if strategy == AvatarStrategy::Vod {
                continue;
            }
            match self.try_strategy(strategy, performer, weblink, dest) {
                Ok(true) => {
                    debug!(identity = %run.identity, %strategy, "avatar resolved");
                    return true;
                }
                Ok(false) => {}
                Err(err) => warn!(identity = %run.identity, %strategy, "avatar lookup failed: {err:#}"),
            }
        }
        false
    }

    fn try_strategy(
        &mut self,
        strategy: AvatarStrategy,
        performer: &Performer,
        weblink: &str,
        dest: &Path,
    ) -> Result<bool> {
        match strategy {
            AvatarStrategy::Profile => {
                let Some(name) = handle_from_uri(weblink) else {
                    return Ok(false);
                };
                download_file(&format!("{PROFILE_IMAGE_URL}/{name}/image.png"), dest)
            }
            AvatarStrategy::Twitch => {
                let (Some(client), Some(uri)) = (self.twitch.as_mut(), performer.twitch_uri.as_deref())
                else {
                    return Ok(false);
                };
                let Some(login) = handle_from_uri(uri) else {
                    return Ok(false);
                };
                match client.user_by_login(&login)?.and_then(|u| u.profile_image_url) {
                    Some(url) if !url.is_empty() => download_file(&url, dest),
                    _ => Ok(false),
                }
            }
            AvatarStrategy::Youtube => {
                let Some(channel_id) = performer.youtube_uri.as_deref().and_then(youtube_channel_id)
                else {
                    return Ok(false);
                };
                self.download_channel_thumbnail(&channel_id, dest)
            }
            AvatarStrategy::Vod => Ok(false),
        }
    }

    fn download_channel_thumbnail(&self, channel_id: &str, dest: &Path) -> Result<bool> {
        let Some(client) = self.youtube.as_ref() else {
            return Ok(false);
        };
        match client.channel_thumbnail(channel_id)? {
            Some(url) => download_file(&url, dest),
            None => Ok(false),
        }
    }

    fn scan_vods(&mut self, run: &NormalizedRun, dest: &Path) -> bool {
        for link in &run.video_links {
            match self.try_vod_link(link, dest) {
                Ok(true) => {
                    debug!(identity = %run.identity, %link, "avatar resolved from video link");
                    return true;
                }
                Ok(false) => {}
                Err(err) => warn!(run = %run.id, %link, "video link lookup failed: {err:#}"),
            }
        }
        false
    }

    fn try_vod_link(&mut self, link: &str, dest: &Path) -> Result<bool> {
        if let (Some(client), Some(video_id)) = (self.twitch.as_mut(), twitch_vod_id(link)) {
            let owner = client.video_owner(&video_id)?;
            if let Some(url) = owner.and_then(|u| u.profile_image_url).filter(|u| !u.is_empty())
                && download_file(&url, dest)?
            {
                return Ok(true);
            }
        }

        if let (Some(client), Some(video_id)) = (self.youtube.as_ref(), youtube_video_id(link))
            && let Some(channel_id) = client.video_channel(&video_id)?
            && self.download_channel_thumbnail(&channel_id, dest)?
        {
            return Ok(true);
        }
        Ok(false)
    }
}

/// Numeric VOD id (7 to 10 digits) from a twitch link.
pub fn twitch_vod_id(link: &str) -> Option<String> {
    if !link.to_ascii_lowercase().contains("twitch.tv") {
        return None;
    }
    find_char_run(link, 7, 10, |c| c.is_ascii_digit())
}

/// Eleven character video id from a youtube / youtu.be link.
pub fn youtube_video_id(link: &str) -> Option<String> {
    let lower = link.to_ascii_lowercase();
    if !lower.contains("youtu.be") && !lower.contains("youtube.com") {
        return None;
    }
    find_char_run(link, 11, 11, is_youtube_id_char)
}

/// Twenty-four character channel id from a channel link.
pub fn youtube_channel_id(uri: &str) -> Option<String> {
    find_char_run(uri, 24, 24, is_youtube_id_char)
}

fn is_youtube_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

// First maximal run of at least `min` matching chars, cut to `max`.
fn find_char_run(text: &str, min: usize, max: usize, matches: impl Fn(char) -> bool) -> Option<String> {
    let chars = text.chars().collect::<Vec<_>>();
    let mut idx = 0;
    while idx < chars.len() {
        if !matches(chars[idx]) {
            idx += 1;
            continue;
        }
        let start = idx;
        while idx < chars.len() && matches(chars[idx]) {
            idx += 1;
        }
        if idx - start >= min {
            let end = start + (idx - start).min(max);
            return Some(chars[start..end].iter().collect());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{
        AvatarStrategy, parse_chain, twitch_vod_id, youtube_channel_id, youtube_video_id,
    };

    #[test]
    fn twitch_vod_ids() {
        assert_eq!(
            twitch_vod_id("https://www.twitch.tv/videos/1234567890").as_deref(),
            Some("1234567890")
        );
        assert_eq!(
            twitch_vod_id("https://www.Twitch.tv/videos/12345678901234").as_deref(),
            Some("1234567890")
        );
        assert_eq!(twitch_vod_id("https://www.twitch.tv/videos/123456"), None);
        assert_eq!(twitch_vod_id("https://example.com/videos/1234567890"), None);
    }

    #[test]
    fn youtube_video_ids() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://YOUTU.BE/a-b_c1234XY").as_deref(),
            Some("a-b_c1234XY")
        );
        assert_eq!(youtube_video_id("https://vimeo.com/123456789012"), None);
    }

    #[test]
    fn youtube_channel_ids() {
        assert_eq!(
            youtube_channel_id("https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv")
                .as_deref(),
            Some("UCabcdefghijklmnopqrstuv")
        );
        assert_eq!(youtube_channel_id("https://www.youtube.com/user/short"), None);
    }

    #[test]
    fn chain_parsing_keeps_order_and_drops_duplicates() {
        let chain = parse_chain("vod, profile,twitch vod").expect("valid chain");
        assert_eq!(
            chain,
            vec![
                AvatarStrategy::Vod,
                AvatarStrategy::Profile,
                AvatarStrategy::Twitch
            ]
        );
        assert!(parse_chain("profile,myspace").is_err());
        assert!(parse_chain("").expect("empty ok").is_empty());
    }
}
