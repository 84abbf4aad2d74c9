use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::http_client::http_client;

const HELIX_USERS_URL: &str = "https://api.twitch.tv/helix/users";
const HELIX_VIDEOS_URL: &str = "https://api.twitch.tv/helix/videos";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitchCredentials {
    pub client_id: String,
    pub access_token: String,
}

/// Sleep-until-reset policy: once the service reports an exhausted quota,
/// the next call waits for the advertised reset instant.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    resume_at: Option<DateTime<Utc>>,
}

impl RateLimitGate {
    pub fn observe(&mut self, remaining: Option<&str>, reset: Option<&str>) {
        let exhausted = remaining
            .and_then(|r| r.trim().parse::<u64>().ok())
            .is_some_and(|r| r == 0);
        if !exhausted {
            return;
        }
        self.resume_at = reset
            .and_then(|r| r.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    }

    /// How long to wait at `now`; clears the gate.
    pub fn take_wait(&mut self, now: DateTime<Utc>) -> Option<Duration> {
        let resume_at = self.resume_at.take()?;
        (resume_at - now).to_std().ok().filter(|d| !d.is_zero())
    }

    pub fn is_armed(&self) -> bool {
        self.resume_at.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitchUser {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TwitchVideo {
    user_id: String,
}

pub struct TwitchClient {
    credentials: TwitchCredentials,
    client: &'static Client,
    gate: RateLimitGate,
}

impl TwitchClient {
    pub fn new(credentials: TwitchCredentials) -> Result<Self> {
        Ok(Self {
            credentials,
            client: http_client()?,
            gate: RateLimitGate::default(),
        })
    }

    /// Helix `data` array; any non-200 answer is treated as "nothing found".
    fn query(&mut self, url: &str, params: &[(&str, &str)]) -> Result<Vec<Value>> {
        if let Some(wait) = self.gate.take_wait(Utc::now()) {
            info!(secs = wait.as_secs(), "twitch rate limit reached, sleeping");
            std::thread::sleep(wait);
        }

        let resp = self
            .client
            .get(url)
            .query(params)
            .header("Client-Id", &self.credentials.client_id)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .context("twitch request failed")?;

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let remaining = header("Ratelimit-Remaining");
        let reset = header("Ratelimit-Reset");
        self.gate.observe(remaining.as_deref(), reset.as_deref());

        let status = resp.status();
        if !status.is_success() {
            debug!(%url, %status, "twitch lookup failed");
            return Ok(Vec::new());
        }
        let body: Value = resp.json().context("invalid twitch json")?;
        Ok(match body.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        })
    }

    pub fn user_by_login(&mut self, login: &str) -> Result<Option<TwitchUser>> {
        let users = self.query(HELIX_USERS_URL, &[("login", login)])?;
        for raw in users {
            let user: TwitchUser = serde_json::from_value(raw).context("invalid twitch user")?;
            if user.display_name.eq_ignore_ascii_case(login) || user.login.eq_ignore_ascii_case(login)
            {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    pub fn user_by_id(&mut self, user_id: &str) -> Result<Option<TwitchUser>> {
        let users = self.query(HELIX_USERS_URL, &[("id", user_id)])?;
        match users.into_iter().next() {
            Some(raw) => Ok(Some(
                serde_json::from_value(raw).context("invalid twitch user")?,
            )),
            None => Ok(None),
        }
    }

    /// Owner of a VOD, if the video still exists.
    pub fn video_owner(&mut self, video_id: &str) -> Result<Option<TwitchUser>> {
        let videos = self.query(HELIX_VIDEOS_URL, &[("id", video_id)])?;
        let Some(raw) = videos.into_iter().next() else {
            return Ok(None);
        };
        let video: TwitchVideo = serde_json::from_value(raw).context("invalid twitch video")?;
        self.user_by_id(&video.user_id)
    }
}

/// Channel handle from a profile link such as `https://www.twitch.tv/name/`.
pub fn handle_from_uri(uri: &str) -> Option<String> {
    uri.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
