use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::http_client::http_client;

const CHANNELS_URL: &str = "https://www.googleapis.com/youtube/v3/channels";
const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YoutubeCredentials {
    pub api_key: String,
    pub access_token: String,
}

pub struct YoutubeClient {
    credentials: YoutubeCredentials,
    client: &'static Client,
}

impl YoutubeClient {
    pub fn new(credentials: YoutubeCredentials) -> Result<Self> {
        Ok(Self {
            credentials,
            client: http_client()?,
        })
    }

    /// First item's snippet, or `None` for a non-200 or empty result.
    fn first_snippet(&self, url: &str, id: &str) -> Result<Option<Value>> {
        let mut params = vec![("part", "snippet"), ("id", id)];
        if !self.credentials.api_key.is_empty() {
            params.push(("key", self.credentials.api_key.as_str()));
        }
        if !self.credentials.access_token.is_empty() {
            params.push(("access_token", self.credentials.access_token.as_str()));
        }

        let resp = self
            .client
            .get(url)
            .query(&params)
            .send()
            .context("youtube request failed")?;
        let status = resp.status();
        if !status.is_success() {
            debug!(%url, %status, "youtube lookup failed");
            return Ok(None);
        }
        let body: Value = resp.json().context("invalid youtube json")?;
        Ok(first_item_snippet(&body).cloned())
    }

    /// Medium thumbnail of a channel.
    pub fn channel_thumbnail(&self, channel_id: &str) -> Result<Option<String>> {
        let snippet = self.first_snippet(CHANNELS_URL, channel_id)?;
        Ok(snippet.as_ref().and_then(medium_thumbnail))
    }

    /// Channel that uploaded a video.
    pub fn video_channel(&self, video_id: &str) -> Result<Option<String>> {
        let snippet = self.first_snippet(VIDEOS_URL, video_id)?;
        Ok(snippet
            .as_ref()
            .and_then(|s| s.get("channelId"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

fn first_item_snippet(body: &Value) -> Option<&Value> {
    let total = body
        .pointer("/pageInfo/totalResults")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if total == 0 {
        return None;
    }
    body.pointer("/items/0/snippet")
}

fn medium_thumbnail(snippet: &Value) -> Option<String> {
    snippet
        .pointer("/thumbnails/medium/url")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
