use std::collections::HashMap;
use std::fmt;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One leaderboard entry as returned by the runs endpoint (with
/// `embed=players,platform,region`). Only the fields the collector reads
/// are typed; embedded resources stay as raw JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRun {
    pub id: String,
    pub times: RunTimes,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub submitted: Option<String>,
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: RunStatus,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "map_or_default")]
    pub values: HashMap<String, String>,
    #[serde(default)]
    pub players: Value,
    #[serde(default)]
    pub region: Value,
    #[serde(default)]
    pub platform: Value,
    #[serde(default, deserialize_with = "system_or_default")]
    pub system: RunSystem,
    #[serde(default)]
    pub category: Value,
    #[serde(default)]
    pub videos: Option<RunVideos>,
    /// Display name of the category the run was paged from.
    #[serde(skip)]
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunTimes {
    pub primary_t: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunStatus {
    #[serde(default, rename = "verify-date")]
    pub verify_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSystem {
    #[serde(default)]
    pub emulated: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunVideos {
    #[serde(default, deserialize_with = "vec_or_default")]
    pub links: Vec<VideoLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoLink {
    pub uri: String,
}

impl RawRun {
    /// Performer descriptors, whether embedded (`{"data": [...]}`) or inline.
    pub fn performer_values(&self) -> &[Value] {
        let list = match &self.players {
            Value::Object(map) => map.get("data"),
            other => Some(other),
        };
        match list {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    pub fn region_name(&self) -> Option<String> {
        embedded_name(&self.region)
    }

    pub fn platform_name(&self) -> Option<String> {
        embedded_name(&self.platform)
    }

    /// Category label: the paged category's name when known, else whatever
    /// the raw `category` field holds (an id, or an embedded object).
    pub fn category_label(&self) -> Option<String> {
        if let Some(name) = &self.category_name {
            return Some(name.clone());
        }
        match &self.category {
            Value::String(id) => Some(id.clone()),
            Value::Object(_) => embedded_name(&self.category),
            _ => None,
        }
    }

    pub fn video_links(&self) -> Vec<String> {
        self.videos
            .as_ref()
            .map(|v| v.links.iter().map(|l| l.uri.clone()).collect())
            .unwrap_or_default()
    }
}

// Embedded resources come back as `{"data": {...}}`, or `{"data": []}` when unset.
fn embedded_name(value: &Value) -> Option<String> {
    value
        .pointer("/data/name")
        .or_else(|| value.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PerformerKind {
    Account { id: String },
    Guest { name: String },
}

/// A participant in a run, parsed from its embedded descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Performer {
    pub kind: PerformerKind,
    pub display_name: String,
    pub weblink: Option<String>,
    pub country: Option<String>,
    pub twitch_uri: Option<String>,
    pub youtube_uri: Option<String>,
    pub descriptor: Value,
}

impl Performer {
    pub fn from_value(value: &Value) -> Result<Self> {
        let rel = value.get("rel").and_then(Value::as_str).unwrap_or("");
        let id = non_empty_str(value.get("id"));
        // Guest names are hashed exactly as stored, whitespace included.
        let name = value.get("name").and_then(Value::as_str).map(str::to_string);

        let (kind, display_name) = match (rel, id, name) {
            ("user", Some(id), name) => {
                let display = non_empty_str(value.pointer("/names/international"))
                    .or(name)
                    .unwrap_or_else(|| id.clone());
                (PerformerKind::Account { id }, display)
            }
            (_, _, Some(name)) => (PerformerKind::Guest { name: name.clone() }, name),
            (_, Some(id), None) => (PerformerKind::Account { id: id.clone() }, id),
            _ => return Err(anyhow!("performer has neither account id nor name: {value}")),
        };

        Ok(Self {
            kind,
            display_name,
            weblink: non_empty_str(value.get("weblink")),
            country: non_empty_str(value.pointer("/location/country/code")),
            twitch_uri: non_empty_str(value.pointer("/twitch/uri")),
            youtube_uri: non_empty_str(value.pointer("/youtube/uri")),
            descriptor: value.clone(),
        })
    }

    pub fn is_account(&self) -> bool {
        matches!(self.kind, PerformerKind::Account { .. })
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Region/platform/emulation/category columns, only filled in extended mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedInfo {
    pub region: Option<String>,
    pub platform: Option<String>,
    pub emulated: bool,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRun {
    pub id: String,
    pub identity: String,
    pub elapsed_seconds: f64,
    pub time_display: String,
    pub performed_date: Option<NaiveDate>,
    pub comment: Option<String>,
    pub display_names: Vec<String>,
    pub performers: Vec<Performer>,
    pub video_links: Vec<String>,
    pub extended: Option<ExtendedInfo>,
}

impl NormalizedRun {
    pub fn detail(&self) -> RunDetail {
        RunDetail {
            time: self.time_display.clone(),
            time_t: self.elapsed_seconds,
            comment: self.comment.clone(),
            extended: self.extended.clone(),
        }
    }
}

impl fmt::Display for NormalizedRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self
            .performed_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        write!(
            f,
            "{} by {} on {}",
            self.time_display,
            self.display_names.join(" & "),
            date
        )
    }
}

/// Entry of the run-id → attributes map written to the metadata bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunDetail {
    pub time: String,
    pub time_t: f64,
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extended: Option<ExtendedInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Game {
    pub id: String,
    pub names: GameNames,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub assets: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameNames {
    pub international: String,
}

impl Game {
    pub fn name(&self) -> &str {
        &self.names.international
    }

    pub fn cover_uri(&self) -> Option<&str> {
        self.assets
            .pointer("/cover-large/uri")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl Category {
    pub fn is_per_game(&self) -> bool {
        self.kind == "per-game"
    }
}

fn vec_or_default<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    let value = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

fn map_or_default<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<HashMap<String, Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
        .collect())
}

fn status_or_default<'de, D>(deserializer: D) -> std::result::Result<RunStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<RunStatus>::deserialize(deserializer)?.unwrap_or_default())
}

fn system_or_default<'de, D>(deserializer: D) -> std::result::Result<RunSystem, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<RunSystem>::deserialize(deserializer)?.unwrap_or_default())
}
