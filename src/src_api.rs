use std::fmt;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::http_client::http_client;
use crate::model::{Category, Game, RawRun};

pub const DEFAULT_API_BASE: &str = "https://www.speedrun.com/api/v1/";
pub const RUNS_PAGE_SIZE: usize = 200;

const RUN_EMBEDS: &str = "players,platform,region";

#[derive(Debug)]
pub enum ApiError {
    /// Non-200 response, with the payload's `message` when it had one.
    Status { status: u16, message: Option<String> },
    /// The request succeeded but `data` was empty; marks the end of paging.
    NoResults,
    Transport(reqwest::Error),
    Decode(serde_json::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Status {
                status,
                message: Some(message),
            } => write!(f, "{status}: {message}"),
            ApiError::Status { status, .. } => write!(f, "{status}"),
            ApiError::NoResults => write!(f, "no results"),
            ApiError::Transport(err) => write!(f, "request failed: {err}"),
            ApiError::Decode(err) => write!(f, "invalid api json: {err}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Transport(err) => Some(err),
            ApiError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

/// Maps a raw response onto the envelope's `data` member.
pub fn parse_api_response(status: u16, raw: &str) -> Result<Value, ApiError> {
    let parsed = serde_json::from_str::<Value>(raw.trim());
    if status != 200 {
        let message = parsed
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.is_empty());
        return Err(ApiError::Status { status, message });
    }

    let mut root = parsed.map_err(ApiError::Decode)?;
    match root.get_mut("data").map(Value::take) {
        Some(Value::Array(items)) if items.is_empty() => Err(ApiError::NoResults),
        Some(data) => Ok(data),
        None => Ok(root),
    }
}

/// Runs from one page of the runs endpoint.
pub fn parse_runs_page_json(raw: &str) -> Result<Vec<RawRun>> {
    match parse_api_response(200, raw) {
        Ok(data) => serde_json::from_value(data).context("invalid runs page"),
        Err(ApiError::NoResults) => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

pub struct SrcApi {
    base: String,
    client: &'static Client,
}

impl SrcApi {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            base,
            client: http_client()?,
        })
    }

    pub fn fetch(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base, path);
        debug!(%url, ?params, "api request");
        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .map_err(ApiError::Transport)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(ApiError::Transport)?;
        parse_api_response(status, &body)
    }

    /// Tries an abbreviation search first, then a name search. An empty
    /// result means neither matched.
    pub fn search_games(&self, query: &str, max: usize) -> Result<Vec<Game>> {
        let mut last_err = None;
        for key in ["abbreviation", "name"] {
            let params = [
                ("_bulk", "0".to_string()),
                ("max", max.to_string()),
                (key, query.to_string()),
            ];
            match self.fetch("games", &params) {
                Ok(data) => return serde_json::from_value(data).context("invalid games json"),
                Err(ApiError::NoResults) => continue,
                Err(err) => last_err = Some(err),
            }
        }
        match last_err {
            Some(err) => Err(err.into()),
            None => Ok(Vec::new()),
        }
    }

    pub fn fetch_game(&self, game_id: &str) -> Result<Game> {
        let data = self.fetch(&format!("games/{game_id}"), &[])?;
        serde_json::from_value(data).context("invalid game json")
    }

    pub fn per_game_categories(&self, game_id: &str) -> Result<Vec<Category>> {
        let data = match self.fetch(&format!("games/{game_id}/categories"), &[]) {
            Ok(data) => data,
            Err(ApiError::NoResults) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let categories: Vec<Category> =
            serde_json::from_value(data).context("invalid categories json")?;
        Ok(categories.into_iter().filter(Category::is_per_game).collect())
    }

    pub fn fetch_category(&self, category_id: &str) -> Result<Category> {
        let data = self.fetch(&format!("categories/{category_id}"), &[])?;
        serde_json::from_value(data).context("invalid category json")
    }

    /// Every verified run in a category, page by page, each tagged with the
    /// category's display name.
    pub fn fetch_category_runs(&self, category: &Category) -> Result<Vec<RawRun>> {
        let mut pager = RunsPager::new(&category.name);
        while !pager.is_done() {
            let offset = pager.offset();
            let params = [
                ("category", category.id.clone()),
                ("status", "verified".to_string()),
                ("max", RUNS_PAGE_SIZE.to_string()),
                ("offset", offset.to_string()),
                ("embed", RUN_EMBEDS.to_string()),
            ];
            pager
                .accept(self.fetch("runs", &params))
                .with_context(|| format!("runs for {} at offset {offset}", category.name))?;
            debug!(category = %category.name, fetched = pager.fetched(), "runs page");
        }
        info!(category = %category.name, runs = pager.fetched(), "fetched verified runs");
        Ok(pager.into_runs())
    }
}

/// Accumulates runs pages until an empty or short page ends the listing.
#[derive(Debug)]
pub struct RunsPager {
    category_name: String,
    offset: usize,
    runs: Vec<RawRun>,
    done: bool,
}

impl RunsPager {
    pub fn new(category_name: &str) -> Self {
        Self {
            category_name: category_name.to_string(),
            offset: 0,
            runs: Vec::new(),
            done: false,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn fetched(&self) -> usize {
        self.runs.len()
    }

    /// Takes one page response. `NoResults` finishes the listing; any other
    /// error is returned and leaves the pager unchanged.
    pub fn accept(&mut self, page: Result<Value, ApiError>) -> Result<()> {
        let data = match page {
            Ok(data) => data,
            Err(ApiError::NoResults) => {
                self.done = true;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let mut runs: Vec<RawRun> = serde_json::from_value(data).context("invalid runs json")?;
        if runs.len() < RUNS_PAGE_SIZE {
            self.done = true;
        }
        for run in &mut runs {
            run.category_name = Some(self.category_name.clone());
        }
        self.offset += RUNS_PAGE_SIZE;
        self.runs.append(&mut runs);
        Ok(())
    }

    pub fn into_runs(self) -> Vec<RawRun> {
        self.runs
    }
}
