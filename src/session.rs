use std::collections::HashSet;

use tracing::{debug, warn};

use crate::assets::FlagSource;

/// Dedup state for one invocation of the collector. Nothing here outlives
/// the process.
#[derive(Debug, Default)]
pub struct SessionCache {
    checked_countries: HashSet<String>,
    flags: Vec<String>,
    checked_identities: HashSet<String>,
    avatars: Vec<String>,
    scanned_runs: HashSet<String>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks `source` for a country's flag at most once per session.
    pub fn request_flag(&mut self, country: &str, source: &dyn FlagSource) {
        if !self.checked_countries.insert(country.to_string()) {
            return;
        }
        match source.fetch_flag(country) {
            Ok(true) => self.flags.push(country.to_string()),
            Ok(false) => debug!(country, "no flag available"),
            Err(err) => warn!(country, "flag download failed: {err:#}"),
        }
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// True the first time an identity is offered for avatar lookup.
    pub fn begin_identity_lookup(&mut self, identity: &str) -> bool {
        self.checked_identities.insert(identity.to_string())
    }

    /// True the first time a run's video links are offered for scanning.
    pub fn begin_vod_scan(&mut self, run_id: &str) -> bool {
        self.scanned_runs.insert(run_id.to_string())
    }

    pub fn mark_avatar(&mut self, identity: &str) {
        if !self.has_avatar(identity) {
            self.avatars.push(identity.to_string());
        }
    }

    pub fn has_avatar(&self, identity: &str) -> bool {
        self.avatars.iter().any(|a| a == identity)
    }

    pub fn avatars(&self) -> &[String] {
        &self.avatars
    }
}
