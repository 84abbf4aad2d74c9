use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::assets::FlagSource;
use crate::identity::identity_of_performers;
use crate::model::{ExtendedInfo, NormalizedRun, Performer, RawRun};
use crate::session::SessionCache;

/// Custom-variable value that marks a run as having no trustworthy date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedMarker {
    pub variable: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub use_hours: bool,
    pub use_milliseconds: bool,
    pub include_extended: bool,
    pub unverified_marker: Option<UnverifiedMarker>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            use_hours: true,
            use_milliseconds: true,
            include_extended: false,
            unverified_marker: None,
        }
    }
}

pub struct Normalizer {
    options: NormalizeOptions,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Builds the canonical record for one run and requests a flag for every
    /// performer country not yet seen this session. A run whose date cannot
    /// be resolved comes back with `performed_date == None`.
    pub fn normalize(
        &self,
        raw: &RawRun,
        session: &mut SessionCache,
        flags: &dyn FlagSource,
    ) -> Result<NormalizedRun> {
        let performers = raw
            .performer_values()
            .iter()
            .map(Performer::from_value)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("run {}", raw.id))?;

        for country in performers.iter().filter_map(|p| p.country.as_deref()) {
            session.request_flag(country, flags);
        }

        let elapsed = raw.times.primary_t;
        let extended = self.options.include_extended.then(|| ExtendedInfo {
            region: raw.region_name(),
            platform: raw.platform_name(),
            emulated: raw.system.emulated,
            category: raw.category_label(),
        });

        Ok(NormalizedRun {
            id: raw.id.clone(),
            identity: identity_of_performers(&performers),
            elapsed_seconds: elapsed,
            time_display: format_run_time(
                elapsed,
                self.options.use_hours,
                self.options.use_milliseconds,
            ),
            performed_date: resolve_performed_date(raw, self.options.unverified_marker.as_ref()),
            comment: raw.comment.clone(),
            display_names: performers.iter().map(|p| p.display_name.clone()).collect(),
            performers,
            video_links: raw.video_links(),
            extended,
        })
    }
}

/// `H:MM:SS.mmm`. Dropping milliseconds truncates the rendered string;
/// dropping hours removes the leading field entirely.
pub fn format_run_time(seconds: f64, use_hours: bool, use_milliseconds: bool) -> String {
    let hours = (seconds / 3600.0).trunc() as u64;
    let minutes = ((seconds / 60.0) % 60.0).trunc() as u64;
    let secs = seconds % 60.0;
    let mut rendered = format!("{hours}:{minutes:02}:{secs:06.3}");
    if !use_milliseconds {
        rendered.truncate(rendered.len().saturating_sub(4));
    }
    if !use_hours
        && let Some((_, rest)) = rendered.split_once(':')
    {
        rendered = rest.to_string();
    }
    rendered
}

/// Date priority: unverified marker (no date), explicit `date`, then the
/// submission timestamp, then the verification timestamp.
pub fn resolve_performed_date(raw: &RawRun, marker: Option<&UnverifiedMarker>) -> Option<NaiveDate> {
    if let Some(marker) = marker
        && raw.values.get(&marker.variable) == Some(&marker.value)
    {
        return None;
    }

    if let Some(date) = raw.date.as_deref() {
        match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
            Ok(parsed) => return Some(parsed),
            Err(err) => debug!(run = %raw.id, date, "unparsable run date: {err}"),
        }
    }

    raw.submitted
        .as_deref()
        .and_then(parse_timestamp_date)
        .or_else(|| raw.status.verify_date.as_deref().and_then(parse_timestamp_date))
}

/// Calendar date of an API timestamp, in the timestamp's own offset.
pub fn parse_timestamp_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(dt.date_naive());
    }

    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(cleaned, "%Y-%m-%d").ok()
}
