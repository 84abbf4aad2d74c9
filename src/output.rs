use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::players::PlayerDirectory;
use crate::timeline::{DetailMap, Timeline};

pub const TIMELINE_FILE: &str = "runs.csv";
pub const METADATA_FILE: &str = "metadata.json";

/// The JSON bundle that accompanies the timeline table.
#[derive(Debug, Serialize)]
pub struct Metadata<'a> {
    pub game: &'a str,
    pub category: &'a str,
    pub runs: &'a DetailMap,
    pub players: &'a PlayerDirectory,
    pub pfps: &'a [String],
    pub cover: bool,
    pub flags: &'a [String],
}

pub fn write_timeline<W: Write>(timeline: &Timeline, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(timeline.identities.len() + 1);
    header.push("date");
    header.extend(timeline.identities.iter().map(String::as_str));
    writer.write_record(&header)?;

    for row in &timeline.rows {
        let mut record = Vec::with_capacity(row.cells.len() + 1);
        record.push(row.date.format("%Y-%m-%d").to_string());
        record.extend(row.cells.iter().map(|c| c.clone().unwrap_or_default()));
        writer.write_record(&record)?;
    }
    writer.flush().context("flush timeline csv")?;
    Ok(())
}

pub fn write_timeline_file(timeline: &Timeline, path: &Path) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    let file = File::create(&tmp).with_context(|| format!("failed to create {}", tmp.display()))?;
    write_timeline(timeline, file)?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

pub fn metadata_json(metadata: &Metadata<'_>) -> Result<String> {
    serde_json::to_string(metadata).context("serialize metadata")
}

pub fn write_metadata_file(metadata: &Metadata<'_>, path: &Path) -> Result<()> {
    let json = metadata_json(metadata)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}
