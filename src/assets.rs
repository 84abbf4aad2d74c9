use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::http_client::http_client;
use crate::model::Game;

pub const COVER_FILE: &str = "_cover.png";
const FLAG_URL_BASE: &str = "https://flagcdn.com/64x48";

/// Something that can make a country's flag image available locally.
/// Returns `Ok(true)` when the asset exists afterwards.
pub trait FlagSource {
    fn fetch_flag(&self, country: &str) -> Result<bool>;
}

/// Avatars and the cover share one directory keyed by identity; flags live
/// in their own directory keyed by country code.
#[derive(Debug, Clone)]
pub struct AssetLayout {
    pub avatar_dir: PathBuf,
    pub flag_dir: PathBuf,
}

impl AssetLayout {
    pub fn new(avatar_dir: impl Into<PathBuf>, flag_dir: impl Into<PathBuf>) -> Self {
        Self {
            avatar_dir: avatar_dir.into(),
            flag_dir: flag_dir.into(),
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.avatar_dir)
            .with_context(|| format!("create {}", self.avatar_dir.display()))?;
        fs::create_dir_all(&self.flag_dir)
            .with_context(|| format!("create {}", self.flag_dir.display()))?;
        Ok(())
    }

    pub fn avatar_path(&self, identity: &str) -> PathBuf {
        self.avatar_dir.join(format!("{identity}.png"))
    }

    pub fn cover_path(&self) -> PathBuf {
        self.avatar_dir.join(COVER_FILE)
    }

    pub fn flag_path(&self, country: &str) -> PathBuf {
        self.flag_dir.join(format!("{}.png", flag_file_stem(country)))
    }
}

// Subdivision codes look like "ca/qc".
fn flag_file_stem(country: &str) -> String {
    country.replace('/', "-")
}

fn flag_url(country: &str) -> String {
    let base = country.split('/').next().unwrap_or(country);
    format!("{FLAG_URL_BASE}/{}.png", base.to_ascii_lowercase())
}

/// Streams `url` into `dest`. A non-success status is `Ok(false)` and
/// leaves `dest` untouched.
pub fn download_file(url: &str, dest: &Path) -> Result<bool> {
    let client = http_client()?;
    let mut resp = client
        .get(url)
        .send()
        .with_context(|| format!("request {url}"))?;
    if !resp.status().is_success() {
        return Ok(false);
    }

    let tmp = prepare_download(dest)?;
    {
        let mut file =
            File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        resp.copy_to(&mut file)
            .with_context(|| format!("write {}", tmp.display()))?;
    }
    fs::rename(&tmp, dest).with_context(|| format!("swap {}", dest.display()))?;
    Ok(true)
}

// Creates the destination directory and returns the staging path.
fn prepare_download(dest: &Path) -> Result<PathBuf> {
    if let Some(dir) = dest.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    Ok(dest.with_extension("png.tmp"))
}

pub struct FlagDownloader<'a> {
    layout: &'a AssetLayout,
}

impl<'a> FlagDownloader<'a> {
    pub fn new(layout: &'a AssetLayout) -> Self {
        Self { layout }
    }
}

impl FlagSource for FlagDownloader<'_> {
    fn fetch_flag(&self, country: &str) -> Result<bool> {
        let dest = self.layout.flag_path(country);
        if dest.exists() {
            return Ok(true);
        }
        download_file(&flag_url(country), &dest)
    }
}

pub fn download_cover(game: &Game, layout: &AssetLayout) -> Result<bool> {
    let Some(uri) = game.cover_uri() else {
        return Ok(false);
    };
    download_file(uri, &layout.cover_path())
}
