use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tally_finance::Store;

use crate::config::Config;

/// `$TALLY_HOME`, or `~/.tally`
pub fn tally_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLY_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".tally"))
}

pub fn ensure_tally_home() -> Result<PathBuf> {
    let dir = tally_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn data_path(cfg: &Config) -> Result<PathBuf> {
    match &cfg.storage.data_file {
        Some(p) => Ok(PathBuf::from(p)),
        None => Ok(ensure_tally_home()?.join("tally.json")),
    }
}

pub fn open_store(cfg: &Config) -> Result<Store> {
    let p = data_path(cfg)?;
    Store::open(&p).with_context(|| format!("open store {}", p.display()))
}
