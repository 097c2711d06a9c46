use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub identity: IdentitySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind: String,
    /// Origin allowed by CORS
    pub frontend_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSection {
    /// JSON data file (default: ~/.tally/tally.json)
    pub data_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProviderKind {
    /// Verify bearer tokens against a hosted identity service
    Remote,
    /// Fixed token → user id table, for local use
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySection {
    pub provider: IdentityProviderKind,
    /// For provider = "remote": service base URL
    pub base_url: Option<String>,
    /// For provider = "remote": project API key sent as `apikey`
    pub api_key: Option<String>,
    /// For provider = "static": token → user id
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3001".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
        }
    }
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            provider: IdentityProviderKind::Static,
            base_url: None,
            api_key: None,
            tokens: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Apply `TALLY_BIND`, `TALLY_IDENTITY_URL` and `TALLY_IDENTITY_KEY`.
    /// Setting an identity URL switches the provider to remote.
    pub fn apply_env(&mut self) {
        if let Ok(bind) = std::env::var("TALLY_BIND") {
            self.server.bind = bind;
        }
        if let Ok(url) = std::env::var("TALLY_IDENTITY_URL") {
            self.identity.provider = IdentityProviderKind::Remote;
            self.identity.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("TALLY_IDENTITY_KEY") {
            self.identity.api_key = Some(key);
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    let mut cfg = if p.exists() {
        let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
        parse_config(&s)?
    } else {
        Config::default()
    };
    cfg.apply_env();
    Ok(cfg)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
