pub mod captcha;
pub mod domains;
pub mod fingerprint;
pub mod resolve;
pub mod sites;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use mirrorscout::config::{Environment, Settings, SitesDocument};

/// Settings and environment shared by every command.
pub struct Context {
    pub settings: Settings,
    pub env: Environment,
}

impl Context {
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let settings = match config {
            Some(path) => Settings::load_from(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => Settings::load().context("loading settings")?,
        };
        let env = Environment::from_env()?;
        Ok(Self { settings, env })
    }

    pub fn sites_path(&self) -> PathBuf {
        self.settings.sites_path()
    }

    pub fn sites(&self) -> Result<SitesDocument> {
        let path = self.sites_path();
        SitesDocument::load(&path).with_context(|| {
            format!(
                "no usable sites document at {} (run `mirrorscout domains refresh` or set sites_file)",
                path.display()
            )
        })
    }
}
