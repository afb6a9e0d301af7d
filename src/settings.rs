use std::path::PathBuf;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

pub const DEFAULT_OVERVIEW_URL: &str =
    "https://mitsuba.readthedocs.io/en/latest/src/plugin_reference.html";
const CONFIG_FILE: &str = "mitsuba_scene";
const ENV_PREFIX: &str = "MITSUBA";

/// Generator settings: defaults, then `mitsuba_scene.toml` (optional), then
/// `MITSUBA_*` environment variables. CLI flags are applied on top by `main`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub overview_url: String,
    pub out_dir: PathBuf,
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub user_agent: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .set_default("overview_url", DEFAULT_OVERVIEW_URL)?
            .set_default("out_dir", "mitsuba_scene_description")?
            .set_default("timeout_secs", 30_i64)?
            .set_default("concurrency", 8_i64)?
            .set_default(
                "user_agent",
                concat!("mitsuba_scene/", env!("CARGO_PKG_VERSION")),
            )?
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read generator settings")?
            .try_deserialize()
            .context("Invalid generator settings")
    }
}
