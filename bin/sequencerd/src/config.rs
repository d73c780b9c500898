use serde::Deserialize;
use std::path::Path;

/// On-disk location of the state commitment log.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateManagerConfig {
    pub root_identity: String,
    pub log_path: String,
}

impl Default for StateManagerConfig {
    fn default() -> Self {
        Self { root_identity: "l2-sequencer".into(), log_path: "state.log".into() }
    }
}

/// Top-level configuration aggregating every engine's own options, loaded
/// from a single TOML file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub bundle_engine: bundle_engine::Config,
    pub tx_optimizer: tx_optimizer::Config,
    pub bridge_engine: bridge_engine::Config,
    pub state_manager: StateManagerConfig,
}

impl Config {
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|err| anyhow::anyhow!("could not read config file `{}`: {err}", path.display()))?;
        toml::from_str(&data).map_err(|err| anyhow::anyhow!("could not parse TOML config `{}`: {err}", path.display()))
    }
}
