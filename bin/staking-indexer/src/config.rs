use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sidx_indexer::IndexerConfig;

use crate::args::Args;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    /// Directory holding the sled database.
    pub data_dir: PathBuf,

    /// First height to request from the scanner; the store's checkpoint
    /// wins when it is higher.
    pub start_height: u64,

    /// Optional block replay file (see `--blocks-file`).
    pub blocks_file: Option<PathBuf>,

    pub indexer: IndexerConfig,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            start_height: 1,
            blocks_file: None,
            indexer: IndexerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LoggingConfig {
    /// Emit JSON log lines instead of the compact format.
    pub json_format: bool,

    /// Also write logs into this directory when set.
    pub log_dir: Option<PathBuf>,

    pub log_file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            log_dir: None,
            log_file_prefix: "staking-indexer.log".to_owned(),
        }
    }
}

pub(crate) fn load_config(path: Option<&Path>, args: &Args) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => Config::default(),
    };

    // CLI overrides beat the file.
    if let Some(datadir) = &args.datadir {
        config.data_dir = datadir.clone();
    }
    if let Some(start_height) = args.start_height {
        config.start_height = start_height;
    }
    if let Some(blocks_file) = &args.blocks_file {
        config.blocks_file = Some(blocks_file.clone());
    }

    Ok(config)
}
