use crate::transfer::{
    Limits,
    limits::{DEFAULT_CHUNK_SIZE_BYTES, DEFAULT_SINGLE_PART_LIMIT_BYTES},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::{collections::BTreeMap, fs::File, path::PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub hosts: BTreeMap<String, Host>,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    pub endpoint: String,
    pub access_token: SecretString,
    pub chunk_size: Option<u64>,
    pub single_part_limit: Option<u64>,
}

impl Config {
    /// # Errors
    ///
    /// Will return `Err` if the config file cannot be opened or parsed
    pub fn new(config_path: PathBuf) -> Result<Self> {
        let context = format!("unable to open {}", config_path.display());
        let file = File::open(config_path).context(context)?;

        let config: Self =
            serde_yaml_ng::from_reader(file).context("unable to parse config file")?;

        Ok(config)
    }

    /// Get the host from the config.yml
    ///
    /// # Errors
    ///
    /// Will return `Err` if the host is not defined
    pub fn get_host(&self, name: &str) -> Result<&Host> {
        self.hosts
            .get(name)
            .with_context(|| format!("could not find host {name}"))
    }
}

impl Host {
    /// Transfer thresholds for this host, falling back to the defaults.
    #[must_use]
    pub fn limits(&self) -> Limits {
        Limits::new(
            self.single_part_limit
                .unwrap_or(DEFAULT_SINGLE_PART_LIMIT_BYTES),
            self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE_BYTES),
        )
    }
}
