//! Optional TOML defaults for the command-line tool.
//!
//! ```toml
//! [matching]
//! backend = "r_tree"
//! order = "ascending"
//! threads = 8
//! sequential = false
//! chunk_size = 256
//! unmatched = "out"
//! empty = "empty"
//!
//! [distance]
//! metric = "euclidean"
//! nearest_k = 5
//! threads = 0
//! block_size = 1024
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::Sentinels;
use crate::parallel::Parallelism;
use crate::pip::{CandidateOrder, IndexBackend};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub matching: MatchingConfig,
    pub distance: DistanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MatchingConfig {
    pub backend: IndexBackend,
    pub order: CandidateOrder,
    /// Worker threads, 0 uses every core
    pub threads: usize,
    /// Match on the calling thread, ignoring `threads`
    pub sequential: bool,
    pub chunk_size: usize,
    pub unmatched: String,
    pub empty: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let sentinels = Sentinels::default();
        Self {
            backend: IndexBackend::default(),
            order: CandidateOrder::default(),
            threads: 0,
            sequential: false,
            chunk_size: 1,
            unmatched: sentinels.unmatched,
            empty: sentinels.empty,
        }
    }
}

impl MatchingConfig {
    pub fn parallelism(&self) -> Parallelism {
        if self.sequential {
            Parallelism::Sequential
        } else {
            Parallelism::Threads {
                threads: self.threads,
                chunk_size: self.chunk_size,
            }
        }
    }

    pub fn sentinels(&self) -> Sentinels {
        Sentinels {
            unmatched: self.unmatched.clone(),
            empty: self.empty.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DistanceConfig {
    pub metric: String,
    pub nearest_k: Option<usize>,
    /// Unset runs on the calling thread, 0 uses every core
    pub threads: Option<usize>,
    /// Rows of A processed (and written) per block
    pub block_size: usize,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            metric: "euclidean".to_string(),
            nearest_k: None,
            threads: None,
            block_size: 1024,
        }
    }
}

impl DistanceConfig {
    pub fn parallelism(&self) -> Parallelism {
        match self.threads {
            None => Parallelism::Sequential,
            Some(threads) => Parallelism::Threads {
                threads,
                chunk_size: 1,
            },
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
