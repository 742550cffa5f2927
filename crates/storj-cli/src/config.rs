//! Layered configuration (§7.A): built-in defaults → TOML file → CLI flags.
//!
//! Modeled on the teacher's per-binary `Config` struct convention: a
//! `serde`-deserializable struct with `#[serde(default)]` per field and a
//! `clap::Args` sub-struct of optional overrides, merged field-by-field by
//! [`Config::load`]. The uplink's root encryption key has nowhere else to
//! live between invocations, so `load` generates one on first run and writes
//! the whole config back out — the one piece of state this layer persists
//! rather than merely reads.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use storj_crypto::{Cipher, Key, KEY_SIZE};
use storj_erasure::RedundancyScheme;

/// Worst-case AEAD overhead added to a segment's plaintext before it is
/// split into shares (both ciphers this crate uses append a 16-byte tag).
const AEAD_TAG_SIZE: usize = 16;

fn default_node_count() -> usize {
    8
}
fn default_required() -> usize {
    3
}
fn default_repair_threshold() -> usize {
    4
}
fn default_success_threshold() -> usize {
    5
}
fn default_total() -> usize {
    6
}
fn default_segment_size() -> usize {
    64 * 1024 * 1024
}
/// Large enough that `required * share_size` holds a full `default_segment_size`
/// segment plus its AEAD tag — `ErasureCode::encode` rejects anything bigger.
fn default_share_size() -> usize {
    min_share_size(default_required(), default_segment_size())
}
fn default_max_inline_size() -> usize {
    4 * 1024
}
fn default_cipher() -> u8 {
    Cipher::AesGcm.as_u8()
}

/// Smallest `share_size` for which `required * share_size >= segment_size + tag`.
fn min_share_size(required: usize, segment_size: usize) -> usize {
    let capacity_needed = segment_size + AEAD_TAG_SIZE;
    let required = required.max(1);
    capacity_needed.div_ceil(required)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the local satellite/storage-node sled database.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Number of simulated storage nodes the local network hosts.
    #[serde(default = "default_node_count")]
    pub node_count: usize,
    #[serde(default = "default_required")]
    pub required: usize,
    #[serde(default = "default_repair_threshold")]
    pub repair_threshold: usize,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: usize,
    #[serde(default = "default_total")]
    pub total: usize,
    #[serde(default = "default_share_size")]
    pub share_size: usize,
    #[serde(default = "default_segment_size")]
    pub segment_size: usize,
    #[serde(default = "default_max_inline_size")]
    pub max_inline_size: usize,
    /// `storj_crypto::Cipher` as its wire byte; new buckets are created with this.
    #[serde(default = "default_cipher")]
    pub path_cipher: u8,
    /// Hex-encoded root key, generated once on first run and persisted.
    #[serde(default)]
    pub root_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            node_count: default_node_count(),
            required: default_required(),
            repair_threshold: default_repair_threshold(),
            success_threshold: default_success_threshold(),
            total: default_total(),
            share_size: default_share_size(),
            segment_size: default_segment_size(),
            max_inline_size: default_max_inline_size(),
            path_cipher: default_cipher(),
            root_key: None,
        }
    }
}

/// CLI-flag overrides, `#[command(flatten)]`-ed onto every sub-command (§7.A).
#[derive(Debug, Args)]
pub struct ConfigOverrides {
    /// Directory for the local satellite/storage-node database.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,
    /// Number of simulated storage nodes.
    #[arg(long, global = true)]
    pub node_count: Option<usize>,
}

impl Config {
    pub fn redundancy(&self) -> RedundancyScheme {
        RedundancyScheme {
            required: self.required,
            repair_threshold: self.repair_threshold,
            success_threshold: self.success_threshold,
            total: self.total,
            share_size: self.share_size,
        }
    }

    pub fn cipher(&self) -> Cipher {
        Cipher::from_u8(self.path_cipher).unwrap_or(Cipher::AesGcm)
    }

    pub fn root_key(&self) -> Result<Key> {
        let hex_key = self
            .root_key
            .as_deref()
            .context("root key missing after Config::load, this is a bug")?;
        let bytes = hex::decode(hex_key).context("root key in config is not valid hex")?;
        let array: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("root key in config has the wrong length"))?;
        Ok(Key::from_bytes(array))
    }

    pub fn resolved_db_path(&self, default_dir: &Path) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| default_dir.join("db"))
    }

    /// Default per-user config file path (§6 "default: platform-specific
    /// per-user config dir").
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "storj", "storj-cli")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn default_state_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "storj", "storj-cli")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Load defaults, overlay the TOML file at `config_path` if present,
    /// apply `overrides`, then persist a generated root key back to disk if
    /// this is the first run at that path.
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path);

        let mut config = match &path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            _ => Config::default(),
        };

        if let Some(db_path) = overrides.db_path {
            config.db_path = Some(db_path);
        }
        if let Some(node_count) = overrides.node_count {
            config.node_count = node_count;
        }

        let needed = min_share_size(config.required, config.segment_size);
        let mut adjusted_share_size = false;
        if config.share_size < needed {
            config.share_size = needed;
            adjusted_share_size = true;
        }

        let mut generated_key = false;
        if config.root_key.is_none() {
            let mut bytes = [0u8; KEY_SIZE];
            OsRng.fill_bytes(&mut bytes);
            config.root_key = Some(hex::encode(bytes));
            generated_key = true;
        }
        if config.db_path.is_none() {
            if let Some(state_dir) = Self::default_state_dir() {
                config.db_path = Some(state_dir.join("db"));
            }
        }

        if let Some(path) = &path {
            if generated_key || adjusted_share_size || !path.exists() {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating config directory {}", parent.display()))?;
                }
                let serialized = toml::to_string_pretty(&config).context("serializing config")?;
                std::fs::write(path, serialized)
                    .with_context(|| format!("writing config file {}", path.display()))?;
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_generates_and_persists_a_root_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let first = Config::load(Some(&path), ConfigOverrides { db_path: None, node_count: None }).unwrap();
        assert!(first.root_key.is_some());
        assert!(path.exists());

        let second = Config::load(Some(&path), ConfigOverrides { db_path: None, node_count: None }).unwrap();
        assert_eq!(first.root_key, second.root_key, "second load must reuse the persisted key");
    }

    #[test]
    fn shipped_defaults_can_hold_a_full_segment() {
        let config = Config::default();
        assert!(
            config.required * config.share_size >= config.segment_size + AEAD_TAG_SIZE,
            "required * share_size must cover a full segment plus its AEAD tag"
        );
    }

    #[test]
    fn an_undersized_share_size_is_bumped_up_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.share_size = 1;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load(Some(&path), ConfigOverrides { db_path: None, node_count: None }).unwrap();
        assert!(loaded.required * loaded.share_size >= loaded.segment_size + AEAD_TAG_SIZE);

        let persisted: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(persisted.share_size, loaded.share_size, "the bumped share_size must be persisted");
    }

    #[test]
    fn cli_overrides_win_over_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::load(Some(&path), ConfigOverrides { db_path: None, node_count: None }).unwrap();

        let overridden = Config::load(
            Some(&path),
            ConfigOverrides { db_path: None, node_count: Some(42) },
        )
        .unwrap();
        assert_eq!(overridden.node_count, 42);
    }
}
