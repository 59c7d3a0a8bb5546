// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine configuration and its storage port.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::energy::Energy;

/// Store key under which [`EngineConfig`] is persisted.
pub const ENGINE_CONFIG_KEY: &str = "engine";

/// Default evaluation step budget.
pub const DEFAULT_ENERGY_BUDGET: u64 = 100_000;
/// Default limit on nested tag lookups.
pub const DEFAULT_MAX_DEPTH: u32 = 128;

/// Tag-mask spaces, most transient / most local first.
pub const DEFAULT_SPACE_PRIORITY: [&str; 6] = [
    "tempLocal",
    "local",
    "tempShared",
    "remoteTempShared",
    "shared",
    "admin",
];

/// Historical tag-name prefixes consulted when a tag is missing.
pub const DEFAULT_LEGACY_TAG_PREFIXES: [&str; 1] = ["aux"];

/// Tunables for value resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Step budget granted to each top-level resolve or query.
    pub energy_budget: u64,
    /// Maximum nesting of tag lookups made from inside formulas.
    pub max_depth: u32,
    /// Mask spaces in resolution order; the first defining space wins.
    pub space_priority: Vec<String>,
    /// Prefixes of legacy tag aliases (`color` → `auxColor`).
    pub legacy_tag_prefixes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            energy_budget: DEFAULT_ENERGY_BUDGET,
            max_depth: DEFAULT_MAX_DEPTH,
            space_priority: Vec::from(DEFAULT_SPACE_PRIORITY.map(str::to_owned)),
            legacy_tag_prefixes: Vec::from(DEFAULT_LEGACY_TAG_PREFIXES.map(str::to_owned)),
        }
    }
}

impl EngineConfig {
    /// Fresh energy counter sized by this config.
    #[must_use]
    pub fn energy(&self) -> Energy {
        Energy::new(self.energy_budget, self.max_depth)
    }

    /// Candidate legacy aliases for `tag`, in lookup order.
    pub fn legacy_aliases<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = String> + 'a {
        let mut chars = tag.chars();
        let capitalized = chars
            .next()
            .map(|first| first.to_uppercase().chain(chars).collect::<String>());
        self.legacy_tag_prefixes
            .iter()
            .filter_map(move |prefix| capitalized.as_ref().map(|rest| format!("{prefix}{rest}")))
    }
}

/// Storage port for raw config blobs (keyed by logical name).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Serializes config values as JSON and delegates storage to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize a config value for `key`. Returns `Ok(None)` if missing.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialize and persist a config value for `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }

    /// Loads the engine config, falling back to defaults when none is stored.
    pub fn load_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        Ok(self.load(ENGINE_CONFIG_KEY)?.unwrap_or_default())
    }
}
