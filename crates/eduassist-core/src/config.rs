//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_VECTOR__SIMILARITY_THRESHOLD`).
//! Paths support `~` and `${VAR}` expansion.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::Error;
use crate::types::DEFAULT_SUBJECT;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view of the whole configuration, validated.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Which strategy answers subject-scoped questions first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Embedding search, keyword scoring as the fallback source.
    Vector,
    /// Keyword scoring only; the vector index is never opened.
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    pub path: String,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self { path: "knowledge_base.json".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    pub uri: String,
    pub table: String,
    pub cache_table: String,
    pub similarity_threshold: f32,
    pub search_k: usize,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            uri: "./data/lancedb".to_string(),
            table: "knowledge_base".to_string(),
            cache_table: "embedding_cache".to_string(),
            similarity_threshold: 0.5,
            search_k: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub default_subject: String,
    pub strategy: Strategy,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self { default_subject: DEFAULT_SUBJECT.to_string(), strategy: Strategy::Vector }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub knowledge: KnowledgeSettings,
    pub vector: VectorSettings,
    pub resolver: ResolverSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        let t = self.vector.similarity_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(Error::InvalidConfig(format!("vector.similarity_threshold must be within [0, 1], got {t}")));
        }
        if self.vector.search_k == 0 {
            return Err(Error::InvalidConfig("vector.search_k must be at least 1".to_string()));
        }
        if self.resolver.default_subject.trim().is_empty() {
            return Err(Error::InvalidConfig("resolver.default_subject must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn knowledge_path(&self) -> PathBuf {
        expand_path(&self.knowledge.path)
    }

    pub fn vector_uri(&self) -> PathBuf {
        expand_path(&self.vector.uri)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

