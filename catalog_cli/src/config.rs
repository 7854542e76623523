//! Layered configuration for the catalog CLI
//!
//! Defaults, then the TOML config file, then `CATALOG_`-prefixed environment
//! variables, merged with figment.

use anyhow::{Context, Result};
use catalog_client_core::{ApiConfig, CachePolicy, Credentials, MutationSettings, QueryOptions};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub mutation: MutationSection,

    #[serde(default)]
    pub auth: AuthSection,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ApiSection {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CacheSection {
    /// Freshness window in seconds
    pub stale_seconds: u64,
    /// Idle eviction window in seconds
    pub expire_seconds: u64,
    pub refetch_on_focus: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MutationSection {
    /// Refetch the list after a successful mutation. Leave off for backends
    /// that do not persist writes.
    pub refetch_after_commit: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AuthSection {
    pub username: String,
    pub password: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        let defaults = ApiConfig::default();
        Self {
            base_url: defaults.base_url,
            timeout_seconds: defaults.timeout.as_secs(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            stale_seconds: 300,
            expire_seconds: 1800,
            refetch_on_focus: true,
        }
    }
}

impl Default for MutationSection {
    fn default() -> Self {
        Self {
            refetch_after_commit: false,
        }
    }
}

impl Default for AuthSection {
    fn default() -> Self {
        let defaults = Credentials::default();
        Self {
            username: defaults.username,
            password: defaults.password,
        }
    }
}

impl AppConfig {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_seconds),
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            stale_after: Duration::from_secs(self.cache.stale_seconds),
            expires_after: Duration::from_secs(self.cache.expire_seconds),
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::default()
            .with_stale_time(Duration::from_secs(self.cache.stale_seconds))
            .with_refetch_on_focus(self.cache.refetch_on_focus)
    }

    pub fn mutation_settings(&self) -> MutationSettings {
        MutationSettings {
            refetch_after_commit: self.mutation.refetch_after_commit,
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.auth.username.clone(),
            password: self.auth.password.clone(),
        }
    }
}

/// Load the layered configuration from the given file path
pub fn load_config(path: &Path) -> Result<AppConfig> {
    Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CATALOG_").split("__"))
        .extract()
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_no_file_exists() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.api.base_url, "https://fakestoreapi.com");
        assert_eq!(config.cache.stale_seconds, 300);
        assert!(!config.mutation.refetch_after_commit);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[api]\nbase_url = \"http://localhost:9000\"\ntimeout_seconds = 5\n\n[cache]\nstale_seconds = 60\nexpire_seconds = 600\nrefetch_on_focus = false\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.cache.stale_seconds, 60);
        assert!(!config.cache.refetch_on_focus);
        // Untouched sections keep their defaults.
        assert_eq!(config.auth.username, "admin");
    }
}
