//! Configuration and collaborator factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use assessforge_core::draft::DraftStore;
use assessforge_core::reference::ReferenceNormalizer;
use assessforge_core::traits::{Submitter, Uploader};

use crate::file_store::FileStore;
use crate::http::HttpBackend;
use crate::mock::{MockSubmitter, MockUploader};

/// Where uploads and submissions go.
///
/// Note: Custom Debug impl masks the API token to prevent accidental exposure in logs.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Http {
        base_url: String,
        #[serde(default)]
        api_token: Option<String>,
    },
    #[default]
    Mock,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Http {
                base_url,
                api_token,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_token", &api_token.as_ref().map(|_| "***"))
                .finish(),
            BackendConfig::Mock => f.write_str("Mock"),
        }
    }
}

/// Public storage location that relative resource paths resolve against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_base_url")]
    pub base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_storage_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftsConfig {
    /// Directory holding one JSON file per draft.
    #[serde(default = "default_drafts_dir")]
    pub dir: PathBuf,
    /// Prefix for every draft key.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            dir: default_drafts_dir(),
            namespace: default_namespace(),
        }
    }
}

fn default_storage_base_url() -> String {
    "http://localhost:9000/assessforge".to_string()
}
fn default_drafts_dir() -> PathBuf {
    PathBuf::from("./.assessforge/drafts")
}
fn default_namespace() -> String {
    "assessforge-draft".to_string()
}

/// Top-level assessforge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessforgeConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub drafts: DraftsConfig,
}

impl AssessforgeConfig {
    pub fn normalizer(&self) -> ReferenceNormalizer {
        ReferenceNormalizer::new(&self.storage.base_url)
    }

    pub fn draft_store(&self) -> DraftStore {
        DraftStore::new(
            Arc::new(FileStore::new(&self.drafts.dir)),
            &self.drafts.namespace,
        )
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(len) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + len];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + len + 1..]);
    }
    result
}

fn resolve_backend_config(config: &BackendConfig) -> BackendConfig {
    match config {
        BackendConfig::Http {
            base_url,
            api_token,
        } => BackendConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_token: api_token.as_deref().map(resolve_env_vars),
        },
        BackendConfig::Mock => BackendConfig::Mock,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `assessforge.toml` in the current directory
/// 2. `~/.config/assessforge/config.toml`
///
/// Environment variable overrides: `ASSESSFORGE_STORAGE_BASE_URL`, `ASSESSFORGE_API_TOKEN`.
pub fn load_config() -> Result<AssessforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AssessforgeConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("assessforge.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => AssessforgeConfig::default(),
    };

    // Apply env var overrides
    if let Ok(base_url) = std::env::var("ASSESSFORGE_STORAGE_BASE_URL") {
        config.storage.base_url = base_url;
    }
    if let Ok(token) = std::env::var("ASSESSFORGE_API_TOKEN") {
        if let BackendConfig::Http { api_token, .. } = &mut config.backend {
            *api_token = Some(token);
        }
    }

    Ok(config)
}

/// Parse config text and resolve `${VAR}` references.
pub fn parse_config(content: &str) -> Result<AssessforgeConfig> {
    let mut config: AssessforgeConfig = toml::from_str(content)?;
    config.storage.base_url = resolve_env_vars(&config.storage.base_url);
    config.backend = resolve_backend_config(&config.backend);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("assessforge"))
}

/// Create the upload collaborator for a backend.
pub fn create_uploader(config: &BackendConfig) -> Arc<dyn Uploader> {
    match config {
        BackendConfig::Http {
            base_url,
            api_token,
        } => Arc::new(HttpBackend::new(base_url, api_token.clone())),
        BackendConfig::Mock => Arc::new(MockUploader::new()),
    }
}

/// Create the submission collaborator for a backend.
pub fn create_submitter(config: &BackendConfig) -> Arc<dyn Submitter> {
    match config {
        BackendConfig::Http {
            base_url,
            api_token,
        } => Arc::new(HttpBackend::new(base_url, api_token.clone())),
        BackendConfig::Mock => Arc::new(MockSubmitter::accepting()),
    }
}
