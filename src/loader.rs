//! Locating transform definitions and caching loaded engines per form hash.

use crate::config::{BridgeConfig, TransformDefinition};
use crate::transformer::TransformEngine;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// File extensions tried, in order, when looking up `<dir>/<hash>.<ext>`.
const DEFINITION_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Where definitions come from: inline configuration first, then a directory.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSource {
    inline: Arc<HashMap<String, Arc<TransformDefinition>>>,
    dir: Option<PathBuf>,
}

impl DefinitionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        let mut source = Self::new();
        for (hash, definition) in &config.definitions {
            source = source.with_inline(hash.clone(), definition.clone());
        }
        match &config.settings.definition_dir {
            Some(dir) => source.with_dir(dir),
            None => source,
        }
    }

    /// Register a definition under `hash`.
    pub fn with_inline(mut self, hash: impl Into<String>, definition: TransformDefinition) -> Self {
        Arc::make_mut(&mut self.inline).insert(hash.into(), Arc::new(definition));
        self
    }

    /// Look up definitions not found inline in `dir`.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Locate and parse the definition for `hash`.
    pub fn load(&self, hash: &str) -> Result<Arc<TransformDefinition>, LoadError> {
        validate_hash(hash)?;

        if let Some(definition) = self.inline.get(hash) {
            debug!(form = hash, "Using inline transform definition");
            return Ok(Arc::clone(definition));
        }

        let dir = self.dir.as_deref().ok_or_else(|| LoadError::NoDefinitionDir {
            hash: hash.to_string(),
        })?;
        if !dir.is_dir() {
            return Err(LoadError::DirectoryMissing(dir.to_path_buf()));
        }

        let path = DEFINITION_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", hash, ext)))
            .find(|path| path.is_file())
            .ok_or_else(|| LoadError::NotFound {
                hash: hash.to_string(),
                dir: dir.to_path_buf(),
            })?;

        debug!(form = hash, path = %path.display(), "Loading transform definition");
        let content = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;

        let definition = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|source| LoadError::Json {
                path: path.clone(),
                source,
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|source| LoadError::Yaml {
                path: path.clone(),
                source,
            })?
        };

        Ok(Arc::new(definition))
    }
}

/// Hashes become file names, so only allow characters that cannot escape
/// the definition directory.
fn validate_hash(hash: &str) -> Result<(), LoadError> {
    let valid = !hash.is_empty()
        && hash
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(LoadError::InvalidHash(hash.to_string()))
    }
}

/// Loaded engines keyed by form hash, kept for the process lifetime.
pub struct EngineCache {
    source: DefinitionSource,
    engines: RwLock<HashMap<String, Arc<TransformEngine>>>,
}

impl EngineCache {
    pub fn new(source: DefinitionSource) -> Self {
        Self {
            source,
            engines: RwLock::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &DefinitionSource {
        &self.source
    }

    /// Return the engine for `hash`, loading it on first use.
    ///
    /// Failed loads are not cached.
    pub async fn get_or_load(&self, hash: &str) -> Result<Arc<TransformEngine>, LoadError> {
        if let Some(engine) = self.engines.read().await.get(hash) {
            return Ok(Arc::clone(engine));
        }

        // Directory lookups hit the filesystem; keep them off the runtime workers
        let source = self.source.clone();
        let form = hash.to_string();
        let engine = tokio::task::spawn_blocking(move || TransformEngine::load(&source, &form))
            .await??;
        let engine = Arc::new(engine);

        let mut engines = self.engines.write().await;
        let engine = Arc::clone(engines.entry(hash.to_string()).or_insert(engine));
        info!(form = hash, cached = engines.len(), "Transform definition loaded");
        Ok(engine)
    }

    /// Number of cached engines.
    pub async fn len(&self) -> usize {
        self.engines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.engines.read().await.is_empty()
    }

    /// Drop every cached engine; the next request reloads from the source.
    pub async fn clear(&self) {
        self.engines.write().await.clear();
    }
}

/// Transform definition loading errors.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid form hash '{0}'")]
    InvalidHash(String),

    #[error("No inline definition for '{hash}' and no definition directory configured")]
    NoDefinitionDir { hash: String },

    #[error("Definition directory {} does not exist", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("No definition for '{hash}' in {}", .dir.display())]
    NotFound { hash: String, dir: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML parse error in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("JSON parse error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Definition load task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
