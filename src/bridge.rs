//! Bridge facade: one Wufoo entry in, SysAid submissions out.

use crate::config::{BridgeConfig, EntryFormat};
use crate::context::TransformContext;
use crate::dispatch::{Connector, DispatchReport, Dispatcher, HttpConnector};
use crate::document::RequestDocument;
use crate::entry::{parse_entry, EntryError};
use crate::loader::{DefinitionSource, EngineCache, LoadError};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Wufoo to SysAid bridge.
///
/// Holds the definition cache, the dispatcher and running counters. Safe to
/// share between tasks.
pub struct Bridge {
    /// Configuration
    config: BridgeConfig,
    /// Loaded transform engines, keyed by form hash
    engines: EngineCache,
    /// Outbound submissions
    dispatcher: Dispatcher,
    /// Stats: entries received.
    submissions_total: AtomicU64,
    /// Stats: requests that got a response.
    requests_sent: AtomicU64,
    /// Stats: transport failures.
    requests_failed: AtomicU64,
    /// Stats: request elements rejected for missing fields.
    requests_invalid: AtomicU64,
    /// Stats: entries whose transform failed.
    transform_errors: AtomicU64,
}

/// Point-in-time copy of the bridge counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub submissions_total: u64,
    pub requests_sent: u64,
    pub requests_failed: u64,
    pub requests_invalid: u64,
    pub transform_errors: u64,
}

impl Bridge {
    /// Create a bridge that posts with `reqwest`.
    pub fn new(config: BridgeConfig) -> Self {
        let connector = HttpConnector::new(
            Duration::from_millis(config.settings.timeout_ms),
            config.settings.user_agent.clone(),
        );
        Self::with_connector(config, Arc::new(connector))
    }

    /// Create a bridge with a custom outbound connector.
    pub fn with_connector(config: BridgeConfig, connector: Arc<dyn Connector>) -> Self {
        let warnings = config.sysaid.warnings();
        for warning in &warnings {
            warn!("{}", warning);
        }
        if warnings.is_empty() {
            debug!(
                url = %config.sysaid.url,
                account_id = %config.sysaid.account_id,
                form_id = %config.sysaid.form_id,
                "SysAid identity configured"
            );
        }

        let engines = EngineCache::new(DefinitionSource::from_config(&config));
        let dispatcher = Dispatcher::new(config.sysaid.clone(), connector);

        info!(
            inline_definitions = config.definitions.len(),
            definition_dir = ?config.settings.definition_dir,
            "Bridge initialized"
        );

        Self {
            config,
            engines,
            dispatcher,
            submissions_total: AtomicU64::new(0),
            requests_sent: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            requests_invalid: AtomicU64::new(0),
            transform_errors: AtomicU64::new(0),
        }
    }

    /// Create from a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> Result<Self, BridgeError> {
        let config: BridgeConfig = serde_yaml::from_str(yaml)?;
        Ok(Self::new(config))
    }

    /// Create from a JSON configuration string.
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn engines(&self) -> &EngineCache {
        &self.engines
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Build the request document for an already parsed entry.
    ///
    /// `Ok(None)` means the transform failed and was logged.
    pub async fn build(
        &self,
        form: &str,
        entry: JsonValue,
    ) -> Result<Option<RequestDocument>, LoadError> {
        let engine = self.engines.get_or_load(form).await?;
        let ctx = TransformContext::for_entry(form, entry);
        let document = engine.transform(&ctx);
        if document.is_none() {
            self.transform_errors.fetch_add(1, Ordering::Relaxed);
        }
        Ok(document)
    }

    /// Parse, transform and dispatch one webhook payload.
    pub async fn submit(
        &self,
        form: &str,
        payload: &[u8],
        format: EntryFormat,
    ) -> Result<DispatchReport, BridgeError> {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);

        let entry = parse_entry(payload, format)?;
        let Some(document) = self.build(form, entry).await? else {
            return Ok(DispatchReport::default());
        };

        let report = self.dispatcher.dispatch(Some(&document)).await;
        self.record(&report);

        info!(
            form,
            requests = report.requests,
            sent = report.sent,
            "Submission processed"
        );

        Ok(report)
    }

    fn record(&self, report: &DispatchReport) {
        self.requests_sent
            .fetch_add(report.sent as u64, Ordering::Relaxed);
        self.requests_failed
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        self.requests_invalid
            .fetch_add(report.invalid as u64, Ordering::Relaxed);
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            submissions_total: self.submissions_total.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_invalid: self.requests_invalid.load(Ordering::Relaxed),
            transform_errors: self.transform_errors.load(Ordering::Relaxed),
        }
    }
}

/// Bridge errors.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Entry error: {0}")]
    Entry(#[from] EntryError),

    #[error("Definition error: {0}")]
    Load(#[from] LoadError),
}
