//! Submitting Request elements to the SysAid web form endpoint.

use crate::config::SysAidSettings;
use crate::document::RequestDocument;
use crate::ticket::{TicketRequest, FORM_CONTENT_TYPE};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Response to one submission. Logged, never interpreted.
#[derive(Debug, Clone)]
pub struct FormResponse {
    pub status: u16,
    pub body: String,
}

impl FormResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// An open client able to POST form bodies.
#[async_trait]
pub trait FormClient: Send + Sync {
    async fn post_form(&self, endpoint: &Url, body: String) -> Result<FormResponse, DispatchError>;
}

/// Hands out a fresh client for each dispatch call.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn FormClient>, DispatchError>;
}

/// `reqwest`-backed connector.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
    user_agent: String,
}

impl HttpConnector {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
        }
    }
}

impl Connector for HttpConnector {
    fn connect(&self) -> Result<Box<dyn FormClient>, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(DispatchError::Client)?;
        Ok(Box::new(HttpFormClient { client }))
    }
}

struct HttpFormClient {
    client: reqwest::Client,
}

#[async_trait]
impl FormClient for HttpFormClient {
    async fn post_form(&self, endpoint: &Url, body: String) -> Result<FormResponse, DispatchError> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(status, error = %e, "Failed to read SysAid response body");
                String::new()
            }
        };
        Ok(FormResponse { status, body })
    }
}

/// Outcome of one dispatch call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Request elements in the document
    pub requests: usize,
    /// POSTs issued
    pub attempted: usize,
    /// POSTs that got a response (any status)
    pub sent: usize,
    /// POSTs that failed at the transport level
    pub failed: usize,
    /// Elements rejected for missing mandatory fields
    pub invalid: usize,
    /// Valid elements not sent because no usable endpoint is configured
    pub skipped: usize,
}

/// Turns request documents into SysAid web form submissions.
pub struct Dispatcher {
    identity: SysAidSettings,
    connector: Arc<dyn Connector>,
}

impl Dispatcher {
    pub fn new(identity: SysAidSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            identity,
            connector,
        }
    }

    pub fn identity(&self) -> &SysAidSettings {
        &self.identity
    }

    /// Submit every Request element of `document`.
    ///
    /// A failing element (missing field or transport error) never stops its
    /// siblings. The client is opened once per call and dropped on return.
    pub async fn dispatch(&self, document: Option<&RequestDocument>) -> DispatchReport {
        let Some(document) = document else {
            error!("No request document to dispatch; the entry was not transformed first");
            return DispatchReport::default();
        };

        let mut report = DispatchReport {
            requests: document.len(),
            ..Default::default()
        };

        let endpoint = match self.identity.endpoint() {
            Ok(url) => Some(url),
            Err(issue) => {
                warn!(
                    issue = %issue,
                    requests = document.len(),
                    "Not executing HTTP requests: no usable SysAid URL configured"
                );
                None
            }
        };

        let client = match &endpoint {
            Some(_) => match self.connector.connect() {
                Ok(client) => Some(client),
                Err(e) => {
                    error!(error = %e, "Failed to create HTTP client");
                    None
                }
            },
            None => None,
        };

        for (index, element) in document.requests.iter().enumerate() {
            let ticket = match TicketRequest::try_from(element) {
                Ok(ticket) => ticket,
                Err(e) => {
                    error!(
                        request_index = index,
                        error = %e,
                        fields = ?element,
                        "Skipping invalid request element"
                    );
                    report.invalid += 1;
                    continue;
                }
            };
            let fields = ticket.form_fields(&self.identity);

            let (Some(endpoint), Some(client)) = (&endpoint, &client) else {
                if endpoint.is_some() {
                    // endpoint fine, client creation failed
                    report.failed += 1;
                    warn!(request_index = index, fields = ?fields, "Unable to execute POST request");
                } else {
                    report.skipped += 1;
                    debug!(request_index = index, fields = ?fields, "Request not sent");
                }
                continue;
            };

            report.attempted += 1;
            match client.post_form(endpoint, ticket.encode(&self.identity)).await {
                Ok(response) => {
                    report.sent += 1;
                    debug!(
                        request_index = index,
                        fields = ?fields,
                        status = response.status,
                        body = %response.body,
                        "SysAid response"
                    );
                    if !response.is_success() {
                        warn!(
                            request_index = index,
                            status = response.status,
                            "SysAid answered with a non-success status"
                        );
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    error!(
                        request_index = index,
                        error = %e,
                        fields = ?fields,
                        "POST request failed; check that SysAid is reachable and configured"
                    );
                }
            }
        }

        info!(
            requests = report.requests,
            sent = report.sent,
            failed = report.failed,
            invalid = report.invalid,
            skipped = report.skipped,
            "Dispatch finished"
        );

        report
    }
}

/// Outbound submission errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}
