//! Configuration types for the bridge and for transform definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// Annotated configuration printed by `--example-config`.
pub const EXAMPLE_CONFIG: &str = r#"# Wufoo to SysAid bridge configuration example
version: "1"

sysaid:
  # SysAid web form submission URL
  url: "https://helpdesk.example.edu/webformsubmit"
  # SysAid account id
  account_id: "myaccount"
  # SysAid web form id
  form_id: "1234"

settings:
  # Directory holding <form-hash>.yaml / .yml / .json definitions
  definition_dir: "/etc/wufoo-sysaid/definitions"
  # Timeout for each outbound POST (ms)
  timeout_ms: 30000

# Definitions may also be given inline, keyed by form hash
definitions:
  q1x2y3z4:
    prepare:
      - delete: ["$.HandshakeKey", "$.IP"]
    requests:
      - name: "ticket"
        fields:
          Description: "${Field1}"
          Category: "Hardware"
          Subcategory: "${Field4}"
          Title: "${Field2}"
          FirstName: "${Field5}"
          LastName: "${Field6}"
          Email: "${Field3}"
          USMAICampus:
            value: "${Field7}"
            optional: true
"#;

/// Main configuration for the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Configuration version
    pub version: String,
    /// SysAid identity embedded in every outbound request
    pub sysaid: SysAidSettings,
    /// Global settings
    pub settings: Settings,
    /// Inline transform definitions, keyed by form hash
    pub definitions: HashMap<String, TransformDefinition>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            sysaid: SysAidSettings::default(),
            settings: Settings::default(),
            definitions: HashMap::new(),
        }
    }
}

/// SysAid web form endpoint and the static identifiers it expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SysAidSettings {
    /// Web form submission URL
    pub url: String,
    /// SysAid account id
    pub account_id: String,
    /// SysAid web form id
    pub form_id: String,
}

impl Default for SysAidSettings {
    fn default() -> Self {
        Self {
            url: "https://sysaid.example.com/webformsubmit".to_string(),
            account_id: String::new(),
            form_id: "0".to_string(),
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding `<hash>.yaml` / `<hash>.yml` / `<hash>.json` definitions
    pub definition_dir: Option<String>,
    /// Timeout for each outbound POST (ms)
    pub timeout_ms: u64,
    /// User-Agent sent with outbound requests
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            definition_dir: None,
            timeout_ms: 30_000,
            user_agent: concat!("wufoo-sysaid-bridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Why an endpoint URL will not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointIssue {
    /// Empty or whitespace only
    Blank,
    /// Still pointing at the shipped example host
    Placeholder(String),
    /// Not an absolute http(s) URL
    Invalid(String),
}

impl fmt::Display for EndpointIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => write!(f, "SysAid URL is blank"),
            Self::Placeholder(url) => {
                write!(f, "SysAid URL \"{}\" is unchanged from the example", url)
            }
            Self::Invalid(reason) => write!(f, "SysAid URL is not usable: {}", reason),
        }
    }
}

/// A configuration value that looks unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    Endpoint(EndpointIssue),
    AccountId,
    FormId,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(issue) => write!(
                f,
                "{}; set sysaid.url to the location of your SysAid installation",
                issue
            ),
            Self::AccountId => write!(
                f,
                "sysaid.account_id appears empty; set it to your SysAid account id"
            ),
            Self::FormId => write!(
                f,
                "sysaid.form_id appears empty or unchanged; requests will not be accepted"
            ),
        }
    }
}

impl SysAidSettings {
    /// Resolve the endpoint, refusing blank, placeholder and malformed URLs.
    pub fn endpoint(&self) -> Result<Url, EndpointIssue> {
        let raw = self.url.trim();
        if raw.is_empty() {
            return Err(EndpointIssue::Blank);
        }
        if raw.contains("example.com") {
            return Err(EndpointIssue::Placeholder(raw.to_string()));
        }
        let url = Url::parse(raw).map_err(|e| EndpointIssue::Invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(EndpointIssue::Invalid(format!("unsupported scheme '{}'", other))),
        }
    }

    /// Values that look unset or left at their defaults.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if let Err(issue) = self.endpoint() {
            warnings.push(ConfigWarning::Endpoint(issue));
        }
        if self.account_id.trim().is_empty() {
            warnings.push(ConfigWarning::AccountId);
        }
        let form_id = self.form_id.trim();
        if form_id.is_empty() || form_id == "0" {
            warnings.push(ConfigWarning::FormId);
        }
        warnings
    }
}

/// Rules turning one entry document into a request document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransformDefinition {
    /// Operations applied to a copy of the entry before templating,
    /// written as single-key maps (`- delete: [...]`) in YAML and JSON alike
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub prepare: Vec<JsonOperation>,
    /// Request templates, emitted in order
    #[serde(default)]
    pub requests: Vec<RequestTemplate>,
}

/// Template for one (or, with `for_each`, several) Request elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTemplate {
    /// Name used in logs
    #[serde(default)]
    pub name: Option<String>,
    /// All conditions must hold for the template to emit anything
    #[serde(default)]
    pub when: Vec<JsonCondition>,
    /// Emit one request per item of the array at this path
    #[serde(default)]
    pub for_each: Option<String>,
    /// Request field name -> value template
    pub fields: IndexMap<String, FieldTemplate>,
}

/// Value template for a single Request field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldTemplate {
    /// Every `${...}` reference must resolve
    Required(String),
    /// Dropped when a reference is unresolved or the result is empty
    Detailed {
        value: String,
        #[serde(default)]
        optional: bool,
    },
}

impl FieldTemplate {
    pub fn template(&self) -> &str {
        match self {
            Self::Required(value) | Self::Detailed { value, .. } => value,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Detailed { optional: true, .. })
    }
}

/// JSON transformation operation applied to the entry document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonOperation {
    /// Set a value at a JSON path
    Set {
        path: String,
        value: serde_json::Value,
    },
    /// Delete values at JSON paths
    Delete(Vec<String>),
    /// Rename a field
    Rename { from: String, to: String },
    /// Wrap a value in an object with a key
    Wrap { path: String, key: String },
    /// Merge additional fields into an object
    Merge {
        path: String,
        with: serde_json::Value,
    },
    /// Copy a value from one path to another
    Copy { from: String, to: String },
    /// Move a value from one path to another
    Move { from: String, to: String },
}

/// Condition on the entry document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCondition {
    /// JSON path expression
    pub path: String,
    /// Expected value (exact match)
    #[serde(default)]
    pub equals: Option<serde_json::Value>,
    /// Contains substring (for string values)
    #[serde(default)]
    pub contains: Option<String>,
    /// Regex match against the value's text
    #[serde(default)]
    pub matches: Option<String>,
    /// Value must exist (or, with `false`, must not)
    #[serde(default)]
    pub exists: Option<bool>,
}

/// Format of an incoming entry payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryFormat {
    /// Guess from the first non-whitespace byte
    #[default]
    Auto,
    Json,
    /// application/x-www-form-urlencoded
    Form,
}
