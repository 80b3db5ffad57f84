//! Wufoo to SysAid webhook bridge.
//!
//! Takes entries posted by a Wufoo form webhook, turns them into SysAid
//! ticket requests with a per-form transform definition and submits each one
//! to the SysAid web form endpoint:
//!
//! - Entry parsing (JSON or form-urlencoded payloads)
//! - Definitions loaded by form hash, inline or from a directory, cached
//! - Entry preparation (set, delete, rename, copy, move, merge, wrap)
//! - Request templates with `${...}` interpolation, conditions and `for_each`
//! - One form POST per valid request, failures isolated per request
//!
//! ## Definition Example
//!
//! ```yaml
//! prepare:
//!   - delete: ["$.HandshakeKey"]
//! requests:
//!   - name: "ticket"
//!     fields:
//!       Description: "${Field1}"
//!       Category: "Hardware"
//!       Subcategory: "${Field4}"
//!       Title: "${Field2}"
//!       FirstName: "${Field5}"
//!       LastName: "${Field6}"
//!       Email: "${Field3}"
//!       USMAICampus: { value: "${Field7}", optional: true }
//! ```

pub mod bridge;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod document;
pub mod entry;
pub mod loader;
pub mod matcher;
pub mod path;
pub mod ticket;
pub mod transformer;

pub use bridge::{Bridge, BridgeError, BridgeStats};
pub use config::{BridgeConfig, EntryFormat, TransformDefinition};
pub use context::TransformContext;
pub use dispatch::{DispatchReport, Dispatcher};
pub use document::{RequestDocument, RequestElement};
pub use loader::{DefinitionSource, EngineCache, LoadError};
pub use transformer::{TransformEngine, TransformError};
