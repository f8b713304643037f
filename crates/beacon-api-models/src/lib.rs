#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Shared wire DTOs for the Beacon meta RPC surface.
//!
//! The server and the administration CLI both encode and decode through these
//! types so the request/response contract has a single definition. Procedures
//! are addressed through [`MetaMethod`], which pairs the logical procedure name
//! used in diagnostics with the HTTP route that carries it.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Header carrying the per-invocation trace identifier.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Empty request payload used by parameterless queries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Void {}

/// Server status as reported by `Meta.Status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    /// Opaque, human-readable status text.
    pub info: String,
}

/// Server configuration as reported by `Meta.Config`.
///
/// Only `app_url` is interpreted by clients. Every other field is opaque and
/// kept in `extra`, whatever its JSON type, so rendering shows everything the
/// server sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigResponse {
    /// Externally reachable web address of the server; empty when absent or null.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub app_url: String,
    /// Remaining fields, passed through verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// RFC9457-style problem response returned for failed calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
}

/// Procedures exposed by the meta service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaMethod {
    /// `Meta.Status`: free-form server status text.
    Status,
    /// `Meta.Config`: server configuration.
    Config,
}

impl MetaMethod {
    /// Every procedure, in route registration order.
    pub const ALL: [Self; 2] = [Self::Status, Self::Config];

    /// Logical procedure name used in logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Status => "Meta.Status",
            Self::Config => "Meta.Config",
        }
    }

    /// HTTP route serving the procedure.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Status => "/rpc/meta/status",
            Self::Config => "/rpc/meta/config",
        }
    }
}

impl Display for MetaMethod {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}
