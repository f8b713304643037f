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
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Meta RPC server for Beacon.
//!
//! Serves `Meta.Status` and `Meta.Config` as JSON-over-HTTP procedures so the
//! administration CLI can query a running server's operational metadata.

pub mod error;
pub mod http;
pub mod meta;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::{ApiServer, new_handler};
pub use meta::{MetaSource, StaticMeta};
