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
#![allow(clippy::redundant_pub_crate)]

//! Command-line client for querying a Beacon server's meta-information.
//!
//! Layout:
//! - `cli.rs`: global flags, logging setup, and command dispatch
//! - `registry.rs`: ordered command tree rendered to clap
//! - `commands/`: command handlers grouped by concern
//! - `remote.rs`: endpoint, call context, and the meta RPC client
//! - `client.rs`: CLI errors, exit codes, and telemetry helpers
//! - `output.rs`: renderers and formatting helpers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod output;
pub(crate) mod registry;
pub(crate) mod remote;

pub use cli::run;
pub use commands::meta::{MetaError, resolve_app_url};
pub use registry::RegistrationError;
pub use remote::{
    CallContext, DEFAULT_ENDPOINT_URL, Endpoint, HttpMetaClient, MetaClient, Remote,
    RemoteClientProvider, RpcError,
};
