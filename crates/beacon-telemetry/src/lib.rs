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

//! Telemetry primitives shared across the Beacon workspace.
//!
//! Layout:
//! - `init.rs`: logging configuration and subscriber installation
//! - `layers.rs`: request-id middleware for tower stacks
//! - `error.rs`: error type for telemetry setup

pub mod error;
pub mod init;
pub mod layers;

pub use error::{Result, TelemetryError};
pub use init::{LogFormat, LoggingConfig, build_sha, init_logging};
pub use layers::{propagate_request_id_layer, set_request_id_layer};
