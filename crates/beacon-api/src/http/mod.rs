//! HTTP surface modules (router, handlers, problem responses).

/// Problem response helpers and error types.
pub mod errors;
/// Meta procedure handlers.
pub mod meta;
/// Router construction and server host.
pub mod router;
