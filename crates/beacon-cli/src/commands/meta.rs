//! `beacon meta`: server meta-information.
//!
//! The group itself does nothing; `status` prints the server's status line and
//! `config` prints the server configuration as indented JSON. Both issue
//! exactly one call per invocation and write nothing to stdout on failure.

use std::io::{self, Write};

use async_trait::async_trait;
use beacon_api_models::Void;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::client::{CliError, CliResult};
use crate::output::{render_json, write_line};
use crate::registry::{CommandAction, CommandEnv, CommandRegistry, RegistrationError};
use crate::remote::{CallContext, RemoteClientProvider, RpcError};

/// Failures of the meta commands and of app URL resolution.
#[derive(Debug, Error)]
pub enum MetaError {
    /// The remote call failed; passed through unchanged.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The response could not be rendered for display.
    #[error("failed to render response")]
    Serialization {
        /// Underlying encoder failure.
        source: serde_json::Error,
    },
    /// Writing to the output stream failed.
    #[error("failed to write command output")]
    Output {
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The server's configuration lacks a required attribute.
    #[error("server with RPC endpoint {endpoint} has no {attribute}")]
    MissingAttribute {
        /// Attribute that was empty.
        attribute: &'static str,
        /// Endpoint of the context the call was made with.
        endpoint: String,
    },
    /// The server reported an app URL that does not parse.
    #[error("server reported malformed app URL `{value}`")]
    MalformedUrl {
        /// Value the server reported.
        value: String,
        /// Parser failure.
        source: url::ParseError,
    },
}

/// Register the `meta` group and its subcommands.
pub(crate) fn register(registry: &mut CommandRegistry) -> Result<(), RegistrationError> {
    let mut meta = registry.add_command("meta", "server meta-information", "", MetaGroup)?;
    meta.add_command(
        "status",
        "server status",
        "The `beacon meta status` command displays server status information.",
        MetaStatus,
    )?;
    meta.add_command(
        "config",
        "server config",
        "The `beacon meta config` command displays server config information.",
        MetaConfig,
    )?;
    Ok(())
}

struct MetaGroup;

#[async_trait]
impl CommandAction for MetaGroup {
    async fn execute(&self, _env: &mut CommandEnv<'_>) -> CliResult<()> {
        Ok(())
    }
}

struct MetaStatus;

#[async_trait]
impl CommandAction for MetaStatus {
    async fn execute(&self, env: &mut CommandEnv<'_>) -> CliResult<()> {
        meta_status(env).await.map_err(CliError::from)
    }
}

struct MetaConfig;

#[async_trait]
impl CommandAction for MetaConfig {
    async fn execute(&self, env: &mut CommandEnv<'_>) -> CliResult<()> {
        meta_config(env).await.map_err(CliError::from)
    }
}

async fn meta_status(env: &mut CommandEnv<'_>) -> Result<(), MetaError> {
    let remote = env.remote;
    let status = remote
        .client()?
        .status(remote.context(), Void {})
        .await?;
    write_line(env.out, &status.info).map_err(|source| MetaError::Output { source })
}

async fn meta_config(env: &mut CommandEnv<'_>) -> Result<(), MetaError> {
    let remote = env.remote;
    let banner = format!("# {}", remote.endpoint().url_or_default());
    if let Err(err) = write_line(env.diag, &banner) {
        warn!(error = %err, "failed to write endpoint banner");
    }

    let config = remote
        .client()?
        .config(remote.context(), Void {})
        .await?;
    print_json(env.out, &config)
}

/// Render `value` completely before writing, so a rendering failure leaves
/// `out` untouched.
fn print_json<T: Serialize + ?Sized>(
    out: &mut (dyn Write + Send),
    value: &T,
) -> Result<(), MetaError> {
    let text = render_json(value).map_err(|source| MetaError::Serialization { source })?;
    write_line(out, &text).map_err(|source| MetaError::Output { source })
}

/// Ask the server for its public application URL.
///
/// Issues one config call with `ctx`, which need not be the provider's own
/// context. An empty `app_url` is reported as [`MetaError::MissingAttribute`]
/// naming the endpoint of `ctx`; nothing is parsed in that case.
///
/// # Errors
///
/// Returns the call's [`RpcError`] unchanged, or a [`MetaError`] describing a
/// missing or malformed URL.
pub async fn resolve_app_url(
    remote: &dyn RemoteClientProvider,
    ctx: &CallContext,
) -> Result<Url, MetaError> {
    let config = remote.client()?.config(ctx, Void {}).await?;
    if config.app_url.is_empty() {
        return Err(MetaError::MissingAttribute {
            attribute: "app_url",
            endpoint: ctx.endpoint().to_string(),
        });
    }
    Url::parse(&config.app_url).map_err(|source| MetaError::MalformedUrl {
        value: config.app_url,
        source,
    })
}
