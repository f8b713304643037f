//! Argument parsing, logging setup, and command dispatch.

use std::ffi::OsString;
use std::io;
use std::time::Duration;

use anyhow::anyhow;
use beacon_telemetry::{LogFormat, LoggingConfig, init_logging};
use clap::{ArgMatches, Args, Command, FromArgMatches, ValueEnum};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::client::{CliError, CliResult, TelemetryEmitter, parse_url};
use crate::commands;
use crate::registry::{CommandAction, CommandEnv, CommandRegistry};
use crate::remote::{CallContext, Endpoint, Remote, RemoteClientProvider};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CLI_LOG_LEVEL: &str = "warn";

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(
        long,
        global = true,
        env = "BEACON_ENDPOINT",
        value_parser = parse_url,
        help = "RPC endpoint of the server [default: http://localhost:3080]"
    )]
    endpoint: Option<Url>,
    #[arg(
        long,
        global = true,
        env = "BEACON_RPC_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Deadline for each remote call in seconds; 0 disables it"
    )]
    timeout: u64,
    #[arg(
        long,
        global = true,
        env = "BEACON_LOG",
        default_value = DEFAULT_CLI_LOG_LEVEL,
        help = "Log filter used when RUST_LOG is unset"
    )]
    log_level: String,
    #[arg(
        long,
        global = true,
        env = "BEACON_LOG_FORMAT",
        value_enum,
        default_value_t = LogStyle::Pretty
    )]
    log_format: LogStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogStyle {
    Pretty,
    Json,
}

impl From<LogStyle> for LogFormat {
    fn from(style: LogStyle) -> Self {
        match style {
            LogStyle::Pretty => Self::Pretty,
            LogStyle::Json => Self::Json,
        }
    }
}

/// Parses CLI arguments, executes the requested command, and handles
/// user-facing telemetry emission. Returns the process exit code.
pub async fn run() -> i32 {
    run_with_args(std::env::args_os()).await
}

async fn run_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let registry = match build_registry() {
        Ok(registry) => registry,
        Err(err) => {
            let exit_code = err.exit_code();
            eprintln!("error: {}", err.into_message());
            return exit_code;
        }
    };

    let matches = match root_command(&registry).try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };
    let globals = match GlobalArgs::from_arg_matches(&matches) {
        Ok(globals) => globals,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };

    install_logging(&globals);

    let trace_id = Uuid::new_v4().to_string();
    let telemetry = TelemetryEmitter::from_env();

    let (command_label, result) = dispatch(&registry, &matches, &globals, &trace_id).await;

    let (exit_code, message, outcome) = match result {
        Ok(()) => (0, None, "success"),
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.into_message();
            eprintln!("error: {message}");
            (exit_code, Some(message), "error")
        }
    };

    if let Some(emitter) = &telemetry {
        emitter
            .emit(
                &trace_id,
                &command_label,
                outcome,
                exit_code,
                message.as_deref(),
            )
            .await;
    }

    exit_code
}

fn build_registry() -> CliResult<CommandRegistry> {
    let mut registry = CommandRegistry::new("beacon", "Command-line client for a Beacon server");
    commands::register(&mut registry)?;
    Ok(registry)
}

fn root_command(registry: &CommandRegistry) -> Command {
    GlobalArgs::augment_args(registry.to_command())
}

fn install_logging(globals: &GlobalArgs) {
    let config = LoggingConfig {
        level: &globals.log_level,
        format: globals.log_format.into(),
        build_sha: option_env!("BEACON_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&config) {
        debug!(error = %err, "logging already initialised");
    }
}

async fn dispatch(
    registry: &CommandRegistry,
    matches: &ArgMatches,
    globals: &GlobalArgs,
    trace_id: &str,
) -> (String, CliResult<()>) {
    let Some((label, action)) = registry.resolve(matches) else {
        return (
            String::new(),
            Err(CliError::failure(anyhow!(
                "no action is registered for the selected command"
            ))),
        );
    };
    let result = match build_remote(globals, trace_id) {
        Ok(remote) => execute(action.as_ref(), &remote).await,
        Err(err) => Err(err),
    };
    (label, result)
}

fn build_remote(globals: &GlobalArgs, trace_id: &str) -> CliResult<Remote> {
    let endpoint = Endpoint::new(globals.endpoint.clone());
    let target = endpoint
        .resolve()
        .map_err(|err| CliError::from(commands::meta::MetaError::from(err)))?;
    let mut context = CallContext::new(target).with_trace_id(trace_id);
    if globals.timeout > 0 {
        context = context.with_timeout(Duration::from_secs(globals.timeout));
    }
    Ok(Remote::new(endpoint, context))
}

async fn execute(action: &dyn CommandAction, remote: &Remote) -> CliResult<()> {
    let cancellation = remote.context().cancellation().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling in-flight call");
            cancellation.cancel();
        }
    });

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let mut env = CommandEnv {
        remote,
        out: &mut stdout,
        diag: &mut stderr,
    };
    let result = action.execute(&mut env).await;
    interrupt.abort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    fn parse_globals(args: &[&str]) -> Result<GlobalArgs> {
        let registry = build_registry().map_err(|err| anyhow!(err.into_message()))?;
        let matches = root_command(&registry).try_get_matches_from(args)?;
        Ok(GlobalArgs::from_arg_matches(&matches)?)
    }

    #[test]
    fn global_flags_are_accepted_after_subcommands() -> Result<()> {
        let globals = parse_globals(&[
            "beacon",
            "meta",
            "status",
            "--endpoint",
            "http://beacon.test:3080",
            "--timeout",
            "3",
        ])?;
        assert_eq!(
            globals.endpoint.as_ref().map(Url::as_str),
            Some("http://beacon.test:3080/")
        );
        assert_eq!(globals.timeout, 3);
        Ok(())
    }

    #[test]
    fn remote_uses_fallback_endpoint_and_deadline() -> Result<()> {
        let globals = parse_globals(&["beacon", "meta", "config", "--timeout", "5"])?;
        let globals = GlobalArgs {
            endpoint: None,
            ..globals
        };
        let remote = build_remote(&globals, "trace-1").map_err(|err| anyhow!(err.into_message()))?;
        assert_eq!(remote.endpoint().url_or_default(), "http://localhost:3080");
        assert_eq!(remote.context().endpoint().as_str(), "http://localhost:3080/");
        assert_eq!(remote.context().timeout(), Some(Duration::from_secs(5)));
        assert_eq!(remote.context().trace_id(), "trace-1");
        Ok(())
    }

    #[test]
    fn zero_timeout_disables_deadline() -> Result<()> {
        let globals = parse_globals(&["beacon", "meta", "status", "--timeout", "0"])?;
        let remote = build_remote(&globals, "trace-1").map_err(|err| anyhow!(err.into_message()))?;
        assert_eq!(remote.context().timeout(), None);
        Ok(())
    }

    #[tokio::test]
    async fn usage_errors_use_clap_exit_code() {
        assert_eq!(run_with_args(["beacon"]).await, 2);
        assert_eq!(run_with_args(["beacon", "meta", "restart"]).await, 2);
    }

    #[tokio::test]
    async fn group_alone_succeeds_without_calls() {
        assert_eq!(run_with_args(["beacon", "meta"]).await, 0);
    }

    #[tokio::test]
    async fn group_ignores_endpoint_it_never_dials() {
        let args = ["beacon", "meta", "--endpoint", "ftp://beacon.test"];
        assert_eq!(run_with_args(args).await, 0);
    }

    #[tokio::test]
    async fn non_http_endpoint_fails_commands_that_dial_it() {
        let args = ["beacon", "meta", "status", "--endpoint", "ftp://beacon.test"];
        assert_eq!(run_with_args(args).await, 2);
    }

    #[tokio::test]
    async fn status_against_server_exits_zero() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rpc/meta/status")
                .header_exists("x-request-id");
            then.status(200).json_body(json!({"info": "OK"}));
        });

        let base = server.base_url();
        let code = run_with_args(["beacon", "meta", "status", "--endpoint", base.as_str()]).await;
        assert_eq!(code, 0);
        mock.assert();
    }

    #[tokio::test]
    async fn failed_call_exits_with_command_code() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/rpc/meta/config");
            then.status(500).body("backend offline");
        });

        let base = server.base_url();
        let code = run_with_args(["beacon", "--endpoint", base.as_str(), "meta", "config"]).await;
        assert_eq!(code, 3);
        mock.assert_calls(1);
    }
}
