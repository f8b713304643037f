//! CLI-level error type, outcome telemetry, and argument parsing helpers.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::commands::meta::MetaError;
use crate::registry::RegistrationError;
use crate::remote::RpcError;

pub(crate) const ENV_TELEMETRY_ENDPOINT: &str = "BEACON_TELEMETRY_ENDPOINT";

/// CLI-level error type to distinguish command, startup, and operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Registration(RegistrationError),
    Command(MetaError),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    /// An endpoint the transport cannot dial is a usage problem, not a
    /// failed call.
    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Command(MetaError::Rpc(RpcError::UnsupportedScheme { .. })) => 2,
            Self::Command(_) | Self::Failure(_) => 3,
            Self::Registration(_) => 4,
        }
    }

    /// Render the error and its sources, `outer: inner: root`.
    pub(crate) fn into_message(self) -> String {
        let error = match self {
            Self::Registration(error) => anyhow::Error::from(error).context("invalid command tree"),
            Self::Command(error) => anyhow::Error::from(error),
            Self::Failure(error) => error,
        };
        format!("{error:#}")
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl Error for CliError {}

impl From<MetaError> for CliError {
    fn from(error: MetaError) -> Self {
        Self::Command(error)
    }
}

impl From<RegistrationError> for CliError {
    fn from(error: RegistrationError) -> Self {
        Self::Registration(error)
    }
}

/// Telemetry emitter used to forward CLI outcomes.
#[derive(Clone)]
pub(crate) struct TelemetryEmitter {
    pub(crate) client: Client,
    pub(crate) endpoint: Url,
}

impl TelemetryEmitter {
    #[must_use]
    pub(crate) fn from_env() -> Option<Self> {
        let endpoint = std::env::var(ENV_TELEMETRY_ENDPOINT).ok()?;
        let endpoint = endpoint.parse().ok()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .ok()?;
        Some(Self { client, endpoint })
    }

    pub(crate) async fn emit(
        &self,
        trace_id: &str,
        command: &str,
        outcome: &str,
        exit_code: i32,
        message: Option<&str>,
    ) {
        let event = TelemetryEvent {
            command,
            outcome,
            trace_id,
            exit_code,
            message,
            timestamp_ms: timestamp_now_ms(),
        };

        if let Err(err) = self
            .client
            .post(self.endpoint.clone())
            .json(&event)
            .send()
            .await
        {
            tracing::debug!(error = %err, "telemetry emit failed");
        }
    }
}

#[derive(Serialize)]
struct TelemetryEvent<'a> {
    command: &'a str,
    outcome: &'a str,
    trace_id: &'a str,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    timestamp_ms: u64,
}

/// Parse the endpoint URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Millisecond timestamp helper for telemetry.
#[must_use]
pub(crate) fn timestamp_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
