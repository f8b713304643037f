//! Remote endpoint resolution, per-call context, and the meta RPC client.
//!
//! Commands never reach for process-wide state: they receive a
//! [`RemoteClientProvider`] and obtain the endpoint, the call context, and the
//! client from it. The production provider ([`Remote`]) builds its HTTP client
//! on first use.

use std::time::Duration;

use async_trait::async_trait;
use beacon_api_models::{
    ConfigResponse, HEADER_REQUEST_ID, MetaMethod, ProblemDetails, StatusResponse, Void,
};
use once_cell::sync::OnceCell;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Endpoint shown and dialled when none is configured.
pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:3080";

/// Failures of a single remote call, including context cancellation and
/// deadline expiry.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The endpoint could not be turned into a request URL.
    #[error("invalid RPC endpoint `{endpoint}`")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Underlying parse failure.
        source: url::ParseError,
    },
    /// The endpoint uses a scheme the HTTP transport cannot dial.
    #[error("endpoint `{endpoint}` must use http or https")]
    UnsupportedScheme {
        /// Endpoint as configured.
        endpoint: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build RPC client")]
    ClientBuild {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The request never produced a response.
    #[error("{method} request to {endpoint} failed")]
    Transport {
        /// Procedure being called.
        method: MetaMethod,
        /// Endpoint the call was sent to.
        endpoint: String,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The server answered with a failure status.
    #[error("{method} failed with status {status}: {message}")]
    Remote {
        /// Procedure being called.
        method: MetaMethod,
        /// HTTP status returned by the server.
        status: u16,
        /// Problem detail, title, or raw body reported by the server.
        message: String,
    },
    /// The response body did not match the expected payload.
    #[error("{method} returned an unreadable response")]
    Decode {
        /// Procedure being called.
        method: MetaMethod,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The call context was cancelled before the call completed.
    #[error("{method} was cancelled")]
    Cancelled {
        /// Procedure being called.
        method: MetaMethod,
    },
    /// The call context's deadline elapsed before the call completed.
    #[error("{method} exceeded its deadline of {limit:?}")]
    DeadlineExceeded {
        /// Procedure being called.
        method: MetaMethod,
        /// Deadline carried by the context.
        limit: Duration,
    },
}

/// Configured remote endpoint.
#[derive(Debug, Clone, Default)]
pub struct Endpoint {
    url: Option<Url>,
}

impl Endpoint {
    /// Wrap an optionally configured endpoint URL.
    #[must_use]
    pub const fn new(url: Option<Url>) -> Self {
        Self { url }
    }

    /// The configured URL, if any.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Display form: the configured URL, or [`DEFAULT_ENDPOINT_URL`].
    #[must_use]
    pub fn url_or_default(&self) -> String {
        self.url
            .as_ref()
            .map_or_else(|| DEFAULT_ENDPOINT_URL.to_string(), Url::to_string)
    }

    /// URL calls are sent to.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InvalidEndpoint`] if the fallback cannot be parsed.
    pub fn resolve(&self) -> Result<Url, RpcError> {
        match &self.url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(DEFAULT_ENDPOINT_URL).map_err(|source| {
                RpcError::InvalidEndpoint {
                    endpoint: DEFAULT_ENDPOINT_URL.to_string(),
                    source,
                }
            }),
        }
    }
}

/// Per-invocation call context.
///
/// Identifies the RPC endpoint the calls go to and bounds every call with the
/// context's cancellation token and optional deadline. No other timeout is
/// applied to calls.
#[derive(Debug, Clone)]
pub struct CallContext {
    endpoint: Url,
    timeout: Option<Duration>,
    cancellation: CancellationToken,
    trace_id: String,
}

impl CallContext {
    /// Context for calls to `endpoint` with no deadline and a fresh trace id.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: None,
            cancellation: CancellationToken::new(),
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    /// Bound each call by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use `trace_id` for the `x-request-id` header.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// RPC endpoint identity for calls made with this context.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Deadline applied to each call, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Trace identifier sent with each call.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Token observed by calls made with this context.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancel all in-flight and future calls made with this context.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Drive `call` to completion unless the context is cancelled or its
    /// deadline elapses first.
    ///
    /// # Errors
    ///
    /// Returns the call's own error, [`RpcError::Cancelled`], or
    /// [`RpcError::DeadlineExceeded`].
    pub async fn run<T, F>(&self, method: MetaMethod, call: F) -> Result<T, RpcError>
    where
        F: Future<Output = Result<T, RpcError>>,
    {
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| RpcError::DeadlineExceeded { method, limit })?,
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(RpcError::Cancelled { method }),
            result = bounded => result,
        }
    }
}

/// The meta procedures as seen by the client.
#[async_trait]
pub trait MetaClient: Send + Sync {
    /// Call `Meta.Status`.
    async fn status(&self, ctx: &CallContext, request: Void) -> Result<StatusResponse, RpcError>;

    /// Call `Meta.Config`.
    async fn config(&self, ctx: &CallContext, request: Void) -> Result<ConfigResponse, RpcError>;
}

/// JSON-over-HTTP implementation of [`MetaClient`].
#[derive(Debug, Clone)]
pub struct HttpMetaClient {
    client: Client,
}

impl HttpMetaClient {
    /// Build a client with default transport settings.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::ClientBuild`] if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, RpcError> {
        let client = Client::builder()
            .build()
            .map_err(|source| RpcError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn call<Req, Resp>(
        &self,
        ctx: &CallContext,
        method: MetaMethod,
        request: &Req,
    ) -> Result<Resp, RpcError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = ctx
            .endpoint()
            .join(method.path())
            .map_err(|source| RpcError::InvalidEndpoint {
                endpoint: ctx.endpoint().to_string(),
                source,
            })?;
        debug!(method = %method, endpoint = %ctx.endpoint(), "issuing rpc call");

        let result = ctx
            .run(method, async {
                let response = self
                    .client
                    .post(url)
                    .header(HEADER_REQUEST_ID, ctx.trace_id())
                    .json(request)
                    .send()
                    .await
                    .map_err(|source| RpcError::Transport {
                        method,
                        endpoint: ctx.endpoint().to_string(),
                        source,
                    })?;

                if !response.status().is_success() {
                    return Err(classify_problem(method, response).await);
                }
                response
                    .json::<Resp>()
                    .await
                    .map_err(|source| RpcError::Decode { method, source })
            })
            .await;

        if let Err(err) = &result {
            debug!(method = %method, error = %err, "rpc call failed");
        }
        result
    }
}

#[async_trait]
impl MetaClient for HttpMetaClient {
    async fn status(&self, ctx: &CallContext, request: Void) -> Result<StatusResponse, RpcError> {
        self.call(ctx, MetaMethod::Status, &request).await
    }

    async fn config(&self, ctx: &CallContext, request: Void) -> Result<ConfigResponse, RpcError> {
        self.call(ctx, MetaMethod::Config, &request).await
    }
}

/// Supplies the endpoint, call context, and client to command actions.
pub trait RemoteClientProvider: Send + Sync {
    /// Configured endpoint.
    fn endpoint(&self) -> &Endpoint;

    /// Context shared by every call of this invocation.
    fn context(&self) -> &CallContext;

    /// Client bound to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    fn client(&self) -> Result<&dyn MetaClient, RpcError>;
}

/// Provider used by the CLI: one endpoint, one context, and a client built on
/// first use.
#[derive(Debug)]
pub struct Remote {
    endpoint: Endpoint,
    context: CallContext,
    client: OnceCell<HttpMetaClient>,
}

impl Remote {
    /// Bind `endpoint` and `context` together; the client is created lazily.
    #[must_use]
    pub const fn new(endpoint: Endpoint, context: CallContext) -> Self {
        Self {
            endpoint,
            context,
            client: OnceCell::new(),
        }
    }
}

impl RemoteClientProvider for Remote {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn context(&self) -> &CallContext {
        &self.context
    }

    fn client(&self) -> Result<&dyn MetaClient, RpcError> {
        let endpoint = self.context.endpoint();
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RpcError::UnsupportedScheme {
                endpoint: endpoint.to_string(),
            });
        }
        let client: &dyn MetaClient = self.client.get_or_try_init(HttpMetaClient::new)?;
        Ok(client)
    }
}

/// Turn a failed HTTP response into an [`RpcError::Remote`].
async fn classify_problem(method: MetaMethod, response: reqwest::Response) -> RpcError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();
    let problem = serde_json::from_slice::<ProblemDetails>(&bytes).ok();

    let message = match problem {
        Some(ProblemDetails {
            detail: Some(detail),
            ..
        }) => detail,
        Some(problem) => problem.title,
        None if !body_text.is_empty() => body_text,
        None => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    RpcError::Remote {
        method,
        status: status.as_u16(),
        message,
    }
}
