//! A model provider for OpenAI-compatible and Azure OpenAI chat completion
//! APIs.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use backoff::ExponentialBackoffBuilder;
use backoff::future::retry_notify;
use mime::Mime;
use release_agent_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use reqwest::{Client, Response, StatusCode, header};
use tracing::Instrument;

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
use proto::{ChatCompletionRequest, ErrorBody};
use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else {
            ErrorKind::Other
        };
        Self::new(format!("{err}"), kind)
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::from_reqwest)?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let body = proto::create_request(req, &self.config);
        let client = self.client.clone();
        let config = Arc::clone(&self.config);

        async move {
            let resp = if config.retry_budget.is_zero() {
                post_once(&client, &config, &body)
                    .await
                    .map_err(|err| match err {
                        backoff::Error::Permanent(err) => err,
                        backoff::Error::Transient { err, .. } => err,
                    })?
            } else {
                let policy = ExponentialBackoffBuilder::new()
                    .with_max_elapsed_time(Some(config.retry_budget))
                    .build();
                retry_notify(
                    policy,
                    || post_once(&client, &config, &body),
                    |err: Error, after| {
                        warn!("retrying in {after:?} after error: {err}");
                    },
                )
                .await?
            };

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.subtype().as_str() == "event-stream")
                .unwrap_or(false);
            if !is_event_stream {
                return Err(Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::Other,
                ));
            }

            // Here we got a successful response.
            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(OpenAIResponse::from_sse(sse))
        }
        .instrument(debug_span!("openai request"))
    }
}

/// Posts the request once and classifies failures as retryable or not.
async fn post_once(
    client: &Client,
    config: &OpenAIConfig,
    body: &ChatCompletionRequest,
) -> Result<Response, backoff::Error<Error>> {
    let mut builder = client
        .post(config.completions_url())
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "text/event-stream")
        .json(body);
    builder = if config.is_azure() {
        builder.header("api-key", &config.api_key)
    } else {
        builder.header(
            header::AUTHORIZATION,
            format!("Bearer {}", config.api_key),
        )
    };

    // The timeout bounds every attempt, so a timed-out attempt is final.
    let resp = builder
        .send()
        .await
        .map_err(|err| backoff::Error::permanent(Error::from_reqwest(err)))?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let err = status_error(status, &text);
    if should_retry(status) {
        Err(backoff::Error::transient(err))
    } else {
        Err(backoff::Error::permanent(err))
    }
}

/// Rate limits and server errors are worth another attempt.
fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.error);
    let kind = match status {
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimitExceeded,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ErrorKind::Timeout
        }
        _ if detail.as_ref().and_then(|d| d.code.as_deref())
            == Some("content_filter") =>
        {
            ErrorKind::Moderated
        }
        _ => ErrorKind::Other,
    };
    let message = match detail {
        Some(detail) if !detail.message.is_empty() => {
            format!("HTTP {status}: {}", detail.message)
        }
        _ => format!("HTTP {status}"),
    };
    Error::new(message, kind)
}
