use std::fmt::Debug;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_RETRY_BUDGET: Duration = Duration::from_secs(30);

/// Builder for [`OpenAIConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    azure_api_version: Option<String>,
    timeout: Option<Duration>,
    retry_budget: Option<Duration>,
}

impl OpenAIConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            azure_api_version: None,
            timeout: None,
            retry_budget: None,
        }
    }

    /// Sets the model to use. In Azure mode this is the deployment name.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL. In Azure mode this is the resource endpoint,
    /// e.g. `https://my-resource.openai.azure.com`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Switches to Azure OpenAI addressing with the given API version.
    #[inline]
    pub fn with_azure_api_version<S: Into<String>>(
        mut self,
        api_version: S,
    ) -> Self {
        self.azure_api_version = Some(api_version.into());
        self
    }

    /// Sets the timeout of a whole request, including the streamed body.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets how long failed requests (rate limits and server errors) may be
    /// retried. `Duration::ZERO` disables retries.
    #[inline]
    pub fn with_retry_budget(mut self, budget: Duration) -> Self {
        self.retry_budget = Some(budget);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OpenAIConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_owned();
        OpenAIConfig {
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url,
            azure_api_version: self.azure_api_version,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            retry_budget: self.retry_budget.unwrap_or(DEFAULT_RETRY_BUDGET),
        }
    }
}

impl Debug for OpenAIConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfigBuilder")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("azure_api_version", &self.azure_api_version)
            .field("timeout", &self.timeout)
            .field("retry_budget", &self.retry_budget)
            .finish()
    }
}

/// Configuration for the OpenAI-compatible provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) azure_api_version: Option<String>,
    pub(crate) timeout: Duration,
    pub(crate) retry_budget: Duration,
}

impl OpenAIConfig {
    /// Returns the chat completions endpoint.
    pub fn completions_url(&self) -> String {
        match &self.azure_api_version {
            Some(api_version) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, self.model, api_version
            ),
            None => format!("{}/chat/completions", self.base_url),
        }
    }

    #[inline]
    pub(crate) fn is_azure(&self) -> bool {
        self.azure_api_version.is_some()
    }
}

impl Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("azure_api_version", &self.azure_api_version)
            .field("timeout", &self.timeout)
            .field("retry_budget", &self.retry_budget)
            .finish()
    }
}
