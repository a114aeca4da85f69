//! API Client
//!
//! High-level client combining request preparation, transport, the credential
//! store and the refresh coordinator.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::core::{HttpTransport, ReqwestHttpTransport, RequestNormalizer};
use crate::error::{ApiError, ApiResult, ConfigurationError};
use crate::telemetry::{ClientMetrics, NoOpMetrics};
use crate::token::{
    CredentialStore, HttpRefreshExchange, InMemoryCredentialStore, RefreshCoordinator,
    RefreshExchange, RefreshStats, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY,
};
use crate::types::{ApiResponse, ClientConfig, RequestDescriptor, SessionTokens};

/// Session-aware API client.
///
/// Cloning is cheap and clones share the credential store and the refresh
/// coordinator, so at most one refresh runs across all of them.
pub struct ApiClient<
    T: HttpTransport = ReqwestHttpTransport,
    S: CredentialStore = InMemoryCredentialStore,
> {
    config: ClientConfig,
    transport: Arc<T>,
    store: Arc<S>,
    normalizer: Arc<RequestNormalizer<S>>,
    coordinator: Arc<RefreshCoordinator<T, S>>,
}

impl<T: HttpTransport, S: CredentialStore> Clone for ApiClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: self.transport.clone(),
            store: self.store.clone(),
            normalizer: self.normalizer.clone(),
            coordinator: self.coordinator.clone(),
        }
    }
}

impl ApiClient<ReqwestHttpTransport, InMemoryCredentialStore> {
    /// Create a new client with default implementations.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigurationError> {
        let transport =
            ReqwestHttpTransport::with_options(config.timeout, config.user_agent.as_deref())?;
        Ok(Self::with_components(
            config,
            transport,
            InMemoryCredentialStore::new(),
        ))
    }
}

impl<T: HttpTransport + 'static, S: CredentialStore> ApiClient<T, S> {
    /// Create a client with custom implementations.
    ///
    /// The refresh exchange posts to `config.refresh_path` through the same
    /// transport.
    pub fn with_components(config: ClientConfig, transport: T, store: S) -> Self {
        let transport = Arc::new(transport);
        let store = Arc::new(store);
        let normalizer = Arc::new(RequestNormalizer::new(&config, store.clone()));

        let refresh_url = normalizer
            .resolve_url(&config.refresh_path, &[])
            .unwrap_or_else(|_| config.refresh_path.clone());
        let exchange: Arc<dyn RefreshExchange> = Arc::new(HttpRefreshExchange::new(
            transport.clone(),
            refresh_url,
            config.timeout,
        ));
        let metrics: Arc<dyn ClientMetrics> = Arc::new(NoOpMetrics);

        let coordinator = Arc::new(RefreshCoordinator::new(
            exchange,
            store.clone(),
            normalizer.clone(),
            transport.clone(),
            metrics,
        ));

        Self {
            config,
            transport,
            store,
            normalizer,
            coordinator,
        }
    }
}

impl<T: HttpTransport, S: CredentialStore> ApiClient<T, S> {
    /// Use a custom refresh exchange.
    ///
    /// The exchange is swapped on the shared coordinator, so existing clones
    /// pick it up too.
    pub fn with_refresh_exchange(self, exchange: Arc<dyn RefreshExchange>) -> Self {
        self.coordinator.set_exchange(exchange);
        self
    }

    /// Use a custom metrics sink. Shared with existing clones.
    pub fn with_metrics(self, metrics: Arc<dyn ClientMetrics>) -> Self {
        self.coordinator.set_metrics(metrics);
        self
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the credential store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the refresh coordinator.
    pub fn coordinator(&self) -> &RefreshCoordinator<T, S> {
        &self.coordinator
    }

    /// Refresh counters.
    pub fn refresh_stats(&self) -> RefreshStats {
        self.coordinator.stats()
    }

    // ========== Requests ==========

    /// Send a request.
    ///
    /// A 401 on a request that neither skips auth nor has been retried is
    /// handed to the refresh coordinator and replayed once with the new token.
    #[instrument(skip(self, descriptor), fields(method = %descriptor.method, url = %descriptor.url))]
    pub async fn request(&self, descriptor: RequestDescriptor) -> ApiResult<ApiResponse> {
        let method = descriptor.method;
        let prepared = self.normalizer.prepare(&descriptor).await?;

        let result = match self.transport.send(prepared).await {
            Ok(response) => Ok(response),
            Err(error) => {
                if error.is_unauthorized() {
                    debug!(
                        retried = descriptor.retried,
                        skip_auth = descriptor.skip_auth,
                        "Request unauthorized"
                    );
                }
                self.coordinator.handle_auth_failure(descriptor, error).await
            }
        };

        let status = match &result {
            Ok(response) => response.status,
            Err(e) => e.status,
        };
        self.coordinator
            .metrics()
            .record_request(method.as_str(), status);
        result
    }

    /// Send a GET request.
    pub async fn get(&self, url: &str) -> ApiResult<ApiResponse> {
        self.request(RequestDescriptor::get(url)).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&self, url: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(RequestDescriptor::post(url).json(body)).await
    }

    /// Send a PUT request with a JSON body.
    pub async fn put(&self, url: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(RequestDescriptor::put(url).json(body)).await
    }

    /// Send a PATCH request with a JSON body.
    pub async fn patch(&self, url: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(RequestDescriptor::patch(url).json(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, url: &str) -> ApiResult<ApiResponse> {
        self.request(RequestDescriptor::delete(url)).await
    }

    // ========== Session ==========

    /// Sign in and persist the returned session.
    ///
    /// The request never carries a token and is never refreshed. Tokens are
    /// read from the body (top level or `data`); a `user` object, if present,
    /// is cached alongside them.
    pub async fn sign_in(&self, descriptor: RequestDescriptor) -> ApiResult<ApiResponse> {
        let response = self.request(descriptor.skip_auth()).await?;

        let tokens = SessionTokens::from_payload(&response.data);
        if !tokens.is_authenticated() {
            warn!("Sign-in response carried no access token; session unchanged");
            return Ok(response);
        }
        self.set_session(&tokens).await?;

        let user = response
            .data
            .get(USER_KEY)
            .or_else(|| response.data.get("data").and_then(|d| d.get(USER_KEY)))
            .filter(|u| !u.is_null());
        if let Some(user) = user {
            self.store.set(USER_KEY, &user.to_string()).await?;
        }

        info!("Signed in");
        Ok(response)
    }

    /// Persist session tokens. Absent tokens leave stored values untouched.
    pub async fn set_session(&self, tokens: &SessionTokens) -> ApiResult<()> {
        if let Some(access) = tokens.access_token.as_deref() {
            self.store.set(ACCESS_TOKEN_KEY, access).await?;
        }
        if let Some(refresh) = tokens.refresh_token.as_deref() {
            self.store.set(REFRESH_TOKEN_KEY, refresh).await?;
        }
        Ok(())
    }

    /// Read the stored session tokens.
    pub async fn session(&self) -> ApiResult<SessionTokens> {
        Ok(SessionTokens {
            access_token: self.store.get(ACCESS_TOKEN_KEY).await?,
            refresh_token: self.store.get(REFRESH_TOKEN_KEY).await?,
        })
    }

    /// Read the cached user snapshot.
    pub async fn cached_user(&self) -> ApiResult<Option<Value>> {
        match self.store.get(USER_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                ApiError::generic(crate::error::INTERNAL_ERROR_STATUS)
                    .with_field("reason", format!("Cached user is not valid JSON: {}", e))
            }),
            None => Ok(None),
        }
    }

    /// Remove tokens and the cached user.
    pub async fn sign_out(&self) -> ApiResult<()> {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            self.store.remove(key).await?;
        }
        info!("Signed out");
        Ok(())
    }
}

/// Create a new API client with default implementations.
pub fn api_client(config: ClientConfig) -> Result<ApiClient, ConfigurationError> {
    ApiClient::new(config)
}
