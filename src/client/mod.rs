//! Minimal GraphQL-over-HTTP client for a Caido instance.
//!
//! Only the calls the authentication flow needs live here; the client
//! implements [`AuthGateway`](crate::auth::AuthGateway) in [`auth`].

pub mod auth;
pub mod graphql;
pub mod queries;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthError;
use crate::config::{self, CaidoConfig};
use crate::error::CaidoError;
use crate::util::cancel::cancellable;

use graphql::{join_messages, GraphQlRequest, GraphQlResponse};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GraphQL client bound to one Caido instance.
///
/// # Example
/// ```no_run
/// use caido_mcp::client::CaidoClient;
///
/// let client = CaidoClient::new("http://localhost:8080")?;
/// assert_eq!(client.websocket_endpoint(), "ws://localhost:8080/ws/graphql");
/// # Ok::<(), caido_mcp::error::CaidoError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CaidoClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl CaidoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CaidoError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn from_config(config: &CaidoConfig) -> Result<Self, CaidoError> {
        Self::with_timeout(config.base_url()?, config.request_timeout())
    }

    fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CaidoError> {
        let base_url = config::normalize_base_url(&base_url.into())?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    /// Attach a bearer token to every subsequent request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn graphql_endpoint(&self) -> String {
        config::graphql_endpoint_for(&self.base_url)
    }

    pub fn websocket_endpoint(&self) -> String {
        config::websocket_endpoint_for(&self.base_url)
    }

    /// Run a trivial authenticated query to confirm the token is accepted.
    pub async fn verify_access(&self, cancel: &CancellationToken) -> Result<(), AuthError> {
        cancellable(cancel, async {
            let response: GraphQlResponse<Value> =
                self.execute(queries::VERIFY_ACCESS, Value::Null).await?;
            data_or_rejected(response, "verify access").map(|_| ())
        })
        .await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<GraphQlResponse<T>, AuthError> {
        let mut request = self
            .http
            .post(self.graphql_endpoint())
            .header("Accept", "application/json")
            .json(&GraphQlRequest { query, variables });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::from_status(
                status.as_u16(),
                format!("GraphQL request failed with status {status}"),
            ));
        }
        response
            .json::<GraphQlResponse<T>>()
            .await
            .map_err(|err| AuthError::network(format!("Invalid GraphQL response: {err}")))
    }
}

/// Unwrap `data`, treating top-level GraphQL errors as a server rejection.
fn data_or_rejected<T>(response: GraphQlResponse<T>, operation: &str) -> Result<T, AuthError> {
    if !response.errors.is_empty() {
        return Err(AuthError::rejected(format!(
            "{operation}: {}",
            join_messages(&response.errors)
        )));
    }
    response
        .data
        .ok_or_else(|| AuthError::rejected(format!("{operation}: response contained no data")))
}
