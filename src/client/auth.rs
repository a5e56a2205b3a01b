//! [`AuthGateway`] over the Caido GraphQL API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::graphql::{GraphQlResponse, TypedError};
use super::{data_or_rejected, queries, CaidoClient};
use crate::auth::{AuthError, AuthGateway, AuthorizationRequest, Credential};
use crate::util::cancel::cancellable;

#[async_trait]
impl AuthGateway for CaidoClient {
    async fn start_device_flow(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AuthorizationRequest, AuthError> {
        cancellable(cancel, async {
            let response: GraphQlResponse<StartFlowData> = self
                .execute(queries::START_AUTHENTICATION_FLOW, serde_json::Value::Null)
                .await?;
            let result = data_or_rejected(response, "startAuthenticationFlow")?
                .start_authentication_flow;
            if let Some(error) = result.error {
                return Err(AuthError::rejected(format!(
                    "startAuthenticationFlow: {}",
                    error.typename
                )));
            }
            let request = result.request.ok_or_else(|| {
                AuthError::rejected("startAuthenticationFlow: no request returned")
            })?;
            tracing::debug!(request_id = %request.id, expires_at = %request.expires_at, "Started device flow");
            Ok(AuthorizationRequest {
                id: request.id,
                user_code: request.user_code,
                verification_url: request.verification_url,
                expires_at: request.expires_at,
            })
        })
        .await
    }

    async fn refresh(
        &self,
        cancel: &CancellationToken,
        refresh_token: &str,
    ) -> Result<Credential, AuthError> {
        cancellable(cancel, async {
            let response: GraphQlResponse<RefreshData> = self
                .execute(
                    queries::REFRESH_AUTHENTICATION_TOKEN,
                    json!({ "refreshToken": refresh_token }),
                )
                .await?;
            let result = data_or_rejected(response, "refreshAuthenticationToken")?
                .refresh_authentication_token;
            if let Some(error) = result.error {
                return Err(AuthError::rejected(format!(
                    "refreshAuthenticationToken: {}",
                    error.typename
                )));
            }
            let token = result.token.ok_or_else(|| {
                AuthError::rejected("refreshAuthenticationToken: no token returned")
            })?;
            let credential = Credential {
                access_token: token.access_token,
                refresh_token: token.refresh_token,
                expires_at: token.expires_at,
            };
            credential
                .validate()
                .map_err(|err| AuthError::rejected(format!("refreshAuthenticationToken: {err}")))?;
            Ok(credential)
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartFlowData {
    start_authentication_flow: StartFlowResult,
}

#[derive(Debug, Deserialize)]
struct StartFlowResult {
    request: Option<RequestPayload>,
    error: Option<TypedError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestPayload {
    id: String,
    user_code: String,
    verification_url: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    refresh_authentication_token: RefreshResult,
}

#[derive(Debug, Deserialize)]
struct RefreshResult {
    token: Option<TokenPayload>,
    error: Option<TypedError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPayload {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
}
