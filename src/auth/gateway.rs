use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::device_code::AuthorizationRequest;
use super::error::AuthError;
use super::token::Credential;

/// Remote side of the device flow: starting an authorization request and
/// renewing a credential.
///
/// Failures are reported as [`AuthError::Gateway`] with a
/// [`GatewayErrorKind`](super::GatewayErrorKind); both calls must return
/// [`AuthError::Cancelled`] promptly once `cancel` fires.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn start_device_flow(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AuthorizationRequest, AuthError>;

    async fn refresh(
        &self,
        cancel: &CancellationToken,
        refresh_token: &str,
    ) -> Result<Credential, AuthError>;
}
