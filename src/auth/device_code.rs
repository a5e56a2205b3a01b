use chrono::{DateTime, Utc};

/// Pending device-flow authorization returned by
/// [`AuthGateway::start_device_flow`](super::AuthGateway::start_device_flow).
///
/// `id` correlates the token subscription; `user_code` and
/// `verification_url` are shown to the user. Never persisted.
///
/// # Example
/// ```no_run
/// use caido_mcp::auth::AuthorizationRequest;
/// use chrono::{Duration, Utc};
///
/// let request = AuthorizationRequest {
///     id: "req-1".to_string(),
///     user_code: "ABCD-EFGH".to_string(),
///     verification_url: "https://dashboard.caido.io/device".to_string(),
///     expires_at: Utc::now() + Duration::minutes(10),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub id: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_at: DateTime<Utc>,
}
