use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Bearer credential persisted by a [`CredentialStore`](super::CredentialStore).
///
/// Serialized as `{"accessToken", "refreshToken", "expiresAt"}` with the
/// expiry in RFC 3339.
///
/// # Example
/// ```no_run
/// use caido_mcp::auth::Credential;
/// use chrono::{Duration, Utc};
///
/// let credential = Credential {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     expires_at: Utc::now() + Duration::days(7),
/// };
/// assert_eq!(credential.refresh_token(), Some("refresh"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Refresh token usable for renewal. Empty strings count as absent.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.access_token.trim().is_empty() {
            return Err(AuthError::MissingAccessToken);
        }
        Ok(())
    }
}
