//! GraphQL documents used by the authentication flow.

pub const START_AUTHENTICATION_FLOW: &str = r#"
mutation StartAuthenticationFlow {
  startAuthenticationFlow {
    request {
      id
      userCode
      verificationUrl
      expiresAt
    }
    error {
      __typename
    }
  }
}
"#;

pub const REFRESH_AUTHENTICATION_TOKEN: &str = r#"
mutation RefreshAuthenticationToken($refreshToken: Token!) {
  refreshAuthenticationToken(refreshToken: $refreshToken) {
    token {
      accessToken
      refreshToken
      expiresAt
    }
    error {
      __typename
    }
  }
}
"#;

pub const CREATED_AUTHENTICATION_TOKEN: &str = r#"
subscription CreatedAuthenticationToken($requestId: ID!) {
  createdAuthenticationToken(requestId: $requestId) {
    token {
      accessToken
      refreshToken
      expiresAt
    }
    error {
      __typename
    }
  }
}
"#;

/// Cheapest authenticated query; used to confirm a fresh token is accepted.
pub const VERIFY_ACCESS: &str = r#"
query VerifyAccess {
  requests(first: 1) {
    pageInfo {
      hasNextPage
    }
  }
}
"#;
