//! Token-wait channel: a `graphql-transport-ws` subscription that blocks until
//! Caido pushes the credential issued for an authorization request.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;

use super::error::AuthError;
use super::token::Credential;
use crate::client::graphql::{join_messages, GraphQlError, TypedError};
use crate::client::queries;
use crate::util::cancel::cancellable;

/// Sub-protocol negotiated with the subscription endpoint.
pub const SUBPROTOCOL: &str = "graphql-transport-ws";

/// Only one subscription is ever opened per connection.
pub const SUBSCRIPTION_ID: &str = "1";

/// Expiry assumed when an issued token carries no parseable `expiresAt`.
pub const FALLBACK_EXPIRY_DAYS: i64 = 7;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type TokenSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Waits for the credential issued for an authorization request.
#[async_trait]
pub trait TokenChannel: Send + Sync {
    /// Blocks until a token for `request_id` is issued, issuance fails, the
    /// channel errors, or `cancel` fires, which yields [`AuthError::Cancelled`].
    async fn await_token(
        &self,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Credential, AuthError>;
}

/// What a single inbound message means for the wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Acknowledged,
    TokenIssued(Credential),
    IssuanceFailed(String),
    ProtocolError(String),
    Completed,
    /// Server keep-alive; answered with `pong`.
    Ping,
    /// Unrecognised shape, or traffic for another subscription.
    Ignored,
}

/// [`TokenChannel`] over a WebSocket connection.
///
/// # Example
/// ```no_run
/// use caido_mcp::auth::{TokenChannel, WebSocketTokenChannel};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), caido_mcp::auth::AuthError> {
/// let channel = WebSocketTokenChannel::new("ws://localhost:8080/ws/graphql");
/// let credential = channel.await_token("request-id", &CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct WebSocketTokenChannel {
    endpoint: String,
}

impl WebSocketTokenChannel {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TokenChannel for WebSocketTokenChannel {
    async fn await_token(
        &self,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Credential, AuthError> {
        let mut socket = cancellable(cancel, connect(&self.endpoint)).await?;
        tracing::debug!(endpoint = %self.endpoint, "Subscription socket connected");

        let outcome = run_subscription(&mut socket, request_id, cancel).await;
        close(socket).await;

        match &outcome {
            Ok(credential) => {
                tracing::info!(expires_at = %credential.expires_at, "Received authentication token")
            }
            Err(error) => tracing::debug!(%error, "Token wait ended without a token"),
        }
        outcome
    }
}

async fn run_subscription(
    socket: &mut TokenSocket,
    request_id: &str,
    cancel: &CancellationToken,
) -> Result<Credential, AuthError> {
    send(socket, cancel, &ClientMessage::ConnectionInit).await?;

    loop {
        match next_event(socket, cancel, "before connection_ack").await? {
            SubscriptionEvent::Acknowledged => break,
            SubscriptionEvent::Ping => send(socket, cancel, &ClientMessage::Pong).await?,
            SubscriptionEvent::ProtocolError(detail) => return Err(AuthError::Protocol(detail)),
            other => {
                return Err(AuthError::Protocol(format!(
                    "expected connection_ack, received {other:?}"
                )));
            }
        }
    }

    let subscribe = ClientMessage::Subscribe {
        id: SUBSCRIPTION_ID,
        payload: SubscribePayload {
            query: queries::CREATED_AUTHENTICATION_TOKEN,
            variables: json!({ "requestId": request_id }),
        },
    };
    send(socket, cancel, &subscribe).await?;
    tracing::debug!(request_id, "Subscribed to token issuance");

    loop {
        match next_event(socket, cancel, "before a token was issued").await? {
            SubscriptionEvent::TokenIssued(credential) => return Ok(credential),
            SubscriptionEvent::IssuanceFailed(reason) => {
                return Err(AuthError::IssuanceFailed(reason));
            }
            SubscriptionEvent::ProtocolError(detail) => return Err(AuthError::Protocol(detail)),
            SubscriptionEvent::Completed => {
                return Err(AuthError::Protocol(
                    "subscription completed without token".to_string(),
                ));
            }
            SubscriptionEvent::Ping => send(socket, cancel, &ClientMessage::Pong).await?,
            SubscriptionEvent::Acknowledged | SubscriptionEvent::Ignored => {}
        }
    }
}

/// Read until the next data frame and interpret it.
///
/// Cancellation is checked before every read and raced against the read
/// itself, with cancellation winning ties.
async fn next_event(
    socket: &mut TokenSocket,
    cancel: &CancellationToken,
    phase: &str,
) -> Result<SubscriptionEvent, AuthError> {
    loop {
        if cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AuthError::Cancelled),
            frame = socket.next() => frame,
        };
        let text = match frame {
            Some(Ok(Message::Text(text))) => text.to_string(),
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Some(Ok(Message::Close(_))) | None => {
                return Err(AuthError::Protocol(format!("connection closed {phase}")));
            }
            // tungstenite answers websocket-level pings itself
            Some(Ok(_)) => continue,
            Some(Err(err)) => {
                return Err(AuthError::Protocol(format!(
                    "websocket receive failed {phase}: {err}"
                )));
            }
        };
        let event = parse_event(&text, Utc::now());
        tracing::trace!(?event, "Subscription message");
        return Ok(event);
    }
}

async fn send(
    socket: &mut TokenSocket,
    cancel: &CancellationToken,
    message: &ClientMessage<'_>,
) -> Result<(), AuthError> {
    let text = serde_json::to_string(message)
        .map_err(|err| AuthError::Protocol(format!("failed to encode message: {err}")))?;
    cancellable(cancel, async {
        socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|err| AuthError::Protocol(format!("websocket send failed: {err}")))
    })
    .await
}

async fn connect(endpoint: &str) -> Result<TokenSocket, AuthError> {
    let mut request = endpoint.into_client_request().map_err(|err| {
        AuthError::Protocol(format!("invalid subscription endpoint {endpoint}: {err}"))
    })?;
    let origin = {
        let uri = request.uri();
        let scheme = if uri.scheme_str() == Some("wss") {
            "https"
        } else {
            "http"
        };
        uri.authority()
            .and_then(|authority| HeaderValue::from_str(&format!("{scheme}://{authority}")).ok())
    };
    let headers = request.headers_mut();
    headers.insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));
    if let Some(origin) = origin {
        headers.insert("Origin", origin);
    }

    connect_async(request)
        .await
        .map(|(socket, _)| socket)
        .map_err(|err| map_connect_error(endpoint, err))
}

fn map_connect_error(endpoint: &str, error: WsError) -> AuthError {
    match error {
        WsError::Http(response) => {
            let status = response.status();
            AuthError::from_status(
                status.as_u16(),
                format!("subscription handshake with {endpoint} failed with status {status}"),
            )
        }
        WsError::Url(err) => {
            AuthError::Protocol(format!("invalid subscription endpoint {endpoint}: {err}"))
        }
        other => AuthError::network(format!("failed to connect to {endpoint}: {other}")),
    }
}

async fn close(mut socket: TokenSocket) {
    match tokio::time::timeout(CLOSE_TIMEOUT, socket.close(None)).await {
        Ok(Ok(())) | Ok(Err(WsError::ConnectionClosed)) | Ok(Err(WsError::AlreadyClosed)) => {}
        Ok(Err(err)) => tracing::debug!(%err, "Subscription socket close failed"),
        Err(_) => tracing::debug!("Subscription socket close timed out"),
    }
}

/// Interpret one text frame received at `received_at`.
///
/// Frames that are not JSON objects with a string `type` are ignored; frames
/// of a known type with missing or malformed fields are protocol errors.
pub fn parse_event(text: &str, received_at: DateTime<Utc>) -> SubscriptionEvent {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return SubscriptionEvent::Ignored,
    };
    if value.get("type").and_then(Value::as_str).is_none() {
        return SubscriptionEvent::Ignored;
    }
    let message = match serde_json::from_value::<ServerMessage>(value) {
        Ok(message) => message,
        Err(err) => return SubscriptionEvent::ProtocolError(format!("malformed message: {err}")),
    };

    match message {
        ServerMessage::ConnectionAck => SubscriptionEvent::Acknowledged,
        ServerMessage::Ping => SubscriptionEvent::Ping,
        ServerMessage::Pong | ServerMessage::Unknown => SubscriptionEvent::Ignored,
        ServerMessage::Next { id, .. }
        | ServerMessage::Error { id, .. }
        | ServerMessage::Complete { id }
            if id != SUBSCRIPTION_ID =>
        {
            SubscriptionEvent::Ignored
        }
        ServerMessage::Next { payload, .. } => interpret_next(payload, received_at),
        ServerMessage::Error { payload, .. } => {
            SubscriptionEvent::ProtocolError(format!("subscription error: {}", describe(&payload)))
        }
        ServerMessage::Complete { .. } => SubscriptionEvent::Completed,
    }
}

fn interpret_next(payload: NextPayload, received_at: DateTime<Utc>) -> SubscriptionEvent {
    let Some(result) = payload.data.and_then(|data| data.created_authentication_token) else {
        if payload.errors.is_empty() {
            return SubscriptionEvent::Ignored;
        }
        return SubscriptionEvent::ProtocolError(format!(
            "subscription returned errors: {}",
            join_messages(&payload.errors)
        ));
    };

    if let Some(error) = result.error {
        return SubscriptionEvent::IssuanceFailed(error.typename);
    }
    let Some(token) = result.token else {
        return SubscriptionEvent::ProtocolError(
            "issuance result carried neither a token nor an error".to_string(),
        );
    };
    if token.access_token.trim().is_empty() {
        return SubscriptionEvent::ProtocolError("issued token has no access token".to_string());
    }

    SubscriptionEvent::TokenIssued(Credential {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: parse_expiry(token.expires_at.as_deref(), received_at),
    })
}

/// A bad timestamp must not discard a legitimately issued token.
fn parse_expiry(raw: Option<&str>, received_at: DateTime<Utc>) -> DateTime<Utc> {
    let fallback = received_at + chrono::Duration::days(FALLBACK_EXPIRY_DAYS);
    match raw.map(DateTime::parse_from_rfc3339) {
        Some(Ok(parsed)) => parsed.with_timezone(&Utc),
        Some(Err(err)) => {
            tracing::warn!(
                value = raw.unwrap_or_default(),
                error = %err,
                fallback = %fallback,
                "Issued token has an unparseable expiry; assuming {FALLBACK_EXPIRY_DAYS} days"
            );
            fallback
        }
        None => {
            tracing::warn!(fallback = %fallback, "Issued token has no expiry; assuming {FALLBACK_EXPIRY_DAYS} days");
            fallback
        }
    }
}

fn describe(payload: &Value) -> String {
    match serde_json::from_value::<Vec<GraphQlError>>(payload.clone()) {
        Ok(errors) if !errors.is_empty() => join_messages(&errors),
        _ => payload.to_string(),
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage<'a> {
    ConnectionInit,
    Subscribe {
        id: &'a str,
        payload: SubscribePayload<'a>,
    },
    Pong,
}

#[derive(Debug, Serialize)]
struct SubscribePayload<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    ConnectionAck,
    Next { id: String, payload: NextPayload },
    Error { id: String, payload: Value },
    Complete { id: String },
    Ping,
    Pong,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct NextPayload {
    data: Option<IssuanceData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuanceData {
    created_authentication_token: Option<IssuanceResult>,
}

#[derive(Debug, Deserialize)]
struct IssuanceResult {
    token: Option<IssuedToken>,
    error: Option<TypedError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuedToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<String>,
}
