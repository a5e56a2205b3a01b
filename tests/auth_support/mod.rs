#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use caido_mcp::auth::{
    AuthError, AuthGateway, AuthorizationRequest, BrowserLauncher, Credential, CredentialStore,
    LoginPrompt, TokenChannel,
};
use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct InMemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
    saves: AtomicUsize,
    fail_saves: bool,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `save` always fails with `StorageWrite`.
    pub fn read_only(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
            saves: AtomicUsize::new(0),
            fail_saves: true,
        }
    }

    pub fn seed(&self, credential: Credential) {
        *self.slot.lock().expect("store lock poisoned") = Some(credential);
    }

    pub fn get(&self) -> Option<Credential> {
        self.slot.lock().expect("store lock poisoned").clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, AuthError> {
        Ok(self.get())
    }

    fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves {
            return Err(AuthError::StorageWrite("read-only store".into()));
        }
        credential.validate()?;
        *self.slot.lock().expect("store lock poisoned") = Some(credential.clone());
        Ok(())
    }

    fn delete(&self) -> Result<(), AuthError> {
        *self.slot.lock().expect("store lock poisoned") = None;
        Ok(())
    }
}

/// Gateway that replays queued refresh results and counts calls.
#[derive(Default)]
pub struct FakeGateway {
    refresh_results: Mutex<VecDeque<Result<Credential, AuthError>>>,
    start_error: Mutex<Option<AuthError>>,
    refresh_tokens_seen: Mutex<Vec<String>>,
    starts: AtomicUsize,
    refreshes: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_refresh(&self, result: Result<Credential, AuthError>) {
        self.refresh_results
            .lock()
            .expect("gateway lock poisoned")
            .push_back(result);
    }

    pub fn fail_start(&self, error: AuthError) {
        *self.start_error.lock().expect("gateway lock poisoned") = Some(error);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen
            .lock()
            .expect("gateway lock poisoned")
            .clone()
    }
}

#[async_trait]
impl AuthGateway for FakeGateway {
    async fn start_device_flow(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<AuthorizationRequest, AuthError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.start_error.lock().expect("gateway lock poisoned").take() {
            return Err(error);
        }
        Ok(authorization_request("request-42"))
    }

    async fn refresh(
        &self,
        _cancel: &CancellationToken,
        refresh_token: &str,
    ) -> Result<Credential, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens_seen
            .lock()
            .expect("gateway lock poisoned")
            .push(refresh_token.to_string());
        self.refresh_results
            .lock()
            .expect("gateway lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::rejected("no scripted refresh result")))
    }
}

/// What the fake channel does when awaited.
pub enum ChannelBehavior {
    Issue(Credential),
    Fail(fn() -> AuthError),
    /// Block until cancelled.
    Hang,
}

pub struct FakeChannel {
    behavior: ChannelBehavior,
    opens: AtomicUsize,
    request_ids: Mutex<Vec<String>>,
}

impl FakeChannel {
    pub fn new(behavior: ChannelBehavior) -> Self {
        Self {
            behavior,
            opens: AtomicUsize::new(0),
            request_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn request_ids(&self) -> Vec<String> {
        self.request_ids.lock().expect("channel lock poisoned").clone()
    }
}

#[async_trait]
impl TokenChannel for FakeChannel {
    async fn await_token(
        &self,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Credential, AuthError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.request_ids
            .lock()
            .expect("channel lock poisoned")
            .push(request_id.to_string());
        match &self.behavior {
            ChannelBehavior::Issue(credential) => Ok(credential.clone()),
            ChannelBehavior::Fail(error) => Err(error()),
            ChannelBehavior::Hang => {
                cancel.cancelled().await;
                Err(AuthError::Cancelled)
            }
        }
    }
}

#[derive(Default)]
pub struct RecordingPrompt {
    pub events: Mutex<Vec<String>>,
}

impl RecordingPrompt {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("prompt lock poisoned").clone()
    }
}

impl LoginPrompt for RecordingPrompt {
    fn show_instructions(&self, request: &AuthorizationRequest) {
        self.events
            .lock()
            .expect("prompt lock poisoned")
            .push(format!("instructions:{}", request.user_code));
    }

    fn browser_unavailable(&self, url: &str) {
        self.events
            .lock()
            .expect("prompt lock poisoned")
            .push(format!("browser-unavailable:{url}"));
    }

    fn authenticated(&self) {
        self.events
            .lock()
            .expect("prompt lock poisoned")
            .push("authenticated".to_string());
    }
}

pub struct FailingBrowser;

impl BrowserLauncher for FailingBrowser {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no browser available",
        ))
    }
}

pub fn authorization_request(id: &str) -> AuthorizationRequest {
    AuthorizationRequest {
        id: id.to_string(),
        user_code: "WXYZ-1234".to_string(),
        verification_url: "http://localhost:8080/authorize".to_string(),
        expires_at: Utc::now() + Duration::minutes(15),
    }
}

pub fn credential(access_token: &str, refresh_token: Option<&str>, ttl: Duration) -> Credential {
    Credential {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: Utc::now() + ttl,
    }
}
