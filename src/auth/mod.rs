//! Device-flow authentication and credential lifecycle.

pub mod browser;
pub mod device_code;
pub mod error;
pub mod gateway;
pub mod prompt;
pub mod service;
pub mod store;
pub mod subscription;
pub mod token;

pub use browser::{BrowserLauncher, NoBrowser, SystemBrowser};
pub use device_code::AuthorizationRequest;
pub use error::{AuthError, GatewayErrorKind};
pub use gateway::AuthGateway;
pub use prompt::{LoginPrompt, StderrPrompt};
pub use service::Authenticator;
pub use store::{CredentialStore, CredentialStoreConfig, FileCredentialStore};
pub use subscription::{SubscriptionEvent, TokenChannel, WebSocketTokenChannel};
pub use token::Credential;
