pub mod firebase;
pub mod oauth;

use async_trait::async_trait;
use std::fmt;
use url::Url;

use crate::models::user::AuthAccount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    GitHub,
}

impl ProviderKind {
    /// Provider id understood by the identity service.
    pub fn provider_id(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google.com",
            ProviderKind::GitHub => "github.com",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Google => "Google",
            ProviderKind::GitHub => "GitHub",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Query parameters the federated provider redirects back with.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct ProviderCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidCredentials,
    EmailInUse,
    WeakPassword,
    PopupClosed,
    ProviderNotEnabled,
    StateMismatch,
    Network,
    Service,
}

/// Authentication failure. Displays as the provider's own message, unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn popup_closed(kind: ProviderKind) -> Self {
        Self::new(
            AuthErrorKind::PopupClosed,
            format!("Sign-in with {} was cancelled before it completed", kind),
        )
    }

    pub fn provider_not_enabled(kind: ProviderKind) -> Self {
        Self::new(
            AuthErrorKind::ProviderNotEnabled,
            format!("Sign-in with {} is not enabled", kind),
        )
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AuthError {}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::new(AuthErrorKind::Network, err.to_string())
    }
}

/// The external identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthAccount, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError>;

    /// Where to send the user for a federated sign-in, plus the CSRF state to expect back.
    fn authorization_url(&self, kind: ProviderKind) -> Result<(Url, String), AuthError>;

    /// Finish a federated sign-in with the authorization code from the redirect.
    async fn sign_in_with_provider(
        &self,
        kind: ProviderKind,
        code: &str,
    ) -> Result<AuthAccount, AuthError>;

    async fn sign_out(&self, account: &AuthAccount) -> Result<(), AuthError>;
}
