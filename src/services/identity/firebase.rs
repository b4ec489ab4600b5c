use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::IdentitySettings;
use crate::models::user::AuthAccount;
use crate::services::identity::oauth::OAuthProviders;
use crate::services::identity::{AuthError, AuthErrorKind, IdentityProvider, ProviderKind};

const DEFAULT_REQUEST_URI: &str = "http://localhost";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: String,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    profile_picture: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
}

impl From<AccountResponse> for AuthAccount {
    fn from(resp: AccountResponse) -> Self {
        AuthAccount {
            uid: resp.local_id,
            email: resp.email.filter(|e| !e.is_empty()),
            display_name: resp.display_name.filter(|n| !n.is_empty()),
            photo_url: resp.photo_url.or(resp.profile_picture),
            id_token: resp.id_token,
            refresh_token: resp.refresh_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Identity Toolkit REST client (the service behind Firebase Authentication).
pub struct FirebaseIdentityProvider {
    client: Client,
    api_key: String,
    base_url: String,
    request_uri: String,
    oauth: OAuthProviders,
}

impl FirebaseIdentityProvider {
    pub fn new(settings: &IdentitySettings) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::new(),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            request_uri: settings
                .redirect_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_REQUEST_URI.to_string()),
            oauth: OAuthProviders::from_settings(settings)?,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1/accounts:{}", self.base_url, method)
    }

    async fn call<B: Serialize>(&self, method: &str, body: &B) -> Result<AuthAccount, AuthError> {
        let response = self
            .client
            .post(self.endpoint(method))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::warn!("Identity service rejected {}: {}", method, status);
            return Err(parse_error(&text, status.as_u16()));
        }

        let account: AccountResponse = response.json().await.map_err(|e| {
            AuthError::new(
                AuthErrorKind::Service,
                format!("Failed to parse identity response: {}", e),
            )
        })?;
        Ok(account.into())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthAccount, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        self.call("signInWithPassword", &body).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        self.call("signUp", &body).await
    }

    fn authorization_url(&self, kind: ProviderKind) -> Result<(Url, String), AuthError> {
        let (url, csrf) = self.oauth.authorize_url(kind)?;
        Ok((url, csrf.secret().clone()))
    }

    async fn sign_in_with_provider(
        &self,
        kind: ProviderKind,
        code: &str,
    ) -> Result<AuthAccount, AuthError> {
        let access_token = self.oauth.exchange_code(kind, code).await?;
        let body = IdpRequest {
            post_body: idp_post_body(kind, &access_token),
            request_uri: self.request_uri.clone(),
            return_idp_credential: true,
            return_secure_token: true,
        };
        self.call("signInWithIdp", &body).await.map_err(|e| {
            if e.kind == AuthErrorKind::ProviderNotEnabled {
                AuthError::new(e.kind, format!("{} ({})", e.message, kind.provider_id()))
            } else {
                e
            }
        })
    }

    async fn sign_out(&self, account: &AuthAccount) -> Result<(), AuthError> {
        // Identity Toolkit tokens are bearer tokens; dropping them is the sign-out.
        log::info!("Signed out {}", account.uid);
        Ok(())
    }
}

fn idp_post_body(kind: ProviderKind, access_token: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("access_token", access_token)
        .append_pair("providerId", kind.provider_id())
        .finish()
}

/// Map an Identity Toolkit error body to an `AuthError`, keeping the service's message.
fn parse_error(body: &str, status: u16) -> AuthError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| format!("Identity service returned status {}", status));

    let code = message.split(':').next().unwrap_or_default().trim();
    let kind = match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED"
        | "INVALID_EMAIL" | "INVALID_IDP_RESPONSE" => AuthErrorKind::InvalidCredentials,
        "EMAIL_EXISTS" => AuthErrorKind::EmailInUse,
        "WEAK_PASSWORD" => AuthErrorKind::WeakPassword,
        "OPERATION_NOT_ALLOWED" => AuthErrorKind::ProviderNotEnabled,
        _ => AuthErrorKind::Service,
    };

    AuthError::new(kind, message)
}
