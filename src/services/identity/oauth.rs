use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthUrl, AuthorizationCode, ClientId,
    ClientSecret, CsrfToken, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use url::Url;

use crate::config::{IdentitySettings, OAuthClientSettings};
use crate::services::identity::{AuthError, AuthErrorKind, ProviderKind};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

/// OAuth clients for the federated providers that are configured.
pub struct OAuthProviders {
    google: Option<BasicClient>,
    github: Option<BasicClient>,
}

impl OAuthProviders {
    pub fn from_settings(settings: &IdentitySettings) -> Result<Self, AuthError> {
        let redirect = settings.redirect_uri.as_deref();
        let google = settings
            .google
            .as_ref()
            .map(|c| build_client(ProviderKind::Google, c, redirect))
            .transpose()?;
        let github = settings
            .github
            .as_ref()
            .map(|c| build_client(ProviderKind::GitHub, c, redirect))
            .transpose()?;

        Ok(Self { google, github })
    }

    pub fn is_enabled(&self, kind: ProviderKind) -> bool {
        self.client(kind).is_ok()
    }

    fn client(&self, kind: ProviderKind) -> Result<&BasicClient, AuthError> {
        let client = match kind {
            ProviderKind::Google => self.google.as_ref(),
            ProviderKind::GitHub => self.github.as_ref(),
        };
        client.ok_or_else(|| AuthError::provider_not_enabled(kind))
    }

    /// Build the provider's consent URL along with the CSRF state it will echo back.
    pub fn authorize_url(&self, kind: ProviderKind) -> Result<(Url, CsrfToken), AuthError> {
        let client = self.client(kind)?;
        let request = client.authorize_url(CsrfToken::new_random);
        let request = scopes(kind)
            .iter()
            .fold(request, |req, scope| req.add_scope(Scope::new(scope.to_string())));
        Ok(request.url())
    }

    /// Exchange an authorization code for the provider's access token.
    pub async fn exchange_code(&self, kind: ProviderKind, code: &str) -> Result<String, AuthError> {
        let client = self.client(kind)?;
        client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map(|token| token.access_token().secret().clone())
            .map_err(|e| {
                AuthError::new(
                    AuthErrorKind::InvalidCredentials,
                    format!("Failed to exchange authorization code: {}", e),
                )
            })
    }
}

fn scopes(kind: ProviderKind) -> &'static [&'static str] {
    match kind {
        ProviderKind::Google => &["openid", "email", "profile"],
        ProviderKind::GitHub => &["read:user", "user:email"],
    }
}

fn build_client(
    kind: ProviderKind,
    settings: &OAuthClientSettings,
    redirect_uri: Option<&str>,
) -> Result<BasicClient, AuthError> {
    let (auth_url, token_url) = match kind {
        ProviderKind::Google => (GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL),
        ProviderKind::GitHub => (GITHUB_AUTH_URL, GITHUB_TOKEN_URL),
    };
    let invalid = |e: url::ParseError| {
        AuthError::new(
            AuthErrorKind::Service,
            format!("Invalid {} OAuth endpoint: {}", kind, e),
        )
    };

    let client = BasicClient::new(
        ClientId::new(settings.client_id.clone()),
        Some(ClientSecret::new(settings.client_secret.clone())),
        AuthUrl::new(auth_url.to_string()).map_err(invalid)?,
        Some(TokenUrl::new(token_url.to_string()).map_err(invalid)?),
    );

    match redirect_uri {
        Some(uri) => {
            let redirect = RedirectUrl::new(uri.to_string()).map_err(invalid)?;
            Ok(client.set_redirect_uri(redirect))
        }
        None => Ok(client),
    }
}
