use std::env;
use std::fmt;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_REGION: &str = "Maharashtra";
pub const DEFAULT_COUNTRY: &str = "India";

pub const DEFAULT_ITINERARY_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_REASONING_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_QUICK_FACT_MODEL: &str = "gemini-2.5-flash-lite-latest";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{} not set", var),
            ConfigError::Invalid { var, reason } => write!(f, "{} is invalid: {}", var, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Which model serves each generation feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSet {
    pub itinerary: String,
    pub reasoning: String,
    pub quick_fact: String,
    pub image: String,
    pub analysis: String,
}

impl Default for ModelSet {
    fn default() -> Self {
        Self {
            itinerary: DEFAULT_ITINERARY_MODEL.to_string(),
            reasoning: DEFAULT_REASONING_MODEL.to_string(),
            quick_fact: DEFAULT_QUICK_FACT_MODEL.to_string(),
            image: DEFAULT_IMAGE_MODEL.to_string(),
            analysis: DEFAULT_ANALYSIS_MODEL.to_string(),
        }
    }
}

/// The area every prompt is scoped to.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub country: String,
}

impl Region {
    /// "Maharashtra, India"
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

impl Default for Region {
    fn default() -> Self {
        Self {
            name: DEFAULT_REGION.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub api_key: String,
    pub base_url: String,
    pub models: ModelSet,
    pub region: Region,
}

impl GenerationSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            models: ModelSet::default(),
            region: Region::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .map_err(|_| ConfigError::Missing("GEMINI_API_KEY"))?;

        let defaults = ModelSet::default();
        let models = ModelSet {
            itinerary: var_or("EXPLOREMH_ITINERARY_MODEL", defaults.itinerary),
            reasoning: var_or("EXPLOREMH_REASONING_MODEL", defaults.reasoning),
            quick_fact: var_or("EXPLOREMH_QUICK_FACT_MODEL", defaults.quick_fact),
            image: var_or("EXPLOREMH_IMAGE_MODEL", defaults.image),
            analysis: var_or("EXPLOREMH_ANALYSIS_MODEL", defaults.analysis),
        };

        let region = Region {
            name: var_or("EXPLOREMH_REGION", DEFAULT_REGION.to_string()),
            country: var_or("EXPLOREMH_COUNTRY", DEFAULT_COUNTRY.to_string()),
        };

        Ok(Self {
            api_key,
            base_url: var_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL.to_string()),
            models,
            region,
        })
    }
}

/// Client registration for one federated sign-in provider.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthClientSettings {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySettings {
    pub api_key: String,
    pub base_url: String,
    pub redirect_uri: Option<String>,
    pub google: Option<OAuthClientSettings>,
    pub github: Option<OAuthClientSettings>,
}

impl IdentitySettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            env::var("FIREBASE_API_KEY").map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?;

        let redirect_uri = env::var("OAUTH_REDIRECT_URI").ok();
        if let Some(uri) = &redirect_uri {
            url::Url::parse(uri).map_err(|e| ConfigError::Invalid {
                var: "OAUTH_REDIRECT_URI",
                reason: e.to_string(),
            })?;
        }

        Ok(Self {
            api_key,
            base_url: var_or("IDENTITY_BASE_URL", DEFAULT_IDENTITY_BASE_URL.to_string()),
            redirect_uri,
            google: oauth_client_from_env("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            github: oauth_client_from_env("GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub generation: GenerationSettings,
    pub identity: IdentitySettings,
}

impl AppConfig {
    /// Read settings from the process environment, loading `.env` first if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(Self {
            generation: GenerationSettings::from_env()?,
            identity: IdentitySettings::from_env()?,
        })
    }
}

fn var_or(var: &str, default: String) -> String {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn oauth_client_from_env(id_var: &str, secret_var: &str) -> Option<OAuthClientSettings> {
    match (env::var(id_var), env::var(secret_var)) {
        (Ok(client_id), Ok(client_secret)) => Some(OAuthClientSettings {
            client_id,
            client_secret,
        }),
        _ => None,
    }
}
