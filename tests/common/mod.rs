#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use exploremh::db::storage::MemoryStore;
use exploremh::models::itinerary::{Coordinates, ItineraryDay, TripItinerary};
use exploremh::models::user::{AuthAccount, User};
use exploremh::services::generation::client::GenerativeClient;
use exploremh::services::generation::wire::{GenerateContentRequest, GenerateContentResponse};
use exploremh::services::generation::GenerationError;
use exploremh::services::identity::{AuthError, AuthErrorKind, IdentityProvider, ProviderKind};
use exploremh::services::session::SessionStore;
use async_trait::async_trait;
use url::Url;

pub const TEST_EMAIL: &str = "test@example.com";
pub const TEST_PASSWORD: &str = "testpassword123";
pub const GOOD_CODE: &str = "good-code";

pub fn account(uid: &str, email: &str) -> AuthAccount {
    AuthAccount {
        uid: uid.to_string(),
        email: Some(email.to_string()),
        display_name: None,
        photo_url: None,
        id_token: Some(format!("token-{}", uid)),
        refresh_token: None,
    }
}

/// In-memory stand-in for the identity service.
pub struct FakeIdentityProvider {
    accounts: Mutex<HashMap<String, (String, AuthAccount)>>,
    enabled_providers: Vec<ProviderKind>,
    states_issued: AtomicUsize,
    pub sign_outs: AtomicUsize,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        let provider = Self {
            accounts: Mutex::new(HashMap::new()),
            enabled_providers: vec![ProviderKind::Google],
            states_issued: AtomicUsize::new(0),
            sign_outs: AtomicUsize::new(0),
        };
        provider.accounts.lock().unwrap().insert(
            TEST_EMAIL.to_string(),
            (TEST_PASSWORD.to_string(), account("test_user_123", TEST_EMAIL)),
        );
        provider
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthAccount, AuthError> {
        match self.accounts.lock().unwrap().get(email) {
            Some((stored, account)) if stored == password => Ok(account.clone()),
            _ => Err(AuthError::new(
                AuthErrorKind::InvalidCredentials,
                "INVALID_LOGIN_CREDENTIALS",
            )),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(AuthError::new(AuthErrorKind::EmailInUse, "EMAIL_EXISTS"));
        }
        let created = account(&format!("uid-{}", accounts.len() + 1), email);
        accounts.insert(email.to_string(), (password.to_string(), created.clone()));
        Ok(created)
    }

    fn authorization_url(&self, kind: ProviderKind) -> Result<(Url, String), AuthError> {
        if !self.enabled_providers.contains(&kind) {
            return Err(AuthError::provider_not_enabled(kind));
        }
        let n = self.states_issued.fetch_add(1, Ordering::SeqCst);
        let state = format!("state-{}", n);
        let url = Url::parse(&format!(
            "https://auth.example/{}?state={}",
            kind.provider_id(),
            state
        ))
        .unwrap();
        Ok((url, state))
    }

    async fn sign_in_with_provider(
        &self,
        kind: ProviderKind,
        code: &str,
    ) -> Result<AuthAccount, AuthError> {
        if code != GOOD_CODE {
            return Err(AuthError::new(
                AuthErrorKind::InvalidCredentials,
                "INVALID_IDP_RESPONSE",
            ));
        }
        let mut acct = account(&format!("{}-user", kind.label().to_lowercase()), "fed@example.com");
        acct.display_name = Some("Federated Explorer".to_string());
        Ok(acct)
    }

    async fn sign_out(&self, _account: &AuthAccount) -> Result<(), AuthError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub type TestSession = SessionStore<FakeIdentityProvider, MemoryStore>;

pub fn session_with_store(store: Arc<MemoryStore>) -> TestSession {
    SessionStore::new(FakeIdentityProvider::new(), store)
}

/// Collects every value a session listener receives.
pub fn record_events(session: &TestSession) -> Arc<Mutex<Vec<Option<User>>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    // Listener lives as long as the session.
    let _subscription = session.on_auth_change(move |user| sink.lock().unwrap().push(user));
    events
}

pub fn sample_trip(title: &str) -> TripItinerary {
    TripItinerary {
        id: None,
        trip_title: title.to_string(),
        total_estimated_cost: "INR 12,000".to_string(),
        weather_forecast: "Pleasant, 24C".to_string(),
        itinerary: vec![ItineraryDay {
            day: 1,
            location: "Lonavala".to_string(),
            activities: vec!["Tiger Point".to_string()],
            food_recommendations: vec!["Chikki".to_string()],
            coordinates: Coordinates {
                lat: 18.7546,
                lng: 73.4062,
            },
            rating: 4.4,
            review_count: 8800,
            opening_hours: "Open 24 hours".to_string(),
            travel_time_from_prev: None,
            distance_from_prev: None,
            image_description: "Misty valley".to_string(),
        }],
        travel_tips: vec!["Carry a raincoat".to_string()],
        created_at: None,
        grounding_sources: None,
    }
}

pub fn text_response(text: &str) -> GenerateContentResponse {
    serde_json::from_value(serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    }))
    .unwrap()
}

pub fn prompt_of(request: &GenerateContentRequest) -> String {
    request
        .contents
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.clone())
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Reply = (Option<Duration>, Result<GenerateContentResponse, GenerationError>);

/// Generative client whose answers are computed from the model name and request.
pub struct ScriptedClient<F> {
    script: F,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl<F> ScriptedClient<F>
where
    F: Fn(&str, &GenerateContentRequest) -> Reply + Send + Sync,
{
    pub fn new(script: F) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls_to(&self, model: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == model)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }
}

#[async_trait]
impl<F> GenerativeClient for ScriptedClient<F>
where
    F: Fn(&str, &GenerateContentRequest) -> Reply + Send + Sync,
{
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt_of(request)));
        let (delay, reply) = (self.script)(model, request);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}
