use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, Weak};

use url::Url;

use crate::db::storage::KeyValueStore;
use crate::models::user::{AuthAccount, User};
use crate::services::identity::{
    AuthError, AuthErrorKind, IdentityProvider, ProviderCallback, ProviderKind,
};
use crate::services::trip_repository::TripRepository;

pub const SESSION_KEY: &str = "exploremh_session";

/// Shared handle to whoever is signed in right now.
///
/// Only the session store writes to it; everything else reads.
#[derive(Clone, Default)]
pub struct SessionContext {
    account: Arc<RwLock<Option<AuthAccount>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_account(&self) -> Option<AuthAccount> {
        self.account
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.account
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn replace(&self, account: Option<AuthAccount>) {
        *self.account.write().unwrap_or_else(|e| e.into_inner()) = account;
    }
}

type Listener = Arc<dyn Fn(Option<User>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Returned by [`SessionStore::on_auth_change`]. Dropping it keeps the listener registered.
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut guard = listeners.lock().unwrap_or_else(|e| e.into_inner());
            guard.entries.retain(|(id, _)| *id != self.id);
        }
    }
}

pub struct SessionStore<P, S> {
    provider: P,
    trips: TripRepository<S>,
    context: SessionContext,
    listeners: Arc<Mutex<Listeners>>,
    pending_states: Mutex<HashMap<ProviderKind, String>>,
}

impl<P, S> SessionStore<P, S>
where
    P: IdentityProvider,
    S: KeyValueStore,
{
    pub fn new(provider: P, store: Arc<S>) -> Self {
        let context = SessionContext::new();
        Self {
            provider,
            trips: TripRepository::new(store, context.clone()),
            context,
            listeners: Arc::new(Mutex::new(Listeners::default())),
            pending_states: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn context(&self) -> SessionContext {
        self.context.clone()
    }

    pub fn trips(&self) -> &TripRepository<S> {
        &self.trips
    }

    /// Register a listener for sign-in and sign-out.
    ///
    /// It is called once straight away with the current state, then after every
    /// change the identity service confirms.
    pub fn on_auth_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<User>) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(callback);
        let id = {
            let mut guard = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            let id = guard.next_id;
            guard.next_id += 1;
            guard.entries.push((id, listener.clone()));
            id
        };

        listener(self.current_user());

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.context
            .current_account()
            .map(|account| self.trips.user_for(&account))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let account = self.provider.sign_in_with_password(email, password).await?;
        Ok(self.establish(account))
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let account = self.provider.sign_up(email, password).await?;
        Ok(self.establish(account))
    }

    /// First half of a federated sign-in: the URL to send the user to.
    pub fn begin_provider_login(&self, kind: ProviderKind) -> Result<Url, AuthError> {
        let (url, state) = self.provider.authorization_url(kind)?;
        self.pending_states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, state);
        Ok(url)
    }

    /// Second half of a federated sign-in, fed with the provider's redirect.
    pub async fn login_with_provider(
        &self,
        kind: ProviderKind,
        callback: &ProviderCallback,
    ) -> Result<User, AuthError> {
        let expected_state = self
            .pending_states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&kind);

        let code = match (&callback.error, &callback.code) {
            (None, Some(code)) if !code.is_empty() => code,
            _ => {
                log::info!(
                    "{} sign-in abandoned: {}",
                    kind,
                    callback.error.as_deref().unwrap_or("no authorization code")
                );
                return Err(AuthError::popup_closed(kind));
            }
        };

        if expected_state.is_none() || callback.state != expected_state {
            return Err(AuthError::new(
                AuthErrorKind::StateMismatch,
                format!("{} sign-in could not be verified. Please try again.", kind),
            ));
        }

        let account = self.provider.sign_in_with_provider(kind, code).await?;
        Ok(self.establish(account))
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(account) = self.context.current_account() {
            self.provider.sign_out(&account).await?;
        }

        if let Err(e) = self.trips.store().delete(SESSION_KEY) {
            log::warn!("Failed to clear persisted session: {}", e);
        }
        self.context.replace(None);
        self.notify(None);
        Ok(())
    }

    /// Bring back the session persisted by an earlier sign-in, if any.
    pub fn restore(&self) -> Option<User> {
        let raw = match self.trips.store().get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read persisted session: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<AuthAccount>(&raw) {
            Ok(account) => {
                log::info!("Restored session for {}", account.uid);
                self.context.replace(Some(account));
                let user = self.current_user();
                self.notify(user.clone());
                user
            }
            Err(e) => {
                log::warn!("Discarding unreadable persisted session: {}", e);
                None
            }
        }
    }

    fn establish(&self, account: AuthAccount) -> User {
        match serde_json::to_string(&account) {
            Ok(raw) => {
                if let Err(e) = self.trips.store().set(SESSION_KEY, &raw) {
                    log::warn!("Failed to persist session: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize session: {}", e),
        }

        log::info!("Signed in {}", account.uid);
        let user = self.trips.user_for(&account);
        self.context.replace(Some(account));
        self.notify(Some(user.clone()));
        user
    }

    fn notify(&self, user: Option<User>) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            listener(user.clone());
        }
    }
}
