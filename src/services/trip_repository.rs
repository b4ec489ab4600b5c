use chrono::Utc;
use std::sync::Arc;

use crate::db::storage::{KeyValueStore, StorageError};
use crate::models::itinerary::TripItinerary;
use crate::models::user::{AuthAccount, StoredUserData, User};
use crate::services::session::SessionContext;

pub const STORAGE_KEY_PREFIX: &str = "exploremh_data_";

pub fn storage_key(user_id: &str) -> String {
    format!("{}{}", STORAGE_KEY_PREFIX, user_id)
}

/// Saved trips per principal, over whatever key-value store it is handed.
///
/// There is no locking: two processes saving at once will each write their own
/// list and the last one wins.
pub struct TripRepository<S> {
    store: Arc<S>,
    session: SessionContext,
}

impl<S> Clone for TripRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            session: self.session.clone(),
        }
    }
}

impl<S: KeyValueStore> TripRepository<S> {
    pub fn new(store: Arc<S>, session: SessionContext) -> Self {
        Self { store, session }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn load(&self, user_id: &str) -> Result<StoredUserData, StorageError> {
        let key = storage_key(user_id);
        match self.store.get(&key)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                key,
                reason: e.to_string(),
            }),
            None => Ok(StoredUserData::default()),
        }
    }

    pub fn store_data(&self, user_id: &str, data: &StoredUserData) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(&storage_key(user_id), &raw)
    }

    /// Build the principal for an account. Unreadable records are treated as empty.
    pub fn user_for(&self, account: &AuthAccount) -> User {
        let data = match self.load(&account.uid) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Ignoring stored data for {}: {}", account.uid, e);
                StoredUserData::default()
            }
        };
        User::from_account(account, data)
    }

    /// Save a trip for the signed-in principal, newest first.
    ///
    /// Returns `Ok(None)` without touching storage when nobody is signed in.
    pub fn save_trip(&self, trip: &TripItinerary) -> Result<Option<User>, StorageError> {
        let Some(account) = self.session.current_account() else {
            return Ok(None);
        };

        let mut data = self.load(&account.uid)?;
        let now = Utc::now().timestamp_millis();

        let mut saved = trip.clone();
        saved.id = Some(next_trip_id(now, &data.saved_trips));
        saved.created_at = Some(now);

        log::info!(
            "Saving trip {:?} ({}) for {}",
            saved.trip_title,
            saved.id.as_deref().unwrap_or_default(),
            account.uid
        );
        data.saved_trips.insert(0, saved);
        self.store_data(&account.uid, &data)?;

        Ok(Some(User::from_account(&account, data)))
    }

    /// Remove every saved trip with this id. Unknown ids leave the list as it was.
    pub fn delete_trip(&self, trip_id: &str) -> Result<Option<User>, StorageError> {
        let Some(account) = self.session.current_account() else {
            return Ok(None);
        };

        let mut data = self.load(&account.uid)?;
        let before = data.saved_trips.len();
        data.saved_trips.retain(|t| t.id.as_deref() != Some(trip_id));

        if data.saved_trips.len() != before {
            log::info!("Deleted trip {} for {}", trip_id, account.uid);
        }
        self.store_data(&account.uid, &data)?;

        Ok(Some(User::from_account(&account, data)))
    }
}

/// Epoch millis as a string, moved past any numeric id already present so that
/// two saves inside one millisecond still get different ids.
fn next_trip_id(now_millis: i64, existing: &[TripItinerary]) -> String {
    let newest = existing
        .iter()
        .filter_map(|t| t.id.as_deref())
        .filter_map(|id| id.parse::<i64>().ok())
        .max();

    match newest {
        Some(max) if max >= now_millis => (max + 1).to_string(),
        _ => now_millis.to_string(),
    }
}
