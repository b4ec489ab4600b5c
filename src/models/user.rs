use serde::{Deserialize, Serialize};

use crate::models::itinerary::TripItinerary;

const FALLBACK_NAME: &str = "Explorer";
const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg";

/// The identity provider's view of a signed-in account.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AuthAccount {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Per-user record kept in local storage.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct StoredUserData {
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(rename = "savedTrips", default)]
    pub saved_trips: Vec<TripItinerary>,
}

/// The signed-in principal together with its saved trips, most recent first.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub favorites: Vec<String>,
    #[serde(rename = "savedTrips")]
    pub saved_trips: Vec<TripItinerary>,
}

impl User {
    pub fn from_account(account: &AuthAccount, data: StoredUserData) -> Self {
        let name = account
            .display_name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| {
                account
                    .email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| FALLBACK_NAME.to_string());

        let photo_url = account
            .photo_url
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| format!("{}?seed={}", AVATAR_BASE_URL, account.uid));

        Self {
            id: account.uid.clone(),
            name,
            email: account.email.clone().unwrap_or_default(),
            photo_url,
            favorites: data.favorites,
            saved_trips: data.saved_trips,
        }
    }
}
