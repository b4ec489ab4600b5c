use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One stop of the trip. The generator decides the numbering; nothing here checks it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ItineraryDay {
    pub day: u32,
    pub location: String,
    pub activities: Vec<String>,
    pub food_recommendations: Vec<String>,
    pub coordinates: Coordinates,
    pub rating: f64,
    pub review_count: u32,
    pub opening_hours: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_time_from_prev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_from_prev: Option<String>,
    pub image_description: String,
}

/// Either field may be missing from a search citation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct WebReference {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

/// A citation the generator returned after searching the web.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct GroundingSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebReference>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TripItinerary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub trip_title: String,
    pub total_estimated_cost: String,
    pub weather_forecast: String,
    /// Visit order.
    pub itinerary: Vec<ItineraryDay>,
    pub travel_tips: Vec<String>,
    /// Epoch milliseconds, set when the trip is saved.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_sources: Option<Vec<GroundingSource>>,
}

impl TripItinerary {
    pub fn days(&self) -> &[ItineraryDay] {
        &self.itinerary
    }

    /// Web citations that actually carry a link.
    pub fn web_sources(&self) -> impl Iterator<Item = &WebReference> {
        self.grounding_sources
            .iter()
            .flatten()
            .filter_map(|source| source.web.as_ref())
            .filter(|web| !web.uri.is_empty())
    }
}
