use serde::{Deserialize, Serialize};

/// What the generator made of an uploaded photo.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ImageAnalysis {
    pub location_guess: String,
    pub description: String,
    #[serde(rename = "similar_places_in_mh", default)]
    pub similar_places: Vec<String>,
}
