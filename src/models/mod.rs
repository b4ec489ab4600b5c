pub mod image_analysis;
pub mod itinerary;
pub mod preferences;
pub mod user;
