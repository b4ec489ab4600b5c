//! Response shapes the generator is constrained to, in its OpenAPI-subset schema dialect.

use serde_json::{json, Value};

pub fn itinerary_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "trip_title": { "type": "STRING" },
            "total_estimated_cost": { "type": "STRING" },
            "weather_forecast": { "type": "STRING" },
            "itinerary": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "day": { "type": "INTEGER" },
                        "location": { "type": "STRING" },
                        "activities": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "food_recommendations": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "rating": { "type": "NUMBER" },
                        "review_count": { "type": "INTEGER" },
                        "opening_hours": { "type": "STRING" },
                        "travel_time_from_prev": { "type": "STRING" },
                        "distance_from_prev": { "type": "STRING" },
                        "image_description": { "type": "STRING" },
                        "coordinates": {
                            "type": "OBJECT",
                            "properties": {
                                "lat": { "type": "NUMBER" },
                                "lng": { "type": "NUMBER" }
                            },
                            "required": ["lat", "lng"]
                        }
                    },
                    "required": [
                        "day", "location", "activities", "food_recommendations", "coordinates",
                        "rating", "review_count", "opening_hours", "image_description"
                    ]
                }
            },
            "travel_tips": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": [
            "trip_title", "total_estimated_cost", "weather_forecast", "itinerary", "travel_tips"
        ]
    })
}

pub fn image_analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "location_guess": { "type": "STRING" },
            "description": { "type": "STRING" },
            "similar_places_in_mh": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["location_guess", "description", "similar_places_in_mh"]
    })
}
