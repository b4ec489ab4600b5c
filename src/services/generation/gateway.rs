use base64::{engine::general_purpose, Engine as _};
use chrono::{Datelike, Utc};
use std::fmt;

use crate::config::{GenerationSettings, ModelSet, Region};
use crate::models::image_analysis::ImageAnalysis;
use crate::models::itinerary::TripItinerary;
use crate::models::preferences::Preferences;
use crate::services::generation::client::GenerativeClient;
use crate::services::generation::schema::{image_analysis_schema, itinerary_schema};
use crate::services::generation::wire::{
    GenerateContentRequest, GenerationConfig, ImageConfig, Part, ThinkingConfig,
};
use crate::services::generation::{GenerationError, MISSING_ENTITLEMENT_MARKER};

const JSON_MIME: &str = "application/json";
const THINKING_BUDGET: u32 = 32768;
const POSTCARD_ASPECT_RATIO: &str = "16:9";
const MAX_SIMILAR_PLACES: usize = 3;
const DEFAULT_UPLOAD_MIME: &str = "image/jpeg";
const DEFAULT_IMAGE_MIME: &str = "image/png";

pub const NO_INSIGHTS: &str = "No insights found.";
pub const INSIGHTS_UNAVAILABLE: &str = "The historical archives are temporarily unavailable.";

/// Output resolution tier for postcard images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [ImageSize::OneK, ImageSize::TwoK, ImageSize::FourK];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        ImageSize::OneK
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A photo to identify, already base64 encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Accepts `data:<mime>;base64,<payload>` or a bare base64 string (assumed JPEG).
    pub fn from_data_url(input: &str) -> Result<Self, GenerationError> {
        let Some(rest) = input.strip_prefix("data:") else {
            return Self::from_base64(DEFAULT_UPLOAD_MIME, input);
        };

        let (header, payload) = rest.split_once(',').ok_or_else(|| {
            GenerationError::InvalidInput("Invalid base64 data format".to_string())
        })?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| GenerationError::InvalidInput("Image data is not base64".to_string()))?;
        let mime_type = if mime_type.is_empty() {
            DEFAULT_UPLOAD_MIME
        } else {
            mime_type
        };

        Self::from_base64(mime_type, payload)
    }

    fn from_base64(mime_type: &str, payload: &str) -> Result<Self, GenerationError> {
        let payload = payload.trim();
        general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| GenerationError::InvalidInput(format!("Base64 decode error: {}", e)))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: payload.to_string(),
        })
    }
}

/// The five request/response contracts with the generative service.
pub struct GenerationGateway<C> {
    client: C,
    models: ModelSet,
    region: Region,
}

impl<C: GenerativeClient> GenerationGateway<C> {
    pub fn new(client: C, settings: &GenerationSettings) -> Self {
        Self {
            client,
            models: settings.models.clone(),
            region: settings.region.clone(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Build a day-by-day plan, grounded with live web search.
    pub async fn generate_itinerary(
        &self,
        prefs: &Preferences,
    ) -> Result<TripItinerary, GenerationError> {
        prefs
            .validate()
            .map_err(|e| GenerationError::InvalidInput(e.to_string()))?;

        let request = GenerateContentRequest::from_text(self.itinerary_prompt(prefs))
            .system_instruction(
                "You are the 'ExploreMH' travel engineer. You synthesize data from Google Search \
                 to create perfect plans. Always provide valid JSON.",
            )
            .config(GenerationConfig {
                response_mime_type: Some(JSON_MIME.to_string()),
                response_schema: Some(itinerary_schema()),
                ..GenerationConfig::default()
            })
            .with_google_search();

        log::info!(
            "Generating {}-day {} itinerary from {:?}",
            prefs.duration,
            prefs.vibe,
            prefs.starting_city
        );
        let response = self
            .client
            .generate_content(&self.models.itinerary, &request)
            .await?;

        let text = response.text().ok_or(GenerationError::EmptyResponse)?;
        let mut itinerary: TripItinerary = serde_json::from_str(&text).map_err(|e| {
            log::warn!("Itinerary did not match the declared shape: {}", e);
            GenerationError::MalformedResponse(e.to_string())
        })?;

        if let Some(chunks) = response.grounding_chunks() {
            itinerary.grounding_sources = Some(chunks);
        }

        Ok(itinerary)
    }

    fn itinerary_prompt(&self, prefs: &Preferences) -> String {
        let year = Utc::now().year();
        format!(
            "Generate a detailed travel itinerary for {region}.\n\
             Starting City: {city}\n\
             Duration: {duration} days\n\
             Budget: {budget}\n\
             Vibe: {vibe}\n\
             Month: {month}\n\n\
             Use Google Search to find current weather conditions, seasonal festivals, and updated \
             entry fees for landmarks.\n\
             Ensure all data is accurate for {month} {year}/{next}.",
            region = self.region.full_name(),
            city = prefs.starting_city,
            duration = prefs.duration,
            budget = prefs.budget,
            vibe = prefs.vibe,
            month = prefs.month,
            year = year,
            next = year + 1,
        )
    }

    /// Long-form answer with an extended reasoning allowance.
    ///
    /// Never fails: errors become an apology.
    pub async fn ask_complex_question(&self, question: &str) -> String {
        let request = GenerateContentRequest::from_text(question)
            .system_instruction(format!(
                "You are a senior historian and geography expert for {}. Provide deep, reasoned \
                 insights. Think through the cultural and historical layers before answering.",
                self.region.name
            ))
            .config(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: THINKING_BUDGET,
                }),
                ..GenerationConfig::default()
            });

        match self
            .client
            .generate_content(&self.models.reasoning, &request)
            .await
        {
            Ok(response) => response.text().unwrap_or_else(|| NO_INSIGHTS.to_string()),
            Err(e) => {
                log::error!("Deep reasoning request failed: {}", e);
                INSIGHTS_UNAVAILABLE.to_string()
            }
        }
    }

    /// One short fact about a place. Empty when the service has nothing to say.
    pub async fn quick_fact(&self, place: &str) -> Result<String, GenerationError> {
        let request = GenerateContentRequest::from_text(format!(
            "Give me one super quick unique travel fact about {} in {}. Keep it under 20 words.",
            place, self.region.name
        ));

        let response = self
            .client
            .generate_content(&self.models.quick_fact, &request)
            .await?;
        Ok(response.text().map(|t| t.trim().to_string()).unwrap_or_default())
    }

    /// Render a postcard-style picture and return it as a data URI.
    ///
    /// The caller must make sure a billed key is selected first.
    pub async fn generate_image(
        &self,
        prompt: &str,
        size: ImageSize,
    ) -> Result<String, GenerationError> {
        let request = GenerateContentRequest::from_text(format!(
            "A professional travel postcard of {} in {}. High fidelity, cinematic lighting, 8k, \
             tourism style.",
            prompt,
            self.region.full_name()
        ))
        .config(GenerationConfig {
            image_config: Some(ImageConfig {
                aspect_ratio: POSTCARD_ASPECT_RATIO.to_string(),
                image_size: size.as_str().to_string(),
            }),
            ..GenerationConfig::default()
        });

        let response = self
            .client
            .generate_content(&self.models.image, &request)
            .await
            .map_err(classify_entitlement)?;

        let image = response.first_inline_data().ok_or(GenerationError::NoImage)?;
        let mime = if image.mime_type.is_empty() {
            DEFAULT_IMAGE_MIME
        } else {
            image.mime_type.as_str()
        };
        Ok(format!("data:{};base64,{}", mime, image.data))
    }

    /// Guess where a photo was taken and suggest up to three similar places in the region.
    pub async fn analyze_image(
        &self,
        image: &ImagePayload,
    ) -> Result<ImageAnalysis, GenerationError> {
        let request = GenerateContentRequest::from_parts(vec![
            Part::inline(image.mime_type.clone(), image.data.clone()),
            Part::text(format!(
                "Identify this place. If it's in {region}, suggest 3 similar {region} sites.",
                region = self.region.name
            )),
        ])
        .config(GenerationConfig {
            response_mime_type: Some(JSON_MIME.to_string()),
            response_schema: Some(image_analysis_schema()),
            ..GenerationConfig::default()
        });

        let response = self
            .client
            .generate_content(&self.models.analysis, &request)
            .await?;

        let text = response.text().ok_or(GenerationError::EmptyResponse)?;
        let mut analysis: ImageAnalysis = serde_json::from_str(&text)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        analysis.similar_places.truncate(MAX_SIMILAR_PLACES);
        Ok(analysis)
    }
}

fn classify_entitlement(err: GenerationError) -> GenerationError {
    match err {
        GenerationError::Service { message, .. }
            if message.contains(MISSING_ENTITLEMENT_MARKER) =>
        {
            GenerationError::MissingEntitlement(message)
        }
        other => other,
    }
}
