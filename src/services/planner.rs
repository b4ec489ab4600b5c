use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::db::storage::{KeyValueStore, StorageError};
use crate::models::image_analysis::ImageAnalysis;
use crate::models::itinerary::TripItinerary;
use crate::models::preferences::Preferences;
use crate::models::user::User;
use crate::services::generation::client::GenerativeClient;
use crate::services::generation::gateway::{GenerationGateway, ImagePayload, ImageSize};
use crate::services::generation::GenerationError;
use crate::services::trip_repository::TripRepository;

pub const PLAN_FAILED: &str = "Search grounding failed. Try again.";
pub const IMAGE_FAILED: &str =
    "Image generation failed. Ensure your API key is correctly configured.";
pub const ANALYSIS_FAILED: &str = "Analysis failed. Please try again.";

/// Independent pieces of view state, each fed by its own kind of request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Itinerary,
    QuickFact,
    Insight,
    Postcard,
    ImageAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub slot: Slot,
    pub seq: u64,
}

/// Hands out increasing sequence numbers per slot.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: Mutex<HashMap<Slot, u64>>,
}

impl RequestTracker {
    pub fn begin(&self, slot: Slot) -> Ticket {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        let seq = latest.entry(slot).or_insert(0);
        *seq += 1;
        Ticket { slot, seq: *seq }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        latest.get(&ticket.slot).copied() == Some(ticket.seq)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub itinerary: Option<TripItinerary>,
    pub is_saved: bool,
    pub quick_fact: String,
    pub insight: String,
    pub postcard_url: Option<String>,
    pub analysis: Option<ImageAnalysis>,
    pub pending: BTreeSet<Slot>,
}

impl ViewState {
    pub fn is_pending(&self, slot: Slot) -> bool {
        self.pending.contains(&slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A newer request for the same slot started first; this response was dropped.
    Superseded,
    /// Nothing to do, e.g. a blank prompt.
    Skipped,
}

/// A failed user action: a fixed message to show plus the underlying cause for logs.
#[derive(Debug)]
pub struct PlannerError {
    pub message: &'static str,
    pub cause: GenerationError,
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl std::error::Error for PlannerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Whether a billed key is available for paid models, and how to ask the user for one.
#[async_trait]
pub trait BillingGate: Send + Sync {
    async fn has_selected_key(&self) -> bool;
    async fn open_select_key(&self);
}

/// For deployments where the server-side key is always billed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredKey;

#[async_trait]
impl BillingGate for ConfiguredKey {
    async fn has_selected_key(&self) -> bool {
        true
    }

    async fn open_select_key(&self) {
        log::warn!("Configured API key lacks access to the image model");
    }
}

/// Runs the AI features on behalf of the UI and keeps the resulting view state.
pub struct TripPlanner<C, B> {
    gateway: GenerationGateway<C>,
    billing: B,
    tracker: RequestTracker,
    state: watch::Sender<ViewState>,
}

impl<C, B> TripPlanner<C, B>
where
    C: GenerativeClient,
    B: BillingGate,
{
    pub fn new(gateway: GenerationGateway<C>, billing: B) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            gateway,
            billing,
            tracker: RequestTracker::default(),
            state,
        }
    }

    pub fn gateway(&self) -> &GenerationGateway<C> {
        &self.gateway
    }

    pub fn billing(&self) -> &B {
        &self.billing
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    fn start(&self, slot: Slot, reset: impl FnOnce(&mut ViewState)) -> Ticket {
        let ticket = self.tracker.begin(slot);
        self.state.send_modify(|s| {
            s.pending.insert(slot);
            reset(s);
        });
        ticket
    }

    /// Apply `update` only if `ticket` is still the newest request for its slot.
    fn finish(&self, ticket: Ticket, update: impl FnOnce(&mut ViewState)) -> Outcome {
        // Held across the write so a newer `begin` cannot slip in between check and apply.
        let latest = self.tracker.latest.lock().unwrap_or_else(|e| e.into_inner());
        if latest.get(&ticket.slot).copied() != Some(ticket.seq) {
            log::debug!("Dropping stale {:?} response #{}", ticket.slot, ticket.seq);
            return Outcome::Superseded;
        }
        self.state.send_modify(|s| {
            s.pending.remove(&ticket.slot);
            update(s);
        });
        Outcome::Applied
    }

    /// Generate an itinerary, then a quick fact about the starting city.
    pub async fn plan_trip(&self, prefs: &Preferences) -> Result<Outcome, PlannerError> {
        let ticket = self.start(Slot::Itinerary, |s| s.is_saved = false);

        let itinerary = match self.gateway.generate_itinerary(prefs).await {
            Ok(itinerary) => itinerary,
            Err(cause) => {
                log::error!("Itinerary generation failed: {}", cause);
                self.finish(ticket, |_| {});
                return Err(PlannerError {
                    message: PLAN_FAILED,
                    cause,
                });
            }
        };

        if self.finish(ticket, |s| {
            s.itinerary = Some(itinerary);
            s.is_saved = false;
        }) == Outcome::Superseded
        {
            return Ok(Outcome::Superseded);
        }

        let place = if prefs.starting_city.trim().is_empty() {
            self.gateway.region().name.clone()
        } else {
            prefs.starting_city.trim().to_string()
        };
        let fact_ticket = self.start(Slot::QuickFact, |_| {});
        match self.gateway.quick_fact(&place).await {
            Ok(fact) => {
                self.finish(fact_ticket, |s| s.quick_fact = fact);
            }
            Err(e) => {
                log::warn!("Quick fact for {} failed: {}", place, e);
                self.finish(fact_ticket, |_| {});
            }
        }

        Ok(Outcome::Applied)
    }

    pub async fn ask(&self, question: &str) -> Outcome {
        if question.trim().is_empty() {
            return Outcome::Skipped;
        }
        let ticket = self.start(Slot::Insight, |s| s.insight.clear());
        let answer = self.gateway.ask_complex_question(question).await;
        self.finish(ticket, |s| s.insight = answer)
    }

    pub async fn generate_postcard(
        &self,
        prompt: &str,
        size: ImageSize,
    ) -> Result<Outcome, PlannerError> {
        if prompt.trim().is_empty() {
            return Ok(Outcome::Skipped);
        }

        if !self.billing.has_selected_key().await {
            self.billing.open_select_key().await;
        }

        let ticket = self.start(Slot::Postcard, |s| s.postcard_url = None);
        match self.gateway.generate_image(prompt, size).await {
            Ok(url) => Ok(self.finish(ticket, |s| s.postcard_url = Some(url))),
            Err(cause) => {
                log::error!("Postcard generation failed: {}", cause);
                if cause.is_missing_entitlement() {
                    self.billing.open_select_key().await;
                }
                self.finish(ticket, |_| {});
                Err(PlannerError {
                    message: IMAGE_FAILED,
                    cause,
                })
            }
        }
    }

    pub async fn analyze_image(&self, image: &ImagePayload) -> Result<Outcome, PlannerError> {
        let ticket = self.start(Slot::ImageAnalysis, |s| s.analysis = None);
        match self.gateway.analyze_image(image).await {
            Ok(analysis) => Ok(self.finish(ticket, |s| s.analysis = Some(analysis))),
            Err(cause) => {
                log::error!("Image analysis failed: {}", cause);
                self.finish(ticket, |_| {});
                Err(PlannerError {
                    message: ANALYSIS_FAILED,
                    cause,
                })
            }
        }
    }

    /// Show a previously saved trip. Any itinerary still being generated is dropped.
    pub fn open_saved_trip(&self, trip: TripItinerary) -> Outcome {
        let ticket = self.start(Slot::Itinerary, |_| {});
        self.finish(ticket, |s| {
            s.itinerary = Some(trip);
            s.is_saved = true;
        })
    }

    /// Save the itinerary on screen. `Ok(None)` if there is none or nobody is signed in.
    pub fn save_current_trip<S: KeyValueStore>(
        &self,
        trips: &TripRepository<S>,
    ) -> Result<Option<User>, StorageError> {
        let Some(itinerary) = self.state.borrow().itinerary.clone() else {
            return Ok(None);
        };

        let user = trips.save_trip(&itinerary)?;
        if user.is_some() {
            self.state.send_modify(|s| s.is_saved = true);
        }
        Ok(user)
    }
}
