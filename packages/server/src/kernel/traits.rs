// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "route this question") should be domain functions
// that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseEmbeddingService)

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use planning_center::{
    AvailabilityCheck, DateBlockouts, PersonBlockouts, PersonDetails, PersonMatch, ServicePlan,
    SongDetails, SongLookup, SongUsageHistory, TeamAvailability,
};

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

/// One turn of conversation history passed to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a conversation with an LLM (returns raw text response)
    async fn complete(&self, system: &str, messages: &[ChatTurn], max_tokens: u32)
        -> Result<String>;

    /// Single-prompt completion, for extraction and summarization calls
    async fn complete_prompt(&self, system: &str, prompt: &str, max_tokens: u32) -> Result<String> {
        self.complete(system, &[ChatTurn::user(prompt)], max_tokens)
            .await
    }
}

// =============================================================================
// Embedding Service Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseEmbeddingService: Send + Sync {
    /// Generate embedding for text (returns 1536-dimensional vector)
    async fn generate(&self, text: &str) -> Result<Vec<f32>>;
}

// =============================================================================
// Scheduling Service Trait (Infrastructure - Planning Center)
// =============================================================================

/// Scheduling-platform lookups used by the chat orchestrator and the
/// volunteer matcher. Mirrors the Planning Center client surface so
/// tests can substitute canned results.
#[async_trait]
pub trait BaseSchedulingService: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn find_person_matches(&self, name: &str, threshold: f64) -> Result<Vec<PersonMatch>>;

    async fn get_person_details(&self, person_id: &str) -> Result<Option<PersonDetails>>;

    async fn get_plan_for_date(
        &self,
        date: NaiveDate,
        service_type_hint: Option<&str>,
        today: NaiveDate,
    ) -> Result<Option<ServicePlan>>;

    async fn get_nearest_plan(
        &self,
        date: NaiveDate,
        service_type_hint: Option<&str>,
    ) -> Result<Option<ServicePlan>>;

    async fn get_song_by_title(&self, title: &str) -> Result<SongLookup>;

    async fn get_song_by_id(&self, song_id: &str) -> Result<Option<SongDetails>>;

    async fn get_song_usage_history(&self, title: &str) -> Result<SongUsageHistory>;

    async fn get_person_blockouts(&self, name: &str) -> Result<PersonBlockouts>;

    async fn get_date_blockouts(&self, date: NaiveDate) -> Result<DateBlockouts>;

    async fn check_availability(&self, name: &str, date: NaiveDate) -> Result<AvailabilityCheck>;

    async fn get_team_availability(&self, date: NaiveDate) -> Result<TeamAvailability>;
}
