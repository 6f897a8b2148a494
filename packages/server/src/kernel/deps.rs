//! Server dependencies for effects (using traits for testability)
//!
//! This module provides the central dependency container used by all domain
//! functions. All external services use trait abstractions to enable testing.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use planning_center::{
    AvailabilityCheck, DateBlockouts, PersonBlockouts, PersonDetails, PersonMatch,
    PlanningCenterClient, ServicePlan, SongDetails, SongLookup, SongUsageHistory,
    TeamAvailability,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::kernel::ai::{AnthropicClient, OpenAIEmbeddingClient};
use crate::kernel::{BaseAI, BaseEmbeddingService, BaseSchedulingService};

// =============================================================================
// PlanningCenterClient Adapter (implements BaseSchedulingService trait)
// =============================================================================

/// Wrapper around PlanningCenterClient that implements BaseSchedulingService
pub struct PlanningCenterAdapter(pub Arc<PlanningCenterClient>);

impl PlanningCenterAdapter {
    pub fn new(client: Arc<PlanningCenterClient>) -> Self {
        Self(client)
    }
}

#[async_trait]
impl BaseSchedulingService for PlanningCenterAdapter {
    fn is_configured(&self) -> bool {
        self.0.is_configured()
    }

    async fn find_person_matches(&self, name: &str, threshold: f64) -> Result<Vec<PersonMatch>> {
        Ok(self.0.find_matches(name, threshold).await?)
    }

    async fn get_person_details(&self, person_id: &str) -> Result<Option<PersonDetails>> {
        Ok(self.0.get_person_details(person_id).await?)
    }

    async fn get_plan_for_date(
        &self,
        date: NaiveDate,
        service_type_hint: Option<&str>,
        today: NaiveDate,
    ) -> Result<Option<ServicePlan>> {
        Ok(self
            .0
            .get_plan_for_date(date, service_type_hint, today)
            .await?)
    }

    async fn get_nearest_plan(
        &self,
        date: NaiveDate,
        service_type_hint: Option<&str>,
    ) -> Result<Option<ServicePlan>> {
        Ok(self.0.get_nearest_plan(date, service_type_hint).await?)
    }

    async fn get_song_by_title(&self, title: &str) -> Result<SongLookup> {
        Ok(self.0.get_song_by_title(title).await?)
    }

    async fn get_song_by_id(&self, song_id: &str) -> Result<Option<SongDetails>> {
        Ok(self.0.get_song_by_id(song_id).await?)
    }

    async fn get_song_usage_history(&self, title: &str) -> Result<SongUsageHistory> {
        Ok(self.0.get_song_usage_history(title).await?)
    }

    async fn get_person_blockouts(&self, name: &str) -> Result<PersonBlockouts> {
        Ok(self.0.get_person_blockouts(name).await?)
    }

    async fn get_date_blockouts(&self, date: NaiveDate) -> Result<DateBlockouts> {
        Ok(self.0.get_date_blockouts(date).await?)
    }

    async fn check_availability(&self, name: &str, date: NaiveDate) -> Result<AvailabilityCheck> {
        Ok(self.0.check_availability(name, date).await?)
    }

    async fn get_team_availability(&self, date: NaiveDate) -> Result<TeamAvailability> {
        Ok(self.0.get_team_availability(date).await?)
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to domain functions
///
/// The AI and embedding services are optional: without keys the chat
/// engine degrades (canned reply, recency-ordered retrieval) instead of
/// failing. The scheduling service is always present; an unconfigured
/// client reports `is_configured() == false` and is skipped at call sites.
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub ai: Option<Arc<dyn BaseAI>>,
    pub embedding_service: Option<Arc<dyn BaseEmbeddingService>>,
    pub scheduling: Arc<dyn BaseSchedulingService>,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        ai: Option<Arc<dyn BaseAI>>,
        embedding_service: Option<Arc<dyn BaseEmbeddingService>>,
        scheduling: Arc<dyn BaseSchedulingService>,
    ) -> Self {
        Self {
            db_pool,
            ai,
            embedding_service,
            scheduling,
        }
    }

    /// Build production dependencies from configuration
    pub fn from_config(config: &Config, db_pool: PgPool) -> Self {
        let ai: Option<Arc<dyn BaseAI>> = config
            .anthropic_api_key
            .clone()
            .map(|key| Arc::new(AnthropicClient::new(key)) as Arc<dyn BaseAI>);
        if ai.is_none() {
            tracing::warn!("ANTHROPIC_API_KEY not set, chat runs in degraded mode");
        }

        let embedding_service: Option<Arc<dyn BaseEmbeddingService>> = config
            .openai_api_key
            .clone()
            .map(|key| Arc::new(OpenAIEmbeddingClient::new(key)) as Arc<dyn BaseEmbeddingService>);
        if embedding_service.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, retrieval falls back to recency");
        }

        let client = PlanningCenterClient::new(
            config.planning_center_app_id.clone(),
            config.planning_center_secret.clone(),
        );
        if !client.is_configured() {
            tracing::warn!("Planning Center credentials not set, scheduling lookups disabled");
        }
        let scheduling: Arc<dyn BaseSchedulingService> =
            Arc::new(PlanningCenterAdapter::new(Arc::new(client)));

        Self::new(db_pool, ai, embedding_service, scheduling)
    }
}
