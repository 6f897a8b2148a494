//! Mock implementations of infrastructure traits for testing
//!
//! Mocks record their calls and replay queued or canned responses, so
//! tests can assert on both the prompt that was built and the reply path.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use planning_center::{
    AvailabilityCheck, DateBlockouts, PersonBlockouts, PersonDetails, PersonMatch, ServicePlan,
    SongDetails, SongLookup, SongUsageHistory, TeamAvailability,
};
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{BaseAI, BaseEmbeddingService, BaseSchedulingService, ChatTurn};

// =============================================================================
// MockAI
// =============================================================================

/// Records every completion call and replays queued responses in order.
pub struct MockAI {
    responses: Mutex<VecDeque<String>>,
    pub calls: Mutex<Vec<(String, Vec<ChatTurn>)>>,
    pub fail: bool,
}

impl MockAI {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// The system prompt of the nth recorded call.
    pub fn system_prompt(&self, n: usize) -> String {
        self.calls.lock().unwrap()[n].0.clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatTurn],
        _max_tokens: u32,
    ) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), messages.to_vec()));
        if self.fail {
            anyhow::bail!("mock AI failure");
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string()))
    }
}

// =============================================================================
// MockEmbeddingService
// =============================================================================

pub struct MockEmbeddingService {
    pub vector: Vec<f32>,
    pub fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl MockEmbeddingService {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            vector: Vec::new(),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BaseEmbeddingService for MockEmbeddingService {
    async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail {
            anyhow::bail!("mock embedding failure");
        }
        Ok(self.vector.clone())
    }
}

// =============================================================================
// MockSchedulingService
// =============================================================================

/// Canned scheduling lookups. Every field defaults to "nothing found";
/// tests set only what the path under test consumes.
#[derive(Default)]
pub struct MockSchedulingService {
    pub configured: bool,
    pub person_matches: Vec<PersonMatch>,
    pub person_details: Option<PersonDetails>,
    pub plan_for_date: Option<ServicePlan>,
    pub nearest_plan: Option<ServicePlan>,
    pub song_lookup: Option<SongLookup>,
    pub song_by_id: Option<SongDetails>,
    pub usage_history: Option<SongUsageHistory>,
    pub person_blockouts: Option<PersonBlockouts>,
    pub date_blockouts: Option<DateBlockouts>,
    pub availability: Option<AvailabilityCheck>,
    pub team_availability: Option<TeamAvailability>,
    pub calls: Mutex<Vec<String>>,
}

impl MockSchedulingService {
    pub fn configured() -> Self {
        Self {
            configured: true,
            ..Default::default()
        }
    }

    pub fn unconfigured() -> Self {
        Self::default()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.starts_with(prefix))
    }
}

#[async_trait]
impl BaseSchedulingService for MockSchedulingService {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn find_person_matches(&self, name: &str, threshold: f64) -> Result<Vec<PersonMatch>> {
        self.record(&format!("find_person_matches:{name}:{threshold}"));
        Ok(self.person_matches.clone())
    }

    async fn get_person_details(&self, person_id: &str) -> Result<Option<PersonDetails>> {
        self.record(&format!("get_person_details:{person_id}"));
        Ok(self.person_details.clone())
    }

    async fn get_plan_for_date(
        &self,
        date: NaiveDate,
        service_type_hint: Option<&str>,
        _today: NaiveDate,
    ) -> Result<Option<ServicePlan>> {
        self.record(&format!(
            "get_plan_for_date:{date}:{}",
            service_type_hint.unwrap_or("-")
        ));
        Ok(self.plan_for_date.clone())
    }

    async fn get_nearest_plan(
        &self,
        date: NaiveDate,
        service_type_hint: Option<&str>,
    ) -> Result<Option<ServicePlan>> {
        self.record(&format!(
            "get_nearest_plan:{date}:{}",
            service_type_hint.unwrap_or("-")
        ));
        Ok(self.nearest_plan.clone())
    }

    async fn get_song_by_title(&self, title: &str) -> Result<SongLookup> {
        self.record(&format!("get_song_by_title:{title}"));
        Ok(self.song_lookup.clone().unwrap_or(SongLookup::NotFound))
    }

    async fn get_song_by_id(&self, song_id: &str) -> Result<Option<SongDetails>> {
        self.record(&format!("get_song_by_id:{song_id}"));
        Ok(self.song_by_id.clone())
    }

    async fn get_song_usage_history(&self, title: &str) -> Result<SongUsageHistory> {
        self.record(&format!("get_song_usage_history:{title}"));
        Ok(self.usage_history.clone().unwrap_or_default())
    }

    async fn get_person_blockouts(&self, name: &str) -> Result<PersonBlockouts> {
        self.record(&format!("get_person_blockouts:{name}"));
        Ok(self.person_blockouts.clone().unwrap_or_default())
    }

    async fn get_date_blockouts(&self, date: NaiveDate) -> Result<DateBlockouts> {
        self.record(&format!("get_date_blockouts:{date}"));
        Ok(self.date_blockouts.clone().unwrap_or_default())
    }

    async fn check_availability(&self, name: &str, date: NaiveDate) -> Result<AvailabilityCheck> {
        self.record(&format!("check_availability:{name}:{date}"));
        Ok(self.availability.clone().unwrap_or_default())
    }

    async fn get_team_availability(&self, date: NaiveDate) -> Result<TeamAvailability> {
        self.record(&format!("get_team_availability:{date}"));
        Ok(self.team_availability.clone().unwrap_or_default())
    }
}
