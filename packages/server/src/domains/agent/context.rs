//! Per-session conversation state.
//!
//! One row per chat session: running summary, what has been shown,
//! which volunteers are under discussion, the song currently being
//! talked about, and at most one pending action awaiting the user's
//! next message.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use planning_center::SongSuggestion;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

use super::classify::SongQueryType;

/// The one question the assistant asked and is waiting on. A new
/// pending action replaces the old one wholesale; there is never more
/// than one in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingAction {
    /// "Did you mean one of these songs?"
    SongSelection {
        query_type: SongQueryType,
        original_query: String,
        candidates: Vec<SongSuggestion>,
    },
    /// "No plan on that date, check the nearest service instead?"
    DateConfirmation {
        date: NaiveDate,
        query_type: SongQueryType,
        service_type: Option<String>,
    },
    /// "When should I schedule that follow-up?"
    FollowUpDate {
        volunteer_id: Option<Uuid>,
        volunteer_name: String,
        title: String,
        description: String,
        category: Option<String>,
    },
    /// "The song or the person?"
    Disambiguation {
        value: String,
        has_song: bool,
        has_person: bool,
    },
}

/// The song most recently under discussion, for anaphora ("what key is
/// it in?").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSong {
    pub title: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationContext {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub summary: Option<String>,
    pub message_count: i32,
    /// JSONB array of interaction ids already used as context
    pub shown_interaction_ids: JsonValue,
    /// JSONB array of volunteer ids mentioned this session
    pub discussed_volunteer_ids: JsonValue,
    /// JSONB CurrentSong
    pub current_song: Option<JsonValue>,
    /// JSONB PendingAction
    pub pending_action: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationContext {
    pub fn shown_interaction_ids(&self) -> Vec<Uuid> {
        serde_json::from_value(self.shown_interaction_ids.clone()).unwrap_or_default()
    }

    pub fn remember_shown(&mut self, interactions: &[Uuid]) {
        let mut ids = self.shown_interaction_ids();
        for id in interactions {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        self.shown_interaction_ids = json!(ids);
    }

    pub fn discussed_volunteer_ids(&self) -> Vec<Uuid> {
        serde_json::from_value(self.discussed_volunteer_ids.clone()).unwrap_or_default()
    }

    pub fn remember_volunteer(&mut self, volunteer_id: Uuid) {
        let mut ids = self.discussed_volunteer_ids();
        if !ids.contains(&volunteer_id) {
            ids.push(volunteer_id);
            self.discussed_volunteer_ids = json!(ids);
        }
    }

    pub fn current_song(&self) -> Option<CurrentSong> {
        self.current_song
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn note_current_song(&mut self, title: &str, id: Option<&str>) {
        self.current_song = Some(json!(CurrentSong {
            title: title.to_string(),
            id: id.map(String::from),
        }));
    }

    pub fn pending(&self) -> Option<PendingAction> {
        self.pending_action
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn set_pending(&mut self, action: PendingAction) {
        self.pending_action = Some(json!(action));
    }

    /// Read and clear. The orchestrator restores the action only when
    /// the reply did not resolve it.
    pub fn take_pending(&mut self) -> Option<PendingAction> {
        let pending = self.pending();
        self.pending_action = None;
        pending
    }

    // =========================================================================
    // SQL
    // =========================================================================

    pub async fn load_or_create(
        session_id: &str,
        organization_id: Uuid,
        user_id: Uuid,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query(
            r#"
            INSERT INTO conversation_contexts
                (id, organization_id, user_id, session_id, shown_interaction_ids, discussed_volunteer_ids)
            VALUES ($1, $2, $3, $4, '[]'::jsonb, '[]'::jsonb)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(user_id)
        .bind(session_id)
        .execute(pool)
        .await?;

        let context = sqlx::query_as::<_, ConversationContext>(
            "SELECT * FROM conversation_contexts WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_one(pool)
        .await?;
        Ok(context)
    }

    pub async fn save(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE conversation_contexts
            SET summary = $1,
                message_count = $2,
                shown_interaction_ids = $3,
                discussed_volunteer_ids = $4,
                current_song = $5,
                pending_action = $6,
                updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(&self.summary)
        .bind(self.message_count)
        .bind(&self.shown_interaction_ids)
        .bind(&self.discussed_volunteer_ids)
        .bind(&self.current_song)
        .bind(&self.pending_action)
        .bind(self.id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ConversationContext {
        ConversationContext {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            session_id: "session-1".to_string(),
            summary: None,
            message_count: 0,
            shown_interaction_ids: json!([]),
            discussed_volunteer_ids: json!([]),
            current_song: None,
            pending_action: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn pending_action_round_trips_through_json() {
        let mut ctx = context();
        let action = PendingAction::SongSelection {
            query_type: SongQueryType::ChordChart,
            original_query: "chords for Way Makr".to_string(),
            candidates: vec![SongSuggestion {
                id: "1".to_string(),
                title: "Way Maker".to_string(),
                author: None,
                score: 0.8,
            }],
        };
        ctx.set_pending(action.clone());
        assert_eq!(ctx.pending(), Some(action.clone()));

        // take clears
        assert_eq!(ctx.take_pending(), Some(action));
        assert_eq!(ctx.pending(), None);
    }

    #[test]
    fn setting_pending_replaces_the_previous_one() {
        let mut ctx = context();
        ctx.set_pending(PendingAction::Disambiguation {
            value: "Grace".to_string(),
            has_song: true,
            has_person: true,
        });
        ctx.set_pending(PendingAction::FollowUpDate {
            volunteer_id: None,
            volunteer_name: "Sarah".to_string(),
            title: "Follow up with Sarah".to_string(),
            description: "check in about her mom's surgery".to_string(),
            category: Some("pastoral".to_string()),
        });
        match ctx.pending() {
            Some(PendingAction::FollowUpDate {
                volunteer_name,
                title,
                category,
                ..
            }) => {
                assert_eq!(volunteer_name, "Sarah");
                assert_eq!(title, "Follow up with Sarah");
                assert_eq!(category.as_deref(), Some("pastoral"));
            }
            other => panic!("expected follow-up pending, got {other:?}"),
        }
    }

    #[test]
    fn shown_ids_accumulate_without_duplicates() {
        let mut ctx = context();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        ctx.remember_shown(&[a, b]);
        ctx.remember_shown(&[a]);
        assert_eq!(ctx.shown_interaction_ids().len(), 2);
    }

    #[test]
    fn current_song_round_trips() {
        let mut ctx = context();
        assert_eq!(ctx.current_song(), None);
        ctx.note_current_song("Oceans", Some("42"));
        let song = ctx.current_song().unwrap();
        assert_eq!(song.title, "Oceans");
        assert_eq!(song.id.as_deref(), Some("42"));
    }

    #[test]
    fn corrupt_pending_json_reads_as_none() {
        let mut ctx = context();
        ctx.pending_action = Some(json!({"type": "bogus"}));
        assert_eq!(ctx.pending(), None);
    }
}
