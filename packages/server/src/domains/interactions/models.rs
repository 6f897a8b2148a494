use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Interaction - a recorded conversation or observation about volunteers
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Interaction {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub content: String,
    pub summary: Option<String>,
    /// 'prayer_request' | 'family_update' | 'preference' | 'availability' | 'general'
    pub category: Option<String>,
    /// Structured fields pulled out by the LLM at capture time
    pub ai_extracted_data: Option<JsonValue>,
    #[serde(skip)]
    pub embedding: Option<Vector>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Populated by the aggregating queries, empty otherwise
    #[sqlx(default)]
    #[serde(default)]
    pub volunteer_ids: Vec<Uuid>,
    #[sqlx(default)]
    #[serde(default)]
    pub volunteer_names: Vec<String>,
}

const WITH_VOLUNTEERS: &str = r#"
    SELECT i.*,
           COALESCE(array_agg(v.id) FILTER (WHERE v.id IS NOT NULL), '{}') AS volunteer_ids,
           COALESCE(array_agg(v.name) FILTER (WHERE v.name IS NOT NULL), '{}') AS volunteer_names
    FROM interactions i
    LEFT JOIN interaction_volunteers iv ON iv.interaction_id = i.id
    LEFT JOIN volunteers v ON v.id = iv.volunteer_id
"#;

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Interaction {
    pub async fn insert(
        organization_id: Uuid,
        created_by: Uuid,
        content: &str,
        summary: Option<&str>,
        category: Option<&str>,
        ai_extracted_data: Option<&JsonValue>,
        pool: &PgPool,
    ) -> Result<Self> {
        let interaction = sqlx::query_as::<_, Interaction>(
            r#"
            INSERT INTO interactions (id, organization_id, created_by, content, summary, category, ai_extracted_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(created_by)
        .bind(content)
        .bind(summary)
        .bind(category)
        .bind(ai_extracted_data)
        .fetch_one(pool)
        .await?;
        Ok(interaction)
    }

    pub async fn link_volunteer(
        interaction_id: Uuid,
        volunteer_id: Uuid,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO interaction_volunteers (interaction_id, volunteer_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(interaction_id)
        .bind(volunteer_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Every interaction that has an embedding, for in-process ranking
    pub async fn all_with_embeddings(organization_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        let sql = format!(
            "{WITH_VOLUNTEERS} WHERE i.organization_id = $1 AND i.embedding IS NOT NULL \
             GROUP BY i.id ORDER BY i.created_at DESC"
        );
        let interactions = sqlx::query_as::<_, Interaction>(&sql)
            .bind(organization_id)
            .fetch_all(pool)
            .await?;
        Ok(interactions)
    }

    /// Most recent interactions regardless of embedding state
    pub async fn recent(organization_id: Uuid, limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let sql = format!(
            "{WITH_VOLUNTEERS} WHERE i.organization_id = $1 \
             GROUP BY i.id ORDER BY i.created_at DESC LIMIT $2"
        );
        let interactions = sqlx::query_as::<_, Interaction>(&sql)
            .bind(organization_id)
            .bind(limit)
            .fetch_all(pool)
            .await?;
        Ok(interactions)
    }

    /// Interactions still waiting for an embedding, for the backfill job
    pub async fn find_without_embeddings(limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let interactions = sqlx::query_as::<_, Interaction>(
            "SELECT * FROM interactions WHERE embedding IS NULL ORDER BY created_at LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(interactions)
    }

    pub async fn update_embedding(id: Uuid, embedding: Vector, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE interactions SET embedding = $1, updated_at = NOW() WHERE id = $2")
            .bind(embedding)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// The text that gets embedded: names plus notes plus extracted data
    pub fn embedding_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.volunteer_names.is_empty() {
            parts.push(format!("Volunteers: {}", self.volunteer_names.join(", ")));
        }
        parts.push(self.content.clone());
        if let Some(summary) = &self.summary {
            parts.push(summary.clone());
        }
        if let Some(data) = &self.ai_extracted_data {
            parts.push(data.to_string());
        }
        parts.join("\n")
    }
}

// =============================================================================
// Chat messages
// =============================================================================

/// One stored turn of an assistant chat session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub session_id: String,
    /// 'user' | 'assistant'
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub async fn insert(
        organization_id: Uuid,
        session_id: &str,
        role: &str,
        content: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (id, organization_id, session_id, role, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(session_id)
        .bind(role)
        .bind(content)
        .fetch_one(pool)
        .await?;
        Ok(message)
    }

    /// The last `limit` messages of a session, oldest first
    pub async fn history(session_id: &str, limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT * FROM chat_messages WHERE session_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        messages.reverse();
        Ok(messages)
    }
}

// =============================================================================
// Follow-ups
// =============================================================================

/// A scheduled follow-up with a volunteer
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowUp {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub volunteer_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    /// 'pastoral' | 'scheduling' | 'general'
    pub category: Option<String>,
    pub due_date: NaiveDate,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl FollowUp {
    pub async fn insert(
        organization_id: Uuid,
        volunteer_id: Option<Uuid>,
        title: &str,
        description: &str,
        category: Option<&str>,
        due_date: NaiveDate,
        pool: &PgPool,
    ) -> Result<Self> {
        let follow_up = sqlx::query_as::<_, FollowUp>(
            r#"
            INSERT INTO follow_ups (id, organization_id, volunteer_id, title, description, category, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(volunteer_id)
        .bind(title)
        .bind(description)
        .bind(category)
        .bind(due_date)
        .fetch_one(pool)
        .await?;
        Ok(follow_up)
    }

    pub async fn open_for_organization(
        organization_id: Uuid,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let follow_ups = sqlx::query_as::<_, FollowUp>(
            r#"
            SELECT * FROM follow_ups
            WHERE organization_id = $1 AND completed = FALSE
            ORDER BY due_date
            "#,
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await?;
        Ok(follow_ups)
    }
}
