use anyhow::Result;
use chrono::{DateTime, Utc};
use planning_center::normalize_name;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Volunteer - a worship team member known to the local roster
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Volunteer {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    /// Lowercased, punctuation-stripped form used for exact matching
    pub normalized_name: String,
    pub team: Option<String>,
    /// Planning Center person id, once linked
    pub planning_center_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Volunteer {
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        let volunteer = sqlx::query_as::<_, Volunteer>("SELECT * FROM volunteers WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(volunteer)
    }

    /// Exact match on the normalized name within an organization
    pub async fn find_by_normalized_name(
        organization_id: Uuid,
        name: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let volunteer = sqlx::query_as::<_, Volunteer>(
            "SELECT * FROM volunteers WHERE organization_id = $1 AND normalized_name = $2",
        )
        .bind(organization_id)
        .bind(normalize_name(name))
        .fetch_optional(pool)
        .await?;
        Ok(volunteer)
    }

    pub async fn find_by_planning_center_id(
        organization_id: Uuid,
        planning_center_id: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let volunteer = sqlx::query_as::<_, Volunteer>(
            "SELECT * FROM volunteers WHERE organization_id = $1 AND planning_center_id = $2",
        )
        .bind(organization_id)
        .bind(planning_center_id)
        .fetch_optional(pool)
        .await?;
        Ok(volunteer)
    }

    /// Full roster for an organization, for fuzzy scanning
    pub async fn all_for_organization(organization_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        let volunteers = sqlx::query_as::<_, Volunteer>(
            "SELECT * FROM volunteers WHERE organization_id = $1 ORDER BY name",
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await?;
        Ok(volunteers)
    }

    pub async fn insert(
        organization_id: Uuid,
        name: &str,
        team: Option<&str>,
        planning_center_id: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        let volunteer = sqlx::query_as::<_, Volunteer>(
            r#"
            INSERT INTO volunteers (id, organization_id, name, normalized_name, team, planning_center_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(name)
        .bind(normalize_name(name))
        .bind(team)
        .bind(planning_center_id)
        .fetch_one(pool)
        .await?;
        Ok(volunteer)
    }

    /// Attach a Planning Center id to an existing volunteer
    pub async fn link_planning_center_id(
        &self,
        planning_center_id: &str,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE volunteers SET planning_center_id = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(planning_center_id)
        .bind(self.id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
