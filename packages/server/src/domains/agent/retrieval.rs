//! Retrieval of relevant interactions for a chat turn.
//!
//! Ranking happens in-process: embeddings are fetched with their rows
//! and scored with cosine similarity, then re-ranked against session
//! state so already-shown snippets make room for fresh ones and notes
//! about volunteers under discussion float up.

use anyhow::Result;
use uuid::Uuid;

use crate::domains::interactions::Interaction;
use crate::kernel::deps::ServerDeps;

use super::classify::AggregateCategory;
use super::context::ConversationContext;

/// Candidates surviving the cosine cut.
const RANK_POOL: usize = 30;
/// Snippets that actually enter the prompt.
const CONTEXT_CAP: usize = 20;
/// Already-shown snippets allowed back in, after everything fresh.
const SHOWN_CAP: usize = 3;

/// Recency fallback size when embeddings are unavailable.
const RECENT_FALLBACK: i64 = 30;

const AGGREGATE_FETCH: i64 = 150;
const AGGREGATE_CATEGORY_CAP: usize = 100;
const AGGREGATE_OTHER_CAP: usize = 50;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Top candidates by cosine similarity against the query embedding.
pub fn rank_by_similarity(
    query_embedding: &[f32],
    interactions: Vec<Interaction>,
) -> Vec<Interaction> {
    let mut scored: Vec<(f32, Interaction)> = interactions
        .into_iter()
        .filter_map(|interaction| {
            let embedding = interaction.embedding.as_ref()?;
            let score = cosine_similarity(query_embedding, embedding.as_slice());
            Some((score, interaction))
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(RANK_POOL)
        .map(|(_, interaction)| interaction)
        .collect()
}

/// Re-rank the similarity pool against session state.
///
/// Interactions about volunteers already under discussion come first,
/// then the rest, both skipping anything shown earlier in the session.
/// Shown snippets are appended last and capped so they cannot crowd out
/// new material.
pub fn re_rank_for_session(
    ranked: Vec<Interaction>,
    shown_ids: &[Uuid],
    discussed_volunteer_ids: &[Uuid],
) -> Vec<Interaction> {
    let mut discussed: Vec<Interaction> = Vec::new();
    let mut fresh: Vec<Interaction> = Vec::new();
    let mut shown: Vec<Interaction> = Vec::new();

    for interaction in ranked {
        if shown_ids.contains(&interaction.id) {
            shown.push(interaction);
        } else if interaction
            .volunteer_ids
            .iter()
            .any(|id| discussed_volunteer_ids.contains(id))
        {
            discussed.push(interaction);
        } else {
            fresh.push(interaction);
        }
    }

    let mut result = discussed;
    result.extend(fresh);
    result.extend(shown.into_iter().take(SHOWN_CAP));
    result.truncate(CONTEXT_CAP);
    result
}

/// Retrieve the interaction snippets for a question. Embedding failures
/// and missing configuration both degrade to recency ordering.
pub async fn retrieve_interactions(
    deps: &ServerDeps,
    organization_id: Uuid,
    question: &str,
    context: &ConversationContext,
) -> Result<Vec<Interaction>> {
    if let Some(embedding_service) = &deps.embedding_service {
        match embedding_service.generate(question).await {
            Ok(query_embedding) => {
                let pool = Interaction::all_with_embeddings(organization_id, &deps.db_pool).await?;
                let ranked = rank_by_similarity(&query_embedding, pool);
                return Ok(re_rank_for_session(
                    ranked,
                    &context.shown_interaction_ids(),
                    &context.discussed_volunteer_ids(),
                ));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Query embedding failed, falling back to recency");
            }
        }
    }

    let recent = Interaction::recent(organization_id, RECENT_FALLBACK, &deps.db_pool).await?;
    Ok(re_rank_for_session(
        recent,
        &context.shown_interaction_ids(),
        &context.discussed_volunteer_ids(),
    ))
}

fn category_matches(interaction: &Interaction, category: AggregateCategory) -> bool {
    let Some(stored) = interaction.category.as_deref() else {
        return false;
    };
    match category {
        AggregateCategory::Prayer => stored == "prayer_request",
        AggregateCategory::Family | AggregateCategory::Birthday => stored == "family_update",
        AggregateCategory::Food | AggregateCategory::Hobbies => stored == "preference",
        AggregateCategory::Availability => stored == "availability",
        AggregateCategory::General => false,
    }
}

/// Wide recency-ordered pull for team-level questions: the matching
/// category first, a smaller tail of everything else for context.
pub async fn aggregate_interactions(
    deps: &ServerDeps,
    organization_id: Uuid,
    category: AggregateCategory,
) -> Result<Vec<Interaction>> {
    let recent = Interaction::recent(organization_id, AGGREGATE_FETCH, &deps.db_pool).await?;

    let (matching, others): (Vec<_>, Vec<_>) = recent
        .into_iter()
        .partition(|interaction| category_matches(interaction, category));

    let mut result: Vec<Interaction> = matching.into_iter().take(AGGREGATE_CATEGORY_CAP).collect();
    result.extend(others.into_iter().take(AGGREGATE_OTHER_CAP));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pgvector::Vector;

    fn interaction(id_byte: u8, embedding: Option<Vec<f32>>, volunteer: Option<Uuid>) -> Interaction {
        Interaction {
            id: Uuid::from_bytes([id_byte; 16]),
            organization_id: Uuid::nil(),
            created_by: Uuid::nil(),
            content: format!("note {id_byte}"),
            summary: None,
            category: None,
            ai_extracted_data: None,
            embedding: embedding.map(Vector::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            volunteer_ids: volunteer.into_iter().collect(),
            volunteer_names: vec![],
        }
    }

    #[test]
    fn cosine_handles_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn ranking_orders_by_similarity() {
        let query = vec![1.0, 0.0];
        let pool = vec![
            interaction(1, Some(vec![0.0, 1.0]), None),
            interaction(2, Some(vec![1.0, 0.0]), None),
            interaction(3, Some(vec![0.7, 0.7]), None),
            interaction(4, None, None),
        ];
        let ranked = rank_by_similarity(&query, pool);
        let ids: Vec<u8> = ranked.iter().map(|i| i.id.as_bytes()[0]).collect();
        // Unembedded rows are dropped, best match first.
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn discussed_volunteers_come_first() {
        let discussed = Uuid::from_bytes([9; 16]);
        let ranked = vec![
            interaction(1, None, None),
            interaction(2, None, Some(discussed)),
            interaction(3, None, None),
        ];
        let result = re_rank_for_session(ranked, &[], &[discussed]);
        assert_eq!(result[0].id.as_bytes()[0], 2);
    }

    #[test]
    fn shown_interactions_move_to_the_back_and_are_capped() {
        let shown_ids: Vec<Uuid> = (1..=5).map(|b| Uuid::from_bytes([b; 16])).collect();
        let mut ranked: Vec<Interaction> =
            (1..=5).map(|b| interaction(b, None, None)).collect();
        ranked.push(interaction(6, None, None));

        let result = re_rank_for_session(ranked, &shown_ids, &[]);
        // Fresh one first, then at most SHOWN_CAP shown ones.
        assert_eq!(result[0].id.as_bytes()[0], 6);
        assert_eq!(result.len(), 1 + SHOWN_CAP);
    }

    #[test]
    fn context_is_capped() {
        let ranked: Vec<Interaction> = (1..=30).map(|b| interaction(b, None, None)).collect();
        let result = re_rank_for_session(ranked, &[], &[]);
        assert_eq!(result.len(), CONTEXT_CAP);
    }
}
