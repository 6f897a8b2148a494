//! Volunteer name matching: local roster first, Planning Center second.
//!
//! The cascade is pure (`evaluate_match`) so the confidence tiers can be
//! tested without a database or network; the async wrappers fetch the
//! candidate pools and act on the verdict.

use anyhow::Result;
use planning_center::{name_similarity, normalize_name, PersonMatch};
use uuid::Uuid;

use crate::kernel::deps::ServerDeps;

use super::models::Volunteer;

/// At or above this the match is treated as the same person.
pub const EXACT_THRESHOLD: f64 = 0.95;
/// At or above this the match is suggested but held for confirmation.
pub const LIKELY_THRESHOLD: f64 = 0.75;
/// Below this a candidate is not offered at all.
pub const MIN_THRESHOLD: f64 = 0.6;

const MAX_ALTERNATIVES: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchSource {
    Local(Uuid),
    External(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub source: MatchSource,
    pub name: String,
    pub score: f64,
}

/// Verdict of the matching cascade for one extracted name.
#[derive(Debug, Clone, PartialEq)]
pub enum VolunteerMatch {
    /// Same person, link silently
    Exact(MatchCandidate),
    /// Strong candidate; suggested to the user but not linked until confirmed
    Likely {
        best: MatchCandidate,
        alternatives: Vec<MatchCandidate>,
    },
    /// Needs user confirmation before linking
    Possible {
        best: MatchCandidate,
        alternatives: Vec<MatchCandidate>,
    },
    NoMatch,
}

impl VolunteerMatch {
    pub fn best(&self) -> Option<&MatchCandidate> {
        match self {
            Self::Exact(best) | Self::Likely { best, .. } | Self::Possible { best, .. } => {
                Some(best)
            }
            Self::NoMatch => None,
        }
    }
}

/// Run the cascade over a local roster and external person matches.
///
/// Order matters: a local exact match wins outright, then an external
/// exact match, then the merged fuzzy pool. Fuzzy candidates from both
/// sources are deduplicated by normalized name with the local entry kept.
pub fn evaluate_match(
    name: &str,
    locals: &[Volunteer],
    external: &[PersonMatch],
) -> VolunteerMatch {
    let wanted = normalize_name(name);
    if wanted.is_empty() {
        return VolunteerMatch::NoMatch;
    }

    if let Some(volunteer) = locals.iter().find(|v| v.normalized_name == wanted) {
        return VolunteerMatch::Exact(MatchCandidate {
            source: MatchSource::Local(volunteer.id),
            name: volunteer.name.clone(),
            score: 1.0,
        });
    }

    if let Some(person) = external.iter().find(|p| p.score >= EXACT_THRESHOLD) {
        return VolunteerMatch::Exact(MatchCandidate {
            source: MatchSource::External(person.pco_id.clone()),
            name: person.name.clone(),
            score: person.score,
        });
    }

    let mut candidates: Vec<MatchCandidate> = Vec::new();
    for volunteer in locals {
        let score = name_similarity(name, &volunteer.name);
        if score >= MIN_THRESHOLD {
            candidates.push(MatchCandidate {
                source: MatchSource::Local(volunteer.id),
                name: volunteer.name.clone(),
                score,
            });
        }
    }
    for person in external {
        if person.score < MIN_THRESHOLD {
            continue;
        }
        let normalized = normalize_name(&person.name);
        if candidates
            .iter()
            .any(|c| normalize_name(&c.name) == normalized)
        {
            continue;
        }
        candidates.push(MatchCandidate {
            source: MatchSource::External(person.pco_id.clone()),
            name: person.name.clone(),
            score: person.score,
        });
    }

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let Some(best) = candidates.first().cloned() else {
        return VolunteerMatch::NoMatch;
    };
    let alternatives: Vec<MatchCandidate> = candidates
        .into_iter()
        .skip(1)
        .take(MAX_ALTERNATIVES)
        .collect();

    if best.score >= LIKELY_THRESHOLD {
        VolunteerMatch::Likely { best, alternatives }
    } else {
        VolunteerMatch::Possible { best, alternatives }
    }
}

/// Match one name against the roster and, when configured, Planning Center.
pub async fn find_volunteer(
    deps: &ServerDeps,
    organization_id: Uuid,
    name: &str,
) -> Result<VolunteerMatch> {
    let locals = Volunteer::all_for_organization(organization_id, &deps.db_pool).await?;

    let external = if deps.scheduling.is_configured() {
        match deps
            .scheduling
            .find_person_matches(name, MIN_THRESHOLD)
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "Planning Center person search failed");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    Ok(evaluate_match(name, &locals, &external))
}

/// Resolve a match candidate to a local volunteer row, creating one for
/// external candidates the roster has not seen before.
pub async fn resolve_candidate(
    deps: &ServerDeps,
    organization_id: Uuid,
    candidate: &MatchCandidate,
) -> Result<Volunteer> {
    match &candidate.source {
        MatchSource::Local(id) => Ok(Volunteer::find_by_id(*id, &deps.db_pool).await?),
        MatchSource::External(pco_id) => {
            if let Some(existing) =
                Volunteer::find_by_planning_center_id(organization_id, pco_id, &deps.db_pool)
                    .await?
            {
                return Ok(existing);
            }
            if let Some(existing) =
                Volunteer::find_by_normalized_name(organization_id, &candidate.name, &deps.db_pool)
                    .await?
            {
                existing.link_planning_center_id(pco_id, &deps.db_pool).await?;
                return Ok(Volunteer::find_by_id(existing.id, &deps.db_pool).await?);
            }
            Volunteer::insert(
                organization_id,
                &candidate.name,
                None,
                Some(pco_id),
                &deps.db_pool,
            )
            .await
        }
    }
}

/// Outcome of matching every name extracted from one interaction.
#[derive(Debug, Default)]
pub struct InteractionMatches {
    /// Linked silently (exact matches only)
    pub confirmed: Vec<Volunteer>,
    /// Needs user confirmation; the verdict carries the candidates
    pub pending: Vec<(String, VolunteerMatch)>,
    /// No candidate at all; a fresh volunteer row was created
    pub created: Vec<Volunteer>,
}

/// Three-tier policy: exact matches link automatically, likely and
/// possible matches wait for user confirmation, unknown names become
/// new roster entries.
pub async fn match_volunteers_for_interaction(
    deps: &ServerDeps,
    organization_id: Uuid,
    names: &[String],
) -> Result<InteractionMatches> {
    let mut outcome = InteractionMatches::default();

    for name in names {
        let verdict = find_volunteer(deps, organization_id, name).await?;
        match &verdict {
            VolunteerMatch::Exact(best) => {
                let volunteer = resolve_candidate(deps, organization_id, best).await?;
                outcome.confirmed.push(volunteer);
            }
            VolunteerMatch::Likely { .. } | VolunteerMatch::Possible { .. } => {
                outcome.pending.push((name.clone(), verdict));
            }
            VolunteerMatch::NoMatch => {
                let volunteer =
                    Volunteer::insert(organization_id, name, None, None, &deps.db_pool).await?;
                outcome.created.push(volunteer);
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn volunteer(name: &str) -> Volunteer {
        Volunteer {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: name.to_string(),
            normalized_name: normalize_name(name),
            team: None,
            planning_center_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn person(id: &str, name: &str, score: f64) -> PersonMatch {
        PersonMatch {
            pco_id: id.to_string(),
            name: name.to_string(),
            score,
        }
    }

    #[test]
    fn local_exact_match_wins_over_external() {
        let locals = vec![volunteer("John Smith")];
        let external = vec![person("pco1", "John Smith", 1.0)];

        let verdict = evaluate_match("john smith", &locals, &external);
        match verdict {
            VolunteerMatch::Exact(best) => {
                assert!(matches!(best.source, MatchSource::Local(_)));
                assert_eq!(best.score, 1.0);
            }
            other => panic!("expected exact local match, got {other:?}"),
        }
    }

    #[test]
    fn external_exact_match_when_roster_empty() {
        let external = vec![person("pco1", "John Smith", 0.97)];

        let verdict = evaluate_match("John Smith", &[], &external);
        match verdict {
            VolunteerMatch::Exact(best) => {
                assert_eq!(best.source, MatchSource::External("pco1".to_string()));
            }
            other => panic!("expected exact external match, got {other:?}"),
        }
    }

    #[test]
    fn close_name_is_likely_not_exact() {
        let locals = vec![volunteer("Michael Chen")];

        let verdict = evaluate_match("Mike Chen", &locals, &[]);
        match verdict {
            VolunteerMatch::Likely { best, .. } => {
                assert_eq!(best.name, "Michael Chen");
                assert!(best.score >= LIKELY_THRESHOLD);
            }
            other => panic!("expected likely match, got {other:?}"),
        }
    }

    #[test]
    fn weak_match_is_possible() {
        let external = vec![person("pco1", "Jon Smythe", 0.65)];

        let verdict = evaluate_match("John Smith", &[], &external);
        match verdict {
            VolunteerMatch::Possible { best, .. } => {
                assert_eq!(best.name, "Jon Smythe");
            }
            other => panic!("expected possible match, got {other:?}"),
        }
    }

    #[test]
    fn unknown_name_is_no_match() {
        let locals = vec![volunteer("Lisa Williams")];
        assert_eq!(
            evaluate_match("Zachary Quinto", &locals, &[]),
            VolunteerMatch::NoMatch
        );
        assert_eq!(evaluate_match("", &locals, &[]), VolunteerMatch::NoMatch);
    }

    #[test]
    fn duplicate_external_candidate_is_dropped() {
        let locals = vec![volunteer("Sarah Johnson")];
        let external = vec![person("pco1", "Sarah Johnson", 0.9)];

        // Not exact ("Sara" differs), so both pools are scanned; only the
        // local entry for the shared name should survive.
        let verdict = evaluate_match("Sara Johnson", &locals, &external);
        match verdict {
            VolunteerMatch::Likely { best, alternatives } => {
                assert!(matches!(best.source, MatchSource::Local(_)));
                assert!(alternatives.is_empty(), "got {alternatives:?}");
            }
            other => panic!("expected likely match, got {other:?}"),
        }
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn close_roster_name_waits_for_confirmation() {
        use crate::kernel::test_dependencies::MockSchedulingService;
        use std::sync::Arc;

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
        let pool = sqlx::PgPool::connect(&database_url).await.unwrap();
        let deps = ServerDeps::new(
            pool.clone(),
            None,
            None,
            Arc::new(MockSchedulingService::unconfigured()),
        );
        let organization_id = Uuid::new_v4();
        Volunteer::insert(organization_id, "Michael Chen", None, None, &pool)
            .await
            .unwrap();

        let names = vec!["Mike Chen".to_string()];
        let outcome = match_volunteers_for_interaction(&deps, organization_id, &names)
            .await
            .unwrap();

        // A likely match is suggested, never linked on its own.
        assert!(outcome.confirmed.is_empty());
        assert!(outcome.created.is_empty());
        assert_eq!(outcome.pending.len(), 1);
        assert_eq!(outcome.pending[0].0, "Mike Chen");
        assert!(matches!(
            outcome.pending[0].1,
            VolunteerMatch::Likely { .. }
        ));
    }

    #[test]
    fn alternatives_are_capped_and_ordered() {
        let external = vec![
            person("a", "Dan Smith", 0.80),
            person("b", "Don Smith", 0.78),
            person("c", "Dean Smith", 0.76),
            person("d", "Dana Smith", 0.74),
            person("e", "Dina Smith", 0.72),
            person("f", "Dion Smith", 0.70),
        ];

        let verdict = evaluate_match("Danny Smithh", &[], &external);
        let (best, alternatives) = match verdict {
            VolunteerMatch::Likely { best, alternatives } => (best, alternatives),
            other => panic!("expected likely match, got {other:?}"),
        };
        assert_eq!(best.name, "Dan Smith");
        assert_eq!(alternatives.len(), MAX_ALTERNATIVES);
        assert!(alternatives.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
