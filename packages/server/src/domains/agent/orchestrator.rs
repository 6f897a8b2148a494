//! The chat turn: pending-action resolution, routing, context assembly
//! and reply generation.
//!
//! A turn always produces a reply string. Every external call is
//! individually guarded; a dead Planning Center or LLM degrades the
//! answer, it never aborts the turn.

use anyhow::Result;
use chrono::{NaiveDate, Utc, Weekday};
use planning_center::{ServicePlan, SongDetails, SongLookup};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domains::interactions::{ChatMessage, FollowUp, Interaction};
use crate::domains::volunteers::matching;
use crate::kernel::deps::ServerDeps;
use crate::kernel::ChatTurn;

use super::classify::{
    self, BlockoutQuery, DisambiguationChoice, PcoQueryType, SongQueryType,
};
use super::context::{ConversationContext, PendingAction};
use super::dates::{extract_date_reference, parse_date_reference};
use super::extract::{extract_song_title, resolve_selection_index};
use super::format;
use super::prompts::{self, DEGRADED_REPLY};
use super::retrieval;

const REPLY_MAX_TOKENS: u32 = 1024;
const EXTRACTION_MAX_TOKENS: u32 = 1024;
const SUMMARY_MAX_TOKENS: u32 = 512;

/// Stored messages that trigger a running summary.
const SUMMARY_THRESHOLD: i32 = 20;
/// Raw history sent alongside a summary.
const HISTORY_WITH_SUMMARY: i64 = 10;
/// Raw history sent when there is no summary yet.
const HISTORY_WITHOUT_SUMMARY: i64 = 20;

const PCO_UNREACHABLE: &str = "I couldn't reach Planning Center right now. Please try again.";

/// The leader talking to the assistant.
#[derive(Debug, Clone)]
pub struct ChatUser {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub display_name: String,
}

/// What a routing step decided to do with the turn.
enum RouteOutcome {
    /// Answer directly, no LLM call.
    Reply(String),
    /// Assemble context and generate.
    Generate {
        blocks: Vec<String>,
        skip_retrieval: bool,
    },
}

fn generate(blocks: Vec<String>) -> RouteOutcome {
    RouteOutcome::Generate {
        blocks,
        skip_retrieval: false,
    }
}

/// Answer one chat message. Infallible by contract: internal errors are
/// logged and turn into an apologetic reply.
pub async fn answer_question(
    deps: &ServerDeps,
    question: &str,
    user: &ChatUser,
    session_id: &str,
) -> String {
    match answer_question_inner(deps, question, user, session_id).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, session_id = %session_id, "Chat turn failed");
            DEGRADED_REPLY.to_string()
        }
    }
}

async fn answer_question_inner(
    deps: &ServerDeps,
    question: &str,
    user: &ChatUser,
    session_id: &str,
) -> Result<String> {
    let today = Utc::now().date_naive();
    let mut context = ConversationContext::load_or_create(
        session_id,
        user.organization_id,
        user.id,
        &deps.db_pool,
    )
    .await?;

    ChatMessage::insert(
        user.organization_id,
        session_id,
        "user",
        question,
        &deps.db_pool,
    )
    .await?;

    let outcome = match handle_pending(deps, question, user, &mut context, today).await {
        Some(outcome) => outcome,
        None => route(deps, question, user, &mut context, today).await,
    };

    let reply = match outcome {
        RouteOutcome::Reply(text) => text,
        RouteOutcome::Generate {
            blocks,
            skip_retrieval,
        } => {
            generate_reply(
                deps,
                question,
                user,
                session_id,
                &mut context,
                blocks,
                skip_retrieval,
                today,
            )
            .await
        }
    };

    ChatMessage::insert(
        user.organization_id,
        session_id,
        "assistant",
        &reply,
        &deps.db_pool,
    )
    .await?;
    context.message_count += 2;

    maybe_summarize(deps, session_id, &mut context).await;
    context.save(&deps.db_pool).await?;
    Ok(reply)
}

// =============================================================================
// Pending actions
// =============================================================================

/// Try to resolve the pending action with this message. Returns None
/// when the message is about something else; the action is restored and
/// normal routing takes over.
async fn handle_pending(
    deps: &ServerDeps,
    message: &str,
    user: &ChatUser,
    context: &mut ConversationContext,
    today: NaiveDate,
) -> Option<RouteOutcome> {
    let pending = context.take_pending()?;

    match pending {
        PendingAction::SongSelection {
            query_type,
            original_query,
            candidates,
        } => {
            if classify::is_correction(message) {
                return Some(RouteOutcome::Reply(
                    "No problem. What song did you mean?".to_string(),
                ));
            }
            let titles: Vec<String> = candidates.iter().map(|c| c.title.clone()).collect();
            match resolve_selection_index(message, &titles) {
                Some(idx) => {
                    let choice = &candidates[idx];
                    match deps.scheduling.get_song_by_id(&choice.id).await {
                        Ok(Some(details)) => {
                            context.note_current_song(&details.title, Some(&details.id));
                            Some(song_outcome(deps, query_type, details).await)
                        }
                        Ok(None) => Some(RouteOutcome::Reply(format!(
                            "I couldn't load \"{}\" from Planning Center.",
                            choice.title
                        ))),
                        Err(e) => {
                            tracing::warn!(error = %e, "Song fetch after selection failed");
                            Some(RouteOutcome::Reply(PCO_UNREACHABLE.to_string()))
                        }
                    }
                }
                None => {
                    // Changed the subject; keep the question open.
                    context.set_pending(PendingAction::SongSelection {
                        query_type,
                        original_query,
                        candidates,
                    });
                    None
                }
            }
        }

        PendingAction::DateConfirmation {
            date,
            query_type,
            service_type,
        } => {
            if classify::is_confirmation(message) {
                match deps
                    .scheduling
                    .get_nearest_plan(date, service_type.as_deref())
                    .await
                {
                    Ok(Some(plan)) => Some(generate(vec![plan_block(query_type, &plan)])),
                    Ok(None) => Some(RouteOutcome::Reply(
                        "I couldn't find any services near that date in Planning Center."
                            .to_string(),
                    )),
                    Err(e) => {
                        tracing::warn!(error = %e, "Nearest plan lookup failed");
                        Some(RouteOutcome::Reply(PCO_UNREACHABLE.to_string()))
                    }
                }
            } else if classify::is_correction(message) {
                Some(RouteOutcome::Reply(
                    "Okay, I'll leave it. Let me know another date to check.".to_string(),
                ))
            } else {
                context.set_pending(PendingAction::DateConfirmation {
                    date,
                    query_type,
                    service_type,
                });
                None
            }
        }

        PendingAction::FollowUpDate {
            volunteer_id,
            volunteer_name,
            title,
            description,
            category,
        } => {
            let parsed = extract_date_reference(message)
                .and_then(|reference| parse_date_reference(&reference, today));
            match parsed {
                Some(due_date) => {
                    match FollowUp::insert(
                        user.organization_id,
                        volunteer_id,
                        &title,
                        &description,
                        category.as_deref(),
                        due_date,
                        &deps.db_pool,
                    )
                    .await
                    {
                        Ok(_) => Some(RouteOutcome::Reply(format!(
                            "Got it. I'll remind you to follow up with {} on {}.",
                            volunteer_name,
                            due_date.format("%B %-d, %Y")
                        ))),
                        Err(e) => {
                            tracing::error!(error = %e, "Follow-up insert failed");
                            Some(RouteOutcome::Reply(
                                "I couldn't save that follow-up. Please try again.".to_string(),
                            ))
                        }
                    }
                }
                None if classify::is_correction(message) => Some(RouteOutcome::Reply(
                    "Okay, I won't schedule a follow-up.".to_string(),
                )),
                None => {
                    context.set_pending(PendingAction::FollowUpDate {
                        volunteer_id,
                        volunteer_name,
                        title,
                        description,
                        category,
                    });
                    Some(RouteOutcome::Reply(
                        "When should the follow-up happen? A date like \"next Friday\" works."
                            .to_string(),
                    ))
                }
            }
        }

        PendingAction::Disambiguation {
            value,
            has_song,
            has_person,
        } => match classify::check_disambiguation_response(message) {
            Some(DisambiguationChoice::Song) => {
                Some(lookup_song(deps, context, SongQueryType::SongInfo, &value).await)
            }
            Some(DisambiguationChoice::Person) => {
                Some(lookup_person(deps, user, context, &value, PcoQueryType::Contact).await)
            }
            None => {
                context.set_pending(PendingAction::Disambiguation {
                    value,
                    has_song,
                    has_person,
                });
                None
            }
        },
    }
}

// =============================================================================
// Routing
// =============================================================================

async fn route(
    deps: &ServerDeps,
    message: &str,
    user: &ChatUser,
    context: &mut ConversationContext,
    today: NaiveDate,
) -> RouteOutcome {
    if classify::detect_interaction_intent(message) {
        return match process_interaction(deps, message, user).await {
            Ok(reply) => RouteOutcome::Reply(reply),
            Err(e) => {
                tracing::error!(error = %e, "Interaction recording failed");
                RouteOutcome::Reply(
                    "I had trouble recording that note. Please try again.".to_string(),
                )
            }
        };
    }

    if let Some(request) = classify::detect_follow_up_request(message) {
        let (volunteer_id, volunteer_name) = match &request.volunteer_name {
            Some(name) => {
                let id = match matching::find_volunteer(deps, user.organization_id, name).await {
                    Ok(verdict) => match verdict.best() {
                        Some(best) => {
                            match matching::resolve_candidate(deps, user.organization_id, best)
                                .await
                            {
                                Ok(volunteer) => Some(volunteer.id),
                                Err(e) => {
                                    tracing::warn!(error = %e, "Follow-up volunteer resolve failed");
                                    None
                                }
                            }
                        }
                        None => None,
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "Follow-up volunteer match failed");
                        None
                    }
                };
                (id, name.clone())
            }
            None => (None, "them".to_string()),
        };
        context.set_pending(PendingAction::FollowUpDate {
            volunteer_id,
            volunteer_name: volunteer_name.clone(),
            title: format!("Follow up with {volunteer_name}"),
            description: request.description,
            category: None,
        });
        return RouteOutcome::Reply(format!(
            "Sure. When should I remind you to follow up with {volunteer_name}?"
        ));
    }

    // Data classifiers run in sequence from here; a message can match
    // more than one and each contributes its own context block.
    // Interactive outcomes (suggestion lists, pending offers) still
    // short-circuit.
    let mut blocks: Vec<String> = Vec::new();
    let mut skip_retrieval = false;

    if let Some(compound) = classify::detect_compound_team_contact(message) {
        let date = compound
            .date_reference
            .as_deref()
            .and_then(|reference| parse_date_reference(reference, today))
            .unwrap_or_else(|| upcoming_sunday(today));
        match team_contact_block(deps, compound.query_type, date, today).await {
            Ok(block) => blocks.push(block),
            Err(e) => {
                tracing::warn!(error = %e, "Team contact lookup failed");
                return RouteOutcome::Reply(PCO_UNREACHABLE.to_string());
            }
        }
    }

    if let Some(query) = classify::detect_pco_data_query(message) {
        match lookup_person(deps, user, context, &query.person_name, query.query_type).await {
            RouteOutcome::Reply(text) => return RouteOutcome::Reply(text),
            RouteOutcome::Generate {
                blocks: person_blocks,
                ..
            } => blocks.extend(person_blocks),
        }
    }

    if blocks.is_empty() {
        if let Some(query) = classify::detect_blockout_query(message) {
            return blockout_outcome(deps, query, message, today).await;
        }
    }

    if let Some(query_type) = classify::detect_song_or_setlist_query(message) {
        let outcome = match query_type {
            SongQueryType::TeamSchedule | SongQueryType::Setlist => {
                schedule_outcome(deps, message, context, query_type, today).await
            }
            _ => {
                let title = extract_song_title(message, query_type)
                    .or_else(|| context.current_song().map(|song| song.title));
                match title {
                    Some(title) => lookup_song(deps, context, query_type, &title).await,
                    None => RouteOutcome::Reply("Which song do you mean?".to_string()),
                }
            }
        };
        match outcome {
            RouteOutcome::Reply(text) => return RouteOutcome::Reply(text),
            RouteOutcome::Generate {
                blocks: song_blocks,
                ..
            } => blocks.extend(song_blocks),
        }
    }

    if let Some(query) = classify::detect_analytics_query(message) {
        match analytics_block(deps, user.organization_id, query).await {
            Ok(block) => blocks.push(block),
            Err(e) => {
                tracing::warn!(error = %e, "Analytics lookup failed");
            }
        }
    }

    if let Some(category) = classify::detect_aggregate_question(message) {
        match retrieval::aggregate_interactions(deps, user.organization_id, category).await {
            Ok(interactions) => {
                context.remember_shown(&interactions.iter().map(|i| i.id).collect::<Vec<_>>());
                blocks.push(snippets_block(&interactions));
                skip_retrieval = true;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Aggregate fetch failed");
            }
        }
    }

    if blocks.is_empty() {
        if let Some(value) = classify::check_ambiguous_song_or_person(message) {
            return disambiguate(deps, user, context, &value).await;
        }
    }

    RouteOutcome::Generate {
        blocks,
        skip_retrieval,
    }
}

// =============================================================================
// Routing helpers
// =============================================================================

fn upcoming_sunday(today: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    let diff = (Weekday::Sun.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    today + chrono::Days::new(diff as u64)
}

/// Song detail lookup shared by direct routing, selection replies and
/// disambiguation. Fuzzy candidates become a pending selection.
async fn lookup_song(
    deps: &ServerDeps,
    context: &mut ConversationContext,
    query_type: SongQueryType,
    title: &str,
) -> RouteOutcome {
    if !deps.scheduling.is_configured() {
        return generate(Vec::new());
    }

    if query_type == SongQueryType::SongHistory {
        return match deps.scheduling.get_song_usage_history(title).await {
            Ok(history) if history.found => {
                context.note_current_song(&history.song_title, None);
                generate(vec![format::format_song_usage_history(&history)])
            }
            Ok(history) => RouteOutcome::Reply(format::format_song_usage_history(&history)),
            Err(e) => {
                tracing::warn!(error = %e, title = %title, "Song usage lookup failed");
                RouteOutcome::Reply(PCO_UNREACHABLE.to_string())
            }
        };
    }

    match deps.scheduling.get_song_by_title(title).await {
        Ok(SongLookup::Found(details)) => {
            context.note_current_song(&details.title, Some(&details.id));
            song_outcome(deps, query_type, details).await
        }
        Ok(SongLookup::Suggestions(candidates)) => {
            let reply = format::format_song_suggestions(title, &candidates);
            context.set_pending(PendingAction::SongSelection {
                query_type,
                original_query: title.to_string(),
                candidates,
            });
            RouteOutcome::Reply(reply)
        }
        Ok(SongLookup::NotFound) => RouteOutcome::Reply(format!(
            "I couldn't find \"{title}\" in your song library."
        )),
        Err(e) => {
            tracing::warn!(error = %e, title = %title, "Song lookup failed");
            RouteOutcome::Reply(PCO_UNREACHABLE.to_string())
        }
    }
}

/// Turn resolved song details into the right context for the query type.
async fn song_outcome(
    deps: &ServerDeps,
    query_type: SongQueryType,
    details: SongDetails,
) -> RouteOutcome {
    if query_type == SongQueryType::SongHistory {
        match deps.scheduling.get_song_usage_history(&details.title).await {
            Ok(history) => return generate(vec![format::format_song_usage_history(&history)]),
            Err(e) => {
                tracing::warn!(error = %e, "Usage history after selection failed");
            }
        }
    }
    generate(vec![format::format_song_details(&details)])
}

/// Person lookup for contact-style questions. A confident hit is also
/// resolved to a roster row so later retrieval favors this volunteer.
async fn lookup_person(
    deps: &ServerDeps,
    user: &ChatUser,
    context: &mut ConversationContext,
    name: &str,
    query_type: PcoQueryType,
) -> RouteOutcome {
    if !deps.scheduling.is_configured() {
        // Notes may still know the answer.
        return generate(Vec::new());
    }

    let matches = match deps
        .scheduling
        .find_person_matches(name, matching::MIN_THRESHOLD)
        .await
    {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, name = %name, "Person search failed");
            return RouteOutcome::Reply(PCO_UNREACHABLE.to_string());
        }
    };

    let Some(top) = matches.first() else {
        return RouteOutcome::Reply(format!("I couldn't find {name} in Planning Center."));
    };

    // A single strong hit resolves silently; close calls go back to the
    // user as a numbered list.
    let confident = top.score >= matching::EXACT_THRESHOLD
        || (top.score >= matching::LIKELY_THRESHOLD && matches.len() == 1);
    if !confident {
        return RouteOutcome::Reply(format::format_person_suggestions(name, &matches));
    }

    match deps.scheduling.get_person_details(&top.pco_id).await {
        Ok(Some(details)) => {
            let candidate = matching::MatchCandidate {
                source: matching::MatchSource::External(top.pco_id.clone()),
                name: top.name.clone(),
                score: top.score,
            };
            match matching::resolve_candidate(deps, user.organization_id, &candidate).await {
                Ok(volunteer) => context.remember_volunteer(volunteer.id),
                Err(e) => {
                    tracing::warn!(error = %e, "Roster resolve for person lookup failed");
                }
            }
            generate(vec![format::format_pco_details(
                &details,
                Some(query_type.as_str()),
            )])
        }
        Ok(None) => RouteOutcome::Reply(format!("I couldn't find {name} in Planning Center.")),
        Err(e) => {
            tracing::warn!(error = %e, "Person details fetch failed");
            RouteOutcome::Reply(PCO_UNREACHABLE.to_string())
        }
    }
}

async fn blockout_outcome(
    deps: &ServerDeps,
    query: BlockoutQuery,
    message: &str,
    today: NaiveDate,
) -> RouteOutcome {
    if !deps.scheduling.is_configured() {
        return RouteOutcome::Reply(
            "Planning Center isn't connected, so I can't check blockouts.".to_string(),
        );
    }

    let date = extract_date_reference(message)
        .and_then(|reference| parse_date_reference(&reference, today))
        .unwrap_or_else(|| upcoming_sunday(today));

    let result = match query {
        BlockoutQuery::DateBlockouts => deps
            .scheduling
            .get_date_blockouts(date)
            .await
            .map(|blockouts| format::format_date_blockouts(&blockouts)),
        BlockoutQuery::PersonBlockouts(name) => deps
            .scheduling
            .get_person_blockouts(&name)
            .await
            .map(|blockouts| format::format_person_blockouts(&blockouts)),
        BlockoutQuery::AvailabilityCheck(name) => deps
            .scheduling
            .check_availability(&name, date)
            .await
            .map(|check| format::format_availability_check(&check)),
        BlockoutQuery::TeamAvailability => deps
            .scheduling
            .get_team_availability(date)
            .await
            .map(|availability| format::format_team_availability(&availability)),
    };

    match result {
        Ok(reply) => RouteOutcome::Reply(reply),
        Err(e) => {
            tracing::warn!(error = %e, "Blockout lookup failed");
            RouteOutcome::Reply(PCO_UNREACHABLE.to_string())
        }
    }
}

/// The block a resolved plan should produce for a date-based query:
/// the full roster for team questions, just the songs for setlists.
fn plan_block(query_type: SongQueryType, plan: &ServicePlan) -> String {
    match query_type {
        SongQueryType::Setlist => format::format_setlist(plan),
        _ => format::format_team_schedule(Some(plan)),
    }
}

/// Service roster / setlist lookup. A miss on the exact date becomes a
/// pending offer to check the nearest service instead.
async fn schedule_outcome(
    deps: &ServerDeps,
    message: &str,
    context: &mut ConversationContext,
    query_type: SongQueryType,
    today: NaiveDate,
) -> RouteOutcome {
    if !deps.scheduling.is_configured() {
        return RouteOutcome::Reply(
            "Planning Center isn't connected, so I can't look up schedules.".to_string(),
        );
    }

    let date = extract_date_reference(message)
        .and_then(|reference| parse_date_reference(&reference, today))
        .unwrap_or_else(|| upcoming_sunday(today));
    let service_type = classify::detect_service_type(message);

    match deps
        .scheduling
        .get_plan_for_date(date, service_type, today)
        .await
    {
        Ok(Some(plan)) => generate(vec![plan_block(query_type, &plan)]),
        Ok(None) => {
            context.set_pending(PendingAction::DateConfirmation {
                date,
                query_type,
                service_type: service_type.map(String::from),
            });
            RouteOutcome::Reply(format!(
                "I couldn't find a service on {}. Want me to check the nearest service date?",
                date.format("%B %-d, %Y")
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Plan lookup failed");
            RouteOutcome::Reply(PCO_UNREACHABLE.to_string())
        }
    }
}

/// Contact info for everyone on a service roster.
async fn team_contact_block(
    deps: &ServerDeps,
    query_type: PcoQueryType,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<String> {
    use std::fmt::Write;

    let plan = match deps.scheduling.get_plan_for_date(date, None, today).await? {
        Some(plan) => plan,
        None => {
            return Ok(format!(
                "No service found on {}.",
                date.format("%B %-d, %Y")
            ))
        }
    };

    let mut out = format!("[TEAM CONTACT INFO for {}]\n", plan.dates);
    let mut seen: Vec<&str> = Vec::new();
    for member in &plan.team_members {
        if seen.contains(&member.name.as_str()) {
            continue;
        }
        seen.push(&member.name);

        let details = match deps.scheduling.find_person_matches(&member.name, 0.85).await {
            Ok(matches) => match matches.first() {
                Some(person) => deps
                    .scheduling
                    .get_person_details(&person.pco_id)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(error = %e, name = %member.name, "Contact fetch failed");
                        None
                    }),
                None => None,
            },
            Err(e) => {
                tracing::warn!(error = %e, name = %member.name, "Contact search failed");
                None
            }
        };

        let Some(details) = details else {
            let _ = writeln!(out, "{}: no record found", member.name);
            continue;
        };

        let value = match query_type {
            PcoQueryType::Phone => details
                .phone_numbers
                .iter()
                .find(|p| p.primary)
                .or(details.phone_numbers.first())
                .map(|p| p.number.clone()),
            _ => details
                .emails
                .iter()
                .find(|e| e.primary)
                .or(details.emails.first())
                .map(|e| e.address.clone()),
        };
        let _ = writeln!(
            out,
            "{}: {}",
            member.name,
            value.unwrap_or_else(|| "not on file".to_string())
        );
    }
    out.push_str("[END TEAM CONTACT INFO]");
    Ok(out)
}

/// Team-level stats block for analytics questions.
async fn analytics_block(
    deps: &ServerDeps,
    organization_id: Uuid,
    query: classify::AnalyticsQuery,
) -> Result<String> {
    use std::fmt::Write;

    let volunteers =
        crate::domains::volunteers::Volunteer::all_for_organization(organization_id, &deps.db_pool)
            .await?;
    let recent = Interaction::recent(organization_id, 150, &deps.db_pool).await?;
    let follow_ups = FollowUp::open_for_organization(organization_id, &deps.db_pool).await?;

    let mut out = String::from("[TEAM ANALYTICS]\n");
    let _ = writeln!(out, "Analytics focus: {query:?}");
    let _ = writeln!(out, "Volunteers on roster: {}", volunteers.len());
    let _ = writeln!(out, "Recent interactions: {}", recent.len());
    let _ = writeln!(out, "Open follow-ups: {}", follow_ups.len());

    // Volunteers with no recorded interaction are the care signal.
    let mentioned: Vec<&Uuid> = recent.iter().flat_map(|i| &i.volunteer_ids).collect();
    let quiet: Vec<&str> = volunteers
        .iter()
        .filter(|v| !mentioned.contains(&&v.id))
        .map(|v| v.name.as_str())
        .collect();
    if !quiet.is_empty() {
        let _ = writeln!(out, "No recent notes about: {}", quiet.join(", "));
    }
    if !follow_ups.is_empty() {
        out.push_str("Follow-ups due:\n");
        for follow_up in follow_ups.iter().take(10) {
            let mut line = format!("  - {}: {}", follow_up.due_date, follow_up.title);
            if let Some(category) = &follow_up.category {
                let _ = write!(line, " ({category})");
            }
            let _ = writeln!(out, "{line}");
        }
    }
    out.push_str("[END TEAM ANALYTICS]");
    Ok(out)
}

/// "Tell me about Grace": probe both interpretations, ask when both
/// exist, route straight through when only one does.
async fn disambiguate(
    deps: &ServerDeps,
    user: &ChatUser,
    context: &mut ConversationContext,
    value: &str,
) -> RouteOutcome {
    if !deps.scheduling.is_configured() {
        return generate(Vec::new());
    }

    let has_song = match deps.scheduling.get_song_by_title(value).await {
        Ok(SongLookup::Found(_)) | Ok(SongLookup::Suggestions(_)) => true,
        Ok(SongLookup::NotFound) => false,
        Err(e) => {
            tracing::warn!(error = %e, "Disambiguation song probe failed");
            false
        }
    };
    let has_person = match deps
        .scheduling
        .find_person_matches(value, matching::LIKELY_THRESHOLD)
        .await
    {
        Ok(matches) => !matches.is_empty(),
        Err(e) => {
            tracing::warn!(error = %e, "Disambiguation person probe failed");
            false
        }
    };

    match (has_song, has_person) {
        (true, true) => {
            let reply = format::format_disambiguation_prompt(value, true, true);
            context.set_pending(PendingAction::Disambiguation {
                value: value.to_string(),
                has_song,
                has_person,
            });
            RouteOutcome::Reply(reply)
        }
        (true, false) => lookup_song(deps, context, SongQueryType::SongInfo, value).await,
        (false, true) => lookup_person(deps, user, context, value, PcoQueryType::Contact).await,
        (false, false) => generate(Vec::new()),
    }
}

fn snippets_block(interactions: &[Interaction]) -> String {
    if interactions.is_empty() {
        return String::new();
    }
    let snippets: Vec<String> = interactions
        .iter()
        .map(format::format_interaction_context)
        .collect();
    format!(
        "[RELEVANT NOTES]\n{}\n[END RELEVANT NOTES]",
        snippets.join("\n")
    )
}

// =============================================================================
// Generation
// =============================================================================

#[allow(clippy::too_many_arguments)]
async fn generate_reply(
    deps: &ServerDeps,
    question: &str,
    user: &ChatUser,
    session_id: &str,
    context: &mut ConversationContext,
    route_blocks: Vec<String>,
    skip_retrieval: bool,
    today: NaiveDate,
) -> String {
    let mut blocks: Vec<String> = Vec::new();

    if let Some(summary) = &context.summary {
        blocks.push(format!(
            "[CONVERSATION SUMMARY]\n{summary}\n[END CONVERSATION SUMMARY]"
        ));
    }
    let discussed_ids = context.discussed_volunteer_ids();
    if !discussed_ids.is_empty() {
        match crate::domains::volunteers::Volunteer::all_for_organization(
            user.organization_id,
            &deps.db_pool,
        )
        .await
        {
            Ok(roster) => {
                let names: Vec<&str> = roster
                    .iter()
                    .filter(|v| discussed_ids.contains(&v.id))
                    .map(|v| v.name.as_str())
                    .collect();
                if !names.is_empty() {
                    blocks.push(format!(
                        "Volunteers discussed this session: {}",
                        names.join(", ")
                    ));
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Roster fetch for session knowledge failed");
            }
        }
    }
    if let Some(song) = context.current_song() {
        blocks.push(format!("Currently discussing the song: {}", song.title));
    }

    blocks.extend(route_blocks.into_iter().filter(|b| !b.is_empty()));

    if !skip_retrieval {
        match retrieval::retrieve_interactions(deps, user.organization_id, question, context).await
        {
            Ok(interactions) => {
                let block = snippets_block(&interactions);
                if !block.is_empty() {
                    context
                        .remember_shown(&interactions.iter().map(|i| i.id).collect::<Vec<_>>());
                    blocks.push(block);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval failed, answering without notes");
            }
        }
    }

    let system = prompts::system_prompt(&blocks.join("\n\n"), today);

    let history_limit = if context.summary.is_some() {
        HISTORY_WITH_SUMMARY
    } else {
        HISTORY_WITHOUT_SUMMARY
    };
    let turns: Vec<ChatTurn> = match ChatMessage::history(session_id, history_limit, &deps.db_pool)
        .await
    {
        Ok(messages) => messages
            .into_iter()
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "History fetch failed, sending the question alone");
            vec![ChatTurn::user(question)]
        }
    };

    let Some(ai) = &deps.ai else {
        return DEGRADED_REPLY.to_string();
    };
    match ai.complete(&system, &turns, REPLY_MAX_TOKENS).await {
        Ok(reply) if !reply.trim().is_empty() => reply,
        Ok(_) => DEGRADED_REPLY.to_string(),
        Err(e) => {
            tracing::error!(error = %e, "Chat completion failed");
            DEGRADED_REPLY.to_string()
        }
    }
}

/// Start a running summary once the session gets long. Failures skip
/// summarization; the next turn tries again.
async fn maybe_summarize(deps: &ServerDeps, session_id: &str, context: &mut ConversationContext) {
    if context.message_count < SUMMARY_THRESHOLD || context.summary.is_some() {
        return;
    }
    let Some(ai) = &deps.ai else {
        return;
    };

    let messages = match ChatMessage::history(session_id, SUMMARY_THRESHOLD as i64, &deps.db_pool)
        .await
    {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(error = %e, "Summary history fetch failed");
            return;
        }
    };
    let transcript: Vec<String> = messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect();

    match ai
        .complete_prompt(
            "You summarize conversations.",
            &prompts::summary_prompt(&transcript.join("\n")),
            SUMMARY_MAX_TOKENS,
        )
        .await
    {
        Ok(summary) if !summary.trim().is_empty() => {
            context.summary = Some(summary.trim().to_string());
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Summarization failed");
        }
    }
}

// =============================================================================
// Interaction recording
// =============================================================================

/// Parse a JSON reply that may arrive wrapped in a fenced code block.
pub fn parse_json_response(raw: &str) -> Option<JsonValue> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    // ```json ... ``` or plain ``` ... ```
    if let Some(start) = trimmed.find("```") {
        let inner = &trimmed[start + 3..];
        let inner = inner.strip_prefix("json").unwrap_or(inner);
        if let Some(end) = inner.find("```") {
            if let Ok(value) = serde_json::from_str(inner[..end].trim()) {
                return Some(value);
            }
        }
    }

    // Last resort: the outermost brace pair.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    serde_json::from_str(trimmed[start..=end].trim()).ok()
}

/// Record a note: extract structure, store it, link volunteers, embed.
/// Returns the confirmation reply.
pub async fn process_interaction(
    deps: &ServerDeps,
    content: &str,
    user: &ChatUser,
) -> Result<String> {
    let extracted = match &deps.ai {
        Some(ai) => {
            match ai
                .complete_prompt(
                    "You extract structured data from notes.",
                    &prompts::extraction_prompt(content),
                    EXTRACTION_MAX_TOKENS,
                )
                .await
            {
                Ok(raw) => parse_json_response(&raw),
                Err(e) => {
                    tracing::warn!(error = %e, "Extraction call failed, storing note as-is");
                    None
                }
            }
        }
        None => None,
    };

    let names: Vec<String> = extracted
        .as_ref()
        .and_then(|v| v.get("volunteers"))
        .and_then(JsonValue::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(JsonValue::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let category = extracted
        .as_ref()
        .and_then(|v| v.get("category"))
        .and_then(JsonValue::as_str)
        .map(String::from);
    let summary = extracted
        .as_ref()
        .and_then(|v| v.get("summary"))
        .and_then(JsonValue::as_str)
        .map(String::from);
    let details = extracted.as_ref().and_then(|v| v.get("details")).cloned();

    let interaction = Interaction::insert(
        user.organization_id,
        user.id,
        content,
        summary.as_deref(),
        category.as_deref(),
        details.as_ref(),
        &deps.db_pool,
    )
    .await?;

    let mut linked_names: Vec<String> = Vec::new();
    let mut uncertain: Vec<String> = Vec::new();
    match matching::match_volunteers_for_interaction(deps, user.organization_id, &names).await {
        Ok(outcome) => {
            for volunteer in outcome.confirmed.iter().chain(outcome.created.iter()) {
                if let Err(e) =
                    Interaction::link_volunteer(interaction.id, volunteer.id, &deps.db_pool).await
                {
                    tracing::warn!(error = %e, "Volunteer link failed");
                }
                linked_names.push(volunteer.name.clone());
            }
            for (name, verdict) in &outcome.pending {
                if let Some(best) = verdict.best() {
                    uncertain.push(format!("{} (did you mean {}?)", name, best.name));
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Volunteer matching failed for interaction");
        }
    }

    if let Some(embedding_service) = &deps.embedding_service {
        let mut text = interaction.embedding_text();
        if !linked_names.is_empty() {
            text = format!("Volunteers: {}\n{}", linked_names.join(", "), text);
        }
        match embedding_service.generate(&text).await {
            Ok(embedding) => {
                if let Err(e) = Interaction::update_embedding(
                    interaction.id,
                    pgvector::Vector::from(embedding),
                    &deps.db_pool,
                )
                .await
                {
                    tracing::warn!(error = %e, "Embedding store failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Interaction embedding failed, backfill will retry");
            }
        }
    }

    let mut reply = String::from("Got it, I've recorded that note.");
    if !linked_names.is_empty() {
        reply.push_str(&format!(" Linked to {}.", linked_names.join(", ")));
    }
    if !uncertain.is_empty() {
        reply.push_str(&format!(
            " I wasn't sure about {}.",
            uncertain.join("; ")
        ));
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockSchedulingService;
    use planning_center::{PersonDetails, PersonMatch, PlanSong, PlanTeamMember, SongSuggestion};
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn test_deps(scheduling: Arc<MockSchedulingService>) -> ServerDeps {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/aria_test")
            .unwrap();
        ServerDeps::new(pool, None, None, scheduling)
    }

    fn test_context() -> ConversationContext {
        ConversationContext {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            session_id: "s".to_string(),
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

    fn test_user() -> ChatUser {
        ChatUser {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            display_name: "Jamie".to_string(),
        }
    }

    fn song_selection_pending() -> PendingAction {
        PendingAction::SongSelection {
            query_type: SongQueryType::SongInfo,
            original_query: "Way Makr".to_string(),
            candidates: vec![
                SongSuggestion {
                    id: "10".to_string(),
                    title: "Way Maker".to_string(),
                    author: None,
                    score: 0.8,
                },
                SongSuggestion {
                    id: "11".to_string(),
                    title: "Waymaker (Live)".to_string(),
                    author: None,
                    score: 0.7,
                },
            ],
        }
    }

    #[test]
    fn parses_bare_json() {
        let value = parse_json_response(r#"{"volunteers": ["Sarah"]}"#).unwrap();
        assert_eq!(value["volunteers"][0], "Sarah");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "Here you go:\n```json\n{\"category\": \"general\"}\n```";
        let value = parse_json_response(raw).unwrap();
        assert_eq!(value["category"], "general");
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let raw = "Sure! {\"summary\": \"ok\"} hope that helps";
        let value = parse_json_response(raw).unwrap();
        assert_eq!(value["summary"], "ok");
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_json_response("no json here"), None);
    }

    #[tokio::test]
    async fn song_selection_resolves_a_number() {
        let scheduling = Arc::new(MockSchedulingService {
            configured: true,
            song_by_id: Some(SongDetails {
                id: "10".to_string(),
                title: "Way Maker".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        let deps = test_deps(scheduling.clone());
        let mut context = test_context();
        context.set_pending(song_selection_pending());

        let today = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        let outcome = handle_pending(&deps, "1", &test_user(), &mut context, today)
            .await
            .expect("pending should handle a selection");

        match outcome {
            RouteOutcome::Generate { blocks, .. } => {
                assert!(blocks[0].contains("[SONG DATA]"));
                assert!(blocks[0].contains("Way Maker"));
            }
            RouteOutcome::Reply(reply) => panic!("expected context, got reply: {reply}"),
        }
        assert!(scheduling.called("get_song_by_id:10"));
        assert_eq!(context.pending(), None);
        assert_eq!(context.current_song().unwrap().title, "Way Maker");
    }

    #[tokio::test]
    async fn unrelated_message_restores_pending_selection() {
        let deps = test_deps(Arc::new(MockSchedulingService::configured()));
        let mut context = test_context();
        context.set_pending(song_selection_pending());

        let today = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        let outcome =
            handle_pending(&deps, "never mind that", &test_user(), &mut context, today).await;

        assert!(outcome.is_none());
        assert!(matches!(
            context.pending(),
            Some(PendingAction::SongSelection { .. })
        ));
    }

    #[tokio::test]
    async fn correction_clears_pending_selection() {
        let deps = test_deps(Arc::new(MockSchedulingService::configured()));
        let mut context = test_context();
        context.set_pending(song_selection_pending());

        let today = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        let outcome = handle_pending(&deps, "no, that's wrong", &test_user(), &mut context, today)
            .await
            .expect("correction should be handled");

        assert!(matches!(outcome, RouteOutcome::Reply(_)));
        assert_eq!(context.pending(), None);
    }

    #[tokio::test]
    async fn date_confirmation_runs_nearest_plan() {
        let scheduling = Arc::new(MockSchedulingService {
            configured: true,
            nearest_plan: Some(planning_center::ServicePlan {
                id: "1".to_string(),
                service_type_name: "Sunday Worship".to_string(),
                dates: "December 22, 2024".to_string(),
                sort_date: "2024-12-22".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        let deps = test_deps(scheduling.clone());
        let mut context = test_context();
        context.set_pending(PendingAction::DateConfirmation {
            date: NaiveDate::from_ymd_opt(2024, 12, 21).unwrap(),
            query_type: SongQueryType::TeamSchedule,
            service_type: None,
        });

        let today = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        let outcome = handle_pending(&deps, "yes please", &test_user(), &mut context, today)
            .await
            .expect("confirmation should be handled");

        match outcome {
            RouteOutcome::Generate { blocks, .. } => {
                assert!(blocks[0].contains("[SERVICE TEAM SCHEDULE]"));
                assert!(blocks[0].contains("December 22, 2024"));
            }
            RouteOutcome::Reply(reply) => panic!("expected context, got reply: {reply}"),
        }
        assert!(scheduling.called("get_nearest_plan:2024-12-21"));
    }

    #[tokio::test]
    async fn person_and_song_queries_both_contribute_blocks() {
        let scheduling = Arc::new(MockSchedulingService {
            configured: true,
            person_matches: vec![PersonMatch {
                pco_id: "p1".to_string(),
                name: "Sarah Johnson".to_string(),
                score: 0.97,
            }],
            person_details: Some(PersonDetails {
                id: "p1".to_string(),
                name: "Sarah Johnson".to_string(),
                ..Default::default()
            }),
            song_lookup: Some(SongLookup::Found(SongDetails {
                id: "10".to_string(),
                title: "Way Maker".to_string(),
                key: Some("E".to_string()),
                ..Default::default()
            })),
            ..Default::default()
        });
        let deps = test_deps(scheduling);
        let mut context = test_context();
        let user = test_user();

        let today = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        let outcome = route(
            &deps,
            "What's Sarah Johnson's email? And what key is \"Way Maker\" in?",
            &user,
            &mut context,
            today,
        )
        .await;

        match outcome {
            RouteOutcome::Generate { blocks, .. } => {
                assert_eq!(blocks.len(), 2);
                assert!(blocks[0].contains("[PLANNING CENTER DATA for Sarah Johnson]"));
                assert!(blocks[1].contains("[SONG DATA]"));
                assert!(blocks[1].contains("Way Maker"));
            }
            RouteOutcome::Reply(reply) => panic!("expected context, got reply: {reply}"),
        }
    }

    #[tokio::test]
    async fn setlist_miss_keeps_the_setlist_question_pending() {
        let deps = test_deps(Arc::new(MockSchedulingService::configured()));
        let mut context = test_context();

        let today = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        let outcome = route(
            &deps,
            "What songs are we singing this Sunday?",
            &test_user(),
            &mut context,
            today,
        )
        .await;

        match outcome {
            RouteOutcome::Reply(reply) => assert!(reply.contains("nearest service")),
            RouteOutcome::Generate { .. } => panic!("expected a confirmation offer"),
        }
        assert!(matches!(
            context.pending(),
            Some(PendingAction::DateConfirmation {
                query_type: SongQueryType::Setlist,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn setlist_confirmation_lists_songs_without_the_roster() {
        let scheduling = Arc::new(MockSchedulingService {
            configured: true,
            nearest_plan: Some(planning_center::ServicePlan {
                id: "1".to_string(),
                service_type_name: "Sunday Worship".to_string(),
                dates: "December 22, 2024".to_string(),
                sort_date: "2024-12-22".to_string(),
                team_members: vec![PlanTeamMember {
                    name: "Mike Chen".to_string(),
                    team_name: "Band".to_string(),
                    position: "Drums".to_string(),
                    status: "Confirmed".to_string(),
                }],
                songs: vec![PlanSong {
                    title: "Way Maker".to_string(),
                    key: Some("E".to_string()),
                    author: None,
                }],
                ..Default::default()
            }),
            ..Default::default()
        });
        let deps = test_deps(scheduling);
        let mut context = test_context();
        context.set_pending(PendingAction::DateConfirmation {
            date: NaiveDate::from_ymd_opt(2024, 12, 21).unwrap(),
            query_type: SongQueryType::Setlist,
            service_type: None,
        });

        let today = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        let outcome = handle_pending(&deps, "yes", &test_user(), &mut context, today)
            .await
            .expect("confirmation should be handled");

        match outcome {
            RouteOutcome::Generate { blocks, .. } => {
                assert!(blocks[0].contains("Song Set:"));
                assert!(blocks[0].contains("Way Maker"));
                assert!(!blocks[0].contains("Mike Chen"));
            }
            RouteOutcome::Reply(reply) => panic!("expected context, got reply: {reply}"),
        }
    }

    #[tokio::test]
    async fn follow_up_without_date_re_asks_and_keeps_details() {
        let deps = test_deps(Arc::new(MockSchedulingService::unconfigured()));
        let mut context = test_context();
        context.set_pending(PendingAction::FollowUpDate {
            volunteer_id: None,
            volunteer_name: "Sarah".to_string(),
            title: "Follow up with Sarah".to_string(),
            description: "check in about her mom's surgery".to_string(),
            category: Some("pastoral".to_string()),
        });

        let today = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        let outcome = handle_pending(&deps, "hmm let me think", &test_user(), &mut context, today)
            .await
            .expect("follow-up should re-ask");

        match outcome {
            RouteOutcome::Reply(reply) => assert!(reply.contains("When should")),
            RouteOutcome::Generate { .. } => panic!("expected a re-ask reply"),
        }
        match context.pending() {
            Some(PendingAction::FollowUpDate {
                title, category, ..
            }) => {
                assert_eq!(title, "Follow up with Sarah");
                assert_eq!(category.as_deref(), Some("pastoral"));
            }
            other => panic!("expected follow-up pending, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn disambiguation_answer_routes_to_song() {
        let scheduling = Arc::new(MockSchedulingService {
            configured: true,
            song_lookup: Some(SongLookup::Found(SongDetails {
                id: "5".to_string(),
                title: "Grace".to_string(),
                ..Default::default()
            })),
            ..Default::default()
        });
        let deps = test_deps(scheduling);
        let mut context = test_context();
        context.set_pending(PendingAction::Disambiguation {
            value: "Grace".to_string(),
            has_song: true,
            has_person: true,
        });

        let today = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        let outcome = handle_pending(&deps, "the song", &test_user(), &mut context, today)
            .await
            .expect("choice should be handled");

        match outcome {
            RouteOutcome::Generate { blocks, .. } => {
                assert!(blocks[0].contains("[SONG DATA]"));
                assert!(blocks[0].contains("Grace"));
            }
            RouteOutcome::Reply(reply) => panic!("expected context, got reply: {reply}"),
        }
    }

    #[tokio::test]
    async fn fuzzy_song_lookup_sets_pending_selection() {
        let scheduling = Arc::new(MockSchedulingService {
            configured: true,
            song_lookup: Some(SongLookup::Suggestions(vec![SongSuggestion {
                id: "10".to_string(),
                title: "Way Maker".to_string(),
                author: None,
                score: 0.8,
            }])),
            ..Default::default()
        });
        let deps = test_deps(scheduling);
        let mut context = test_context();

        let outcome =
            lookup_song(&deps, &mut context, SongQueryType::ChordChart, "Way Makr").await;

        match outcome {
            RouteOutcome::Reply(reply) => {
                assert!(reply.contains("1. Way Maker"));
            }
            RouteOutcome::Generate { .. } => panic!("expected a suggestion reply"),
        }
        assert!(matches!(
            context.pending(),
            Some(PendingAction::SongSelection {
                query_type: SongQueryType::ChordChart,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn unconfigured_scheduling_degrades_blockout_queries() {
        let deps = test_deps(Arc::new(MockSchedulingService::unconfigured()));
        let today = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        let outcome = blockout_outcome(
            &deps,
            BlockoutQuery::DateBlockouts,
            "Who's blocked out this Sunday?",
            today,
        )
        .await;
        match outcome {
            RouteOutcome::Reply(reply) => assert!(reply.contains("isn't connected")),
            RouteOutcome::Generate { .. } => panic!("expected a direct reply"),
        }
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn full_turn_persists_messages_and_context() {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
        let pool = sqlx::PgPool::connect(&database_url).await.unwrap();
        let deps = ServerDeps::new(
            pool.clone(),
            None,
            None,
            Arc::new(MockSchedulingService::unconfigured()),
        );
        let user = test_user();
        let session_id = format!("test-{}", Uuid::new_v4());

        // No AI configured, so the reply is the degraded notice, but the
        // turn still stores both messages and bumps the counter.
        let reply = answer_question(&deps, "How is everyone doing?", &user, &session_id).await;
        assert_eq!(reply, DEGRADED_REPLY);

        let history = ChatMessage::history(&session_id, 10, &pool).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");

        let context =
            ConversationContext::load_or_create(&session_id, user.organization_id, user.id, &pool)
                .await
                .unwrap();
        assert_eq!(context.message_count, 2);
    }

    #[test]
    fn upcoming_sunday_from_midweek() {
        let wednesday = NaiveDate::from_ymd_opt(2024, 12, 11).unwrap();
        assert_eq!(
            upcoming_sunday(wednesday),
            NaiveDate::from_ymd_opt(2024, 12, 15).unwrap()
        );
        let sunday = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        assert_eq!(upcoming_sunday(sunday), sunday);
    }
}
