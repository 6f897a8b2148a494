//! Rule-based intent classification for incoming chat messages.
//!
//! Every classifier is a table of ordered regexes; the first pattern
//! that fires decides the category. Keeping these as plain rules (no
//! LLM call) makes routing free, deterministic and testable.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::dates::extract_date_reference;

// Words that look like names to the capitalized-word patterns but never are.
const GENERIC_TERMS: &[&str] = &[
    "the people",
    "people",
    "team",
    "the team",
    "volunteers",
    "everyone",
    "folks",
    "members",
    "the people serving",
];

const NAME_STOP_WORDS: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "is", "are", "was", "the", "a", "an", "this",
    "that", "next", "last", "everyone", "anybody", "somebody", "sunday", "monday", "tuesday",
    "wednesday", "thursday", "friday", "saturday", "today", "tomorrow", "yesterday", "january",
    "february", "march", "april", "may", "june", "july", "august", "september", "october",
    "november", "december", "easter", "christmas", "thanksgiving", "aria",
];

fn is_generic_term(candidate: &str) -> bool {
    let lower = candidate.trim().to_lowercase();
    GENERIC_TERMS.contains(&lower.as_str()) || NAME_STOP_WORDS.contains(&lower.as_str())
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Person data queries (Planning Center people)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcoQueryType {
    Email,
    Phone,
    Contact,
    Address,
    ServiceHistory,
    Birthday,
}

impl PcoQueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Contact => "contact",
            Self::Address => "address",
            Self::ServiceHistory => "service_history",
            Self::Birthday => "birthday",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PcoDataQuery {
    pub query_type: PcoQueryType,
    pub person_name: String,
}

lazy_static! {
    static ref PCO_TYPE_PATTERNS: Vec<(PcoQueryType, Regex)> = vec![
        (PcoQueryType::Email, Regex::new(r"\be-?mail\b").unwrap()),
        (
            PcoQueryType::Phone,
            Regex::new(r"\bphone\b|\bcell\b|\bmobile\b|\bcall\b|\btext\b").unwrap(),
        ),
        (
            PcoQueryType::Contact,
            Regex::new(r"\bcontact\b|get in touch|\breach\b").unwrap(),
        ),
        (
            PcoQueryType::Address,
            Regex::new(r"\baddress\b|where does .+ live|where .+ lives").unwrap(),
        ),
        (
            PcoQueryType::ServiceHistory,
            Regex::new(
                r"last served?\b|when did .+ (?:serve|play|sing)|(?:serve|play|sing|serving|playing|singing) next|\bscheduled\b"
            )
            .unwrap(),
        ),
        (
            PcoQueryType::Birthday,
            Regex::new(r"\bbirthday\b|\bborn\b|how old is|\banniversary\b").unwrap(),
        ),
    ];

    static ref PERSON_NAME_PATTERNS: Vec<Regex> = vec![
        Regex::new(
            r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)'s\s+(?i:email|e-mail|phone|cell|number|contact|address|birthday|anniversary|info)"
        )
        .unwrap(),
        Regex::new(r"(?i:reach|call|text|contact|email)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)")
            .unwrap(),
        Regex::new(r"(?i:get in touch with)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)").unwrap(),
        Regex::new(r"\b(?i:for)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)").unwrap(),
        Regex::new(r"\b(?i:does|did|is|was)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)").unwrap(),
    ];

    // Leading boundary keeps this from latching onto the "s" of a
    // preceding contraction ("what's john's email").
    static ref LOWERCASE_POSSESSIVE: Regex = Regex::new(
        r"(?:^|[\s,.!?])([a-z]+(?:\s+[a-z]+)?)'s\s+(?:email|phone|cell|number|contact|address|birthday|anniversary)"
    )
    .unwrap();
}

/// Extract the person a message is about, or None when it only names a
/// group ("the team") or nothing at all.
pub fn extract_person_name(message: &str) -> Option<String> {
    for pattern in PERSON_NAME_PATTERNS.iter() {
        for caps in pattern.captures_iter(message) {
            let candidate = caps[1].trim().to_string();
            if !is_generic_term(&candidate) {
                return Some(candidate);
            }
        }
    }

    // All-lowercase input still deserves a lookup: "what's john's email"
    let lower = message.to_lowercase();
    if let Some(caps) = LOWERCASE_POSSESSIVE.captures(&lower) {
        let candidate = caps[1].trim().to_string();
        if !is_generic_term(&candidate) {
            return Some(title_case(&candidate));
        }
    }

    None
}

/// Detect a question about one person's Planning Center data. Returns
/// None unless both a data type and a person name are present.
pub fn detect_pco_data_query(message: &str) -> Option<PcoDataQuery> {
    let lower = message.to_lowercase();
    let query_type = PCO_TYPE_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&lower))
        .map(|(query_type, _)| *query_type)?;
    let person_name = extract_person_name(message)?;
    Some(PcoDataQuery {
        query_type,
        person_name,
    })
}

// =============================================================================
// Song and setlist queries
// =============================================================================

// Serialized into pending actions, so renames are wire-visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongQueryType {
    TeamSchedule,
    ChordChart,
    Lyrics,
    SongSearch,
    SongInfo,
    SongHistory,
    Setlist,
}

lazy_static! {
    static ref TEAM_SCHEDULE: Vec<Regex> = vec![
        Regex::new(r"who'?s (?:on the team|serving|playing|scheduled)").unwrap(),
        Regex::new(r"what'?s the team").unwrap(),
        Regex::new(r"who do we have").unwrap(),
        Regex::new(r"who (?:was on the team|served|played)").unwrap(),
        Regex::new(r"team schedule").unwrap(),
    ];
    static ref CHORD_CHART: Vec<Regex> = vec![
        Regex::new(r"chord chart").unwrap(),
        Regex::new(r"\bchords?\s+(?:for|to)\b").unwrap(),
        Regex::new(r"lead sheet").unwrap(),
        Regex::new(r"\bcharts?\s+for\b").unwrap(),
    ];
    static ref LYRICS: Vec<Regex> = vec![
        Regex::new(r"\blyrics\b").unwrap(),
        Regex::new(r"what are the words to").unwrap(),
        Regex::new(r"\b(?:chorus|bridge|verse) (?:of|in|to)\b").unwrap(),
    ];
    static ref SONG_SEARCH: Vec<Regex> = vec![
        Regex::new(r"do we have .+ in (?:our|the) (?:library|songs|catalog)").unwrap(),
        Regex::new(r"is .+ in our (?:library|song list|catalog)").unwrap(),
        Regex::new(r"search for (?:the song )?").unwrap(),
        Regex::new(r"find the song").unwrap(),
    ];
    static ref SONG_INFO: Vec<Regex> = vec![
        Regex::new(r"what key is").unwrap(),
        Regex::new(r"\bbpm\b").unwrap(),
        Regex::new(r"how fast is").unwrap(),
        Regex::new(r"\btempo\b").unwrap(),
        Regex::new(r"who wrote").unwrap(),
        Regex::new(r"\bccli\b").unwrap(),
    ];
    static ref SONG_HISTORY: Vec<Regex> = vec![
        Regex::new(r"when did we (?:last )?(?:play|do|sing)").unwrap(),
        Regex::new(r"when was the last time").unwrap(),
        Regex::new(r"have we (?:ever )?(?:played|done|sung)").unwrap(),
        Regex::new(r"how often do we (?:play|do|sing)").unwrap(),
        Regex::new(r"song usage history").unwrap(),
    ];
    static ref SETLIST: Vec<Regex> = vec![
        Regex::new(r"what songs (?:did|do|are|will) we").unwrap(),
        Regex::new(r"\bset\s?list\b").unwrap(),
        Regex::new(r"what did we sing").unwrap(),
        Regex::new(r"\bsongs (?:from|for|on)\b").unwrap(),
        Regex::new(r"songs were on the set").unwrap(),
        Regex::new(r"what are we (?:singing|playing)").unwrap(),
    ];
}

fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|p| p.is_match(text))
}

/// Detect a song or setlist question and pick its most specific type.
///
/// History and setlist overlap ("what did we sing last Sunday"), so the
/// tie-break looks at whether the message carries a date reference: a
/// dated question without history phrasing is a setlist lookup, history
/// phrasing without a date is a usage question.
pub fn detect_song_or_setlist_query(message: &str) -> Option<SongQueryType> {
    let lower = message.to_lowercase();

    if any_match(&TEAM_SCHEDULE, &lower) {
        return Some(SongQueryType::TeamSchedule);
    }
    if any_match(&CHORD_CHART, &lower) {
        return Some(SongQueryType::ChordChart);
    }
    if any_match(&LYRICS, &lower) {
        return Some(SongQueryType::Lyrics);
    }
    if any_match(&SONG_SEARCH, &lower) {
        return Some(SongQueryType::SongSearch);
    }
    if any_match(&SONG_INFO, &lower) {
        return Some(SongQueryType::SongInfo);
    }

    let history = any_match(&SONG_HISTORY, &lower);
    let setlist = any_match(&SETLIST, &lower);
    if !history && !setlist {
        return None;
    }

    let has_date = extract_date_reference(message).is_some();
    if history && !has_date {
        Some(SongQueryType::SongHistory)
    } else if has_date && !history {
        Some(SongQueryType::Setlist)
    } else if history {
        Some(SongQueryType::SongHistory)
    } else {
        Some(SongQueryType::Setlist)
    }
}

// =============================================================================
// Aggregate questions over the interaction log
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateCategory {
    Food,
    Hobbies,
    Family,
    Birthday,
    Prayer,
    Availability,
    General,
}

lazy_static! {
    static ref AGGREGATE_INDICATOR: Regex = Regex::new(
        r"\beveryone\b|\ball \w|\bteam\b|most common|how many|who (?:has|have|likes|like|are|is usually)|\bacross\b|\bpatterns\b|\bsummary\b|\bthemes\b|\bupcoming\b|\bvolunteers\b|our team|usually available"
    )
    .unwrap();
    static ref AGGREGATE_CATEGORIES: Vec<(AggregateCategory, Regex)> = vec![
        (
            AggregateCategory::Food,
            Regex::new(r"favorite foods?|dietary|\bfood\b|\ballerg").unwrap(),
        ),
        (
            AggregateCategory::Hobbies,
            Regex::new(r"\bhobby\b|\bhobbies\b|who likes|\binterests\b").unwrap(),
        ),
        (
            AggregateCategory::Family,
            Regex::new(r"\bkids\b|\bchildren\b|\bmarried\b|\bspouse\b|\bfamily\b").unwrap(),
        ),
        (
            AggregateCategory::Birthday,
            Regex::new(r"\bbirthdays?\b").unwrap(),
        ),
        (
            AggregateCategory::Prayer,
            Regex::new(r"prayer requests?|praying about|prayer themes").unwrap(),
        ),
        (
            AggregateCategory::Availability,
            Regex::new(r"available on|\bavailability\b|usually available").unwrap(),
        ),
    ];
}

/// Detect questions that span the whole team rather than one person.
pub fn detect_aggregate_question(message: &str) -> Option<AggregateCategory> {
    let lower = message.to_lowercase();
    if !AGGREGATE_INDICATOR.is_match(&lower) {
        return None;
    }
    let category = AGGREGATE_CATEGORIES
        .iter()
        .find(|(_, pattern)| pattern.is_match(&lower))
        .map(|(category, _)| *category)
        .unwrap_or(AggregateCategory::General);
    Some(category)
}

// =============================================================================
// Blockout and availability queries
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum BlockoutQuery {
    DateBlockouts,
    PersonBlockouts(String),
    AvailabilityCheck(String),
    TeamAvailability,
}

lazy_static! {
    static ref DATE_BLOCKOUTS: Vec<Regex> = vec![
        Regex::new(r"who'?s blocked out").unwrap(),
        Regex::new(r"who is blocked out").unwrap(),
        Regex::new(r"who can'?t make it").unwrap(),
        Regex::new(r"who has blockouts").unwrap(),
    ];
    static ref PERSON_BLOCKOUTS: Vec<Regex> = vec![
        Regex::new(r"(?i:when is) ([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*) blocked").unwrap(),
        Regex::new(r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)'s blockouts?").unwrap(),
        Regex::new(r"(?i:show me) ([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)'s? blockout").unwrap(),
        Regex::new(r"blockout dates for ([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)").unwrap(),
    ];
    static ref AVAILABILITY_CHECK: Vec<Regex> = vec![
        Regex::new(r"(?i:is) ([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*) (?:available|free)").unwrap(),
        Regex::new(r"(?i:can) ([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*) (?:serve|make it|play)").unwrap(),
    ];
    static ref TEAM_AVAILABILITY: Vec<Regex> = vec![
        Regex::new(r"team availability for").unwrap(),
        Regex::new(r"who'?s available").unwrap(),
        Regex::new(r"who is available").unwrap(),
    ];
}

fn capture_name(patterns: &[Regex], message: &str) -> Option<String> {
    for pattern in patterns {
        for caps in pattern.captures_iter(message) {
            let candidate = caps[1].trim().to_string();
            if !is_generic_term(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Detect blockout questions. Date-wide first, then one person's
/// blockouts, then a yes/no availability check, then the whole team.
pub fn detect_blockout_query(message: &str) -> Option<BlockoutQuery> {
    let lower = message.to_lowercase();

    if any_match(&DATE_BLOCKOUTS, &lower) {
        return Some(BlockoutQuery::DateBlockouts);
    }
    if let Some(name) = capture_name(&PERSON_BLOCKOUTS, message) {
        return Some(BlockoutQuery::PersonBlockouts(name));
    }
    if let Some(name) = capture_name(&AVAILABILITY_CHECK, message) {
        return Some(BlockoutQuery::AvailabilityCheck(name));
    }
    if any_match(&TEAM_AVAILABILITY, &lower) {
        return Some(BlockoutQuery::TeamAvailability);
    }
    None
}

// =============================================================================
// Analytics queries
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsQuery {
    Overview,
    Engagement,
    Care,
    Proactive,
    Trends,
    Prayer,
    AssistantPerformance,
}

lazy_static! {
    static ref ANALYTICS_PATTERNS: Vec<(AnalyticsQuery, Regex)> = vec![
        (
            AnalyticsQuery::Overview,
            Regex::new(r"team overview|how are we doing|team stats|team summary").unwrap(),
        ),
        (
            AnalyticsQuery::Engagement,
            Regex::new(r"\bengagement\b").unwrap(),
        ),
        (
            AnalyticsQuery::Care,
            Regex::new(r"need(?:s)? attention|check-? ?in with|reach out to someone|overdue follow-?ups")
                .unwrap(),
        ),
        (
            AnalyticsQuery::Proactive,
            Regex::new(r"\bproactive\b|care alerts|focus on today").unwrap(),
        ),
        (
            AnalyticsQuery::Trends,
            Regex::new(r"\btrends?\b").unwrap(),
        ),
        (
            AnalyticsQuery::Prayer,
            Regex::new(r"prayer request summary|what are people praying about").unwrap(),
        ),
        (
            AnalyticsQuery::AssistantPerformance,
            Regex::new(r"how is aria doing|ai performance|assistant performance").unwrap(),
        ),
    ];
}

pub fn detect_analytics_query(message: &str) -> Option<AnalyticsQuery> {
    let lower = message.to_lowercase();
    ANALYTICS_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&lower))
        .map(|(query, _)| *query)
}

// =============================================================================
// Compound team contact queries
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CompoundContactQuery {
    pub query_type: PcoQueryType,
    pub date_reference: Option<String>,
}

lazy_static! {
    static ref COMPOUND_CONTACT_TYPES: Vec<(PcoQueryType, Regex)> = vec![
        (
            PcoQueryType::Email,
            Regex::new(r"email addresses|\bemails\b").unwrap(),
        ),
        (
            PcoQueryType::Phone,
            Regex::new(r"phone numbers|\bnumbers\b").unwrap(),
        ),
        (
            PcoQueryType::Contact,
            Regex::new(r"contact info(?:rmation)?").unwrap(),
        ),
    ];
    static ref GROUP_TERMS: Regex = Regex::new(
        r"the people\b|\beveryone\b|the team\b|team members|\bvolunteers\b|the band\b|vocals team|tech team|\bfolks\b|\bmembers\b|people (?:serving|playing|scheduled|on the)"
    )
    .unwrap();
}

/// "Phone numbers for everyone serving Sunday" - a contact query about a
/// whole roster, optionally scoped to a service date.
pub fn detect_compound_team_contact(message: &str) -> Option<CompoundContactQuery> {
    let lower = message.to_lowercase();
    let query_type = COMPOUND_CONTACT_TYPES
        .iter()
        .find(|(_, pattern)| pattern.is_match(&lower))
        .map(|(query_type, _)| *query_type)?;
    if !GROUP_TERMS.is_match(&lower) {
        return None;
    }
    Some(CompoundContactQuery {
        query_type,
        date_reference: extract_date_reference(message),
    })
}

// =============================================================================
// Conversational signals
// =============================================================================

lazy_static! {
    static ref CONFIRMATION: Regex = Regex::new(
        r"^(?:yes|yeah|yep|yup|sure|ok|okay|sounds good|that works|correct|right|please do|go ahead|yes please|perfect)\b"
    )
    .unwrap();
    static ref CORRECTION: Regex = Regex::new(
        r"^(?:no\b|nope|not\b|wrong|incorrect|actually|i meant|that'?s not)"
    )
    .unwrap();
}

pub fn is_confirmation(message: &str) -> bool {
    CONFIRMATION.is_match(message.trim().to_lowercase().as_str())
}

pub fn is_correction(message: &str) -> bool {
    CORRECTION.is_match(message.trim().to_lowercase().as_str())
}

const INTERACTION_PREFIXES: &[&str] = &[
    "note:",
    "log:",
    "record:",
    "just talked to",
    "just spoke with",
    "i talked to",
    "i spoke with",
    "spoke with",
    "met with",
    "had a conversation with",
    "caught up with",
    "checked in with",
    "prayed with",
    "followed up with",
    "had coffee with",
];

const QUESTION_STARTERS: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "is", "are", "can", "could", "do", "does",
    "did", "will", "would", "should", "show", "tell", "list",
];

/// Is this message a note to record rather than a question to answer?
///
/// Explicit note prefixes always win; anything question-shaped never
/// records; remaining long messages are treated as notes.
pub fn detect_interaction_intent(message: &str) -> bool {
    let lower = message.trim().to_lowercase();

    if INTERACTION_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    if lower.contains('?') {
        return false;
    }
    // "who's" still starts with "who"
    let first_word = lower
        .split(|c: char| !c.is_ascii_alphabetic())
        .find(|w| !w.is_empty());
    if let Some(first_word) = first_word {
        if QUESTION_STARTERS.contains(&first_word) {
            return false;
        }
    }
    lower.len() > 100
}

/// Map youth-ministry wording to a Planning Center service type hint.
pub fn detect_service_type(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    if lower.contains("hsm") || lower.contains("high school") {
        return Some("HSM");
    }
    if lower.contains("msm") || lower.contains("middle school") {
        return Some("MSM");
    }
    None
}

// =============================================================================
// Follow-up requests
// =============================================================================

lazy_static! {
    static ref FOLLOW_UP_REQUEST: Regex = Regex::new(
        r"remind me to|schedule a follow-? ?up|i need to follow up|set a reminder"
    )
    .unwrap();
    static ref FOLLOW_UP_NAME: Regex =
        Regex::new(r"(?i:with|about|for)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpRequest {
    pub volunteer_name: Option<String>,
    pub description: String,
}

/// "Remind me to check in with Sarah" - a follow-up to schedule.
pub fn detect_follow_up_request(message: &str) -> Option<FollowUpRequest> {
    if !FOLLOW_UP_REQUEST.is_match(&message.to_lowercase()) {
        return None;
    }
    let volunteer_name = FOLLOW_UP_NAME
        .captures_iter(message)
        .map(|caps| caps[1].trim().to_string())
        .find(|candidate| !is_generic_term(candidate));
    Some(FollowUpRequest {
        volunteer_name,
        description: message.trim().to_string(),
    })
}

// =============================================================================
// Song-or-person disambiguation
// =============================================================================

lazy_static! {
    static ref AMBIGUOUS_SUBJECT: Regex =
        Regex::new(r"(?:(?i:tell me about|what about|any notes on))\s+([A-Z][a-z]+)\s*\??$")
            .unwrap();
    static ref CLEAR_SONG: Regex =
        Regex::new(r#"["\u{201c}]|the song\b|\blyrics\b|\bchord"#).unwrap();
}

/// "Tell me about Grace" - Grace could be a song title or a volunteer.
/// Returns the ambiguous value when neither reading is ruled out.
pub fn check_ambiguous_song_or_person(message: &str) -> Option<String> {
    if CLEAR_SONG.is_match(&message.to_lowercase()) {
        return None;
    }
    let caps = AMBIGUOUS_SUBJECT.captures(message)?;
    let candidate = caps[1].trim().to_string();
    if is_generic_term(&candidate) {
        return None;
    }
    Some(candidate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisambiguationChoice {
    Song,
    Person,
}

/// Interpret the user's answer to "the song or the person?"
pub fn check_disambiguation_response(message: &str) -> Option<DisambiguationChoice> {
    let lower = message.to_lowercase();
    if lower.contains("song") {
        return Some(DisambiguationChoice::Song);
    }
    if lower.contains("person") || lower.contains("volunteer") || lower.contains("member") {
        return Some(DisambiguationChoice::Person);
    }
    None
}
