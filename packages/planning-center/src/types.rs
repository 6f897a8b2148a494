//! Typed results returned by the Planning Center client.
//!
//! These are flattened views over the JSON:API payloads — the server
//! formats them into prompt blocks and never touches raw JSON.

use serde::{Deserialize, Serialize};

/// A person record from the People API (list/search endpoints).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Full contact details for a single person.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonDetails {
    pub id: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub emails: Vec<Email>,
    pub phone_numbers: Vec<PhoneNumber>,
    pub addresses: Vec<Address>,
    pub birthdate: Option<String>,
    pub anniversary: Option<String>,
    pub membership: Option<String>,
    pub teams: Vec<TeamPosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub address: String,
    pub primary: bool,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub number: String,
    pub carrier: Option<String>,
    pub primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamPosition {
    pub position: String,
}

/// A fuzzy person-match candidate with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonMatch {
    pub pco_id: String,
    pub name: String,
    pub score: f64,
}

/// A service plan with its roster and song set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePlan {
    pub id: String,
    pub service_type_name: String,
    /// Human-readable date label, e.g. "December 15, 2024".
    pub dates: String,
    /// Sortable ISO date, e.g. "2024-12-15".
    pub sort_date: String,
    pub title: Option<String>,
    pub series_title: Option<String>,
    pub team_members: Vec<PlanTeamMember>,
    pub songs: Vec<PlanSong>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanTeamMember {
    pub name: String,
    pub team_name: String,
    pub position: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSong {
    pub title: String,
    pub key: Option<String>,
    pub author: Option<String>,
}

/// Full song detail, including arrangement metadata and attachments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SongDetails {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub admin: Option<String>,
    pub ccli_number: Option<String>,
    pub copyright: Option<String>,
    pub key: Option<String>,
    pub bpm: Option<f64>,
    pub time_signature: Option<String>,
    pub themes: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub lyrics: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub file_type: Option<String>,
    pub url: Option<String>,
}

/// A candidate when a song title search was not exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongSuggestion {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub score: f64,
}

/// Result of a title lookup: exact hit, fuzzy candidates, or nothing.
#[derive(Debug, Clone)]
pub enum SongLookup {
    Found(SongDetails),
    Suggestions(Vec<SongSuggestion>),
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongUsage {
    pub date: String,
    pub key: Option<String>,
    pub arrangement_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SongUsageHistory {
    pub found: bool,
    pub song_title: String,
    pub author: Option<String>,
    pub usages: Vec<SongUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blockout {
    pub starts_at: String,
    pub ends_at: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonBlockouts {
    pub found: bool,
    pub person_name: String,
    pub blockouts: Vec<Blockout>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedPerson {
    pub name: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateBlockouts {
    pub date: String,
    pub blocked_people: Vec<BlockedPerson>,
    pub total_blocked: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityCheck {
    pub found: bool,
    pub person_name: String,
    pub date: String,
    pub available: bool,
    pub blockout: Option<Blockout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailablePerson {
    pub name: String,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamAvailability {
    pub date: String,
    pub available: Vec<AvailablePerson>,
    pub blocked: Vec<BlockedPerson>,
    pub unknown: Vec<String>,
}
