//! Rendering lookup results into prompt blocks and user-facing lists.
//!
//! Structured data going into the system prompt is wrapped in bracket
//! tags (`[SONG DATA] ... [END SONG DATA]`) so the model can tell
//! authoritative data from conversation. Suggestion lists are numbered
//! because the selection resolver accepts "2" / "the second one".

use planning_center::{
    AvailabilityCheck, DateBlockouts, PersonBlockouts, PersonDetails, PersonMatch, ServicePlan,
    SongDetails, SongSuggestion, SongUsageHistory, TeamAvailability,
};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::domains::interactions::Interaction;

/// Roster and song set for one service, grouped by team.
pub fn format_team_schedule(plan: Option<&ServicePlan>) -> String {
    let Some(plan) = plan else {
        return String::new();
    };

    let mut out = String::from("[SERVICE TEAM SCHEDULE]\n");
    let _ = writeln!(out, "Service: {} - {}", plan.service_type_name, plan.dates);
    if let Some(title) = &plan.title {
        let _ = writeln!(out, "Title: {title}");
    }
    if let Some(series) = &plan.series_title {
        let _ = writeln!(out, "Series: {series}");
    }

    if plan.team_members.is_empty() {
        out.push_str("No team members assigned\n");
    } else {
        let mut teams: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for member in &plan.team_members {
            let mut line = format!("  - {}", member.name);
            if !member.position.is_empty() {
                let _ = write!(line, " ({})", member.position);
            }
            if !member.status.is_empty() {
                let _ = write!(line, " [{}]", member.status);
            }
            teams.entry(member.team_name.as_str()).or_default().push(line);
        }
        for (team, lines) in teams {
            let team = if team.is_empty() { "Team" } else { team };
            let _ = writeln!(out, "{team}:");
            for line in lines {
                let _ = writeln!(out, "{line}");
            }
        }
    }

    if !plan.songs.is_empty() {
        out.push_str("Song Set:\n");
        for song in &plan.songs {
            let mut line = format!("  - {}", song.title);
            if let Some(key) = &song.key {
                let _ = write!(line, " (Key: {key})");
            }
            let _ = writeln!(out, "{line}");
        }
    }

    out.push_str("[END SERVICE TEAM SCHEDULE]");
    out
}

/// Just the song set for one service, for setlist questions.
pub fn format_setlist(plan: &ServicePlan) -> String {
    let mut out = String::from("[SERVICE TEAM SCHEDULE]\n");
    let _ = writeln!(out, "Service: {} - {}", plan.service_type_name, plan.dates);

    if plan.songs.is_empty() {
        out.push_str("No songs planned\n");
    } else {
        out.push_str("Song Set:\n");
        for song in &plan.songs {
            let mut line = format!("  - {}", song.title);
            if let Some(author) = &song.author {
                let _ = write!(line, " by {author}");
            }
            if let Some(key) = &song.key {
                let _ = write!(line, " (Key: {key})");
            }
            let _ = writeln!(out, "{line}");
        }
    }

    out.push_str("[END SERVICE TEAM SCHEDULE]");
    out
}

/// One person's Planning Center record, optionally scoped to the field
/// that was asked about.
pub fn format_pco_details(details: &PersonDetails, query_type: Option<&str>) -> String {
    let mut out = format!("[PLANNING CENTER DATA for {}]\n", details.name);
    if let Some(query_type) = query_type {
        let _ = writeln!(out, "Requested: {query_type}");
    }

    if !details.emails.is_empty() {
        out.push_str("Emails:\n");
        for email in &details.emails {
            let mut line = format!("  - {}", email.address);
            if email.primary {
                line.push_str(" (primary)");
            }
            let _ = writeln!(out, "{line}");
        }
    }
    if !details.phone_numbers.is_empty() {
        out.push_str("Phone numbers:\n");
        for phone in &details.phone_numbers {
            let mut line = format!("  - {}", phone.number);
            if phone.primary {
                line.push_str(" (primary)");
            }
            let _ = writeln!(out, "{line}");
        }
    }
    if !details.addresses.is_empty() {
        out.push_str("Addresses:\n");
        for address in &details.addresses {
            let parts: Vec<&str> = [
                address.street.as_deref(),
                address.city.as_deref(),
                address.state.as_deref(),
                address.zip.as_deref(),
            ]
            .into_iter()
            .flatten()
            .collect();
            let _ = writeln!(out, "  - {}", parts.join(", "));
        }
    }
    if let Some(birthdate) = &details.birthdate {
        let _ = writeln!(out, "Birthdate: {birthdate}");
    }
    if let Some(anniversary) = &details.anniversary {
        let _ = writeln!(out, "Anniversary: {anniversary}");
    }
    if let Some(membership) = &details.membership {
        let _ = writeln!(out, "Membership: {membership}");
    }
    if !details.teams.is_empty() {
        let positions: Vec<&str> = details.teams.iter().map(|t| t.position.as_str()).collect();
        let _ = writeln!(out, "Teams: {}", positions.join(", "));
    }

    out.push_str("[END PLANNING CENTER DATA]");
    out
}

/// Full song metadata block.
pub fn format_song_details(song: &SongDetails) -> String {
    let mut out = String::from("[SONG DATA]\n");
    let _ = writeln!(out, "Title: {}", song.title);
    if let Some(author) = &song.author {
        let _ = writeln!(out, "Author: {author}");
    }
    if let Some(key) = &song.key {
        let _ = writeln!(out, "Key: {key}");
    }
    if let Some(bpm) = song.bpm {
        let _ = writeln!(out, "BPM: {bpm}");
    }
    if let Some(meter) = &song.time_signature {
        let _ = writeln!(out, "Time signature: {meter}");
    }
    if let Some(ccli) = &song.ccli_number {
        let _ = writeln!(out, "CCLI: {ccli}");
    }
    if let Some(copyright) = &song.copyright {
        let _ = writeln!(out, "Copyright: {copyright}");
    }
    if !song.themes.is_empty() {
        let _ = writeln!(out, "Themes: {}", song.themes.join(", "));
    }
    if !song.attachments.is_empty() {
        out.push_str("Attachments:\n");
        for attachment in &song.attachments {
            let _ = writeln!(out, "  - {}", attachment.filename);
        }
    }
    if let Some(lyrics) = &song.lyrics {
        let _ = writeln!(out, "Lyrics:\n{lyrics}");
    }
    out.push_str("[END SONG DATA]");
    out
}

/// Numbered candidate list when a title search was not exact.
pub fn format_song_suggestions(title: &str, suggestions: &[SongSuggestion]) -> String {
    if suggestions.is_empty() {
        return format!("I couldn't find \"{title}\" in your song library.");
    }
    let mut out = format!("I couldn't find an exact match for \"{title}\". Did you mean one of these?\n");
    for (i, suggestion) in suggestions.iter().enumerate() {
        let mut line = format!("{}. {}", i + 1, suggestion.title);
        if let Some(author) = &suggestion.author {
            let _ = write!(line, " by {author}");
        }
        let _ = writeln!(out, "{line}");
    }
    out.push_str("Let me know which one you meant.");
    out
}

/// When and in what key a song was scheduled.
pub fn format_song_usage_history(history: &SongUsageHistory) -> String {
    if !history.found {
        return format!(
            "I couldn't find \"{}\" in your song library.",
            history.song_title
        );
    }
    if history.usages.is_empty() {
        return format!("No recent usage found for \"{}\".", history.song_title);
    }
    let mut out = String::from("[SONG DATA]\n");
    let _ = writeln!(out, "Usage history for: {}", history.song_title);
    if let Some(author) = &history.author {
        let _ = writeln!(out, "Author: {author}");
    }
    for usage in &history.usages {
        let mut line = format!("  - {}", usage.date);
        if let Some(key) = &usage.key {
            let _ = write!(line, " (Key: {key})");
        }
        let _ = writeln!(out, "{line}");
    }
    out.push_str("[END SONG DATA]");
    out
}

/// Numbered person candidates when a name lookup was fuzzy.
pub fn format_person_suggestions(name: &str, matches: &[PersonMatch]) -> String {
    if matches.is_empty() {
        return format!("I couldn't find anyone named {name} in Planning Center.");
    }
    let mut out = format!("Multiple people match \"{name}\":\n");
    for (i, person) in matches.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, person.name);
    }
    out.push_str("Which one did you mean?");
    out
}

/// Ask whether a bare name meant a song or a person.
pub fn format_disambiguation_prompt(value: &str, has_song: bool, has_person: bool) -> String {
    match (has_song, has_person) {
        (true, true) => format!(
            "\"{value}\" could be a song or a volunteer. Did you mean the song or the person?"
        ),
        (true, false) => format!("I found a song called \"{value}\". Did you mean the song?"),
        (false, true) => format!("I found a volunteer named {value}. Did you mean the person?"),
        (false, false) => format!("I couldn't find a song or a volunteer matching \"{value}\"."),
    }
}

pub fn format_person_blockouts(blockouts: &PersonBlockouts) -> String {
    if !blockouts.found {
        return format!("I couldn't find {} in Planning Center.", blockouts.person_name);
    }
    if blockouts.blockouts.is_empty() {
        return format!("{} has no blockouts scheduled.", blockouts.person_name);
    }
    let mut out = format!(
        "Blockouts for {} ({} total):\n",
        blockouts.person_name, blockouts.total_count
    );
    for blockout in &blockouts.blockouts {
        let mut line = format!("  - {} to {}", blockout.starts_at, blockout.ends_at);
        if let Some(reason) = &blockout.reason {
            let _ = write!(line, " ({reason})");
        }
        let _ = writeln!(out, "{line}");
    }
    out.trim_end().to_string()
}

pub fn format_date_blockouts(blockouts: &DateBlockouts) -> String {
    if blockouts.blocked_people.is_empty() {
        return format!("No one is blocked out on {}.", blockouts.date);
    }
    let mut out = format!(
        "{} people are blocked out on {}:\n",
        blockouts.total_blocked, blockouts.date
    );
    for person in &blockouts.blocked_people {
        let mut line = format!("  - {}", person.name);
        if let Some(reason) = &person.reason {
            let _ = write!(line, " ({reason})");
        }
        let _ = writeln!(out, "{line}");
    }
    out.trim_end().to_string()
}

pub fn format_availability_check(check: &AvailabilityCheck) -> String {
    if !check.found {
        return format!("I couldn't find {} in Planning Center.", check.person_name);
    }
    if check.available {
        return format!("{} is available on {}.", check.person_name, check.date);
    }
    let mut out = format!("{} is blocked out on {}.", check.person_name, check.date);
    if let Some(blockout) = &check.blockout {
        if let Some(reason) = &blockout.reason {
            let _ = write!(out, " Reason: {reason}.");
        }
    }
    out
}

pub fn format_team_availability(availability: &TeamAvailability) -> String {
    let mut out = format!("Team availability for {}:\n", availability.date);
    if !availability.available.is_empty() {
        let _ = writeln!(out, "Available ({}):", availability.available.len());
        for person in &availability.available {
            let _ = writeln!(out, "  - {}", person.name);
        }
    }
    if !availability.blocked.is_empty() {
        let _ = writeln!(out, "Blocked out ({}):", availability.blocked.len());
        for person in &availability.blocked {
            let mut line = format!("  - {}", person.name);
            if let Some(reason) = &person.reason {
                let _ = write!(line, " ({reason})");
            }
            let _ = writeln!(out, "{line}");
        }
    }
    if availability.available.is_empty() && availability.blocked.is_empty() {
        out.push_str("No availability information found.");
    }
    out.trim_end().to_string()
}

/// One retrieved interaction as a context snippet.
pub fn format_interaction_context(interaction: &Interaction) -> String {
    let mut out = format!(
        "--- Interaction from {} ---\n",
        interaction.created_at.format("%Y-%m-%d")
    );
    if !interaction.volunteer_names.is_empty() {
        let _ = writeln!(out, "Volunteers: {}", interaction.volunteer_names.join(", "));
    }
    let _ = writeln!(out, "Notes: {}", interaction.content);
    if let Some(summary) = &interaction.summary {
        let _ = writeln!(out, "Summary: {summary}");
    }
    if let Some(data) = &interaction.ai_extracted_data {
        let _ = writeln!(out, "Extracted Data: {data}");
    }
    out.trim_end().to_string()
}
