//! Pulling song titles and selection choices out of free text.
//!
//! Title extraction is per query type: "what key is X in" and "when did
//! we last play X" bound the title differently, so each category gets
//! its own ordered patterns. A quoted title always wins.

use lazy_static::lazy_static;
use regex::Regex;

use super::classify::SongQueryType;

lazy_static! {
    static ref QUOTED: Regex = Regex::new(r#""([^"]+)"|\u{201c}([^\u{201d}]+)\u{201d}"#).unwrap();

    static ref CHORD_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i:chord charts? (?:for|to))\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:chords? (?:for|to))\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:lead sheet (?:for|to))\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:charts? for)\s+(.+?)\s*\??$").unwrap(),
    ];
    static ref LYRICS_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i:lyrics (?:to|for|of))\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:what are the words to)\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:(?:chorus|bridge|verse) (?:of|in|to))\s+(.+?)(?:\s+(?i:go))?\s*\??$").unwrap(),
        Regex::new(r"(?i:how does)\s+(.+?)\s+(?i:go)\s*\??$").unwrap(),
    ];
    static ref INFO_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i:what key is)\s+(.+?)(?:\s+(?i:in))?\s*\??$").unwrap(),
        Regex::new(r"(?i:how fast is)\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:bpm (?:of|for))\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:tempo (?:of|for))\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:who wrote)\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:ccli (?:number )?(?:of|for))\s+(.+?)\s*\??$").unwrap(),
    ];
    static ref HISTORY_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i:when did we (?:last )?(?:play|do|sing))\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:when was the last time we (?:played|did|sang))\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:have we (?:ever )?(?:played|done|sung))\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:how often do we (?:play|do|sing))\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:usage history (?:for|of))\s+(.+?)\s*\??$").unwrap(),
    ];
    static ref SEARCH_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i:do we have)\s+(.+?)\s+(?i:in (?:our|the))").unwrap(),
        Regex::new(r"(?i:is)\s+(.+?)\s+(?i:in our)").unwrap(),
        Regex::new(r"(?i:search for(?: the song)?)\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i:find the song)\s+(.+?)\s*\??$").unwrap(),
    ];

    static ref LEADING_SECTION: Regex = Regex::new(
        r"^(?i:(?:the\s+)?(?:first|second|third|last)?\s*(?:chorus|verse|bridge|intro|outro|tag|pre-chorus)\s+(?:of|in|to)\s+)"
    )
    .unwrap();
    static ref LEADING_THE_SONG: Regex = Regex::new(r"^(?i:the song\s+)").unwrap();
    static ref TRAILING_NOISE: Regex = Regex::new(
        r"(?i:\s+(?:chords?|chord chart|charts?|lyrics|song))\s*$"
    )
    .unwrap();
    static ref SECTION_ONLY: Regex = Regex::new(
        r"^(?i:(?:the\s+)?(?:chorus|verse|bridge|intro|outro|tag|pre-chorus))$"
    )
    .unwrap();
}

/// Strip section words, articles and trailing noise from a raw capture.
/// Returns None when nothing song-like remains.
fn cleanup_song_title(raw: &str) -> Option<String> {
    let mut title = raw.trim().trim_end_matches(['?', '.', '!', ',']).trim().to_string();

    title = LEADING_SECTION.replace(&title, "").to_string();
    title = LEADING_THE_SONG.replace(&title, "").to_string();
    title = TRAILING_NOISE.replace(&title, "").to_string();
    let title = title.trim().trim_matches('"').trim().to_string();

    if title.is_empty() || SECTION_ONLY.is_match(&title) {
        return None;
    }
    Some(title)
}

fn first_capture(patterns: &[Regex], message: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| p.captures(message))
        .and_then(|caps| cleanup_song_title(&caps[1]))
}

/// Extract the song title a query is about, using the query type to
/// pick the right boundary patterns. Quoted titles win outright.
pub fn extract_song_title(message: &str, query_type: SongQueryType) -> Option<String> {
    if let Some(caps) = QUOTED.captures(message) {
        let quoted = caps.get(1).or_else(|| caps.get(2))?;
        return cleanup_song_title(quoted.as_str());
    }

    match query_type {
        SongQueryType::ChordChart => first_capture(&CHORD_PATTERNS, message),
        SongQueryType::Lyrics => first_capture(&LYRICS_PATTERNS, message),
        SongQueryType::SongInfo => first_capture(&INFO_PATTERNS, message),
        SongQueryType::SongHistory => first_capture(&HISTORY_PATTERNS, message),
        SongQueryType::SongSearch => first_capture(&SEARCH_PATTERNS, message),
        SongQueryType::TeamSchedule | SongQueryType::Setlist => None,
    }
}

// =============================================================================
// Selection resolution
// =============================================================================

const ORDINALS: &[&str] = &["first", "second", "third", "fourth", "fifth"];

/// Resolve "which one did they pick" against a numbered candidate list.
///
/// Tried in order: a bare number, a bare ordinal word, "option N", an
/// ordinal with a noun ("the second one"), and finally a title substring.
pub fn resolve_selection_index(message: &str, titles: &[String]) -> Option<usize> {
    let lower = message.trim().to_lowercase();

    if let Ok(n) = lower.trim_end_matches(['.', '!']).parse::<usize>() {
        return (n >= 1 && n <= titles.len()).then(|| n - 1);
    }

    if let Some(idx) = ORDINALS.iter().position(|o| lower == *o) {
        return (idx < titles.len()).then_some(idx);
    }

    lazy_static! {
        static ref OPTION_N: Regex = Regex::new(r"option\s+(\d+)").unwrap();
        static ref ORDINAL_NOUN: Regex =
            Regex::new(r"(first|second|third|fourth|fifth)\s+(?:one|option|song|choice)").unwrap();
    }

    if let Some(caps) = OPTION_N.captures(&lower) {
        let n: usize = caps[1].parse().ok()?;
        return (n >= 1 && n <= titles.len()).then(|| n - 1);
    }

    if let Some(caps) = ORDINAL_NOUN.captures(&lower) {
        let idx = ORDINALS.iter().position(|o| *o == &caps[1])?;
        return (idx < titles.len()).then_some(idx);
    }

    titles
        .iter()
        .position(|title| lower.contains(&title.to_lowercase()))
}
