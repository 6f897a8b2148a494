// Planning Center Online API client.
//
// Covers the People and Services APIs used by Aria: person lookup with
// fuzzy suggestions, service plans (roster + song set), song detail and
// usage history, and blockout/availability queries. Authentication is
// HTTP basic with a Personal Access Token (app id + secret).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;

pub mod matching;
pub mod types;

pub use matching::{name_similarity, normalize_name};
pub use types::*;

const BASE_URL: &str = "https://api.planningcenteronline.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PEOPLE_CACHE_TTL: Duration = Duration::from_secs(3600);
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Planning Center credentials are not configured")]
    NotConfigured,
    #[error("Planning Center request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected Planning Center response: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct PlanningCenterClient {
    app_id: Option<String>,
    secret: Option<String>,
    http: Client,
    people_cache: Arc<Mutex<Option<(Instant, Vec<Person>)>>>,
}

impl PlanningCenterClient {
    pub fn new(app_id: Option<String>, secret: Option<String>) -> Self {
        Self {
            app_id: app_id.filter(|s| !s.is_empty()),
            secret: secret.filter(|s| !s.is_empty()),
            http: Client::new(),
            people_cache: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.app_id.is_some() && self.secret.is_some()
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (&self.app_id, &self.secret) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(Error::NotConfigured),
        }
    }

    /// Authenticated GET returning the raw JSON body.
    async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let (app_id, secret) = self.credentials()?;
        let url = format!("{BASE_URL}{endpoint}");

        let response = self
            .http
            .get(&url)
            .basic_auth(app_id, Some(secret))
            .query(params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Fetch every page of a paginated endpoint by following `links.next`.
    async fn get_all_pages(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<Value>> {
        let mut all_data = Vec::new();
        let mut next = Some(endpoint.to_string());
        let mut first = true;

        while let Some(endpoint) = next.take() {
            let mut page_params: Vec<(&str, String)> = vec![("per_page", MAX_PER_PAGE.to_string())];
            if first {
                page_params.extend_from_slice(params);
                first = false;
            }

            let result = self.get_json(&endpoint, &page_params).await?;
            if let Some(data) = result.get("data").and_then(Value::as_array) {
                all_data.extend(data.iter().cloned());
            }

            // Pagination params are baked into the next-page URL.
            next = result
                .pointer("/links/next")
                .and_then(Value::as_str)
                .map(|url| url.replace(BASE_URL, ""));
        }

        Ok(all_data)
    }

    // =========================================================================
    // People
    // =========================================================================

    /// All people, cached for an hour. The fuzzy matcher scans the full
    /// list, so repeated lookups within a session must not re-page the API.
    pub async fn get_people(&self, use_cache: bool) -> Result<Vec<Person>> {
        if use_cache {
            let cache = self.people_cache.lock().unwrap();
            if let Some((fetched_at, people)) = cache.as_ref() {
                if fetched_at.elapsed() < PEOPLE_CACHE_TTL {
                    return Ok(people.clone());
                }
            }
        }

        let data = self.get_all_pages("/people/v2/people", &[]).await?;
        let people: Vec<Person> = data.iter().filter_map(parse_person).collect();

        tracing::debug!(count = people.len(), "Fetched Planning Center people");
        *self.people_cache.lock().unwrap() = Some((Instant::now(), people.clone()));
        Ok(people)
    }

    /// Direct name search via the People API.
    pub async fn search_people(&self, query: &str) -> Result<Vec<Person>> {
        let result = self
            .get_json(
                "/people/v2/people",
                &[
                    ("where[search_name]", query.to_string()),
                    ("per_page", "25".to_string()),
                ],
            )
            .await?;

        let people = result
            .get("data")
            .and_then(Value::as_array)
            .map(|data| data.iter().filter_map(parse_person).collect())
            .unwrap_or_default();
        Ok(people)
    }

    /// Full contact details for one person, with emails, phones and
    /// addresses side-loaded.
    pub async fn get_person_details(&self, person_id: &str) -> Result<Option<PersonDetails>> {
        let endpoint = format!("/people/v2/people/{person_id}");
        let result = self
            .get_json(
                &endpoint,
                &[(
                    "include",
                    "emails,phone_numbers,addresses".to_string(),
                )],
            )
            .await?;

        let Some(data) = result.get("data") else {
            return Ok(None);
        };
        let attrs = &data["attributes"];
        let first_name = str_attr(attrs, "first_name").unwrap_or_default();
        let last_name = str_attr(attrs, "last_name").unwrap_or_default();

        let mut details = PersonDetails {
            id: str_attr(data, "id").unwrap_or_else(|| person_id.to_string()),
            name: format!("{first_name} {last_name}").trim().to_string(),
            first_name,
            last_name,
            birthdate: str_attr(attrs, "birthdate"),
            anniversary: str_attr(attrs, "anniversary"),
            membership: str_attr(attrs, "membership"),
            ..Default::default()
        };

        if let Some(included) = result.get("included").and_then(Value::as_array) {
            for item in included {
                let attrs = &item["attributes"];
                match item.get("type").and_then(Value::as_str) {
                    Some("Email") => details.emails.push(Email {
                        address: str_attr(attrs, "address").unwrap_or_default(),
                        primary: attrs["primary"].as_bool().unwrap_or(false),
                        location: str_attr(attrs, "location"),
                    }),
                    Some("PhoneNumber") => details.phone_numbers.push(PhoneNumber {
                        number: str_attr(attrs, "number").unwrap_or_default(),
                        carrier: str_attr(attrs, "carrier"),
                        primary: attrs["primary"].as_bool().unwrap_or(false),
                    }),
                    Some("Address") => details.addresses.push(Address {
                        street: str_attr(attrs, "street_line_1").or_else(|| str_attr(attrs, "street")),
                        city: str_attr(attrs, "city"),
                        state: str_attr(attrs, "state"),
                        zip: str_attr(attrs, "zip"),
                        primary: attrs["primary"].as_bool().unwrap_or(false),
                    }),
                    _ => {}
                }
            }
        }

        Ok(Some(details))
    }

    /// Fuzzy person matching: direct search results (boosted) plus a scan
    /// of the cached people list, scored with [`name_similarity`], top 10.
    pub async fn find_matches(&self, name: &str, threshold: f64) -> Result<Vec<PersonMatch>> {
        let search_name = normalize_name(name);
        let direct = self.search_people(name).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Planning Center direct search failed, using list scan only");
            Vec::new()
        });
        let all_people = self.get_people(true).await?;

        let mut matches: Vec<PersonMatch> = Vec::new();
        let mut seen_ids: Vec<String> = Vec::new();

        // Direct search hits get a boost: the API already thought they
        // were relevant.
        for person in &direct {
            if seen_ids.contains(&person.id) {
                continue;
            }
            seen_ids.push(person.id.clone());
            let score = (name_similarity(&search_name, &person.full_name()) + 0.1).min(1.0);
            if score >= threshold {
                matches.push(PersonMatch {
                    pco_id: person.id.clone(),
                    name: person.full_name(),
                    score,
                });
            }
        }

        for person in &all_people {
            if seen_ids.contains(&person.id) {
                continue;
            }
            seen_ids.push(person.id.clone());
            let full_name = person.full_name();
            if full_name.is_empty() {
                continue;
            }
            let score = name_similarity(&search_name, &full_name);
            if score >= threshold {
                matches.push(PersonMatch {
                    pco_id: person.id.clone(),
                    name: full_name,
                    score,
                });
            }
        }

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(10);
        Ok(matches)
    }

    // =========================================================================
    // Service plans
    // =========================================================================

    async fn get_service_types(&self) -> Result<Vec<(String, String)>> {
        let data = self.get_all_pages("/services/v2/service_types", &[]).await?;
        Ok(data
            .iter()
            .filter_map(|st| {
                let id = st.get("id").and_then(Value::as_str)?.to_string();
                let name = str_attr(&st["attributes"], "name")?;
                Some((id, name))
            })
            .collect())
    }

    async fn plan_stubs(
        &self,
        service_type_id: &str,
        service_type_name: &str,
        filter: &str,
    ) -> Result<Vec<ServicePlan>> {
        let endpoint = format!("/services/v2/service_types/{service_type_id}/plans");
        let order = if filter == "past" { "-sort_date" } else { "sort_date" };
        let result = self
            .get_json(
                &endpoint,
                &[
                    ("filter", filter.to_string()),
                    ("order", order.to_string()),
                    ("per_page", MAX_PER_PAGE.to_string()),
                ],
            )
            .await?;

        let stubs = result
            .get("data")
            .and_then(Value::as_array)
            .map(|plans| {
                plans
                    .iter()
                    .filter_map(|plan| {
                        let attrs = &plan["attributes"];
                        Some(ServicePlan {
                            id: plan.get("id").and_then(Value::as_str)?.to_string(),
                            service_type_name: service_type_name.to_string(),
                            dates: str_attr(attrs, "dates").unwrap_or_default(),
                            sort_date: str_attr(attrs, "sort_date").unwrap_or_default(),
                            title: str_attr(attrs, "title"),
                            series_title: str_attr(attrs, "series_title"),
                            team_members: Vec::new(),
                            songs: Vec::new(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(stubs)
    }

    async fn load_plan_contents(&self, service_type_id: &str, plan: &mut ServicePlan) -> Result<()> {
        let members_endpoint = format!(
            "/services/v2/service_types/{service_type_id}/plans/{}/team_members",
            plan.id
        );
        let members = self.get_all_pages(&members_endpoint, &[]).await?;
        plan.team_members = members
            .iter()
            .filter_map(|member| {
                let attrs = &member["attributes"];
                Some(PlanTeamMember {
                    name: str_attr(attrs, "name")?,
                    team_name: str_attr(attrs, "team_name").unwrap_or_default(),
                    position: str_attr(attrs, "team_position_name").unwrap_or_default(),
                    status: match str_attr(attrs, "status").as_deref() {
                        Some("C") | Some("confirmed") => "Confirmed".to_string(),
                        Some("U") | Some("unconfirmed") => "Unconfirmed".to_string(),
                        Some("D") | Some("declined") => "Declined".to_string(),
                        Some(other) => other.to_string(),
                        None => String::new(),
                    },
                })
            })
            .collect();

        let items_endpoint = format!(
            "/services/v2/service_types/{service_type_id}/plans/{}/items",
            plan.id
        );
        let items = self.get_all_pages(&items_endpoint, &[]).await?;
        plan.songs = items
            .iter()
            .filter(|item| {
                str_attr(&item["attributes"], "item_type").as_deref() == Some("song")
            })
            .filter_map(|item| {
                let attrs = &item["attributes"];
                Some(PlanSong {
                    title: str_attr(attrs, "title")?,
                    key: str_attr(attrs, "key_name"),
                    author: None,
                })
            })
            .collect();

        Ok(())
    }

    /// The plan on an exact date, with roster and songs loaded.
    /// `service_type_hint` narrows the service type by name substring
    /// (e.g. "HSM"); otherwise every service type is searched.
    pub async fn get_plan_for_date(
        &self,
        date: NaiveDate,
        service_type_hint: Option<&str>,
        today: NaiveDate,
    ) -> Result<Option<ServicePlan>> {
        let iso = date.format("%Y-%m-%d").to_string();
        let filter = if date >= today { "future" } else { "past" };

        for (st_id, st_name) in self.matching_service_types(service_type_hint).await? {
            let stubs = self.plan_stubs(&st_id, &st_name, filter).await?;
            if let Some(mut plan) = stubs.into_iter().find(|p| p.sort_date.starts_with(&iso)) {
                self.load_plan_contents(&st_id, &mut plan).await?;
                return Ok(Some(plan));
            }
        }
        Ok(None)
    }

    /// The plan closest to a date, searched both directions. Used when an
    /// exact-date lookup came up empty and the user asked to retry.
    pub async fn get_nearest_plan(
        &self,
        date: NaiveDate,
        service_type_hint: Option<&str>,
    ) -> Result<Option<ServicePlan>> {
        let mut best: Option<(i64, String, ServicePlan)> = None;

        for (st_id, st_name) in self.matching_service_types(service_type_hint).await? {
            for filter in ["past", "future"] {
                for stub in self.plan_stubs(&st_id, &st_name, filter).await? {
                    let Some(plan_date) = parse_sort_date(&stub.sort_date) else {
                        continue;
                    };
                    let distance = (plan_date - date).num_days().abs();
                    if best.as_ref().map_or(true, |(d, _, _)| distance < *d) {
                        best = Some((distance, st_id.clone(), stub));
                    }
                }
            }
        }

        match best {
            Some((_, st_id, mut plan)) => {
                self.load_plan_contents(&st_id, &mut plan).await?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    async fn matching_service_types(
        &self,
        hint: Option<&str>,
    ) -> Result<Vec<(String, String)>> {
        let service_types = self.get_service_types().await?;
        let Some(hint) = hint else {
            return Ok(service_types);
        };
        let hint_lower = hint.to_lowercase();
        let matching: Vec<_> = service_types
            .iter()
            .filter(|(_, name)| name.to_lowercase().contains(&hint_lower))
            .cloned()
            .collect();
        Ok(if matching.is_empty() { service_types } else { matching })
    }

    // =========================================================================
    // Songs
    // =========================================================================

    /// Look up a song by title: exact normalized match gives full detail,
    /// close titles give scored suggestions for the user to pick from.
    pub async fn get_song_by_title(&self, title: &str) -> Result<SongLookup> {
        let result = self
            .get_json(
                "/services/v2/songs",
                &[
                    ("where[title]", title.to_string()),
                    ("per_page", "25".to_string()),
                ],
            )
            .await?;
        let mut candidates: Vec<Value> = result
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // The title filter is exact-ish; fall back to a broader search.
        if candidates.is_empty() {
            let result = self
                .get_json(
                    "/services/v2/songs",
                    &[
                        ("where[search]", title.to_string()),
                        ("per_page", "25".to_string()),
                    ],
                )
                .await
                .unwrap_or(Value::Null);
            candidates = result
                .get("data")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
        }

        let wanted = normalize_name(title);
        let mut suggestions: Vec<SongSuggestion> = Vec::new();

        for song in &candidates {
            let attrs = &song["attributes"];
            let Some(song_title) = str_attr(attrs, "title") else {
                continue;
            };
            let Some(id) = song.get("id").and_then(Value::as_str) else {
                continue;
            };
            if normalize_name(&song_title) == wanted {
                return Ok(SongLookup::Found(self.song_details(id, song).await?));
            }
            let score = name_similarity(title, &song_title);
            if score >= 0.5 {
                suggestions.push(SongSuggestion {
                    id: id.to_string(),
                    title: song_title,
                    author: str_attr(attrs, "author"),
                    score,
                });
            }
        }

        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        suggestions.truncate(5);

        if suggestions.is_empty() {
            Ok(SongLookup::NotFound)
        } else {
            Ok(SongLookup::Suggestions(suggestions))
        }
    }

    /// Full detail for a song already identified by id.
    pub async fn get_song_by_id(&self, song_id: &str) -> Result<Option<SongDetails>> {
        let endpoint = format!("/services/v2/songs/{song_id}");
        let result = self.get_json(&endpoint, &[]).await?;
        match result.get("data") {
            Some(data) => Ok(Some(self.song_details(song_id, data).await?)),
            None => Ok(None),
        }
    }

    async fn song_details(&self, song_id: &str, song: &Value) -> Result<SongDetails> {
        let attrs = &song["attributes"];
        let mut details = SongDetails {
            id: song_id.to_string(),
            title: str_attr(attrs, "title").unwrap_or_default(),
            author: str_attr(attrs, "author"),
            admin: str_attr(attrs, "admin"),
            ccli_number: match &attrs["ccli_number"] {
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) => Some(s.clone()),
                _ => None,
            },
            copyright: str_attr(attrs, "copyright"),
            themes: str_attr(attrs, "themes")
                .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            ..Default::default()
        };

        // Key, BPM and lyrics live on the arrangement, attachments on the
        // song. Both are best-effort; a song with no arrangement still has
        // useful metadata.
        let arrangements_endpoint = format!("/services/v2/songs/{song_id}/arrangements");
        if let Ok(arrangements) = self.get_all_pages(&arrangements_endpoint, &[]).await {
            if let Some(arrangement) = arrangements.first() {
                let attrs = &arrangement["attributes"];
                details.key = str_attr(attrs, "chord_chart_key");
                details.bpm = attrs["bpm"].as_f64();
                details.time_signature = str_attr(attrs, "meter");
                details.lyrics = str_attr(attrs, "lyrics");
            }
        }

        let attachments_endpoint = format!("/services/v2/songs/{song_id}/attachments");
        if let Ok(attachments) = self.get_all_pages(&attachments_endpoint, &[]).await {
            details.attachments = attachments
                .iter()
                .filter_map(|attachment| {
                    let attrs = &attachment["attributes"];
                    Some(Attachment {
                        filename: str_attr(attrs, "filename")?,
                        file_type: str_attr(attrs, "content_type"),
                        url: str_attr(attrs, "url"),
                    })
                })
                .collect();
        }

        Ok(details)
    }

    /// When and in what key a song was scheduled, most recent first.
    pub async fn get_song_usage_history(&self, title: &str) -> Result<SongUsageHistory> {
        let (song_id, song_title, author) = match self.get_song_by_title(title).await? {
            SongLookup::Found(details) => (details.id, details.title, details.author),
            SongLookup::Suggestions(mut suggestions) => {
                let top = suggestions.remove(0);
                (top.id, top.title, top.author)
            }
            SongLookup::NotFound => {
                return Ok(SongUsageHistory {
                    found: false,
                    song_title: title.to_string(),
                    ..Default::default()
                });
            }
        };

        let endpoint = format!("/services/v2/songs/{song_id}/song_schedules");
        let schedules = self.get_all_pages(&endpoint, &[]).await?;
        let mut usages: Vec<SongUsage> = schedules
            .iter()
            .filter_map(|schedule| {
                let attrs = &schedule["attributes"];
                Some(SongUsage {
                    date: str_attr(attrs, "plan_sort_date")
                        .or_else(|| str_attr(attrs, "plan_dates"))?,
                    key: str_attr(attrs, "key_name"),
                    arrangement_name: str_attr(attrs, "arrangement_name"),
                })
            })
            .collect();
        usages.sort_by(|a, b| b.date.cmp(&a.date));
        usages.truncate(10);

        Ok(SongUsageHistory {
            found: true,
            song_title,
            author,
            usages,
        })
    }

    // =========================================================================
    // Blockouts and availability
    // =========================================================================

    async fn person_blockout_records(&self, person_id: &str) -> Result<Vec<Blockout>> {
        let endpoint = format!("/services/v2/people/{person_id}/blockouts");
        let data = self.get_all_pages(&endpoint, &[]).await?;
        Ok(data
            .iter()
            .filter_map(|blockout| {
                let attrs = &blockout["attributes"];
                Some(Blockout {
                    starts_at: str_attr(attrs, "starts_at")?,
                    ends_at: str_attr(attrs, "ends_at").unwrap_or_default(),
                    reason: str_attr(attrs, "reason").filter(|r| !r.is_empty()),
                })
            })
            .collect())
    }

    /// Upcoming blockouts for one person, found by fuzzy name match.
    pub async fn get_person_blockouts(&self, name: &str) -> Result<PersonBlockouts> {
        let matches = self.find_matches(name, 0.75).await?;
        let Some(person) = matches.first() else {
            return Ok(PersonBlockouts {
                found: false,
                person_name: name.to_string(),
                ..Default::default()
            });
        };

        let blockouts = self.person_blockout_records(&person.pco_id).await?;
        Ok(PersonBlockouts {
            found: true,
            person_name: person.name.clone(),
            total_count: blockouts.len(),
            blockouts,
        })
    }

    /// Everyone blocked out on a given date.
    pub async fn get_date_blockouts(&self, date: NaiveDate) -> Result<DateBlockouts> {
        let people = self.get_people(true).await?;
        let mut blocked_people = Vec::new();

        for person in &people {
            let blockouts = match self.person_blockout_records(&person.id).await {
                Ok(blockouts) => blockouts,
                Err(e) => {
                    tracing::warn!(person = %person.full_name(), error = %e, "Blockout fetch failed");
                    continue;
                }
            };
            if let Some(blockout) = blockouts.iter().find(|b| blockout_covers(b, date)) {
                blocked_people.push(BlockedPerson {
                    name: person.full_name(),
                    reason: blockout.reason.clone(),
                });
            }
        }

        Ok(DateBlockouts {
            date: date.format("%B %-d, %Y").to_string(),
            total_blocked: blocked_people.len(),
            blocked_people,
        })
    }

    /// Whether one person is free on a date.
    pub async fn check_availability(&self, name: &str, date: NaiveDate) -> Result<AvailabilityCheck> {
        let matches = self.find_matches(name, 0.75).await?;
        let Some(person) = matches.first() else {
            return Ok(AvailabilityCheck {
                found: false,
                person_name: name.to_string(),
                date: date.format("%B %-d, %Y").to_string(),
                ..Default::default()
            });
        };

        let blockouts = self.person_blockout_records(&person.pco_id).await?;
        let blockout = blockouts.iter().find(|b| blockout_covers(b, date)).cloned();
        Ok(AvailabilityCheck {
            found: true,
            person_name: person.name.clone(),
            date: date.format("%B %-d, %Y").to_string(),
            available: blockout.is_none(),
            blockout,
        })
    }

    /// Availability of the whole roster on a date.
    pub async fn get_team_availability(&self, date: NaiveDate) -> Result<TeamAvailability> {
        let people = self.get_people(true).await?;
        let mut availability = TeamAvailability {
            date: date.format("%B %-d, %Y").to_string(),
            ..Default::default()
        };

        for person in &people {
            match self.person_blockout_records(&person.id).await {
                Ok(blockouts) => {
                    match blockouts.iter().find(|b| blockout_covers(b, date)) {
                        Some(blockout) => availability.blocked.push(BlockedPerson {
                            name: person.full_name(),
                            reason: blockout.reason.clone(),
                        }),
                        None => availability.available.push(AvailablePerson {
                            name: person.full_name(),
                            teams: Vec::new(),
                        }),
                    }
                }
                Err(_) => availability.unknown.push(person.full_name()),
            }
        }

        Ok(availability)
    }
}

fn parse_person(value: &Value) -> Option<Person> {
    let attrs = &value["attributes"];
    Some(Person {
        id: value.get("id").and_then(Value::as_str)?.to_string(),
        first_name: str_attr(attrs, "first_name").unwrap_or_default(),
        last_name: str_attr(attrs, "last_name").unwrap_or_default(),
    })
}

fn str_attr(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

fn parse_sort_date(sort_date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(sort_date.get(..10)?, "%Y-%m-%d").ok()
}

fn blockout_covers(blockout: &Blockout, date: NaiveDate) -> bool {
    let Some(start) = parse_sort_date(&blockout.starts_at) else {
        return false;
    };
    let end = parse_sort_date(&blockout.ends_at).unwrap_or(start);
    start <= date && date <= end
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unconfigured_client_reports_not_configured() {
        let client = PlanningCenterClient::new(None, None);
        assert!(!client.is_configured());

        let client = PlanningCenterClient::new(Some(String::new()), Some("secret".into()));
        assert!(!client.is_configured());

        let client = PlanningCenterClient::new(Some("id".into()), Some("secret".into()));
        assert!(client.is_configured());
    }

    #[tokio::test]
    async fn unconfigured_requests_fail_fast() {
        let client = PlanningCenterClient::new(None, None);
        let err = client.get_people(true).await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
    }

    #[test]
    fn parses_person_from_json_api_shape() {
        let value = json!({
            "id": "123",
            "type": "Person",
            "attributes": {"first_name": "John", "last_name": "Smith"}
        });
        let person = parse_person(&value).unwrap();
        assert_eq!(person.full_name(), "John Smith");
    }

    #[test]
    fn blockout_covers_inclusive_range() {
        let blockout = Blockout {
            starts_at: "2024-12-24".into(),
            ends_at: "2024-12-26".into(),
            reason: None,
        };
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 12, d).unwrap();
        assert!(blockout_covers(&blockout, day(24)));
        assert!(blockout_covers(&blockout, day(25)));
        assert!(blockout_covers(&blockout, day(26)));
        assert!(!blockout_covers(&blockout, day(27)));
        assert!(!blockout_covers(&blockout, day(23)));
    }

    #[test]
    fn blockout_with_missing_end_is_single_day() {
        let blockout = Blockout {
            starts_at: "2024-12-24T00:00:00Z".into(),
            ends_at: String::new(),
            reason: None,
        };
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 12, d).unwrap();
        assert!(blockout_covers(&blockout, day(24)));
        assert!(!blockout_covers(&blockout, day(25)));
    }

    #[test]
    fn sort_date_parses_with_time_suffix() {
        assert_eq!(
            parse_sort_date("2024-12-15T09:30:00Z"),
            NaiveDate::from_ymd_opt(2024, 12, 15)
        );
        assert_eq!(parse_sort_date("bogus"), None);
    }
}
