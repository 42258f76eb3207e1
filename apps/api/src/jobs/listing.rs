//! Listing filters and the card view returned by the search endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::categories;
use crate::jobs::placeholder::display_image;
use crate::jobs::proximity::{
    city_part, city_proximity_score, sort_by_proximity, state_for_city, Locatable, JUST_NOW,
};
use crate::models::job::{JobRow, JobStatus};

/// A job as shown in a result list: the row plus everything derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct JobCard {
    #[serde(flatten)]
    pub job: JobRow,
    pub image_url: String,
    pub posted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proximity_score: Option<u32>,
}

impl JobCard {
    pub fn from_row(job: JobRow, now: DateTime<Utc>) -> Self {
        let image_url = display_image(&job.category, &job.id.to_string(), &job.images);
        let posted = posted_label(job.created_at, now);
        Self {
            job,
            image_url,
            posted,
            proximity_score: None,
        }
    }
}

impl Locatable for JobCard {
    fn location(&self) -> &str {
        &self.job.location
    }

    fn is_featured(&self) -> bool {
        self.job.featured
    }

    fn posted_label(&self) -> &str {
        &self.posted
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub jobs: Vec<JobCard>,
    pub total: usize,
    /// Listings located in the searched city itself.
    pub exact_matches: usize,
    /// True when nothing is in the searched city and only nearby jobs remain.
    pub nearby_only: bool,
}

/// Human-readable age of a listing.
pub fn posted_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(created_at);
    let minutes = age.num_minutes();
    if minutes < 1 {
        return JUST_NOW.to_string();
    }
    if minutes < 60 {
        return plural(minutes, "minute");
    }
    let hours = age.num_hours();
    if hours < 24 {
        return plural(hours, "hour");
    }
    plural(age.num_days(), "day")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

/// Matches a job category against a filter given as display name or slug.
pub fn matches_category(job_category: &str, filter: &str) -> bool {
    let filter = filter.trim();
    if filter.is_empty() || filter.eq_ignore_ascii_case("all") {
        return true;
    }
    categories::slugify(job_category) == categories::slugify(filter)
}

pub fn matches_city(location: &str, city: &str) -> bool {
    let city = city_part(city);
    city.is_empty() || location.to_lowercase().contains(&city)
}

/// Free-text match across the searchable fields of a job.
pub fn matches_query(job: &JobRow, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    [
        job.title.as_str(),
        job.description.as_str(),
        job.job_type.as_str(),
        job.location.as_str(),
        job.category.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&query))
}

/// The part of a search the database applies before ranking, so the
/// candidate cap never hides a match: category and text filters, and
/// ILIKE patterns that order same-city then same-state jobs first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub category: Option<String>,
    pub text_pattern: Option<String>,
    pub city_pattern: Option<String>,
    pub nearby_patterns: Vec<String>,
}

impl ListingFilter {
    pub fn from_params(params: &SearchParams) -> Self {
        let category = params
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
            .map(|c| categories::resolve(c).map_or_else(|| c.to_string(), str::to_string));
        let text_pattern = params
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(contains_pattern);
        let city = params.city.as_deref().map(city_part).unwrap_or_default();
        let (city_pattern, nearby_patterns) = if city.is_empty() {
            (None, Vec::new())
        } else {
            let nearby = state_for_city(&city)
                .map(|(state, cities)| {
                    std::iter::once(state)
                        .chain(cities.iter().copied())
                        .map(contains_pattern)
                        .collect()
                })
                .unwrap_or_default();
            (Some(contains_pattern(&city)), nearby)
        };
        Self {
            category,
            text_pattern,
            city_pattern,
            nearby_patterns,
        }
    }
}

/// `%text%` with LIKE wildcards in `text` escaped.
fn contains_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Runs the listing pipeline: active only → category → query → city ranking.
pub fn search(jobs: Vec<JobRow>, params: &SearchParams, now: DateTime<Utc>) -> SearchResult {
    let category = params.category.as_deref().unwrap_or("");
    let query = params.q.as_deref().unwrap_or("");
    let city = params.city.as_deref().unwrap_or("").trim();

    let cards: Vec<JobCard> = jobs
        .into_iter()
        .filter(|j| j.status == JobStatus::Active.as_str())
        .filter(|j| matches_category(&j.category, category))
        .filter(|j| matches_query(j, query))
        .map(|j| JobCard::from_row(j, now))
        .collect();

    let (mut cards, exact_matches) = if city.is_empty() {
        (cards, 0)
    } else {
        let mut ranked = sort_by_proximity(cards, city);
        for card in ranked.iter_mut() {
            card.proximity_score = Some(city_proximity_score(&card.job.location, city));
        }
        let exact = ranked
            .iter()
            .filter(|c| matches_city(&c.job.location, city))
            .count();
        (ranked, exact)
    };

    let total = cards.len();
    if let Some(limit) = params.limit {
        cards.truncate(limit);
    }

    SearchResult {
        nearby_only: !city.is_empty() && exact_matches == 0 && total > 0,
        jobs: cards,
        total,
        exact_matches,
    }
}
