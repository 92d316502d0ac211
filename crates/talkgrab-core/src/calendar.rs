//! Calendar fetching and talk selection.
//!
//! The calendar endpoint returns one JSON array of event records; records
//! carrying an `"id"` key are talks, the rest (breaks, socials) are not.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::io::Read;
use thiserror::Error;

use crate::http::{HttpClient, RequestError};

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("calendar response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("calendar payload is not an array of events")]
    Shape,

    #[error("no talks with id(s) {0:?}")]
    UnknownTalks(Vec<u64>),
}

/// One talk record from the calendar.
///
/// `raw` keeps the record exactly as served so metadata files can carry
/// fields this tool does not model.
#[derive(Debug, Clone, Deserialize)]
pub struct Talk {
    pub id: u64,
    pub title: String,
    #[serde(default, deserialize_with = "de_link")]
    pub video: Option<String>,
    #[serde(default, deserialize_with = "de_link")]
    pub pfile: Option<String>,
    #[serde(default, deserialize_with = "de_link")]
    pub slideshare: Option<String>,
    #[serde(skip)]
    pub raw: Value,
}

/// Link fields come back as null or `""` when absent; both mean no link.
fn de_link<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<String>::deserialize(d)?;
    Ok(v.filter(|s| !s.is_empty()))
}

/// Parses the calendar payload. Events without an `"id"` key are dropped;
/// id-bearing records that don't match the expected shape are skipped with
/// a warning rather than failing the whole calendar.
pub fn parse_calendar(bytes: &[u8]) -> Result<Vec<Talk>, CalendarError> {
    let events = match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(events) => events,
        _ => return Err(CalendarError::Shape),
    };

    let mut talks = Vec::new();
    for event in events {
        if event.get("id").is_none() {
            continue;
        }
        match serde_json::from_value::<Talk>(event.clone()) {
            Ok(mut talk) => {
                talk.raw = event;
                talks.push(talk);
            }
            Err(err) => tracing::warn!(%err, "skipping malformed talk record"),
        }
    }
    Ok(talks)
}

/// Fetches and parses the talk calendar from `url`.
pub fn fetch_calendar(client: &dyn HttpClient, url: &str) -> Result<Vec<Talk>, CalendarError> {
    let mut response = client.get(url, None)?;
    let mut body = Vec::new();
    response
        .body
        .read_to_end(&mut body)
        .map_err(|source| RequestError::Body {
            url: url.to_string(),
            source,
        })?;
    let talks = parse_calendar(&body)?;
    tracing::debug!(count = talks.len(), url, "calendar parsed");
    Ok(talks)
}

/// Direct download URL for a talk video: the video page URL with the
/// configured file suffix appended.
pub fn video_file_url(page_url: &str, suffix: &str) -> String {
    format!("{page_url}{suffix}")
}

/// Resolves requested talk ids against the calendar. Duplicates in the
/// request collapse; ids matching no talk fail with `UnknownTalks`.
pub fn select_talks(talks: &[Talk], requested: &[u64]) -> Result<Vec<Talk>, CalendarError> {
    let mut wanted: Vec<u64> = requested.to_vec();
    wanted.sort_unstable();
    wanted.dedup();

    let missing: Vec<u64> = wanted
        .iter()
        .copied()
        .filter(|id| !talks.iter().any(|t| t.id == *id))
        .collect();
    if !missing.is_empty() {
        return Err(CalendarError::UnknownTalks(missing));
    }

    Ok(talks
        .iter()
        .filter(|t| wanted.contains(&t.id))
        .cloned()
        .collect())
}

/// Link-presence counts across a set of talks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TalkStats {
    pub talks: usize,
    pub videos: usize,
    pub presentations: usize,
    pub slideshares: usize,
}

impl TalkStats {
    pub fn collect(talks: &[Talk]) -> Self {
        let mut stats = TalkStats {
            talks: talks.len(),
            ..TalkStats::default()
        };
        for talk in talks {
            if talk.video.is_some() {
                stats.videos += 1;
            }
            if talk.pfile.is_some() {
                stats.presentations += 1;
            }
            if talk.slideshare.is_some() {
                stats.slideshares += 1;
            }
        }
        stats
    }
}
