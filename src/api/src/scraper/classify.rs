//! Upcoming/past split for scraped events.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{Event, EventsResult};

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").expect("year pattern is valid"));

/// First "20xx" year found in a free-text date, if any
pub fn event_year(date: &str) -> Option<i32> {
    YEAR_RE
        .captures(date)
        .and_then(|caps| caps[1].parse().ok())
}

/// Split events into upcoming and past, keeping only this year's past events.
///
/// Past events whose date carries no recognisable year are kept.
pub fn partition(events: Vec<Event>, current_year: i32) -> EventsResult {
    let (past, upcoming): (Vec<Event>, Vec<Event>) =
        events.into_iter().partition(|event| event.is_past);

    let past_events = past
        .into_iter()
        .filter(|event| event_year(&event.date).map_or(true, |year| year == current_year))
        .collect();

    EventsResult {
        upcoming_events: upcoming,
        past_events,
    }
}
