//! Request and response types for the events API.

use serde::{Deserialize, Serialize};

/// A single listing scraped from the events page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub location: String,
    /// Free text as shown on the card, e.g. "Fri 14 Mar 2025, 6:00 PM"
    pub date: String,
    pub day: String,
    pub month: String,
    pub price: String,
    pub image: String,
    pub link: String,
    pub is_past: bool,
}

/// Events payload served by `GET /api/events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventsResult {
    pub upcoming_events: Vec<Event>,
    pub past_events: Vec<Event>,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cache: String,
}
