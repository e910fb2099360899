//! Events scraper for the club's Rubric listing page.
//!
//! Provides browser automation, field extraction, classification and the
//! cache that fronts them.

pub mod browser;
pub mod cache;
pub mod classify;
pub mod clock;
pub mod extractor;
pub mod fields;
pub mod source;

pub use browser::ChromeRenderer;
pub use cache::EventsCache;
pub use clock::{Clock, SystemClock};
pub use extractor::EventExtractor;
pub use source::{BrowserEventSource, EventSource, RenderRequest};

use crate::config::SourceConfig;

/// Listing page for the club's events
pub const SOURCE_URL: &str = "https://campus.hellorubric.com/?eid=51375";

/// Base for per-event links; the event id is appended
pub const EVENT_LINK_BASE: &str = "https://campus.hellorubric.com/?eid=";

/// Build the link for an event whose card carries no href
pub fn event_url(base: &str, event_id: &str) -> String {
    format!("{}{}", base, event_id)
}

/// Production source: headless Chrome driven against the configured page
pub fn browser_source(config: &SourceConfig) -> anyhow::Result<BrowserEventSource<ChromeRenderer>> {
    Ok(BrowserEventSource::new(
        ChromeRenderer::new(config.chrome_executable.clone()),
        EventExtractor::new(config.event_link_base.clone())?,
        RenderRequest::from_config(config),
    ))
}
