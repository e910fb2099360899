//! Event sources: a rendered page run through the extractor.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::extractor::EventExtractor;
use super::fields::CARD_SELECTOR;
use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::types::Event;

/// Anything that can produce the current list of events.
///
/// One call is one attempt; implementations do not retry.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<Event>, FetchError>;
}

/// What to render and how long to wait for it
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: String,
    /// Element that signals the client-side list has rendered
    pub ready_selector: String,
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
}

impl RenderRequest {
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            url: config.url.clone(),
            ready_selector: CARD_SELECTOR.to_string(),
            navigation_timeout: config.navigation_timeout(),
            selector_timeout: config.selector_timeout(),
        }
    }
}

/// Starts browser sessions
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, FetchError>;
}

/// A running browser. `close` must be called once the session is done with.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigate and return the page's HTML once the ready selector shows up
    async fn render(&mut self, request: &RenderRequest) -> Result<String, FetchError>;

    async fn close(&mut self);
}

/// Launches a browser per fetch, renders the listing and extracts events
pub struct BrowserEventSource<R> {
    renderer: R,
    extractor: EventExtractor,
    request: RenderRequest,
}

impl<R: PageRenderer> BrowserEventSource<R> {
    pub fn new(renderer: R, extractor: EventExtractor, request: RenderRequest) -> Self {
        Self {
            renderer,
            extractor,
            request,
        }
    }
}

#[async_trait]
impl<R: PageRenderer> EventSource for BrowserEventSource<R> {
    async fn fetch_events(&self) -> Result<Vec<Event>, FetchError> {
        let mut session = self.renderer.launch().await?;

        // Close before looking at the outcome so every path releases the browser
        let rendered = session.render(&self.request).await;
        session.close().await;

        let html = rendered?;
        let events = self.extractor.extract(&html);
        debug!("Extracted {} events from {}", events.len(), self.request.url);

        Ok(events)
    }
}
