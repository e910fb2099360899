//! Event card extractor for rendered Rubric pages.

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};

use super::event_url;
use super::fields::{Field, FieldRule, CARD_SELECTOR, EVENT_FIELDS};
use crate::types::Event;

/// A field rule with its selector parsed
#[derive(Debug)]
enum CompiledRule {
    Attr(&'static str),
    Text(Selector),
    ChildAttr(Selector, &'static str),
    HasClass(Selector, &'static str),
}

impl CompiledRule {
    fn compile(rule: FieldRule) -> Result<Self> {
        Ok(match rule {
            FieldRule::Attr(name) => CompiledRule::Attr(name),
            FieldRule::Text(sel) => CompiledRule::Text(parse_selector(sel)?),
            FieldRule::ChildAttr(sel, name) => CompiledRule::ChildAttr(parse_selector(sel)?, name),
            FieldRule::HasClass(sel, class) => CompiledRule::HasClass(parse_selector(sel)?, class),
        })
    }

    fn text(&self, card: &ElementRef) -> String {
        match self {
            CompiledRule::Attr(name) => card.value().attr(name).unwrap_or_default().to_string(),
            CompiledRule::Text(sel) => card
                .select(sel)
                .next()
                .map(|elem| elem.text().collect::<String>().trim().to_string())
                .unwrap_or_default(),
            CompiledRule::ChildAttr(sel, name) => card
                .select(sel)
                .next()
                .and_then(|elem| elem.value().attr(name))
                .unwrap_or_default()
                .to_string(),
            CompiledRule::HasClass(..) => String::new(),
        }
    }

    fn flag(&self, card: &ElementRef) -> bool {
        match self {
            // A missing tag means the marker is absent
            CompiledRule::HasClass(sel, class) => card
                .select(sel)
                .next()
                .is_some_and(|elem| elem.value().classes().any(|c| c == *class)),
            _ => !self.text(card).is_empty(),
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow::anyhow!("Invalid selector {}: {:?}", selector, e))
}

/// Turns a rendered listing page into events using the field table
#[derive(Debug)]
pub struct EventExtractor {
    card: Selector,
    rules: Vec<(Field, CompiledRule)>,
    link_base: String,
}

impl EventExtractor {
    /// Compile the card selector and field rules
    pub fn new(link_base: impl Into<String>) -> Result<Self> {
        let rules = EVENT_FIELDS
            .iter()
            .map(|&(field, rule)| CompiledRule::compile(rule).map(|compiled| (field, compiled)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            card: parse_selector(CARD_SELECTOR)?,
            rules,
            link_base: link_base.into(),
        })
    }

    /// Extract every card with both an id and a title, in document order
    pub fn extract(&self, html: &str) -> Vec<Event> {
        let document = Html::parse_document(html);

        document
            .select(&self.card)
            .filter_map(|card| self.extract_card(&card))
            .collect()
    }

    fn extract_card(&self, card: &ElementRef) -> Option<Event> {
        let mut event = Event::default();

        for (field, rule) in &self.rules {
            match field {
                Field::Id => event.id = rule.text(card),
                Field::Link => event.link = rule.text(card),
                Field::Image => event.image = rule.text(card),
                Field::Title => event.title = rule.text(card),
                Field::Location => event.location = rule.text(card),
                Field::Date => event.date = rule.text(card),
                Field::Price => event.price = rule.text(card),
                Field::Day => event.day = rule.text(card),
                Field::Month => event.month = rule.text(card),
                Field::IsPast => event.is_past = rule.flag(card),
            }
        }

        if event.id.is_empty() || event.title.is_empty() {
            return None;
        }

        if event.link.is_empty() {
            event.link = event_url(&self.link_base, &event.id);
        }

        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::EVENT_LINK_BASE;

    fn card(id: &str, href: Option<&str>, title: &str, date: &str, past: bool) -> String {
        let href = href.map(|h| format!(r#" href="{}""#, h)).unwrap_or_default();
        let tag_class = if past { "date-tag d-none" } else { "date-tag" };
        format!(
            r#"<a eventid="{id}"{href}>
                <img class="cardimage" src="https://cdn.example.com/{id}.png">
                <div class="{tag_class}"><span class="eventDay">14</span><span class="eventMonth">MAR</span></div>
                <h5 id="cardtitle"> {title} </h5>
                <p id="carddesc">Roundhouse</p>
                <p id="cardeventdate">{date}</p>
                <p id="cardinfo">Free</p>
            </a>"#
        )
    }

    fn page(cards: &[String]) -> String {
        format!("<html><body><div class=\"events\">{}</div></body></html>", cards.join("\n"))
    }

    #[test]
    fn test_extract_all_fields() {
        let extractor = EventExtractor::new(EVENT_LINK_BASE).unwrap();
        let html = page(&[card("101", Some("/events/101"), "Showcase", "Fri 14 Mar 2025", false)]);

        let events = extractor.extract(&html);
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.id, "101");
        assert_eq!(event.title, "Showcase");
        assert_eq!(event.location, "Roundhouse");
        assert_eq!(event.date, "Fri 14 Mar 2025");
        assert_eq!(event.day, "14");
        assert_eq!(event.month, "MAR");
        assert_eq!(event.price, "Free");
        assert_eq!(event.image, "https://cdn.example.com/101.png");
        assert_eq!(event.link, "/events/101");
        assert!(!event.is_past);
    }

    #[test]
    fn test_hidden_date_tag_marks_past() {
        let extractor = EventExtractor::new(EVENT_LINK_BASE).unwrap();
        let html = page(&[card("7", None, "Pub Crawl", "2024", true)]);

        let events = extractor.extract(&html);
        assert!(events[0].is_past);
    }

    #[test]
    fn test_missing_href_falls_back_to_event_link() {
        let extractor = EventExtractor::new(EVENT_LINK_BASE).unwrap();
        let html = page(&[card("55", None, "Workshop", "", false)]);

        let events = extractor.extract(&html);
        assert_eq!(events[0].link, "https://campus.hellorubric.com/?eid=55");
    }

    #[test]
    fn test_cards_without_id_or_title_are_dropped() {
        let extractor = EventExtractor::new(EVENT_LINK_BASE).unwrap();
        let html = page(&[
            card("1", None, "Showcase", "", false),
            card("2", None, "", "2023", true),
            card("", None, "No Id", "", false),
            card("3", None, "   ", "", false),
        ]);

        let ids: Vec<_> = extractor.extract(&html).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn test_missing_optional_elements_become_empty() {
        let extractor = EventExtractor::new(EVENT_LINK_BASE).unwrap();
        let html = r#"<html><body><a eventid="9"><span id="cardtitle">Bare</span></a></body></html>"#;

        let events = extractor.extract(html);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Bare");
        assert_eq!(events[0].image, "");
        assert_eq!(events[0].date, "");
        assert_eq!(events[0].price, "");
        // No date tag at all is not a past marker
        assert!(!events[0].is_past);
    }

    #[test]
    fn test_document_order_preserved() {
        let extractor = EventExtractor::new(EVENT_LINK_BASE).unwrap();
        let html = page(&[
            card("3", None, "C", "", false),
            card("1", None, "A", "", true),
            card("2", None, "B", "", false),
        ]);

        let ids: Vec<_> = extractor.extract(&html).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_page_without_cards() {
        let extractor = EventExtractor::new(EVENT_LINK_BASE).unwrap();
        assert!(extractor.extract("<html><body></body></html>").is_empty());
    }
}
