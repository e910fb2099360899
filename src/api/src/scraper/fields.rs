//! Selector contract for event cards on the Rubric page.
//!
//! Every piece of markup the extractor depends on lives in this table.

/// Cards are anchors carrying an `eventid` attribute
pub const CARD_SELECTOR: &str = "a[eventid]";

/// Marker class Rubric puts on the date tag of events that have ended
pub const HIDDEN_CLASS: &str = "d-none";

/// Event field filled by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Link,
    Image,
    Title,
    Location,
    Date,
    Price,
    Day,
    Month,
    IsPast,
}

/// How a field is read from a card element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Attribute on the card itself
    Attr(&'static str),
    /// Trimmed text of the first matching descendant
    Text(&'static str),
    /// Attribute of the first matching descendant
    ChildAttr(&'static str, &'static str),
    /// Whether the first matching descendant carries a class
    HasClass(&'static str, &'static str),
}

pub const EVENT_FIELDS: &[(Field, FieldRule)] = &[
    (Field::Id, FieldRule::Attr("eventid")),
    (Field::Link, FieldRule::Attr("href")),
    (Field::Image, FieldRule::ChildAttr("img.cardimage", "src")),
    (Field::Title, FieldRule::Text("#cardtitle")),
    (Field::Location, FieldRule::Text("#carddesc")),
    (Field::Date, FieldRule::Text("#cardeventdate")),
    (Field::Price, FieldRule::Text("#cardinfo")),
    (Field::Day, FieldRule::Text(".eventDay")),
    (Field::Month, FieldRule::Text(".eventMonth")),
    (Field::IsPast, FieldRule::HasClass(".date-tag", HIDDEN_CLASS)),
];
