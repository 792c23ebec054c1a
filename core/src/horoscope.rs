use serde::Serialize;

use crate::notion::{Page, RichTextSegment};

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Horoscope {
    pub day: String,
    pub date_range: String,
    pub horoscope: String,
}

impl Horoscope {
    /// Flattens one database row. Any missing, mistyped or empty property
    /// yields an empty string for that field only.
    pub fn from_page(page: &Page) -> Self {
        let prop = |name: &str| page.properties.get(name);

        let day = prop("day")
            .and_then(|p| p.select.as_ref())
            .map(|option| option.name.clone())
            .unwrap_or_default();

        // rich text wins whenever it has a segment, whatever the type tag says
        let date_range = prop("date_range")
            .and_then(|p| non_empty(&p.rich_text).or_else(|| non_empty(&p.title)))
            .map(|segments| segments[0].text().to_string())
            .unwrap_or_default();

        let horoscope = prop("horoscope")
            .and_then(|p| p.rich_text.as_ref())
            .map(|segments| segments.iter().map(RichTextSegment::text).collect::<String>())
            .unwrap_or_default();

        Self { day, date_range, horoscope }
    }
}

fn non_empty(segments: &Option<Vec<RichTextSegment>>) -> Option<&[RichTextSegment]> {
    segments.as_deref().filter(|segments| !segments.is_empty())
}
