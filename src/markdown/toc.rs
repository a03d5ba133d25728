use std::collections::HashMap;

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// Anchor id, unique within the document.
    pub id: String,
    pub text: String,
    /// 1 through 6.
    pub level: u8,
}

/// Headings of a Markdown document in order of appearance, as a CommonMark
/// renderer would emit them. Headings nested in block quotes or list items
/// count; anything in a code block does not.
#[must_use]
pub fn table_of_contents(content: &str) -> Vec<TocEntry> {
    let mut headings: Vec<(u8, String)> = Vec::new();
    let mut current: Option<(u8, String)> = None;
    let mut image_depth = 0usize;

    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((heading_level(level), String::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, text)) = current.take() {
                    headings.push((level, text.trim().to_string()));
                }
            }
            Event::Start(Tag::Image { .. }) => image_depth += 1,
            Event::End(TagEnd::Image) => image_depth = image_depth.saturating_sub(1),
            Event::Text(text) | Event::Code(text) if image_depth == 0 => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push(' ');
                }
            }
            _ => {}
        }
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    headings
        .into_iter()
        .map(|(level, text)| {
            let base = slugify(&text);
            let count = seen.entry(base.clone()).or_insert(0);
            let id = if *count == 0 {
                base
            } else {
                format!("{base}-{count}")
            };
            *count += 1;
            TocEntry { id, text, level }
        })
        .collect()
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Anchor slug: whitespace runs become `-`, then everything but ASCII
/// letters and digits, Hangul, and `-` is dropped.
#[must_use]
pub fn slugify(text: &str) -> String {
    let dashed = text.split_whitespace().collect::<Vec<_>>().join("-");
    dashed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || is_hangul(*c))
        .collect::<String>()
        .to_lowercase()
}

fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7A3}' | '\u{3131}'..='\u{314E}' | '\u{314F}'..='\u{3163}')
}
