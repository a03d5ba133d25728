//! Markdown helpers for post bodies.

mod toc;

pub use toc::{TocEntry, slugify, table_of_contents};

/// The Markdown that embeds an uploaded image.
#[must_use]
pub fn image_embed(url: &str) -> String {
    format!("![]({url})")
}
