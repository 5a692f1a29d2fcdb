//! Paragraph extraction from HTML.
//!
//! Pages are parsed with a full HTML5 parser, so paragraphs whose closing
//! tag was omitted still count. A paragraph's text is the concatenation of
//! its descendant text nodes, with character references already decoded.

use lazy_static::lazy_static;
use scraper::{Html, Selector};

use triplecheck_core::Passage;

lazy_static! {
    static ref PARAGRAPH: Selector = Selector::parse("p").unwrap();
}

/// Text of every paragraph in document order, empty ones included.
///
/// The text is returned as found in the page; whitespace is normalized only
/// when a report is serialized.
pub fn paragraph_texts(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&PARAGRAPH)
        .map(|p| p.text().collect::<String>())
        .collect()
}

/// Paragraphs long enough to count as passages, in document order.
pub fn extract_paragraphs(html: &str) -> Vec<Passage> {
    paragraph_texts(html)
        .into_iter()
        .filter_map(Passage::checked)
        .collect()
}
