//! Keyword classification of page text
//!
//! Pure functions: no I/O, no suspension points. The keyword tables are
//! passed in from configuration.

use crate::config::SectorEntry;
use scraper::Html;

/// Sector reported when no sector reaches the confidence threshold
pub const UNKNOWN_SECTOR: &str = "unknown";

/// Elements whose text never renders
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Result of scoring page text against the sector table
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub sector: String,
    /// Matched / total keywords of the best-scoring sector, in `[0, 1]`
    pub confidence: f64,
}

/// Extracts the visible text of an HTML document, lowercased
///
/// Text inside `script`, `style`, `noscript`, and `template` elements is
/// skipped. Text nodes are joined with single spaces.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for node in document.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|element| HIDDEN_ELEMENTS.contains(&element.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let fragment = fragment.trim();
        if !fragment.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(fragment);
        }
    }

    text.to_lowercase()
}

/// Scores lowercased text against an ordered sector table
///
/// The best sector is the one with the strictly highest confidence, so the
/// first sector in table order wins ties. A best confidence below
/// `min_confidence` reports [`UNKNOWN_SECTOR`] with that confidence.
pub fn classify_text(text: &str, sectors: &[SectorEntry], min_confidence: f64) -> Classification {
    let mut best: Option<(&str, f64)> = None;

    for sector in sectors {
        let confidence = sector_confidence(text, &sector.keywords);
        match best {
            Some((_, top)) if confidence <= top => {}
            _ => best = Some((&sector.name, confidence)),
        }
    }

    match best {
        Some((name, confidence)) if confidence >= min_confidence && confidence > 0.0 => {
            Classification {
                sector: name.to_string(),
                confidence,
            }
        }
        Some((_, confidence)) => Classification {
            sector: UNKNOWN_SECTOR.to_string(),
            confidence,
        },
        None => Classification {
            sector: UNKNOWN_SECTOR.to_string(),
            confidence: 0.0,
        },
    }
}

/// Fraction of keywords that occur in the text
fn sector_confidence(text: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }

    let matched = keywords
        .iter()
        .filter(|keyword| text.contains(keyword.to_lowercase().as_str()))
        .count();

    matched as f64 / keywords.len() as f64
}

/// Returns the first dummy keyword (in table order) found in the text
pub fn find_dummy_keyword<'a>(text: &str, keywords: &'a [String]) -> Option<&'a str> {
    keywords
        .iter()
        .find(|keyword| text.contains(keyword.to_lowercase().as_str()))
        .map(String::as_str)
}
