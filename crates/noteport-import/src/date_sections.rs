//! Splitting of unstructured text dumps into one section per date.
//!
//! Diaries exported to PDF usually arrive as one long text where each day
//! starts with a date heading. Detection is deliberately permissive: prose
//! containing a date-like substring is split too.
//!
//! The pipeline is three pure steps so each can be tested alone:
//! 1. [`find_date_mentions`] and [`find_page_breaks`] scan the text
//! 2. [`resolve_overlaps`] reduces the raw matches to one per date mention
//! 3. [`segment`] cuts the text at the line of each surviving mention

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use noteport_core::defaults::{DATE_PROXIMITY_CHARS, FALLBACK_SECTION_TITLE};
use noteport_core::DateSection;

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d{4}年\d{1,2}月\d{1,2}日",
        r"\d{1,2}月\d{1,2}日",
        r"\d{4}/\d{1,2}/\d{1,2}",
        r"\d{4}-\d{1,2}-\d{1,2}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static PAGE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"-- \d+ of \d+ --").unwrap());

/// A raw date match. Offsets are bytes into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMention {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl DateMention {
    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Every match of every date pattern family, unsorted and unresolved.
pub fn find_date_mentions(text: &str) -> Vec<DateMention> {
    DATE_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(text))
        .map(|m| DateMention {
            start: m.start(),
            end: m.end(),
            text: m.as_str().to_string(),
        })
        .collect()
}

/// Byte offsets of `-- N of M --` page-break markers.
pub fn find_page_breaks(text: &str) -> Vec<usize> {
    PAGE_BREAK.find_iter(text).map(|m| m.start()).collect()
}

/// Sort mentions by offset and merge those that refer to the same date.
///
/// Two mentions are the same if their ranges intersect or their starts are
/// fewer than [`DATE_PROXIMITY_CHARS`] characters apart. The longer match
/// text survives; on equal length the earlier one does.
pub fn resolve_overlaps(text: &str, mut mentions: Vec<DateMention>) -> Vec<DateMention> {
    mentions.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<DateMention> = Vec::with_capacity(mentions.len());
    for mention in mentions {
        if let Some(last) = kept.last_mut() {
            let overlaps = mention.start < last.end;
            let distance = text[last.start..mention.start].chars().count();
            if overlaps || distance < DATE_PROXIMITY_CHARS {
                if mention.char_len() > last.char_len() {
                    *last = mention;
                }
                continue;
            }
        }
        kept.push(mention);
    }
    kept
}

/// Split `text` into ordered sections, one per detected date.
///
/// Without any date mention, or when every dated section is empty, a single
/// section titled `Full Text` holds the whole trimmed text.
pub fn segment(text: &str) -> Vec<DateSection> {
    let mentions = resolve_overlaps(text, find_date_mentions(text));
    if mentions.is_empty() {
        return vec![full_text(text)];
    }

    let page_breaks = find_page_breaks(text);
    let line_starts: Vec<usize> = mentions.iter().map(|m| line_start(text, m.start)).collect();

    let mut sections = Vec::with_capacity(mentions.len());
    for (i, mention) in mentions.iter().enumerate() {
        let start = line_starts[i];
        let mut end = line_starts.get(i + 1).copied().unwrap_or(text.len());
        if let Some(&marker) = page_breaks.iter().find(|&&p| p > start && p < end) {
            end = marker;
        }

        let content = text[start..end].trim();
        if content.is_empty() {
            continue;
        }
        trace!(title = %mention.text, start, end, "Date section");
        sections.push(DateSection {
            title: mention.text.clone(),
            content: content.to_string(),
            start_index: start,
            end_index: end,
        });
    }
    if sections.is_empty() {
        sections.push(full_text(text));
    }
    sections
}

fn full_text(text: &str) -> DateSection {
    DateSection {
        title: FALLBACK_SECTION_TITLE.to_string(),
        content: text.trim().to_string(),
        start_index: 0,
        end_index: text.len(),
    }
}

/// Whether a section is the no-date fallback.
pub fn is_fallback(section: &DateSection) -> bool {
    section.title == FALLBACK_SECTION_TITLE
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |pos| pos + 1)
}
