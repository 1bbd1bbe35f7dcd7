//! Authorship and timestamp hints from `<meta>` elements.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::{Html, Node};

use noteport_core::ImportMetadata;

/// Recognized `<meta name>` values, in precedence order.
const CREATED_NAMES: &[&str] = &["created", "Created", "dcterms.created"];
const MODIFIED_NAMES: &[&str] = &["modified", "Modified", "dcterms.modified", "last-modified"];
const AUTHOR_NAMES: &[&str] = &["author", "Author", "dcterms.creator"];

/// Extract metadata from an HTML string. Every field is optional.
pub fn extract(html: &str) -> ImportMetadata {
    extract_from(&Html::parse_document(html))
}

/// Extract metadata from an already parsed document.
pub fn extract_from(doc: &Html) -> ImportMetadata {
    let metas: Vec<(&str, &str)> = doc
        .root_element()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Element(el) if el.name() == "meta" => {
                Some((el.attr("name")?, el.attr("content")?))
            }
            _ => None,
        })
        .collect();

    ImportMetadata {
        created_at: lookup(&metas, CREATED_NAMES).and_then(parse_date),
        updated_at: lookup(&metas, MODIFIED_NAMES).and_then(parse_date),
        author: lookup(&metas, AUTHOR_NAMES).map(str::to_string),
    }
}

/// Content of the first present name variant.
fn lookup<'a>(metas: &[(&'a str, &'a str)], names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|wanted| {
        metas
            .iter()
            .find(|(name, _)| name == wanted)
            .map(|(_, content)| content.trim())
            .filter(|content| !content.is_empty())
    })
}

/// Parse a metadata date. Offsetless values are taken as UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
