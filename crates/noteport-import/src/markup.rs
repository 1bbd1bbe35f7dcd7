//! Removal of Office-specific markup noise from exported HTML.

use once_cell::sync::Lazy;
use regex::Regex;

/// `mso-*` style declaration, bounded by `;` or the closing quote.
static MSO_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)mso-[a-z-]+\s*:[^;"]*;?"#).unwrap());

static EMPTY_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\s+style\s*=\s*"\s*""#).unwrap());

static OFFICE_PARAGRAPH_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?o:p\s*>").unwrap());

static MSO_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bclass\s*=\s*"[^"]*\bmso[^"]*""#).unwrap());

static EMPTY_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\s+class\s*=\s*"\s*""#).unwrap());

/// Strip `mso-` styles, `<o:p>` tags, `Mso*` classes, and the empty
/// attributes they leave behind. Idempotent.
///
/// One removal can splice together a new match for another (`mso-<o:p>a:b;`),
/// so passes repeat until nothing changes. Every changing pass shortens the
/// text.
pub fn clean(html: &str) -> String {
    let mut current = html.to_string();
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(html: &str) -> String {
    let cleaned = OFFICE_PARAGRAPH_TAG.replace_all(html, "");
    let cleaned = MSO_DECLARATION.replace_all(&cleaned, "");
    let cleaned = EMPTY_STYLE.replace_all(&cleaned, "");
    let cleaned = MSO_CLASS.replace_all(&cleaned, r#"class="""#);
    let cleaned = EMPTY_CLASS.replace_all(&cleaned, "");
    cleaned.into_owned()
}
