//! Text encoding detection for uploaded documents.
//!
//! Legacy exports arrive in whatever code page the source machine used, most
//! often Shift_JIS or EUC-JP. [`resolve`] tries a fixed list of candidates and
//! keeps the one that decodes cleanly with the most plausible output.

use std::borrow::Cow;

use encoding_rs::{Encoding, BIG5, EUC_JP, EUC_KR, GB18030, ISO_2022_JP, SHIFT_JIS, UTF_8};
use tracing::{debug, trace};

/// Candidate encodings in priority order. Earlier entries win ties.
pub fn candidates() -> [&'static Encoding; 7] {
    [
        UTF_8,
        ISO_2022_JP,
        EUC_JP,
        SHIFT_JIS,
        GB18030,
        BIG5,
        EUC_KR,
    ]
}

/// A decode attempt that succeeded without invalid sequences.
#[derive(Debug, Clone)]
struct Candidate<'a> {
    encoding: &'static Encoding,
    text: Cow<'a, str>,
    replacement_ratio: f64,
    implausible_ratio: f64,
    priority: usize,
}

/// Detect the encoding of `bytes` and return the decoded text.
///
/// Never fails. When no candidate decodes cleanly the bytes are read as lossy
/// UTF-8.
pub fn resolve(bytes: &[u8]) -> String {
    resolve_with_encoding(bytes).0
}

/// Like [`resolve`], also returning the encoding that was chosen.
pub fn resolve_with_encoding(bytes: &[u8]) -> (String, &'static Encoding) {
    if bytes.is_empty() {
        return (String::new(), UTF_8);
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        debug!(encoding = encoding.name(), "Encoding selected by byte-order mark");
        return (text.into_owned(), encoding);
    }

    let best = candidates()
        .into_iter()
        .enumerate()
        .filter_map(|(priority, encoding)| decode_candidate(bytes, encoding, priority))
        .min_by(|a, b| {
            a.replacement_ratio
                .total_cmp(&b.replacement_ratio)
                .then(a.implausible_ratio.total_cmp(&b.implausible_ratio))
                .then(a.priority.cmp(&b.priority))
        });

    match best {
        Some(candidate) => {
            debug!(
                encoding = candidate.encoding.name(),
                implausible_ratio = candidate.implausible_ratio,
                "Encoding resolved"
            );
            (candidate.text.into_owned(), candidate.encoding)
        }
        None => {
            debug!(encoding = "UTF-8 (lossy)", "No candidate decoded cleanly");
            (String::from_utf8_lossy(bytes).into_owned(), UTF_8)
        }
    }
}

fn decode_candidate<'a>(
    bytes: &'a [u8],
    encoding: &'static Encoding,
    priority: usize,
) -> Option<Candidate<'a>> {
    let text = encoding.decode_without_bom_handling_and_without_replacement(bytes)?;
    let total = text.chars().count().max(1) as f64;
    let replacements = text.chars().filter(|&c| c == '\u{FFFD}').count() as f64;
    let implausible = text.chars().filter(|&c| is_implausible(c)).count() as f64;
    trace!(
        encoding = encoding.name(),
        replacements,
        implausible,
        "Candidate decoded"
    );
    Some(Candidate {
        encoding,
        text,
        replacement_ratio: replacements / total,
        implausible_ratio: implausible / total,
        priority,
    })
}

/// Characters that rarely appear in real documents but show up when bytes are
/// read under the wrong code page.
fn is_implausible(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' | '\u{0C}' => false,
        '\u{00}'..='\u{1F}' | '\u{7F}'..='\u{9F}' => true,
        // Private use area
        '\u{E000}'..='\u{F8FF}' => true,
        // Half-width katakana
        '\u{FF61}'..='\u{FF9F}' => true,
        _ => false,
    }
}

/// Repair an upload filename whose bytes were read as Latin-1.
///
/// Multipart parsers sometimes hand back UTF-8 or Shift_JIS names one byte per
/// char. When every char fits in a byte and at least one is non-ASCII, the
/// bytes are re-resolved; the repaired name is kept only if it contains
/// Japanese or other CJK text.
pub fn repair_filename(name: &str) -> String {
    if name.is_ascii() || name.chars().any(|c| c as u32 > 0xFF) {
        return name.to_string();
    }
    let bytes: Vec<u8> = name.chars().map(|c| c as u32 as u8).collect();
    let repaired = resolve(&bytes);
    if repaired.chars().any(is_cjk) {
        repaired
    } else {
        name.to_string()
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}' // hiragana, katakana
        | '\u{4E00}'..='\u{9FFF}' // unified ideographs
        | '\u{AC00}'..='\u{D7AF}') // hangul
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str, encoding: &'static Encoding) -> Vec<u8> {
        let (bytes, _, had_errors) = encoding.encode(text);
        assert!(!had_errors, "test text must be representable");
        bytes.into_owned()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(resolve(b""), "");
    }

    #[test]
    fn test_ascii_is_utf8() {
        let (text, encoding) = resolve_with_encoding(b"Simple ASCII text 123");
        assert_eq!(text, "Simple ASCII text 123");
        assert_eq!(encoding, UTF_8);
    }

    #[test]
    fn test_utf8_japanese_roundtrip() {
        let text = "日本語のテストです。こんにちは世界！";
        assert_eq!(resolve(text.as_bytes()), text);
    }

    #[test]
    fn test_shift_jis_roundtrip() {
        for text in ["これはテストです", "Hello 世界 Test", "カタカナテスト", "漢字変換テスト"] {
            let bytes = encode(text, SHIFT_JIS);
            let (decoded, encoding) = resolve_with_encoding(&bytes);
            assert_eq!(decoded, text);
            assert_eq!(encoding, SHIFT_JIS);
        }
    }

    #[test]
    fn test_euc_jp_roundtrip() {
        for text in ["EUCテスト", "こんにちは世界"] {
            let bytes = encode(text, EUC_JP);
            let (decoded, encoding) = resolve_with_encoding(&bytes);
            assert_eq!(decoded, text);
            assert_eq!(encoding, EUC_JP);
        }
    }

    #[test]
    fn test_iso_2022_jp_roundtrip() {
        let text = "ISOテスト";
        let bytes = encode(text, ISO_2022_JP);
        assert_eq!(resolve(&bytes), text);
    }

    #[test]
    fn test_gb18030_roundtrip() {
        // 丂 is a GBK extension char; its 0x81 lead is invalid EUC-JP.
        let text = "简体中文测试：们丂";
        let (decoded, encoding) = resolve_with_encoding(&encode(text, GB18030));
        assert_eq!(decoded, text);
        assert_eq!(encoding, GB18030);
    }

    #[test]
    fn test_big5_roundtrip() {
        // 一 is 0xA440, which GB18030 reads as a private-use char.
        let text = "一二三，中文測試";
        let (decoded, encoding) = resolve_with_encoding(&encode(text, BIG5));
        assert_eq!(decoded, text);
        assert_eq!(encoding, BIG5);
    }

    #[test]
    fn test_euc_kr_roundtrip() {
        // 뙇 is a UHC extension syllable (0x8C8D), invalid as Big5 or EUC-JP.
        let text = "뙇 한국어 테스트 學";
        let (decoded, encoding) = resolve_with_encoding(&encode(text, EUC_KR));
        assert_eq!(decoded, text);
        assert_eq!(encoding, EUC_KR);
    }

    #[test]
    fn test_bom_selects_encoding() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("テスト".as_bytes());
        assert_eq!(resolve(&bytes), "テスト");
    }

    #[test]
    fn test_binary_does_not_panic() {
        let text = resolve(&[0xFF, 0xFE, 0xFD, 0xFC]);
        assert!(!text.is_empty());
        let text = resolve(&[0x80, 0x81, 0xFF, 0x00, 0xFE]);
        assert!(!text.is_empty());
    }

    #[test]
    fn test_large_buffer_keeps_content() {
        let text = format!("{}日本語{}", "A".repeat(10_000), "B".repeat(10_000));
        assert!(resolve(text.as_bytes()).contains("日本語"));
    }

    #[test]
    fn test_implausible_chars() {
        assert!(is_implausible('\u{01}'));
        assert!(is_implausible('\u{85}'));
        assert!(is_implausible('\u{E000}'));
        assert!(is_implausible('ｱ'));
        assert!(!is_implausible('\n'));
        assert!(!is_implausible('ア'));
    }

    #[test]
    fn test_repair_filename_utf8_as_latin1() {
        let garbled: String = "議事録.pdf".as_bytes().iter().map(|&b| b as char).collect();
        assert_eq!(repair_filename(&garbled), "議事録.pdf");
    }

    #[test]
    fn test_repair_filename_leaves_clean_names() {
        assert_eq!(repair_filename("notes.html"), "notes.html");
        assert_eq!(repair_filename("日記.pdf"), "日記.pdf");
        assert_eq!(repair_filename("café.pdf"), "café.pdf");
    }
}
