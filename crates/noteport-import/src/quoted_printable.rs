//! Quoted-printable transport decoding for MHTML archives.
//!
//! Works on raw bytes so multi-byte UTF-8 sequences split across `=XX`
//! escapes are reassembled before any text decode runs.

/// Reverse quoted-printable encoding.
///
/// Soft line breaks (`=\r\n`, `=\n`) are removed first, then `=XX` escapes
/// (hex digits in either case) are decoded. A `=` not followed by two hex
/// digits is kept as-is.
pub fn decode(input: &[u8]) -> Vec<u8> {
    decode_escapes(&remove_soft_breaks(input))
}

fn remove_soft_breaks(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'=' {
            match (input.get(i + 1), input.get(i + 2)) {
                (Some(b'\r'), Some(b'\n')) => {
                    i += 3;
                    continue;
                }
                (Some(b'\n'), _) => {
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        out.push(input[i]);
        i += 1;
    }
    out
}

fn decode_escapes(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'=' && i + 2 < input.len() {
            if let (Some(hi), Some(lo)) = (hex_value(input[i + 1]), hex_value(input[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(input[i]);
        i += 1;
    }
    out
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_hex_escapes() {
        assert_eq!(decode(b"a=3Db"), b"a=b");
        assert_eq!(decode(b"=3c=3E"), b"<>");
    }

    #[test]
    fn test_reassembles_multibyte_utf8() {
        let decoded = decode(b"=E6=97=A5=E8=A8=98");
        assert_eq!(String::from_utf8(decoded).unwrap(), "日記");
    }

    #[test]
    fn test_soft_breaks_removed() {
        assert_eq!(decode(b"long=\r\nline"), b"longline");
        assert_eq!(decode(b"long=\nline"), b"longline");
    }

    #[test]
    fn test_escape_split_by_soft_break() {
        assert_eq!(
            String::from_utf8(decode(b"=E6=97=\r\n=A5")).unwrap(),
            "日"
        );
    }

    #[test]
    fn test_invalid_escape_kept() {
        assert_eq!(decode(b"a=ZZb"), b"a=ZZb");
        assert_eq!(decode(b"end="), b"end=");
        assert_eq!(decode(b"end=4"), b"end=4");
    }

    #[test]
    fn test_idempotent_without_escapes() {
        let plain = "<html><body>plain text 日本</body></html>".as_bytes();
        let once = decode(plain);
        assert_eq!(once, plain);
        assert_eq!(decode(&once), once);
    }
}
