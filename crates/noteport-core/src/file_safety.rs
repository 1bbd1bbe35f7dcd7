//! Uploaded names are reduced to a safe final path component before they are
//! used for staging or reporting.

/// Sanitize a filename for staging and reporting.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return "unnamed_file".to_string();
    }

    // Preserve the extension when truncating; cut on a char boundary.
    const MAX_LEN: usize = 255;
    if sanitized.len() > MAX_LEN {
        let ext = sanitized
            .rfind('.')
            .map(|pos| &sanitized[pos..])
            .filter(|ext| ext.len() < 16)
            .unwrap_or("");
        let mut cut = MAX_LEN - ext.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        return format!("{}{}", &sanitized[..cut], ext);
    }

    sanitized.to_string()
}
