//! Filename sanitization for names coming from chat users and media titles.

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Characters rejected by at least one common filesystem.
fn is_forbidden(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '\0') || c.is_control()
}

/// Sanitizes a candidate filename so it is safe on Linux and Windows shares.
///
/// - Replaces `<>:"/\|?*`, NUL, control characters and whitespace runs with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots, spaces and underscores
/// - Limits length to 255 bytes without splitting a UTF-8 character
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let mapped = if is_forbidden(c) || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if mapped == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(mapped);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.len() <= NAME_MAX {
        return trimmed.to_string();
    }
    let mut take = NAME_MAX;
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
