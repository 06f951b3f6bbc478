//! Link validation and filename derivation.
//!
//! Decides whether a chat message is a downloadable link and derives safe
//! local filenames for inline media, sanitized for Linux filesystems.

mod link;
mod sanitize;

pub use link::{validate_link, LinkError};
pub use sanitize::sanitize_filename;

/// Stem used when an inline media id sanitizes to nothing.
const DEFAULT_MEDIA_ID: &str = "media";

/// Filename for inline media: `inline_media_<unique id>.<ext>`.
///
/// Uses the chat protocol's stable unique id so repeated uploads of the same
/// payload map to the same file.
///
/// # Examples
///
/// - `inline_media_filename("AgADBAAD", "mp4")` → `"inline_media_AgADBAAD.mp4"`
/// - `inline_media_filename("../x", ".webm")` → `"inline_media_x.webm"`
pub fn inline_media_filename(unique_id: &str, extension: &str) -> String {
    let id = sanitize_filename(unique_id);
    let id = if id.is_empty() { DEFAULT_MEDIA_ID } else { &id };
    let ext = sanitize_filename(extension.trim_start_matches('.'));
    if ext.is_empty() {
        format!("inline_media_{id}")
    } else {
        format!("inline_media_{id}.{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_media_filename_basic() {
        assert_eq!(
            inline_media_filename("AgADBAAD", "mp4"),
            "inline_media_AgADBAAD.mp4"
        );
    }

    #[test]
    fn inline_media_filename_sanitizes_id_and_ext() {
        assert_eq!(inline_media_filename("../x", ".webm"), "inline_media_x.webm");
        assert_eq!(inline_media_filename("a/b", "mp4"), "inline_media_a_b.mp4");
    }

    #[test]
    fn inline_media_filename_fallbacks() {
        assert_eq!(inline_media_filename("..", "mp4"), "inline_media_media.mp4");
        assert_eq!(inline_media_filename("id", ""), "inline_media_id");
    }
}
