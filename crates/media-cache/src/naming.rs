//! Cache directory naming and target extensions.

use cutforge_instruction_model::MediaRef;

/// Fixed MIME → extension table for cached media files.
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
    ("video/webm", "webm"),
    ("video/x-matroska", "mkv"),
    ("audio/mpeg", "mp3"),
    ("audio/mp4", "m4a"),
    ("audio/aac", "aac"),
    ("audio/wav", "wav"),
    ("audio/x-wav", "wav"),
    ("audio/ogg", "ogg"),
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Filesystem-safe transform of a media id. Anything outside
/// `[A-Za-z0-9._-]` becomes `_`, so ids that look like URLs or object ids
/// map to stable, collision-unlikely directory names.
pub fn safe_cache_key(media_id: &str) -> String {
    media_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Target extension for the assembled file: MIME table first, then the
/// title's extension, then a generic binary extension.
pub fn target_extension(media: &MediaRef) -> String {
    if let Some(mime) = &media.mime {
        let mime = mime.trim().to_ascii_lowercase();
        if let Some((_, ext)) = MIME_EXTENSIONS.iter().find(|(m, _)| *m == mime) {
            return (*ext).to_string();
        }
    }

    if let Some(title) = &media.title {
        if let Some((_, ext)) = title.rsplit_once('.') {
            if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return ext.to_ascii_lowercase();
            }
        }
    }

    "bin".to_string()
}

/// Indexed chunk file name, zero-padded so lexical order equals numeric
/// order.
pub fn chunk_file_name(index: u64) -> String {
    format!("{index:06}.part")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(mime: Option<&str>, title: Option<&str>) -> MediaRef {
        MediaRef {
            media_id: "m".to_string(),
            mime: mime.map(String::from),
            title: title.map(String::from),
            cut: None,
        }
    }

    #[test]
    fn test_safe_cache_key_replaces_url_characters() {
        assert_eq!(
            safe_cache_key("https://cdn.example.com/v/abc?sig=1"),
            "https___cdn.example.com_v_abc_sig_1"
        );
        assert_eq!(safe_cache_key("65bd0c-2"), "65bd0c-2");
    }

    #[test]
    fn test_extension_from_mime_table() {
        assert_eq!(target_extension(&media(Some("video/mp4"), None)), "mp4");
        assert_eq!(target_extension(&media(Some("AUDIO/WAV"), None)), "wav");
    }

    #[test]
    fn test_extension_falls_back_to_title() {
        assert_eq!(
            target_extension(&media(Some("application/x-unknown"), Some("clip.MOV"))),
            "mov"
        );
        assert_eq!(target_extension(&media(None, Some("take_2.mkv"))), "mkv");
    }

    #[test]
    fn test_extension_falls_back_to_bin() {
        assert_eq!(target_extension(&media(None, None)), "bin");
        assert_eq!(target_extension(&media(None, Some("no extension"))), "bin");
    }

    #[test]
    fn test_chunk_file_names_sort_numerically() {
        assert_eq!(chunk_file_name(0), "000000.part");
        assert_eq!(chunk_file_name(42), "000042.part");
        assert!(chunk_file_name(9) < chunk_file_name(10));
    }
}
