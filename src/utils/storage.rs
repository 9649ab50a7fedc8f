// src/utils/storage.rs

use std::sync::LazyLock;

use regex::Regex;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9._-]+").expect("file name pattern is valid")
});

/// Reduces an uploaded file name to a single safe path segment.
///
/// Directory parts are dropped, runs of unsafe characters collapse to `_`
/// and leading dots are removed so the result can never be hidden or relative.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Object path for one photo: `<user id>/<timestamp ms>-<order>-<file name>`.
pub fn photo_object_path(user_id: i64, timestamp_ms: i64, display_order: i32, file_name: &str) -> String {
    format!(
        "{}/{}-{}-{}",
        user_id,
        timestamp_ms,
        display_order,
        sanitize_file_name(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_ordinary_names() {
        assert_eq!(sanitize_file_name("beach-2023.jpg"), "beach-2023.jpg");
    }

    #[test]
    fn collapses_spaces_and_symbols() {
        assert_eq!(sanitize_file_name("my photo (1).png"), "my_photo_1_.png");
    }

    #[test]
    fn drops_directories_and_leading_dots() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\me.gif"), "me.gif");
        assert_eq!(sanitize_file_name(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_file_name(".."), "photo");
    }

    #[test]
    fn builds_object_path() {
        assert_eq!(
            photo_object_path(42, 1_700_000_000_000, 2, "me at the lake.jpg"),
            "42/1700000000000-2-me_at_the_lake.jpg"
        );
    }
}
