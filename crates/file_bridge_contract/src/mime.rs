//! Fixed extension/MIME table used when the bridge has to name a type itself.

/// MIME type used for unrecognized extensions.
pub const GENERIC_BINARY_MIME: &str = "application/octet-stream";

/// Extension to MIME mapping. The first extension listed for a MIME type is its canonical one.
const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("text", "text/plain"),
    ("log", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("mjs", "text/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("rtf", "application/rtf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("odp", "application/vnd.oasis.opendocument.presentation"),
    ("epub", "application/epub+zip"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("tar", "application/x-tar"),
    ("7z", "application/x-7z-compressed"),
    ("apk", "application/vnd.android.package-archive"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("ico", "image/vnd.microsoft.icon"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
];

/// Returns the lowercase extension of `name`, ignoring dot-files without an extension.
fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Derives a MIME type from a file name's extension.
///
/// Lookup is case-insensitive. Unknown or missing extensions yield [`GENERIC_BINARY_MIME`].
pub fn mime_for_file_name(name: &str) -> &'static str {
    let Some(ext) = extension_of(name) else {
        return GENERIC_BINARY_MIME;
    };
    EXTENSION_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(GENERIC_BINARY_MIME)
}

/// Returns the canonical extension for an exact MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = mime.trim().to_ascii_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|(_, candidate)| *candidate == mime)
        .map(|(ext, _)| *ext)
}

/// Returns every known extension whose MIME type matches `pattern` (for example `image/*`).
pub fn extensions_for_pattern(pattern: &str) -> Vec<&'static str> {
    EXTENSION_TABLE
        .iter()
        .filter(|(_, mime)| mime_matches(pattern, mime))
        .map(|(ext, _)| *ext)
        .collect()
}

/// Checks that `pattern` is a `type/subtype` MIME string, allowing `*` wildcards.
pub fn is_valid_mime_pattern(pattern: &str) -> bool {
    let Some((top, sub)) = pattern.trim().split_once('/') else {
        return false;
    };
    let token_ok = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || "!#$&^_.+-*".contains(ch))
    };
    if top == "*" && sub != "*" {
        return false;
    }
    token_ok(top) && token_ok(sub)
}

/// Returns `true` when `mime` satisfies `pattern`, honoring `*/*` and `type/*` wildcards.
pub fn mime_matches(pattern: &str, mime: &str) -> bool {
    let pattern = pattern.trim().to_ascii_lowercase();
    let mime = mime.trim().to_ascii_lowercase();
    if pattern == "*/*" || pattern == mime {
        return true;
    }
    match (pattern.split_once('/'), mime.split_once('/')) {
        (Some((p_top, "*")), Some((m_top, _))) => p_top == m_top,
        _ => false,
    }
}
