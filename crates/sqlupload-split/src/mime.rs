//! Extension to MIME type table

/// Content type used when nothing else is known.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

const TABLE: &[(&str, &str)] = &[
    // text
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("css", "text/css"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("rss", "application/rss+xml"),
    ("pdf", "application/pdf"),
    // images
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    ("ico", "image/vnd.microsoft.icon"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    // audio
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("wav", "audio/wav"),
    ("aac", "audio/aac"),
    ("flac", "audio/flac"),
    // video
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("ogv", "video/ogg"),
    ("avi", "video/x-msvideo"),
    ("mpeg", "video/mpeg"),
];

/// Look up the MIME type for a file-name extension (case-insensitive).
pub fn content_type_for(extension: &str) -> Option<&'static str> {
    let extension = extension.trim_start_matches('.');
    TABLE
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, mime)| *mime)
}

/// Whether the extension belongs to the image family.
///
/// Failures on images are routine (a plot not regenerated this cycle) and are
/// logged at debug level only.
pub fn is_image(extension: &str) -> bool {
    content_type_for(extension).is_some_and(|mime| mime.starts_with("image/"))
}
