//! MIME type detection module
//!
//! Maps a file extension to its `Content-Type` and tells the compression
//! layer whether the payload is worth compressing.

/// Content type of a served file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentType {
    pub mime: &'static str,
    /// Text-like payloads shrink under gzip/brotli; media and archives don't
    pub compressible: bool,
}

const fn text(mime: &'static str) -> ContentType {
    ContentType {
        mime,
        compressible: true,
    }
}

const fn binary(mime: &'static str) -> ContentType {
    ContentType {
        mime,
        compressible: false,
    }
}

/// Look up the content type for a file extension (case-insensitive)
///
/// # Examples
/// ```
/// use asset_server::http::mime::content_type_for;
/// assert_eq!(content_type_for(Some("html")).mime, "text/html; charset=utf-8");
/// assert!(!content_type_for(Some("png")).compressible);
/// assert_eq!(content_type_for(None).mime, "application/octet-stream");
/// ```
pub fn content_type_for(extension: Option<&str>) -> ContentType {
    let ext = extension.map(str::to_ascii_lowercase);

    match ext.as_deref() {
        // Text
        Some("html" | "htm") => text("text/html; charset=utf-8"),
        Some("css") => text("text/css; charset=utf-8"),
        Some("txt" | "md") => text("text/plain; charset=utf-8"),
        Some("csv") => text("text/csv; charset=utf-8"),
        Some("xml") => text("application/xml"),
        Some("webmanifest") => text("application/manifest+json"),

        // JavaScript/WASM
        Some("js" | "mjs") => text("text/javascript; charset=utf-8"),
        Some("json" | "map") => text("application/json"),
        Some("wasm") => text("application/wasm"),

        // Images
        Some("png") => binary("image/png"),
        Some("jpg" | "jpeg") => binary("image/jpeg"),
        Some("gif") => binary("image/gif"),
        Some("svg") => text("image/svg+xml"),
        Some("ico") => text("image/x-icon"),
        Some("webp") => binary("image/webp"),
        Some("avif") => binary("image/avif"),

        // Video
        Some("mp4") => binary("video/mp4"),
        Some("webm") => binary("video/webm"),
        Some("ogg" | "ogv") => binary("video/ogg"),
        Some("mov") => binary("video/quicktime"),

        // Audio
        Some("mp3") => binary("audio/mpeg"),
        Some("wav") => binary("audio/wav"),
        Some("flac") => binary("audio/flac"),
        Some("m4a") => binary("audio/mp4"),

        // Fonts
        Some("woff") => binary("font/woff"),
        Some("woff2") => binary("font/woff2"),
        Some("ttf") => text("font/ttf"),
        Some("otf") => text("font/otf"),
        Some("eot") => text("application/vnd.ms-fontobject"),

        // Documents
        Some("pdf") => binary("application/pdf"),
        Some("zip") => binary("application/zip"),
        Some("gz" | "gzip") => binary("application/gzip"),
        Some("br") => binary("application/x-brotli"),
        Some("tar") => binary("application/x-tar"),

        // Default
        _ => binary("application/octet-stream"),
    }
}
