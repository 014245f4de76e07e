//! Filename-extension content types.

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Maps a file name to a content type.
pub trait ContentTypes: Send + Sync {
    /// `None` when the name gives no usable hint.
    fn content_type(&self, name: &str) -> Option<String>;
}

lazy_static! {
    static ref BUILTIN: HashMap<&'static str, &'static str> = [
        ("txt", "text/plain"),
        ("md", "text/markdown"),
        ("html", "text/html"),
        ("htm", "text/html"),
        ("css", "text/css"),
        ("csv", "text/csv"),
        ("xml", "application/xml"),
        ("js", "application/javascript"),
        ("mjs", "application/javascript"),
        ("json", "application/json"),
        ("wasm", "application/wasm"),
        ("pdf", "application/pdf"),
        ("zip", "application/zip"),
        ("gz", "application/gzip"),
        ("tar", "application/x-tar"),
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("webp", "image/webp"),
        ("svg", "image/svg+xml"),
        ("ico", "image/vnd.microsoft.icon"),
        ("mp3", "audio/mpeg"),
        ("wav", "audio/wav"),
        ("ogg", "audio/ogg"),
        ("mp4", "video/mp4"),
        ("webm", "video/webm"),
        ("woff", "font/woff"),
        ("woff2", "font/woff2"),
    ]
    .into_iter()
    .collect();
}

/// Lookup by the last extension of a name, case-insensitively.
///
/// Textual types get `; charset=utf-8` appended.
#[derive(Debug, Clone, Default)]
pub struct ExtensionContentTypes {
    extra: HashMap<String, String>,
}

impl ExtensionContentTypes {
    /// Add or override the type for an extension (given without the dot).
    pub fn with_type(mut self, extension: &str, mime: impl Into<String>) -> Self {
        self.extra
            .insert(extension.to_ascii_lowercase(), mime.into());
        self
    }

    fn lookup(&self, extension: &str) -> Option<&str> {
        self.extra
            .get(extension)
            .map(String::as_str)
            .or_else(|| BUILTIN.get(extension).copied())
    }
}

fn is_textual(mime: &str) -> bool {
    mime.starts_with("text/") || mime == "application/json" || mime == "application/javascript"
}

impl ContentTypes for ExtensionContentTypes {
    fn content_type(&self, name: &str) -> Option<String> {
        let (stem, extension) = name.rsplit_once('.')?;
        // ".bashrc" is a name, not an extension
        if stem.is_empty() {
            return None;
        }
        let mime = self.lookup(&extension.to_ascii_lowercase())?;
        if is_textual(mime) && !mime.contains("charset") {
            Some(format!("{}; charset=utf-8", mime))
        } else {
            Some(mime.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        let types = ExtensionContentTypes::default();
        assert_eq!(
            types.content_type("a.txt").as_deref(),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(types.content_type("photo.JPG").as_deref(), Some("image/jpeg"));
        assert_eq!(
            types.content_type("archive.tar.gz").as_deref(),
            Some("application/gzip")
        );
        assert_eq!(
            types.content_type("data.json").as_deref(),
            Some("application/json; charset=utf-8")
        );
    }

    #[test]
    fn unknown_or_missing_extension() {
        let types = ExtensionContentTypes::default();
        assert_eq!(types.content_type("Makefile"), None);
        assert_eq!(types.content_type("blob.xyz123"), None);
        assert_eq!(types.content_type(".bashrc"), None);
        assert_eq!(types.content_type("trailing."), None);
    }

    #[test]
    fn overrides_win() {
        let types = ExtensionContentTypes::default()
            .with_type("TXT", "text/x-notes")
            .with_type("rs", "text/rust");
        assert_eq!(
            types.content_type("a.txt").as_deref(),
            Some("text/x-notes; charset=utf-8")
        );
        assert_eq!(
            types.content_type("main.rs").as_deref(),
            Some("text/rust; charset=utf-8")
        );
    }
}
