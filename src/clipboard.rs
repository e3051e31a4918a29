//! Paste events as delivered by the host editor

use std::path::Path;

/// One file attached to a paste
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardFile {
    /// Original file name, when the host knows it
    pub name: Option<String>,
    /// MIME type, e.g. `image/png`
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ClipboardFile {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: None,
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Read a file from disk, guessing its MIME type from the extension
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let mut file = Self::new(mime_from_path(path), data);
        file.name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        Ok(file)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image")
    }

    /// Name sent with the multipart upload.
    ///
    /// Falls back to `image.<subtype>` (e.g. `image.png`) for unnamed
    /// clipboard images.
    pub fn file_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let (kind, subtype) = self
            .mime_type
            .split_once('/')
            .unwrap_or((self.mime_type.as_str(), ""));
        let ext = subtype
            .split(['+', ';'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("bin");
        let stem = if kind.is_empty() { "file" } else { kind };
        format!("{stem}.{ext}")
    }
}

/// MIME type for common image extensions; anything else is opaque bytes
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}

/// A clipboard paste into the editor
#[derive(Debug, Clone, Default)]
pub struct PasteEvent {
    pub files: Vec<ClipboardFile>,
    default_prevented: bool,
}

impl PasteEvent {
    pub fn new(files: Vec<ClipboardFile>) -> Self {
        Self {
            files,
            default_prevented: false,
        }
    }

    /// Suppress the host's own paste handling
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image() {
        assert!(ClipboardFile::new("image/png", vec![]).is_image());
        assert!(ClipboardFile::new("image/svg+xml", vec![]).is_image());
        assert!(!ClipboardFile::new("text/plain", vec![]).is_image());
        assert!(!ClipboardFile::new("", vec![]).is_image());
    }

    #[test]
    fn test_file_name_fallbacks() {
        assert_eq!(ClipboardFile::new("image/png", vec![]).file_name(), "image.png");
        assert_eq!(
            ClipboardFile::new("image/svg+xml", vec![]).file_name(),
            "image.svg"
        );
        assert_eq!(ClipboardFile::new("image", vec![]).file_name(), "image.bin");
        assert_eq!(
            ClipboardFile::new("image/png", vec![])
                .with_name("shot.png")
                .file_name(),
            "shot.png"
        );
    }

    #[test]
    fn test_mime_from_path() {
        assert_eq!(mime_from_path(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_from_path(Path::new("dir/b.jpeg")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("notes.md")), "application/octet-stream");
        assert_eq!(mime_from_path(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let file = ClipboardFile::from_path(&path).await.unwrap();
        assert_eq!(file.mime_type, "image/gif");
        assert_eq!(file.name.as_deref(), Some("shot.gif"));
        assert_eq!(file.data, b"GIF89a");
    }

    #[test]
    fn test_prevent_default() {
        let mut event = PasteEvent::default();
        assert!(!event.is_default_prevented());
        event.prevent_default();
        assert!(event.is_default_prevented());
    }
}
