use bytes::Bytes;

use crate::hashing::content_file_name;

/// An uploaded file held in memory until it is written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    original_name: String,
    content_type: Option<String>,
    data: Bytes,
}

impl UploadedFile {
    pub fn new(
        original_name: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            content_type,
            data: data.into(),
        }
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Content type declared by the client, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Lowercased extension of the original file name.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.original_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Content-derived storage name (`{sha256}.{ext}`).
    pub fn hash_name(&self) -> String {
        content_file_name(&self.data, self.extension().as_deref())
    }

    /// MIME type guessed from the extension, falling back to the declared
    /// content type when the extension is unknown.
    pub fn mime_type(&self) -> Option<String> {
        self.extension()
            .and_then(|ext| mime_for_extension(&ext))
            .map(str::to_string)
            .or_else(|| {
                self.content_type
                    .as_deref()
                    .filter(|ct| *ct != "application/octet-stream")
                    .map(|ct| ct.to_ascii_lowercase())
            })
    }
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime)
}
