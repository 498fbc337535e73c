use std::path::Path;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Accepted upload categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Document,
}

impl MediaKind {
    /// `image/*` of any subtype or `application/pdf`; everything else is rejected.
    pub fn classify(media_type: &str) -> Option<Self> {
        let normalized = essence(media_type);
        if normalized.starts_with("image/") && normalized.len() > "image/".len() {
            return Some(Self::Image);
        }
        if normalized == MIME_PDF {
            return Some(Self::Document);
        }
        None
    }
}

/// Raw upload as selected by the user. Consumed by normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::classify(&self.media_type)
    }
}

/// Why an upload never reached the pipeline. Rejections do not change state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejected {
    #[error("unsupported media type '{media_type}'; upload an image or a PDF")]
    UnsupportedMediaType { media_type: String },
    #[error("an analysis is already in progress")]
    Busy,
}

impl UploadRejected {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedMediaType { .. } => "unsupported_media_type",
            Self::Busy => "busy",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedMediaType { .. } => {
                "请上传图片或PDF文件 (Please upload an image or PDF)".to_string()
            }
            Self::Busy => "AI 正在分析当前试卷，请等待分析完成后再上传。".to_string(),
        }
    }
}

/// Accepts or rejects a declared media type at the upload boundary.
pub fn check_media_type(media_type: &str) -> Result<MediaKind, UploadRejected> {
    MediaKind::classify(media_type).ok_or_else(|| UploadRejected::UnsupportedMediaType {
        media_type: media_type.to_string(),
    })
}

/// Declared media type for a local file, derived from its extension.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => MIME_JPEG,
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "pdf" => MIME_PDF,
        "txt" => "text/plain",
        _ => MIME_OCTET_STREAM,
    }
}

fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{check_media_type, media_type_for_path, MediaKind, UploadRejected};

    #[test]
    fn classify_accepts_any_image_subtype_and_pdf() {
        assert_eq!(MediaKind::classify("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::classify("image/heic"), Some(MediaKind::Image));
        assert_eq!(MediaKind::classify("IMAGE/JPEG"), Some(MediaKind::Image));
        assert_eq!(
            MediaKind::classify("application/pdf; name=exam.pdf"),
            Some(MediaKind::Document)
        );
    }

    #[test]
    fn classify_rejects_other_types() {
        assert_eq!(MediaKind::classify("text/plain"), None);
        assert_eq!(MediaKind::classify("application/zip"), None);
        assert_eq!(MediaKind::classify("image/"), None);
        assert_eq!(MediaKind::classify(""), None);
    }

    #[test]
    fn txt_upload_is_rejected() {
        let media_type = media_type_for_path(Path::new("notes/answers.TXT"));
        assert_eq!(media_type, "text/plain");
        assert_eq!(
            check_media_type(media_type),
            Err(UploadRejected::UnsupportedMediaType {
                media_type: "text/plain".to_string()
            })
        );
    }

    #[test]
    fn media_type_for_path_maps_known_extensions() {
        assert_eq!(media_type_for_path(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(media_type_for_path(Path::new("a.heif")), "image/heif");
        assert_eq!(media_type_for_path(Path::new("paper.pdf")), "application/pdf");
        assert_eq!(
            media_type_for_path(Path::new("no_extension")),
            "application/octet-stream"
        );
    }
}
